//! Integration coverage for the open → close → history → summary flow.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use downtime_core::{
    save_config, summarize, ActiveStore, AppConfig, DowntimeEngine, HistoryStore, HistorySummary,
    Process, ReasonChoice, StorageConfig, OTHER_REASON,
};
use tempfile::{tempdir, TempDir};

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 14)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn engine_in(temp: &TempDir) -> DowntimeEngine {
    let storage = StorageConfig::with_root(temp.path().join("app"));
    if !storage.config_file().exists() {
        save_config(
            &storage.config_file(),
            &AppConfig {
                storage_directory: temp.path().join("history"),
                ..AppConfig::default()
            },
        )
        .unwrap();
    }
    DowntimeEngine::with_storage(storage).unwrap()
}

fn choice_for(reason: &str) -> ReasonChoice {
    if reason == OTHER_REASON {
        ReasonChoice::Other("Motivo livre".to_string())
    } else {
        ReasonChoice::Listed(reason.to_string())
    }
}

#[test]
fn test_every_catalog_pair_produces_one_row_with_exact_duration() {
    let temp = tempdir().unwrap();
    let mut engine = engine_in(&temp);
    let start = at(6, 0, 0);
    let mut expected_rows = 0;

    for process in Process::ALL {
        for (i, reason) in process.reasons().iter().enumerate() {
            let opened_at = start + TimeDelta::minutes(expected_rows as i64);
            let closed_at = opened_at + TimeDelta::seconds(37 + i as i64);
            let s = engine
                .open_stoppage("operador", process.name(), &choice_for(reason), opened_at)
                .unwrap();
            let outcome = engine.close_stoppage(&s.id, closed_at).unwrap();
            assert!(outcome.is_recorded());
            expected_rows += 1;

            let rows = engine.history().unwrap().unwrap();
            assert_eq!(rows.len(), expected_rows);
            let last = rows.last().unwrap();
            let expected = (37 + i) as f64 / 60.0;
            assert!((last.duration_minutes.unwrap() - expected).abs() < 1e-9);
            assert_eq!(last.process.as_deref(), Some(process.name()));
        }
    }
}

#[test]
fn test_close_shrinks_listing_by_one() {
    let temp = tempdir().unwrap();
    let mut engine = engine_in(&temp);
    let mut ids = Vec::new();
    for minute in 0..3 {
        let s = engine
            .open_stoppage(
                "operador",
                "Raku-Raku",
                &ReasonChoice::Listed("Sincronismos".into()),
                at(8, minute, 0),
            )
            .unwrap();
        ids.push(s.id);
    }

    assert_eq!(engine.active_stoppages().len(), 3);
    engine.close_stoppage(&ids[1], at(9, 0, 0)).unwrap();
    let remaining: Vec<_> = engine
        .active_stoppages()
        .iter()
        .map(|s| s.id.clone())
        .collect();
    assert_eq!(remaining, vec![ids[0].clone(), ids[2].clone()]);
}

#[test]
fn test_side_file_round_trip_before_close() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("paradas_ativas.json");
    let mut store = ActiveStore::new(&file);
    store
        .open(
            "ana",
            Process::Unloading,
            &ReasonChoice::Listed("Sensor Robô Motoman".into()),
            at(13, 14, 15),
        )
        .unwrap();
    store
        .open(
            "bia",
            Process::Inspection,
            &ReasonChoice::Other("Peça sem fosfato".into()),
            at(13, 20, 0),
        )
        .unwrap();

    let reloaded = ActiveStore::load(&file);
    let summary = |s: &downtime_core::Stoppage| {
        (
            s.employee.clone(),
            s.process,
            s.reason.clone(),
            s.started_at,
        )
    };
    let before: Vec<_> = store.list().iter().map(summary).collect();
    let after: Vec<_> = reloaded.list().iter().map(summary).collect();
    assert_eq!(before, after);
}

#[test]
fn test_summary_is_idempotent_and_matches_groupings() {
    let temp = tempdir().unwrap();
    let mut engine = engine_in(&temp);
    let entries = [
        ("Carregamento", "Falta de peça", 10),
        ("Carregamento", "Falta de Espaço", 20),
        ("Inspeção", "Falta de tinta", 30),
    ];
    for (process, reason, minutes) in entries {
        let s = engine
            .open_stoppage(
                "operador",
                process,
                &ReasonChoice::Listed(reason.into()),
                at(8, 0, 0),
            )
            .unwrap();
        engine
            .close_stoppage(&s.id, at(8, 0, 0) + TimeDelta::minutes(minutes))
            .unwrap();
    }

    let first = engine.summary().unwrap();
    let second = engine.summary().unwrap();
    assert_eq!(first, second);

    let HistorySummary::Report(agg) = first else {
        panic!("expected a report");
    };
    assert!((agg.grand_total_minutes - 60.0).abs() < 1e-9);
    let carregamento = agg.by_process.get("Carregamento").unwrap();
    assert!((carregamento.minutes - 30.0).abs() < 1e-9);
    assert!((carregamento.percentage - 50.0).abs() < 1e-9);
    let inspecao = agg.by_process.get("Inspeção").unwrap();
    assert!((inspecao.percentage - 50.0).abs() < 1e-9);
    assert_eq!(agg.by_reason.len(), 3);
}

#[test]
fn test_wipe_reports_no_history() {
    let temp = tempdir().unwrap();
    let mut engine = engine_in(&temp);
    assert_eq!(engine.summary().unwrap(), HistorySummary::NoHistory);

    let s = engine
        .open_stoppage(
            "operador",
            "Raku-Raku",
            &ReasonChoice::Listed("Engate".into()),
            at(8, 0, 0),
        )
        .unwrap();
    engine.close_stoppage(&s.id, at(8, 5, 0)).unwrap();
    assert!(matches!(
        engine.summary().unwrap(),
        HistorySummary::Report(_)
    ));

    assert!(engine.wipe_history().unwrap());
    assert!(engine.history_store().scan().unwrap().is_empty());
    assert_eq!(engine.summary().unwrap(), HistorySummary::NoHistory);
    assert_eq!(engine.history().unwrap(), None);
}

#[test]
fn test_empty_table_is_an_empty_report() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("paradas.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Paradas (date TEXT, process TEXT, employee TEXT, reason TEXT, \
         start_time TEXT, end_time TEXT, duration_min REAL);",
    )
    .unwrap();
    drop(conn);

    let store = HistoryStore::new(path);
    assert!(store.exists().unwrap());
    match summarize(&store).unwrap() {
        HistorySummary::Report(agg) => {
            assert!(agg.is_empty());
            assert_eq!(agg.grand_total_minutes, 0.0);
        }
        HistorySummary::NoHistory => panic!("table exists, expected a report"),
    }
}

#[test]
fn test_missing_last_user_loads_as_empty() {
    let temp = tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().join("app"));
    std::fs::create_dir_all(storage.root()).unwrap();
    std::fs::write(
        storage.config_file(),
        format!(
            r#"{{"storage_directory": {:?}, "remember_user": false}}"#,
            temp.path().join("history").display().to_string()
        ),
    )
    .unwrap();

    let engine = DowntimeEngine::with_storage(storage).unwrap();
    assert_eq!(engine.config().last_user, "");
    assert!(!engine.config().remember_user);
}
