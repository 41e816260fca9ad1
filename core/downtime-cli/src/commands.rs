//! Subcommand implementations.
//!
//! Each command drives the engine and prints operator-facing text to stdout.
//! Errors come back as [`CliError`] and are reported by `main`.

use std::io::Write;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use downtime_core::{
    Breakdown, DowntimeEngine, DowntimeError, HistorySummary, Process, ReasonChoice, Stoppage,
    OTHER_REASON,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] DowntimeError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No employee given and no remembered user; pass --employee")]
    NoEmployee,

    #[error("Refusing to wipe history without --yes")]
    NotConfirmed,
}

pub type CliResult = Result<(), CliError>;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// MARK: - Stoppages

pub fn open(
    engine: &mut DowntimeEngine,
    employee: Option<String>,
    process: &str,
    reason: Option<&str>,
    other: Option<String>,
    out: &mut impl Write,
) -> CliResult {
    let employee = employee
        .or_else(|| engine.config().remembered_user().map(str::to_string))
        .ok_or(CliError::NoEmployee)?;

    let choice = match (other, reason) {
        (Some(text), _) => ReasonChoice::Other(text),
        (None, Some(OTHER_REASON)) | (None, None) => ReasonChoice::Other(String::new()),
        (None, Some(reason)) => ReasonChoice::Listed(reason.to_string()),
    };

    let stoppage = engine.open_stoppage(&employee, process, &choice, now())?;
    writeln!(
        out,
        "Parada registrada: {} - {} (início {})",
        stoppage.process,
        stoppage.reason,
        stoppage.started_at.format("%H:%M:%S")
    )?;
    writeln!(out, "id: {}", stoppage.id)?;
    Ok(())
}

pub fn list(engine: &DowntimeEngine, out: &mut impl Write) -> CliResult {
    let active = engine.active_stoppages();
    if active.is_empty() {
        writeln!(out, "Nenhuma parada ativa.")?;
        return Ok(());
    }

    let current = now();
    for (index, stoppage) in active.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {} - {}\n    Início: {}  ({:.1} min)  por {}\n    id: {}",
            index + 1,
            stoppage.process,
            stoppage.reason,
            stoppage.started_at.format("%H:%M:%S"),
            stoppage.elapsed_minutes(current),
            stoppage.employee,
            stoppage.id
        )?;
    }
    Ok(())
}

/// Accepts either a stoppage id or its 1-based position in `list`.
fn resolve_target<'a>(active: &'a [Stoppage], target: &str) -> Option<&'a Stoppage> {
    if let Some(found) = active.iter().find(|s| s.id == target) {
        return Some(found);
    }
    target
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1)
        .and_then(|n| active.get(n - 1))
}

pub fn close(engine: &mut DowntimeEngine, target: &str, out: &mut impl Write) -> CliResult {
    let Some(id) = resolve_target(engine.active_stoppages(), target).map(|s| s.id.clone()) else {
        writeln!(out, "Nenhuma parada ativa com id {}.", target)?;
        return Ok(());
    };

    let Some(outcome) = engine.close_stoppage(&id, now()) else {
        writeln!(out, "Nenhuma parada ativa com id {}.", target)?;
        return Ok(());
    };

    writeln!(
        out,
        "Parada finalizada: {} - {} ({:.2} min)",
        outcome.closed.process, outcome.closed.reason, outcome.closed.duration_minutes
    )?;

    if let Err(e) = &outcome.history {
        writeln!(out)?;
        writeln!(out, "!!! ERRO AO SALVAR HISTÓRICO !!!")?;
        writeln!(out, "{}", e)?;
        writeln!(
            out,
            "Registro perdido: {} | {} | {} | {} → {} | {:.2} min",
            outcome.closed.started_at.format("%Y-%m-%d"),
            outcome.closed.process,
            outcome.closed.reason,
            outcome.closed.started_at.format("%H:%M:%S"),
            outcome.closed.ended_at.format("%H:%M:%S"),
            outcome.closed.duration_minutes
        )?;
    }
    if let Err(e) = &outcome.side_file {
        tracing::warn!(error = %e, "Active stoppage file may be stale");
    }
    Ok(())
}

// MARK: - History

pub fn history(engine: &DowntimeEngine, out: &mut impl Write) -> CliResult {
    let Some(rows) = engine.history()? else {
        writeln!(out, "Nenhum registro encontrado")?;
        return Ok(());
    };
    if rows.is_empty() {
        writeln!(out, "Nenhum registro de paradas encontrado.")?;
        return Ok(());
    }

    for row in rows {
        writeln!(out, "{}", row)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_breakdown(
    out: &mut impl Write,
    title: &str,
    breakdown: &Breakdown,
    width: usize,
) -> CliResult {
    writeln!(out, "{}", title)?;
    if breakdown.is_empty() {
        writeln!(out, "  Nenhum dado disponível")?;
    } else {
        write!(out, "{}", breakdown.render_bars(width))?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn summary(engine: &DowntimeEngine, json: bool, out: &mut impl Write) -> CliResult {
    let summary = engine.summary()?;

    if json {
        let text = serde_json::to_string_pretty(&summary).map_err(|e| DowntimeError::Json {
            context: "serializing summary".to_string(),
            source: e,
        })?;
        writeln!(out, "{}", text)?;
        return Ok(());
    }

    match summary {
        HistorySummary::NoHistory => {
            writeln!(out, "Nenhum dado de parada registrado.")?;
        }
        HistorySummary::Report(agg) => {
            write_breakdown(out, "Tempo de Parada por Processo", &agg.by_process, 30)?;
            write_breakdown(out, "Tempo de Parada por Motivo", &agg.by_reason, 30)?;
            writeln!(out, "Total: {:.2} min", agg.grand_total_minutes)?;
        }
    }
    Ok(())
}

pub fn wipe(engine: &DowntimeEngine, confirmed: bool, out: &mut impl Write) -> CliResult {
    if !engine.history_store().path().exists() {
        writeln!(out, "Nenhum histórico de paradas encontrado.")?;
        return Ok(());
    }
    if !confirmed {
        return Err(CliError::NotConfirmed);
    }
    if engine.wipe_history()? {
        writeln!(out, "Histórico de paradas apagado!")?;
    } else {
        writeln!(out, "Nenhum histórico de paradas encontrado.")?;
    }
    Ok(())
}

// MARK: - Catalog

pub fn reasons(process: Option<&str>, out: &mut impl Write) -> CliResult {
    let processes = match process {
        Some(name) => vec![Process::parse(name)?],
        None => Process::ALL.to_vec(),
    };
    for process in processes {
        writeln!(out, "{}", process)?;
        for reason in process.reasons() {
            if *reason == OTHER_REASON {
                writeln!(out, "  - {} (use --other \"descrição\")", reason)?;
            } else {
                writeln!(out, "  - {}", reason)?;
            }
        }
    }
    Ok(())
}

// MARK: - Settings

pub fn config_show(engine: &DowntimeEngine, out: &mut impl Write) -> CliResult {
    let config = engine.config();
    writeln!(
        out,
        "Diretório de Salvamento: {}",
        config.storage_directory.display()
    )?;
    writeln!(
        out,
        "Lembrar usuário: {}",
        if config.remember_user { "sim" } else { "não" }
    )?;
    writeln!(out, "Último usuário: {}", config.last_user)?;
    writeln!(out, "Arquivo de configuração: {}", engine.storage().config_file().display())?;
    Ok(())
}

pub fn config_set_dir(engine: &mut DowntimeEngine, dir: PathBuf, out: &mut impl Write) -> CliResult {
    engine.set_storage_directory(dir)?;
    writeln!(
        out,
        "Diretório alterado para:\n{}",
        engine.config().storage_directory.display()
    )?;
    Ok(())
}

pub fn config_remember(
    engine: &mut DowntimeEngine,
    user: Option<&str>,
    out: &mut impl Write,
) -> CliResult {
    engine.remember_user(user)?;
    match engine.config().remembered_user() {
        Some(name) => writeln!(out, "Usuário lembrado: {}", name)?,
        None => writeln!(out, "Nenhum usuário lembrado.")?,
    }
    Ok(())
}

pub fn status(engine: &DowntimeEngine, out: &mut impl Write) -> CliResult {
    let user = engine.config().remembered_user().unwrap_or("-");
    writeln!(out, "{}", engine.status_line(user))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use downtime_core::{save_config, AppConfig, StorageConfig};
    use tempfile::TempDir;

    fn engine() -> (TempDir, DowntimeEngine) {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("app"));
        save_config(
            &storage.config_file(),
            &AppConfig {
                storage_directory: temp.path().join("history"),
                ..AppConfig::default()
            },
        )
        .unwrap();
        let engine = DowntimeEngine::with_storage(storage).unwrap();
        (temp, engine)
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_open_without_employee_needs_remembered_user() {
        let (_temp, mut engine) = engine();
        let mut out = Vec::new();
        let err = open(&mut engine, None, "Raku-Raku", Some("Engate"), None, &mut out).unwrap_err();
        assert!(matches!(err, CliError::NoEmployee));

        engine.remember_user(Some("operador")).unwrap();
        open(&mut engine, None, "Raku-Raku", Some("Engate"), None, &mut out).unwrap();
        assert_eq!(engine.active_stoppages()[0].employee, "operador");
    }

    #[test]
    fn test_close_by_position_then_history() {
        let (_temp, mut engine) = engine();
        let mut out = Vec::new();
        open(
            &mut engine,
            Some("ana".into()),
            "inspecao",
            None,
            Some("Peça suja".into()),
            &mut out,
        )
        .unwrap();

        let mut out = Vec::new();
        close(&mut engine, "1", &mut out).unwrap();
        assert!(text(out).starts_with("Parada finalizada: Inspeção - Peça suja"));
        assert!(engine.active_stoppages().is_empty());

        let mut out = Vec::new();
        history(&engine, &mut out).unwrap();
        let printed = text(out);
        assert!(printed.starts_with("Data: "));
        assert!(!printed.contains(" | "));
        assert!(printed.contains("Processo: Inspeção"));
        assert!(printed.contains("Motivo: Peça suja"));
    }

    #[test]
    fn test_escape_reason_without_text_is_rejected() {
        let (_temp, mut engine) = engine();
        let mut out = Vec::new();
        let err = open(
            &mut engine,
            Some("ana".into()),
            "Carregamento",
            Some(OTHER_REASON),
            None,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Core(ref e) if e.is_validation()));
    }

    #[test]
    fn test_close_unknown_target_is_not_an_error() {
        let (_temp, mut engine) = engine();
        let mut out = Vec::new();
        close(&mut engine, "7", &mut out).unwrap();
        assert!(text(out).contains("Nenhuma parada ativa"));
    }

    #[test]
    fn test_summary_without_history() {
        let (_temp, engine) = engine();
        let mut out = Vec::new();
        summary(&engine, false, &mut out).unwrap();
        assert_eq!(text(out).trim(), "Nenhum dado de parada registrado.");
    }

    #[test]
    fn test_wipe_requires_confirmation() {
        let (_temp, mut engine) = engine();
        let mut out = Vec::new();
        open(&mut engine, Some("ana".into()), "Carregamento", Some("Falta de peça"), None, &mut out)
            .unwrap();
        close(&mut engine, "1", &mut out).unwrap();

        let err = wipe(&engine, false, &mut out).unwrap_err();
        assert!(matches!(err, CliError::NotConfirmed));
        assert!(engine.history().unwrap().is_some());

        let mut out = Vec::new();
        wipe(&engine, true, &mut out).unwrap();
        assert_eq!(text(out).trim(), "Histórico de paradas apagado!");
        assert!(engine.history().unwrap().is_none());
    }

    #[test]
    fn test_reasons_for_one_process() {
        let mut out = Vec::new();
        reasons(Some("Inspeção"), &mut out).unwrap();
        let printed = text(out);
        assert!(printed.starts_with("Inspeção\n"));
        assert!(printed.contains("  - Fosfato na peça\n"));
        assert!(printed.contains("Outros (use --other"));
    }
}
