//! Reason catalog: the fixed production processes and the stoppage reasons
//! each one accepts.
//!
//! The catalog is compiled in. Every process ends its list with the escape
//! reason [`OTHER_REASON`], which lets the operator type a free-text cause.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DowntimeError, Result};

/// The escape reason. Selecting it requires a free-text description.
pub const OTHER_REASON: &str = "Outros";

/// Hint text shown in the free-text box. Never accepted as a reason.
pub const OTHER_PLACEHOLDER: &str = "Descreva o motivo...";

const CARREGAMENTO_REASONS: &[&str] = &[
    "Tempo de Pausa intervalos",
    "Falta de peça",
    "Temperatura Estufa",
    "Mal Funcionamento Ebara",
    "Falta de Espaço",
    OTHER_REASON,
];

const RAKU_RAKU_REASONS: &[&str] = &[
    "Falta de bandeja",
    "Ligar Cabine",
    "Acumulo de bandeja",
    "Sincronismos",
    "Alimentação",
    "Engate",
    "Falta de Dispositivos",
    "Troca de Cor",
    "Falha de Pistola Automática",
    "Atraso Aspiração",
    "Ar-condicionado Cabine",
    "Troca de Pintor",
    "Falha de Pistola Manual",
    OTHER_REASON,
];

const INSPECAO_REASONS: &[&str] = &[
    "Falta de tinta",
    "Lixo na Peça",
    "Falta de Colaborador",
    "Fosfato na peça",
    "Falha no Equipamento",
    OTHER_REASON,
];

const DESCARREGAMENTO_REASONS: &[&str] = &[
    "HG/ELO Empenado para Robô",
    "Queda de HG na Célula do Robô",
    "Sensor Robô Motoman",
    "Sensor Robô Fanuc",
    "Trans. Fora de Tempo para Robô",
    "Power Free Parou",
    "Falta de Sincronismo",
    "Falha no Pega do Robô",
    "Falha no Pega Robô Motoman",
    "Acumulo de Bandeja no Robô",
    "Trans. LSA Parou",
    "Falha de Pistão/LS Power Free",
    "Chassi Descendo Moldado",
    OTHER_REASON,
];

/// A monitored production stage.
///
/// Serialized with its shop-floor display name so side files and history
/// rows stay readable by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Process {
    #[serde(rename = "Carregamento")]
    Loading,
    #[serde(rename = "Raku-Raku")]
    RakuRaku,
    #[serde(rename = "Inspeção")]
    Inspection,
    #[serde(rename = "Descarregamento")]
    Unloading,
}

impl Process {
    /// All processes in display order.
    pub const ALL: [Process; 4] = [
        Process::Loading,
        Process::RakuRaku,
        Process::Inspection,
        Process::Unloading,
    ];

    /// Display name, also used as the stored value.
    pub fn name(self) -> &'static str {
        match self {
            Process::Loading => "Carregamento",
            Process::RakuRaku => "Raku-Raku",
            Process::Inspection => "Inspeção",
            Process::Unloading => "Descarregamento",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Process::Loading => "carregamento",
            Process::RakuRaku => "raku-raku",
            Process::Inspection => "inspecao",
            Process::Unloading => "descarregamento",
        }
    }

    /// Looks up a process by display name (case-insensitive) or ASCII slug.
    pub fn from_name(name: &str) -> Option<Process> {
        let wanted = name.trim().to_lowercase();
        Process::ALL
            .into_iter()
            .find(|p| p.name().to_lowercase() == wanted || p.slug() == wanted)
    }

    /// Parses a process name, failing with [`DowntimeError::UnknownProcess`].
    pub fn parse(name: &str) -> Result<Process> {
        Process::from_name(name).ok_or_else(|| DowntimeError::UnknownProcess(name.to_string()))
    }

    /// The ordered list of reasons this process accepts.
    pub fn reasons(self) -> &'static [&'static str] {
        match self {
            Process::Loading => CARREGAMENTO_REASONS,
            Process::RakuRaku => RAKU_RAKU_REASONS,
            Process::Inspection => INSPECAO_REASONS,
            Process::Unloading => DESCARREGAMENTO_REASONS,
        }
    }

    pub fn accepts_free_text(self) -> bool {
        self.reasons().contains(&OTHER_REASON)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the operator picked on the reason screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonChoice {
    /// One of the catalog entries, by exact name.
    Listed(String),
    /// The escape reason with its free-text description.
    Other(String),
}

/// Resolves the operator's choice into the reason string that gets stored.
///
/// Picking [`OTHER_REASON`] by name is rejected: the free text is what gets
/// recorded, so callers must use [`ReasonChoice::Other`].
pub fn resolve_reason(process: Process, choice: &ReasonChoice) -> Result<String> {
    match choice {
        ReasonChoice::Listed(reason) if reason == OTHER_REASON => Err(DowntimeError::Validation(
            "describe the stoppage reason".to_string(),
        )),
        ReasonChoice::Listed(reason) => {
            if process.reasons().contains(&reason.as_str()) {
                Ok(reason.clone())
            } else {
                Err(DowntimeError::UnknownReason {
                    process: process.name().to_string(),
                    reason: reason.clone(),
                })
            }
        }
        ReasonChoice::Other(text) => {
            if !process.accepts_free_text() {
                return Err(DowntimeError::UnknownReason {
                    process: process.name().to_string(),
                    reason: OTHER_REASON.to_string(),
                });
            }
            let text = text.trim();
            if text.is_empty() || text == OTHER_PLACEHOLDER {
                return Err(DowntimeError::Validation(
                    "describe the stoppage reason".to_string(),
                ));
            }
            Ok(text.to_string())
        }
    }
}
