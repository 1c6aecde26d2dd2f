use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::deadline::days_remaining;

/// Estados del ciclo de vida de un expediente.
///
/// iniciado → en_proceso → observado → aprobado → completado, con
/// observado → en_proceso y cancelado desde cualquier estado no terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpedienteState {
    Iniciado,
    EnProceso,
    Observado,
    Aprobado,
    Completado,
    Cancelado,
}

impl ExpedienteState {
    pub const ALL: [ExpedienteState; 6] = [
        ExpedienteState::Iniciado,
        ExpedienteState::EnProceso,
        ExpedienteState::Observado,
        ExpedienteState::Aprobado,
        ExpedienteState::Completado,
        ExpedienteState::Cancelado,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, ExpedienteState::Completado | ExpedienteState::Cancelado)
    }

    /// Whether the graph has a direct edge from `self` to `next`.
    /// Self-loops are not edges; callers treat them as no-ops.
    pub fn can_transition_to(self, next: ExpedienteState) -> bool {
        use ExpedienteState::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Cancelado)
                | (Iniciado, EnProceso)
                | (EnProceso, Observado)
                | (Observado, Aprobado)
                | (Observado, EnProceso)
                | (Aprobado, Completado)
        )
    }

    /// Estados alcanzables en un solo paso.
    pub fn next_states(self) -> Vec<ExpedienteState> {
        Self::ALL
            .into_iter()
            .filter(|s| self.can_transition_to(*s))
            .collect()
    }
}

impl fmt::Display for ExpedienteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpedienteState::Iniciado => write!(f, "iniciado"),
            ExpedienteState::EnProceso => write!(f, "en_proceso"),
            ExpedienteState::Observado => write!(f, "observado"),
            ExpedienteState::Aprobado => write!(f, "aprobado"),
            ExpedienteState::Completado => write!(f, "completado"),
            ExpedienteState::Cancelado => write!(f, "cancelado"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Semáforo de urgencia derivado de los días restantes al vencimiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Verde,
    Amarillo,
    Rojo,
}

impl Urgency {
    /// Clasifica por días calendario restantes: vencido es rojo, dentro de
    /// `warning_days` (inclusive) es amarillo, el resto verde.
    ///
    /// Nunca se guarda en la entidad; se recalcula en cada lectura.
    pub fn classify(due: NaiveDate, today: NaiveDate, warning_days: u32) -> Self {
        let remaining = days_remaining(due, today);
        if remaining < 0 {
            Urgency::Rojo
        } else if remaining <= i64::from(warning_days) {
            Urgency::Amarillo
        } else {
            Urgency::Verde
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Verde => write!(f, "verde"),
            Urgency::Amarillo => write!(f, "amarillo"),
            Urgency::Rojo => write!(f, "rojo"),
        }
    }
}
