use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{ExpedienteState, Priority};
use crate::catalog::DocumentKind;

/// Estado de revisión de un documento adjunto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Pending => write!(f, "pending"),
            ReviewState::InReview => write!(f, "in_review"),
            ReviewState::Approved => write!(f, "approved"),
            ReviewState::Rejected => write!(f, "rejected"),
        }
    }
}

/// Documento declarado o subido para un expediente.
///
/// `checklist_item` y `mandatory` se fijan al adjuntar y no cambian después;
/// sólo `review` es mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub expediente_id: Uuid,
    pub name: String,
    /// Etiqueta del ítem de checklist que cubre; `None` para documentos extra.
    pub checklist_item: Option<String>,
    pub mandatory: bool,
    pub kind: DocumentKind,
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
}

/// Qué ocurrió en una entrada de auditoría.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StateChanged {
        from: ExpedienteState,
        to: ExpedienteState,
    },
    StepAdvanced {
        from: u32,
        to: u32,
    },
    DocumentAttached {
        document_id: Uuid,
        checklist_item: Option<String>,
    },
    DocumentReviewed {
        document_id: Uuid,
        review: ReviewState,
    },
    Observation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Un expediente: un trámite de un cliente ante un organismo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expediente {
    pub id: Uuid,
    pub code: String,
    pub procedure_id: String,
    pub client: String,
    pub alias: String,
    pub priority: Priority,
    pub created_on: NaiveDate,
    /// Fijada al crear; avanzar pasos no la recalcula.
    pub due_on: NaiveDate,
    pub state: ExpedienteState,
    pub current_step: u32,
    pub total_steps: u32,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub history: Vec<AuditEntry>,
    /// Se incrementa en cada escritura aceptada.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Expediente {
    pub fn progress(&self) -> u8 {
        progress(self.current_step, self.total_steps)
    }

    pub(crate) fn record(&mut self, at: DateTime<Utc>, action: AuditAction, reason: Option<String>) {
        self.history.push(AuditEntry { at, action, reason });
        self.updated_at = at;
    }
}

/// Porcentaje de avance redondeado: `round(current / total * 100)`.
/// Devuelve 0 cuando el trámite no tiene pasos.
pub fn progress(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let current = u64::from(current.min(total));
    let total = u64::from(total);
    ((current * 100 + total / 2) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_rounds_half_up() {
        assert_eq!(progress(0, 3), 0);
        assert_eq!(progress(1, 3), 33);
        assert_eq!(progress(2, 3), 67);
        assert_eq!(progress(3, 3), 100);
        assert_eq!(progress(1, 8), 13);
    }

    #[test]
    fn progress_guards_zero_steps() {
        assert_eq!(progress(0, 0), 0);
        assert_eq!(progress(5, 0), 0);
    }

    #[test]
    fn progress_never_exceeds_100() {
        assert_eq!(progress(7, 3), 100);
    }

    #[test]
    fn audit_action_serializes_tagged() {
        let action = AuditAction::StepAdvanced { from: 1, to: 2 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "step_advanced");
        assert_eq!(json["to"], 2);
    }

    #[test]
    fn review_state_default_is_pending() {
        assert_eq!(ReviewState::default(), ReviewState::Pending);
        assert_eq!(ReviewState::InReview.to_string(), "in_review");
    }
}
