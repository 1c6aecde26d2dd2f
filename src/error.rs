use thiserror::Error;

use crate::expediente::ExpedienteState;

#[derive(Debug, Error)]
pub enum SgtError {
    #[error("Invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: ExpedienteState,
        to: ExpedienteState,
        reason: String,
    },

    #[error("No steps remaining for {code} (step {current}/{total})")]
    NoStepsRemaining {
        code: String,
        current: u32,
        total: u32,
    },

    #[error("Unknown checklist item: {label}")]
    UnknownChecklistItem { label: String },

    #[error("Concurrent modification: expected version {expected}, found {found}")]
    ConcurrentModification { expected: u64, found: u64 },

    #[error("Expediente not found: {0}")]
    ExpedienteNotFound(String),

    #[error("Procedure type not found: {0}")]
    ProcedureNotFound(String),

    #[error("Agency not found: {0}")]
    AgencyNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Duplicate expediente code: {0}")]
    DuplicateCode(String),

    #[error("No free code suffix left for {prefix}")]
    CodeSpaceExhausted { prefix: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SgtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_display() {
        let err = SgtError::InvalidTransition {
            from: ExpedienteState::Completado,
            to: ExpedienteState::EnProceso,
            reason: "terminal state".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition completado -> en_proceso: terminal state"
        );

        let err = SgtError::NoStepsRemaining {
            code: "SGT-2026-ANMAT-00001".into(),
            current: 3,
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "No steps remaining for SGT-2026-ANMAT-00001 (step 3/3)"
        );

        let err = SgtError::ConcurrentModification {
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "Concurrent modification: expected version 2, found 3"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SgtError = io.into();
        assert!(matches!(err, SgtError::Io(_)));
    }
}
