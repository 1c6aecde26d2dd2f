mod engine;
mod record;
mod state;

pub use engine::{
    Clock, EnginePolicy, ExpedienteSummary, FixedClock, LifecycleEngine, NewDocument, StepStatus,
    StepView, SystemClock, UnknownDocumentPolicy,
};
pub use record::{AuditAction, AuditEntry, DocumentRecord, Expediente, ReviewState, progress};
pub use state::{ExpedienteState, Priority, Urgency};
