//! SGT — motor del ciclo de vida de expedientes regulatorios.
//!
//! Calcula vencimientos en días hábiles, controla el avance por pasos de
//! cada expediente contra su plantilla de trámite, valida el checklist
//! documental y deriva el semáforo de urgencia. La persistencia queda
//! detrás de [`store::ExpedienteStore`].

pub mod catalog;
pub mod checklist;
pub mod code;
pub mod deadline;
pub mod error;
pub mod expediente;
pub mod store;

pub use error::{Result, SgtError};
