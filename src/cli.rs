//! Interfaz de línea de comandos de SGT basada en clap.
//!
//! Define la struct [`Cli`] con subcomandos [`Command`] y flags globales
//! (--config, --verbose). Los expedientes se identifican por su código.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use sgt::catalog::DocumentKind;
use sgt::expediente::{ExpedienteState, Priority, ReviewState};

/// SGT — Gestión de expedientes regulatorios.
#[derive(Debug, Parser)]
#[command(name = "sgt", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ruta al archivo de configuración (por defecto `sgt.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita logs de depuración.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista los tipos de trámite del catálogo.
    Catalog,

    /// Abre un expediente nuevo.
    Create {
        /// Id o código del tipo de trámite.
        #[arg(long)]
        procedure: String,
        #[arg(long)]
        client: String,
        #[arg(long)]
        alias: String,
        #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
        priority: PriorityArg,
    },

    /// Lista todos los expedientes con su semáforo.
    List,

    /// Muestra el detalle de un expediente.
    Show { code: String },

    /// Avanza el expediente al siguiente paso.
    Advance {
        code: String,
        /// Versión que se espera encontrar; falla si otro escritor se adelantó.
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Cambia el estado del expediente.
    State {
        code: String,
        #[arg(value_enum)]
        state: StateArg,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Adjunta un documento, opcionalmente contra un ítem del checklist.
    Attach {
        code: String,
        #[arg(long)]
        name: String,
        /// Etiqueta exacta del ítem del checklist.
        #[arg(long)]
        item: Option<String>,
        #[arg(long, value_enum, default_value_t = KindArg::Pdf)]
        kind: KindArg,
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Cambia el estado de revisión de un documento.
    Review {
        code: String,
        document_id: String,
        #[arg(value_enum)]
        review: ReviewArg,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Agrega una observación libre.
    Observe {
        code: String,
        text: String,
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Ejecuta un escenario de ejemplo en memoria.
    Demo,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Normal,
    High,
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
            PriorityArg::Urgent => Priority::Urgent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum StateArg {
    Iniciado,
    EnProceso,
    Observado,
    Aprobado,
    Completado,
    Cancelado,
}

impl From<StateArg> for ExpedienteState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Iniciado => ExpedienteState::Iniciado,
            StateArg::EnProceso => ExpedienteState::EnProceso,
            StateArg::Observado => ExpedienteState::Observado,
            StateArg::Aprobado => ExpedienteState::Aprobado,
            StateArg::Completado => ExpedienteState::Completado,
            StateArg::Cancelado => ExpedienteState::Cancelado,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Pdf,
    Image,
    Spreadsheet,
    Word,
}

impl From<KindArg> for DocumentKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Pdf => DocumentKind::Pdf,
            KindArg::Image => DocumentKind::Image,
            KindArg::Spreadsheet => DocumentKind::Spreadsheet,
            KindArg::Word => DocumentKind::Word,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ReviewArg {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl From<ReviewArg> for ReviewState {
    fn from(arg: ReviewArg) -> Self {
        match arg {
            ReviewArg::Pending => ReviewState::Pending,
            ReviewArg::InReview => ReviewState::InReview,
            ReviewArg::Approved => ReviewState::Approved,
            ReviewArg::Rejected => ReviewState::Rejected,
        }
    }
}
