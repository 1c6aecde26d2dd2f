mod cli;
mod config;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cli::{Cli, Command};
use config::SgtConfig;
use sgt::catalog::{Catalog, DocumentKind};
use sgt::expediente::{Clock, ExpedienteState, LifecycleEngine, NewDocument, Priority};
use sgt::store::{ExpedienteStore, InMemoryStore, JsonFileStore};
use ui::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let config = SgtConfig::load(cli.config.as_deref())?;
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::builtin()?,
    };
    let printer = Printer::default();
    let policy = config.engine_policy();

    match cli.command {
        Command::Demo => {
            let engine = LifecycleEngine::new(catalog, InMemoryStore::new(), policy);
            run_demo(&engine, &printer)
        }
        command => {
            let store = JsonFileStore::open(&config.store_path)
                .with_context(|| format!("failed to open store {}", config.store_path.display()))?;
            let engine = LifecycleEngine::new(catalog, store, policy);
            run(&engine, &printer, command)
        }
    }
}

fn run<S: ExpedienteStore, C: Clock>(
    engine: &LifecycleEngine<S, C>,
    printer: &Printer,
    command: Command,
) -> Result<()> {
    match command {
        Command::Catalog => {
            for procedure in engine.catalog().procedures() {
                let agency = engine.catalog().agency_for(procedure)?;
                printer.catalog_entry(procedure, &agency.sigla);
            }
        }
        Command::Create {
            procedure,
            client,
            alias,
            priority,
        } => {
            let exp = engine.create(&procedure, &client, &alias, priority.into())?;
            show(engine, printer, &exp.id)?;
        }
        Command::List => {
            for exp in engine.list()? {
                printer.summary_line(&engine.summary(&exp.id)?);
            }
        }
        Command::Show { code } => {
            let exp = engine.find_by_code(&code)?;
            show(engine, printer, &exp.id)?;
        }
        Command::Advance {
            code,
            expected_version,
        } => {
            let exp = engine.find_by_code(&code)?;
            engine.advance_step(&exp.id, expected_version)?;
            show(engine, printer, &exp.id)?;
        }
        Command::State {
            code,
            state,
            reason,
            expected_version,
        } => {
            let exp = engine.find_by_code(&code)?;
            engine.change_state(&exp.id, state.into(), &reason, expected_version)?;
            show(engine, printer, &exp.id)?;
        }
        Command::Attach {
            code,
            name,
            item,
            kind,
            expected_version,
        } => {
            let exp = engine.find_by_code(&code)?;
            let document = NewDocument {
                name,
                checklist_item: item,
                kind: kind.into(),
            };
            let (record, coverage) = engine.attach_document(&exp.id, document, expected_version)?;
            println!("Documento {} registrado ({})", record.name, record.id);
            printer.coverage(&coverage);
        }
        Command::Review {
            code,
            document_id,
            review,
            note,
            expected_version,
        } => {
            let exp = engine.find_by_code(&code)?;
            let document_id = Uuid::parse_str(&document_id)
                .with_context(|| format!("invalid document id {document_id}"))?;
            let doc = engine.review_document(&exp.id, &document_id, review.into(), note.as_deref(), expected_version)?;
            println!("Documento {}: {}", doc.name, doc.review);
        }
        Command::Observe {
            code,
            text,
            expected_version,
        } => {
            let exp = engine.find_by_code(&code)?;
            engine.add_observation(&exp.id, &text, expected_version)?;
            show(engine, printer, &exp.id)?;
        }
        Command::Demo => run_demo(engine, printer)?,
    }

    Ok(())
}

fn show<S: ExpedienteStore, C: Clock>(
    engine: &LifecycleEngine<S, C>,
    printer: &Printer,
    id: &Uuid,
) -> Result<()> {
    let summary = engine.summary(id)?;
    let steps = engine.get_steps(id)?;
    let coverage = engine.get_checklist_coverage(id)?;
    let documents = engine.documents(id)?;
    printer.detail(&summary, &steps, &coverage, &documents);
    Ok(())
}

/// Registro sanitario de 3 pasos: se abre, avanza dos pasos y recibe un
/// documento obligatorio.
fn run_demo<S: ExpedienteStore, C: Clock>(engine: &LifecycleEngine<S, C>, printer: &Printer) -> Result<()> {
    let exp = engine.create(
        "REG-SAN-ALIM",
        "Alimentos del Sur SAC",
        "Galletas de avena",
        Priority::High,
    )?;
    engine.change_state(&exp.id, ExpedienteState::EnProceso, "inicio de gestión", None)?;
    engine.advance_step(&exp.id, None)?;
    engine.advance_step(&exp.id, None)?;
    engine.attach_document(
        &exp.id,
        NewDocument {
            name: "solicitud.pdf".into(),
            checklist_item: Some("Solicitud firmada".into()),
            kind: DocumentKind::Pdf,
        },
        None,
    )?;
    show(engine, printer, &exp.id)
}
