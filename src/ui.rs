//! Interfaz de terminal de SGT: semáforo coloreado y barra de avance.
//!
//! Usa `console` para los estilos (verde, amarillo, rojo) e `indicatif`
//! para dibujar el avance de pasos de un expediente.

use console::Style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use sgt::catalog::ProcedureType;
use sgt::checklist::CoverageReport;
use sgt::expediente::{DocumentRecord, ExpedienteSummary, StepStatus, StepView, Urgency};

/// Impresora de expedientes para la terminal.
pub struct Printer {
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    bold: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            yellow: Style::new().yellow().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }
}

impl Printer {
    fn urgency_style(&self, urgency: Urgency) -> &Style {
        match urgency {
            Urgency::Verde => &self.green,
            Urgency::Amarillo => &self.yellow,
            Urgency::Rojo => &self.red,
        }
    }

    /// Una línea por expediente, para `sgt list`.
    pub fn summary_line(&self, summary: &ExpedienteSummary) {
        let style = self.urgency_style(summary.urgency);
        println!(
            "{} {:<28} {:<11} {:>3}%  vence {} ({:+}d)  {}",
            style.apply_to("●"),
            summary.code,
            summary.state.to_string(),
            summary.progress,
            summary.due_on,
            summary.days_remaining,
            summary.alias
        );
    }

    pub fn catalog_entry(&self, procedure: &ProcedureType, sigla: &str) {
        println!(
            "{} {} — {} [{}] SLA {} días hábiles, {} pasos",
            self.bold.apply_to(&procedure.code),
            procedure.name,
            sigla,
            procedure.id,
            procedure.sla_total_days,
            procedure.total_steps()
        );
        for item in &procedure.checklist {
            let marker = if item.mandatory { "*" } else { " " };
            println!("    {marker} {} ({})", item.label, item.kind);
        }
    }

    /// Detalle completo de un expediente.
    pub fn detail(
        &self,
        summary: &ExpedienteSummary,
        steps: &[StepView],
        coverage: &CoverageReport,
        documents: &[DocumentRecord],
    ) {
        let style = self.urgency_style(summary.urgency);
        println!("{}  {}", self.bold.apply_to(&summary.code), summary.alias);
        println!("  Trámite:   {}", summary.procedure);
        println!("  Cliente:   {}", summary.client);
        println!("  Prioridad: {}", summary.priority);
        println!("  Estado:    {}", summary.state);
        println!(
            "  Vence:     {} {}",
            summary.due_on,
            style.apply_to(format!("{} ({:+} días)", summary.urgency, summary.days_remaining))
        );
        println!("  Versión:   {}", summary.version);

        self.progress_bar(summary);

        for step in steps {
            let mark = match step.status {
                StepStatus::Done => self.green.apply_to("✓"),
                StepStatus::Current => self.yellow.apply_to("▶"),
                StepStatus::Pending => self.dim.apply_to("·"),
            };
            println!(
                "    {mark} {}. {} ({} días, {})",
                step.order, step.name, step.sla_days, step.responsible_role
            );
        }

        println!();
        self.coverage(coverage);

        if !documents.is_empty() {
            println!("  Documentos:");
            for doc in documents {
                println!(
                    "    {} {} [{}] {}",
                    self.dim.apply_to(doc.id),
                    doc.name,
                    doc.review,
                    doc.checklist_item.as_deref().unwrap_or("(extra)")
                );
            }
        }
    }

    pub fn coverage(&self, coverage: &CoverageReport) {
        let header = format!(
            "  Checklist: {}/{} obligatorios ({}%)",
            coverage.mandatory_covered.len(),
            coverage.mandatory_total(),
            coverage.completion_percent()
        );
        if coverage.is_complete() {
            println!("{}", self.green.apply_to(header));
        } else {
            println!("{}", self.yellow.apply_to(header));
        }
        for item in &coverage.items {
            let mark = if item.covered {
                self.green.apply_to("✓")
            } else if item.mandatory {
                self.red.apply_to("✗")
            } else {
                self.dim.apply_to("○")
            };
            println!("    {mark} {}", item.label);
        }
    }

    /// Dibuja el avance de pasos con una barra fija de indicatif.
    fn progress_bar(&self, summary: &ExpedienteSummary) {
        let pb = ProgressBar::with_draw_target(
            Some(u64::from(summary.total_steps.max(1))),
            ProgressDrawTarget::stdout(),
        );
        if let Ok(style) = ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_position(u64::from(summary.current_step));
        pb.abandon_with_message(format!("{}%", summary.progress));
    }
}
