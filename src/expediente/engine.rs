use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::record::{AuditAction, DocumentRecord, Expediente, ReviewState};
use super::state::{ExpedienteState, Priority, Urgency};
use crate::catalog::{Catalog, DocumentKind, ProcedureStep, ProcedureType};
use crate::checklist::{self, CoverageReport};
use crate::code::{CodeGenerator, code_prefix};
use crate::deadline::{add_business_days, days_remaining};
use crate::error::{Result, SgtError};
use crate::store::ExpedienteStore;

const PENDING_DOCUMENTATION: &str = "Documentación obligatoria pendiente";

/// Fuente de la fecha y hora actuales.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reloj fijo a medianoche UTC de una fecha; útil en pruebas y demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Qué hacer con un documento cuya etiqueta no existe en el checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDocumentPolicy {
    /// Se guarda como documento extra, sin vínculo al checklist.
    #[default]
    Accept,
    /// Se rechaza con `UnknownChecklistItem`.
    Reject,
}

#[derive(Debug, Clone)]
pub struct EnginePolicy {
    /// Upper bound (inclusive) of the amarillo window, in calendar days.
    pub warning_days: u32,
    pub unknown_documents: UnknownDocumentPolicy,
    pub codes: CodeGenerator,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            warning_days: 3,
            unknown_documents: UnknownDocumentPolicy::Accept,
            codes: CodeGenerator::default(),
        }
    }
}

/// Datos de un documento a adjuntar.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub checklist_item: Option<String>,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Current,
    Pending,
}

/// Un paso de la plantilla visto desde un expediente concreto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub order: u32,
    pub name: String,
    pub sla_days: u32,
    pub responsible_role: String,
    pub status: StepStatus,
}

/// Vista de lectura con todos los campos derivados, calculados al momento.
#[derive(Debug, Clone, Serialize)]
pub struct ExpedienteSummary {
    pub code: String,
    pub alias: String,
    pub client: String,
    pub procedure: String,
    pub priority: Priority,
    pub state: ExpedienteState,
    pub current_step: u32,
    pub total_steps: u32,
    pub current_step_name: Option<String>,
    pub progress: u8,
    pub due_on: NaiveDate,
    pub days_remaining: i64,
    pub urgency: Urgency,
    pub missing_mandatory: usize,
    pub documentation_pending: bool,
    pub version: u64,
}

/// Motor del ciclo de vida de expedientes.
///
/// Todas las operaciones son síncronas y sólo modifican el propio
/// expediente. La completitud documental es informativa: nunca bloquea
/// transiciones ni avances de paso.
pub struct LifecycleEngine<S, C = SystemClock> {
    catalog: Catalog,
    store: S,
    clock: C,
    policy: EnginePolicy,
}

impl<S: ExpedienteStore> LifecycleEngine<S, SystemClock> {
    pub fn new(catalog: Catalog, store: S, policy: EnginePolicy) -> Self {
        Self::with_clock(catalog, store, SystemClock, policy)
    }
}

impl<S: ExpedienteStore, C: Clock> LifecycleEngine<S, C> {
    pub fn with_clock(catalog: Catalog, store: S, clock: C, policy: EnginePolicy) -> Self {
        Self {
            catalog,
            store,
            clock,
            policy,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Abre un expediente nuevo en estado `iniciado`, paso 0, con
    /// vencimiento a `sla_total_days` días hábiles desde hoy.
    ///
    /// Si otro escritor inserta el mismo código entre la generación y el
    /// alta, se genera otro, hasta `max_attempts` veces.
    pub fn create(
        &self,
        procedure: &str,
        client: &str,
        alias: &str,
        priority: Priority,
    ) -> Result<Expediente> {
        let procedure = self.catalog.procedure(procedure)?;
        let agency = self.catalog.agency_for(procedure)?;
        let now = self.clock.now();
        let today = self.clock.today();
        let year = today.year();

        let mut expediente = Expediente {
            id: Uuid::new_v4(),
            code: String::new(),
            procedure_id: procedure.id.clone(),
            client: client.to_string(),
            alias: alias.to_string(),
            priority,
            created_on: today,
            due_on: add_business_days(today, procedure.sla_total_days),
            state: ExpedienteState::Iniciado,
            current_step: 0,
            total_steps: procedure.total_steps(),
            observations: Vec::new(),
            history: Vec::new(),
            version: 1,
            updated_at: now,
        };
        expediente.record(now, AuditAction::Created, None);

        if procedure.checklist.iter().any(|i| i.mandatory) {
            expediente
                .observations
                .push(PENDING_DOCUMENTATION.to_string());
        }

        for attempt in 1..=self.policy.codes.max_attempts.max(1) {
            expediente.code = self.policy.codes.generate(&self.store, &agency.sigla, year)?;
            match self.store.insert(&expediente) {
                Ok(()) => {
                    info!(
                        code = %expediente.code,
                        procedure = %procedure.code,
                        due_on = %expediente.due_on,
                        "expediente created"
                    );
                    return Ok(expediente);
                }
                Err(SgtError::DuplicateCode(code)) => {
                    warn!(%code, attempt, "expediente code taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SgtError::CodeSpaceExhausted {
            prefix: code_prefix(&agency.sigla, year),
        })
    }

    /// Cambia el estado siguiendo el grafo de transiciones.
    ///
    /// Pedir el estado actual es un no-op. Pasar a `completado` exige
    /// haber recorrido todos los pasos.
    pub fn change_state(
        &self,
        id: &Uuid,
        next: ExpedienteState,
        reason: &str,
        expected_version: Option<u64>,
    ) -> Result<Expediente> {
        let mut expediente = self.load(id, expected_version)?;
        let from = expediente.state;

        if from == next {
            return Ok(expediente);
        }
        if !from.can_transition_to(next) {
            return Err(SgtError::InvalidTransition {
                from,
                to: next,
                reason: if from.is_terminal() {
                    format!("{from} is terminal")
                } else {
                    "not an edge of the lifecycle graph".to_string()
                },
            });
        }
        if next == ExpedienteState::Completado && expediente.current_step != expediente.total_steps {
            return Err(SgtError::InvalidTransition {
                from,
                to: next,
                reason: format!(
                    "step {}/{} is not the last step",
                    expediente.current_step, expediente.total_steps
                ),
            });
        }

        expediente.state = next;
        let reason = reason.trim();
        if !reason.is_empty() {
            expediente.observations.push(reason.to_string());
        }
        expediente.record(
            self.clock.now(),
            AuditAction::StateChanged { from, to: next },
            (!reason.is_empty()).then(|| reason.to_string()),
        );
        let expediente = self.save(expediente)?;
        info!(code = %expediente.code, %from, to = %next, "expediente state changed");
        Ok(expediente)
    }

    /// Avanza exactamente un paso.
    pub fn advance_step(&self, id: &Uuid, expected_version: Option<u64>) -> Result<Expediente> {
        let mut expediente = self.load(id, expected_version)?;
        if expediente.state.is_terminal() || expediente.current_step >= expediente.total_steps {
            return Err(SgtError::NoStepsRemaining {
                code: expediente.code,
                current: expediente.current_step,
                total: expediente.total_steps,
            });
        }

        let from = expediente.current_step;
        expediente.current_step += 1;
        expediente.record(
            self.clock.now(),
            AuditAction::StepAdvanced {
                from,
                to: expediente.current_step,
            },
            None,
        );
        let expediente = self.save(expediente)?;
        info!(
            code = %expediente.code,
            step = expediente.current_step,
            progress = expediente.progress(),
            "expediente step advanced"
        );
        Ok(expediente)
    }

    /// Registra un documento y devuelve el documento con la cobertura
    /// recalculada. El expediente y el documento se guardan juntos.
    pub fn attach_document(
        &self,
        id: &Uuid,
        document: NewDocument,
        expected_version: Option<u64>,
    ) -> Result<(DocumentRecord, CoverageReport)> {
        let mut expediente = self.load(id, expected_version)?;
        let procedure = self.catalog.procedure(&expediente.procedure_id)?;

        let (checklist_item, mandatory) = match document.checklist_item {
            Some(label) => match checklist::resolve_item(&procedure.checklist, &label) {
                Some(item) => (Some(item.label.clone()), item.mandatory),
                None => match self.policy.unknown_documents {
                    UnknownDocumentPolicy::Reject => {
                        return Err(SgtError::UnknownChecklistItem { label });
                    }
                    UnknownDocumentPolicy::Accept => {
                        warn!(
                            code = %expediente.code,
                            %label,
                            "unknown checklist label, storing as extra document"
                        );
                        (None, false)
                    }
                },
            },
            None => (None, false),
        };

        let now = self.clock.now();
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            expediente_id: expediente.id,
            name: document.name,
            checklist_item,
            mandatory,
            kind: document.kind,
            review: ReviewState::Pending,
            created_at: now,
        };

        let mut documents = self.store.documents(&expediente.id)?;
        documents.push(record.clone());
        let report = checklist::coverage(&procedure.checklist, &documents);
        if report.is_complete() {
            expediente.observations.retain(|o| o != PENDING_DOCUMENTATION);
        }

        expediente.record(
            now,
            AuditAction::DocumentAttached {
                document_id: record.id,
                checklist_item: record.checklist_item.clone(),
            },
            None,
        );
        let expediente = self.save_with_document(expediente, &record)?;
        info!(
            code = %expediente.code,
            document = %record.name,
            missing_mandatory = report.missing_mandatory_count(),
            "document attached"
        );
        Ok((record, report))
    }

    /// Cambia el estado de revisión de un documento del expediente.
    pub fn review_document(
        &self,
        id: &Uuid,
        document_id: &Uuid,
        review: ReviewState,
        note: Option<&str>,
        expected_version: Option<u64>,
    ) -> Result<DocumentRecord> {
        let mut expediente = self.load(id, expected_version)?;
        let mut document = self
            .store
            .documents(id)?
            .into_iter()
            .find(|d| d.id == *document_id)
            .ok_or_else(|| SgtError::DocumentNotFound(document_id.to_string()))?;

        document.review = review;
        expediente.record(
            self.clock.now(),
            AuditAction::DocumentReviewed {
                document_id: document.id,
                review,
            },
            note.map(str::to_string),
        );
        self.save_with_document(expediente, &document)?;
        info!(document = %document.name, %review, "document reviewed");
        Ok(document)
    }

    pub fn add_observation(
        &self,
        id: &Uuid,
        text: &str,
        expected_version: Option<u64>,
    ) -> Result<Expediente> {
        let mut expediente = self.load(id, expected_version)?;
        expediente.observations.push(text.to_string());
        expediente.record(
            self.clock.now(),
            AuditAction::Observation,
            Some(text.to_string()),
        );
        self.save(expediente)
    }

    pub fn get_expediente(&self, id: &Uuid) -> Result<Expediente> {
        self.store
            .get(id)?
            .ok_or_else(|| SgtError::ExpedienteNotFound(id.to_string()))
    }

    pub fn find_by_code(&self, code: &str) -> Result<Expediente> {
        self.store
            .find_by_code(code)?
            .ok_or_else(|| SgtError::ExpedienteNotFound(code.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Expediente>> {
        self.store.list()
    }

    pub fn documents(&self, id: &Uuid) -> Result<Vec<DocumentRecord>> {
        self.store.documents(id)
    }

    pub fn get_steps(&self, id: &Uuid) -> Result<Vec<StepView>> {
        let expediente = self.get_expediente(id)?;
        let procedure = self.catalog.procedure(&expediente.procedure_id)?;
        Ok(procedure
            .steps
            .iter()
            .map(|step| step_view(step, expediente.current_step, expediente.state))
            .collect())
    }

    pub fn get_checklist_coverage(&self, id: &Uuid) -> Result<CoverageReport> {
        let expediente = self.get_expediente(id)?;
        let procedure = self.catalog.procedure(&expediente.procedure_id)?;
        self.coverage_for(&expediente, procedure)
    }

    pub fn get_urgency(&self, id: &Uuid) -> Result<Urgency> {
        let expediente = self.get_expediente(id)?;
        Ok(self.urgency_of(&expediente))
    }

    pub fn get_progress(&self, id: &Uuid) -> Result<u8> {
        Ok(self.get_expediente(id)?.progress())
    }

    /// Urgencia recalculada contra el reloj del motor.
    pub fn urgency_of(&self, expediente: &Expediente) -> Urgency {
        Urgency::classify(expediente.due_on, self.clock.today(), self.policy.warning_days)
    }

    pub fn summary(&self, id: &Uuid) -> Result<ExpedienteSummary> {
        let expediente = self.get_expediente(id)?;
        let procedure = self.catalog.procedure(&expediente.procedure_id)?;
        let coverage = self.coverage_for(&expediente, procedure)?;
        let today = self.clock.today();

        let current_step_name = procedure
            .step(expediente.current_step)
            .map(|s| s.name.clone());

        Ok(ExpedienteSummary {
            urgency: self.urgency_of(&expediente),
            days_remaining: days_remaining(expediente.due_on, today),
            progress: expediente.progress(),
            missing_mandatory: coverage.missing_mandatory_count(),
            documentation_pending: !coverage.is_complete(),
            procedure: procedure.name.clone(),
            current_step_name,
            code: expediente.code,
            alias: expediente.alias,
            client: expediente.client,
            priority: expediente.priority,
            state: expediente.state,
            current_step: expediente.current_step,
            total_steps: expediente.total_steps,
            due_on: expediente.due_on,
            version: expediente.version,
        })
    }

    fn coverage_for(&self, expediente: &Expediente, procedure: &ProcedureType) -> Result<CoverageReport> {
        let documents = self.store.documents(&expediente.id)?;
        let report = checklist::coverage(&procedure.checklist, &documents);
        debug!(
            code = %expediente.code,
            covered = report.covered_count(),
            missing_mandatory = report.missing_mandatory_count(),
            "checklist coverage computed"
        );
        Ok(report)
    }

    fn load(&self, id: &Uuid, expected_version: Option<u64>) -> Result<Expediente> {
        let expediente = self.get_expediente(id)?;
        if let Some(expected) = expected_version
            && expected != expediente.version
        {
            return Err(SgtError::ConcurrentModification {
                expected,
                found: expediente.version,
            });
        }
        Ok(expediente)
    }

    fn save(&self, mut expediente: Expediente) -> Result<Expediente> {
        let previous = expediente.version;
        expediente.version += 1;
        self.store.update(&expediente, previous)?;
        Ok(expediente)
    }

    fn save_with_document(&self, mut expediente: Expediente, document: &DocumentRecord) -> Result<Expediente> {
        let previous = expediente.version;
        expediente.version += 1;
        self.store.update_with_document(&expediente, previous, document)?;
        Ok(expediente)
    }
}

fn step_view(step: &ProcedureStep, current: u32, state: ExpedienteState) -> StepView {
    let status = if step.order <= current {
        StepStatus::Done
    } else if step.order == current + 1 && !state.is_terminal() {
        StepStatus::Current
    } else {
        StepStatus::Pending
    };
    StepView {
        order: step.order,
        name: step.name.clone(),
        sla_days: step.sla_days,
        responsible_role: step.responsible_role.clone(),
        status,
    }
}
