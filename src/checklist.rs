//! Validación del checklist documental.
//!
//! Un ítem está cubierto si algún documento declara exactamente su etiqueta
//! (sensible a mayúsculas, sin coincidencia aproximada). El estado de
//! revisión del documento no influye. El reporte es informativo: la
//! documentación incompleta nunca bloquea el ciclo de vida.

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{ChecklistItem, DocumentKind};
use crate::expediente::DocumentRecord;

/// Cobertura de un ítem del checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemCoverage {
    pub label: String,
    pub mandatory: bool,
    pub kind: DocumentKind,
    pub document_ids: Vec<Uuid>,
    pub covered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub items: Vec<ItemCoverage>,
    pub mandatory_covered: Vec<String>,
    pub mandatory_missing: Vec<String>,
    pub optional_covered: Vec<String>,
    pub optional_missing: Vec<String>,
    /// Documentos sin ítem de checklist correspondiente.
    pub extra_documents: Vec<Uuid>,
}

impl CoverageReport {
    pub fn missing_mandatory_count(&self) -> usize {
        self.mandatory_missing.len()
    }

    pub fn mandatory_total(&self) -> usize {
        self.mandatory_covered.len() + self.mandatory_missing.len()
    }

    pub fn covered_count(&self) -> usize {
        self.mandatory_covered.len() + self.optional_covered.len()
    }

    /// Porcentaje de ítems obligatorios cubiertos; 100 si no hay obligatorios.
    pub fn completion_percent(&self) -> u8 {
        let total = self.mandatory_total();
        if total == 0 {
            return 100;
        }
        ((self.mandatory_covered.len() * 100 + total / 2) / total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.mandatory_missing.is_empty()
    }
}

pub fn coverage(checklist: &[ChecklistItem], documents: &[DocumentRecord]) -> CoverageReport {
    let mut report = CoverageReport::default();

    for item in checklist {
        let document_ids: Vec<Uuid> = documents
            .iter()
            .filter(|d| d.checklist_item.as_deref() == Some(item.label.as_str()))
            .map(|d| d.id)
            .collect();
        let covered = !document_ids.is_empty();

        let bucket = match (item.mandatory, covered) {
            (true, true) => &mut report.mandatory_covered,
            (true, false) => &mut report.mandatory_missing,
            (false, true) => &mut report.optional_covered,
            (false, false) => &mut report.optional_missing,
        };
        bucket.push(item.label.clone());

        report.items.push(ItemCoverage {
            label: item.label.clone(),
            mandatory: item.mandatory,
            kind: item.kind,
            document_ids,
            covered,
        });
    }

    report.extra_documents = documents
        .iter()
        .filter(|d| match &d.checklist_item {
            Some(label) => resolve_item(checklist, label).is_none(),
            None => true,
        })
        .map(|d| d.id)
        .collect();

    report
}

/// Exact-label lookup used when attaching a document.
pub fn resolve_item<'a>(checklist: &'a [ChecklistItem], label: &str) -> Option<&'a ChecklistItem> {
    checklist.iter().find(|i| i.label == label)
}
