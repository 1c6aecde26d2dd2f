use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SgtError};

/// Organismo público ante el que se presentan los trámites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: String,
    pub name: String,
    /// Sigla oficial; puede contener barras (p. ej. `MINSA/DIGESA`).
    pub sigla: String,
}

/// Tipo de archivo esperado para un ítem del checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Spreadsheet,
    Word,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Image => write!(f, "image"),
            DocumentKind::Spreadsheet => write!(f, "spreadsheet"),
            DocumentKind::Word => write!(f, "word"),
        }
    }
}

/// A single step of a procedure template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    /// 1-based position within the procedure.
    pub order: u32,
    pub name: String,
    pub sla_days: u32,
    pub responsible_role: String,
}

/// Documento requerido por un tipo de trámite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Unique within the procedure; joins against `DocumentRecord::checklist_item`.
    pub label: String,
    pub mandatory: bool,
    pub kind: DocumentKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// Plantilla de un trámite: pasos ordenados, SLA total y checklist documental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureType {
    pub id: String,
    pub name: String,
    pub code: String,
    pub agency_id: String,
    pub sla_total_days: u32,
    #[serde(default)]
    pub steps: Vec<ProcedureStep>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
}

impl ProcedureType {
    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn step(&self, order: u32) -> Option<&ProcedureStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    /// Ordena los pasos y verifica los invariantes de la plantilla.
    ///
    /// Los `order` deben formar `1..N` sin huecos ni repetidos y las
    /// etiquetas del checklist deben ser únicas.
    pub fn validate(&mut self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(SgtError::InvalidCatalog(format!(
                "procedure {} has an empty code",
                self.id
            )));
        }

        self.steps.sort_by_key(|s| s.order);
        for (i, step) in self.steps.iter().enumerate() {
            let expected = i as u32 + 1;
            if step.order != expected {
                return Err(SgtError::InvalidCatalog(format!(
                    "procedure {}: step orders must be contiguous from 1, found {} at position {}",
                    self.code, step.order, expected
                )));
            }
        }

        let mut labels = HashSet::new();
        for item in &self.checklist {
            if !labels.insert(item.label.as_str()) {
                return Err(SgtError::InvalidCatalog(format!(
                    "procedure {}: duplicate checklist label '{}'",
                    self.code, item.label
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(order: u32, name: &str) -> ProcedureStep {
        ProcedureStep {
            order,
            name: name.into(),
            sla_days: 3,
            responsible_role: "gestor".into(),
        }
    }

    fn procedure(steps: Vec<ProcedureStep>) -> ProcedureType {
        ProcedureType {
            id: "p1".into(),
            name: "Registro".into(),
            code: "REG".into(),
            agency_id: "a1".into(),
            sla_total_days: 10,
            steps,
            checklist: vec![],
        }
    }

    #[test]
    fn validate_sorts_steps() {
        let mut p = procedure(vec![step(2, "Revisión"), step(1, "Ingreso"), step(3, "Emisión")]);
        p.validate().unwrap();
        let names: Vec<_> = p.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ingreso", "Revisión", "Emisión"]);
        assert_eq!(p.total_steps(), 3);
        assert_eq!(p.step(2).unwrap().name, "Revisión");
        assert!(p.step(4).is_none());
    }

    #[test]
    fn validate_rejects_gaps_and_duplicates() {
        let mut gap = procedure(vec![step(1, "a"), step(3, "c")]);
        assert!(matches!(gap.validate(), Err(SgtError::InvalidCatalog(_))));

        let mut dup = procedure(vec![step(1, "a"), step(1, "b")]);
        assert!(matches!(dup.validate(), Err(SgtError::InvalidCatalog(_))));

        let mut zero = procedure(vec![step(0, "a")]);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_labels() {
        let mut p = procedure(vec![step(1, "a")]);
        let item = ChecklistItem {
            label: "RUC".into(),
            mandatory: true,
            kind: DocumentKind::Pdf,
            description: None,
        };
        p.checklist = vec![item.clone(), item];
        assert!(p.validate().is_err());
    }

    #[test]
    fn procedure_without_steps_is_valid() {
        let mut p = procedure(vec![]);
        p.validate().unwrap();
        assert_eq!(p.total_steps(), 0);
    }

    #[test]
    fn document_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentKind::Spreadsheet).unwrap();
        assert_eq!(json, "\"spreadsheet\"");
    }
}
