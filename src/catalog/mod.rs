//! Catálogo de tipos de trámite.
//!
//! Las plantillas son inmutables una vez cargadas. El [`Catalog`] se arma
//! desde TOML (archivo propio o el catálogo embebido) y valida cada
//! [`ProcedureType`] al cargarlo.

mod procedure;

pub use procedure::{Agency, ChecklistItem, DocumentKind, ProcedureStep, ProcedureType};

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SgtError};

const BUILTIN_CATALOG: &str = include_str!("builtin.toml");

/// Conjunto de organismos y tipos de trámite disponibles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct Catalog {
    agencies: Vec<Agency>,
    procedures: Vec<ProcedureType>,
}

/// Forma del TOML antes de validar.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    agencies: Vec<Agency>,
    #[serde(default)]
    procedures: Vec<ProcedureType>,
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = SgtError;

    fn try_from(file: CatalogFile) -> Result<Self> {
        Self::new(file.agencies, file.procedures)
    }
}

impl Catalog {
    pub fn new(agencies: Vec<Agency>, procedures: Vec<ProcedureType>) -> Result<Self> {
        let mut catalog = Self {
            agencies,
            procedures,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Catálogo de ejemplo embebido en el binario.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn procedures(&self) -> &[ProcedureType] {
        &self.procedures
    }

    /// Busca un tipo de trámite por id o por código.
    pub fn procedure(&self, key: &str) -> Result<&ProcedureType> {
        self.procedures
            .iter()
            .find(|p| p.id == key || p.code == key)
            .ok_or_else(|| SgtError::ProcedureNotFound(key.to_string()))
    }

    pub fn agency(&self, id: &str) -> Result<&Agency> {
        self.agencies
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| SgtError::AgencyNotFound(id.to_string()))
    }

    pub fn agency_for(&self, procedure: &ProcedureType) -> Result<&Agency> {
        self.agency(&procedure.agency_id)
    }

    fn validate(&mut self) -> Result<()> {
        let mut agency_ids = HashSet::new();
        for agency in &self.agencies {
            if !agency_ids.insert(agency.id.as_str()) {
                return Err(SgtError::InvalidCatalog(format!(
                    "duplicate agency id '{}'",
                    agency.id
                )));
            }
        }

        let mut keys = HashSet::new();
        for procedure in &mut self.procedures {
            procedure.validate()?;
            if !agency_ids.contains(procedure.agency_id.as_str()) {
                return Err(SgtError::InvalidCatalog(format!(
                    "procedure {} references unknown agency '{}'",
                    procedure.code, procedure.agency_id
                )));
            }
            let code_clash = procedure.code != procedure.id && !keys.insert(procedure.code.clone());
            if !keys.insert(procedure.id.clone()) || code_clash {
                return Err(SgtError::InvalidCatalog(format!(
                    "duplicate procedure id or code '{}'",
                    procedure.code
                )));
            }
        }

        Ok(())
    }
}
