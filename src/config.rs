//! Configuración de SGT cargada a partir de `sgt.toml`.
//!
//! La struct [`SgtConfig`] contiene todos los parámetros configurables.
//! Valores no presentes en el archivo usan defaults razonables.
//! La variable de entorno `SGT_STORE_PATH` tiene precedencia sobre el archivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use sgt::code::{CodeGenerator, CodeStrategy};
use sgt::expediente::{EnginePolicy, UnknownDocumentPolicy};

/// Configuración de nivel superior cargada de `sgt.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SgtConfig {
    /// Archivo JSON donde se guardan expedientes y documentos.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Catálogo TOML propio; sin él se usa el catálogo embebido.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub code_strategy: CodeStrategy,

    /// Intentos máximos al generar un código aleatorio.
    #[serde(default = "default_code_max_attempts")]
    pub code_max_attempts: u32,

    /// Días restantes (inclusive) a partir de los cuales el semáforo pasa a amarillo.
    #[serde(default = "default_warning_days")]
    pub warning_days: u32,

    #[serde(default)]
    pub unknown_documents: UnknownDocumentPolicy,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sgt-data.json")
}

fn default_code_max_attempts() -> u32 {
    20
}

fn default_warning_days() -> u32 {
    3
}

impl Default for SgtConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            catalog_path: None,
            code_strategy: CodeStrategy::default(),
            code_max_attempts: default_code_max_attempts(),
            warning_days: default_warning_days(),
            unknown_documents: UnknownDocumentPolicy::default(),
        }
    }
}

impl SgtConfig {
    /// Carga la configuración desde `path`, o desde `sgt.toml` en el
    /// directorio actual. Usa valores por defecto si el archivo no existe.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new("sgt.toml"));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<SgtConfig>(&contents)
                .with_context(|| format!("invalid config in {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(store) = std::env::var("SGT_STORE_PATH")
            && !store.is_empty()
        {
            config.store_path = PathBuf::from(store);
        }

        Ok(config)
    }

    pub fn engine_policy(&self) -> EnginePolicy {
        EnginePolicy {
            warning_days: self.warning_days,
            unknown_documents: self.unknown_documents,
            codes: CodeGenerator::new(self.code_strategy, self.code_max_attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = SgtConfig::default();
        assert_eq!(config.store_path, PathBuf::from("sgt-data.json"));
        assert!(config.catalog_path.is_none());
        assert_eq!(config.code_strategy, CodeStrategy::Sequence);
        assert_eq!(config.warning_days, 3);
        assert_eq!(config.unknown_documents, UnknownDocumentPolicy::Accept);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            code_strategy = "random"
            warning_days = 5
            unknown_documents = "reject"
        "#;
        let config: SgtConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.code_strategy, CodeStrategy::Random);
        assert_eq!(config.warning_days, 5);
        assert_eq!(config.unknown_documents, UnknownDocumentPolicy::Reject);
        assert_eq!(config.code_max_attempts, 20);

        let policy = config.engine_policy();
        assert_eq!(policy.warning_days, 5);
        assert_eq!(policy.codes.strategy, CodeStrategy::Random);
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "warning_days = 7\ncatalog_path = \"tramites.toml\"\n").unwrap();
        let config = SgtConfig::load(Some(&path)).unwrap();
        assert_eq!(config.warning_days, 7);
        assert_eq!(config.catalog_path, Some(PathBuf::from("tramites.toml")));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SgtConfig::load(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.warning_days, 3);
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        let result = toml::from_str::<SgtConfig>("code_strategy = \"lottery\"");
        assert!(result.is_err());
    }
}
