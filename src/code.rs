//! Generación del código visible de un expediente.
//!
//! Formato: `SGT-{año}-{sigla}-{número de 5 dígitos}`, con las barras de la
//! sigla reemplazadas por guiones. El número es único por (año, organismo).

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, SgtError};
use crate::store::ExpedienteStore;

const CODE_PREFIX: &str = "SGT";
const MAX_SUFFIX: u32 = 99_999;

/// How the numeric suffix is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStrategy {
    /// Next number after the highest one already issued for the prefix.
    #[default]
    Sequence,
    /// Random 5-digit number, retried against the store on collision.
    Random,
}

/// `SGT-{year}-{sigla}-` con la sigla normalizada.
pub fn code_prefix(sigla: &str, year: i32) -> String {
    format!("{CODE_PREFIX}-{year}-{}-", sigla.trim().replace('/', "-"))
}

pub fn format_code(sigla: &str, year: i32, number: u32) -> String {
    format!("{}{number:05}", code_prefix(sigla, year))
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    pub strategy: CodeStrategy,
    pub max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            strategy: CodeStrategy::Sequence,
            max_attempts: 20,
        }
    }
}

impl CodeGenerator {
    pub fn new(strategy: CodeStrategy, max_attempts: u32) -> Self {
        Self {
            strategy,
            max_attempts,
        }
    }

    /// Genera un código libre en `store` para el organismo y año dados.
    pub fn generate(&self, store: &impl ExpedienteStore, sigla: &str, year: i32) -> Result<String> {
        match self.strategy {
            CodeStrategy::Sequence => self.next_in_sequence(store, sigla, year),
            CodeStrategy::Random => self.random_with_retry(store, sigla, year),
        }
    }

    fn next_in_sequence(&self, store: &impl ExpedienteStore, sigla: &str, year: i32) -> Result<String> {
        let prefix = code_prefix(sigla, year);
        let highest = store
            .codes_with_prefix(&prefix)?
            .iter()
            .filter_map(|code| code[prefix.len()..].parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        if highest >= MAX_SUFFIX {
            return Err(SgtError::CodeSpaceExhausted { prefix });
        }
        Ok(format_code(sigla, year, highest + 1))
    }

    fn random_with_retry(&self, store: &impl ExpedienteStore, sigla: &str, year: i32) -> Result<String> {
        let mut rng = rand::thread_rng();
        for attempt in 1..=self.max_attempts {
            let code = format_code(sigla, year, rng.gen_range(10_000..=MAX_SUFFIX));
            if !store.code_exists(&code)? {
                return Ok(code);
            }
            warn!(%code, attempt, "expediente code collision, retrying");
        }
        Err(SgtError::CodeSpaceExhausted {
            prefix: code_prefix(sigla, year),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expediente::{Expediente, ExpedienteState, Priority};
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn seed(store: &InMemoryStore, code: &str) {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        store
            .insert(&Expediente {
                id: Uuid::new_v4(),
                code: code.into(),
                procedure_id: "p".into(),
                client: "c".into(),
                alias: "a".into(),
                priority: Priority::Normal,
                created_on: today,
                due_on: today,
                state: ExpedienteState::Iniciado,
                current_step: 0,
                total_steps: 1,
                observations: vec![],
                history: vec![],
                version: 1,
                updated_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn format_replaces_slashes() {
        assert_eq!(format_code("MINSA/DIGESA", 2026, 42), "SGT-2026-MINSA-DIGESA-00042");
        assert_eq!(format_code("SENASA", 2025, 12345), "SGT-2025-SENASA-12345");
    }

    #[test]
    fn sequence_starts_at_one() {
        let store = InMemoryStore::new();
        let code = CodeGenerator::default().generate(&store, "SENASA", 2026).unwrap();
        assert_eq!(code, "SGT-2026-SENASA-00001");
    }

    #[test]
    fn sequence_continues_after_highest_for_same_year_and_agency() {
        let store = InMemoryStore::new();
        seed(&store, "SGT-2026-SENASA-00001");
        seed(&store, "SGT-2026-SENASA-00007");
        seed(&store, "SGT-2025-SENASA-00099");
        seed(&store, "SGT-2026-MINSA-DIGESA-00050");

        let generator = CodeGenerator::default();
        assert_eq!(
            generator.generate(&store, "SENASA", 2026).unwrap(),
            "SGT-2026-SENASA-00008"
        );
        assert_eq!(
            generator.generate(&store, "MINSA/DIGESA", 2026).unwrap(),
            "SGT-2026-MINSA-DIGESA-00051"
        );
    }

    #[test]
    fn sequence_exhaustion_is_an_error() {
        let store = InMemoryStore::new();
        seed(&store, "SGT-2026-SENASA-99999");
        let err = CodeGenerator::default()
            .generate(&store, "SENASA", 2026)
            .unwrap_err();
        assert!(matches!(err, SgtError::CodeSpaceExhausted { .. }));
    }

    #[test]
    fn random_code_has_five_digits() {
        let store = InMemoryStore::new();
        let generator = CodeGenerator::new(CodeStrategy::Random, 5);
        let code = generator.generate(&store, "SENASA", 2026).unwrap();
        let suffix = code.strip_prefix("SGT-2026-SENASA-").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.parse::<u32>().unwrap() >= 10_000);
    }

    #[test]
    fn random_with_zero_attempts_gives_up() {
        let store = InMemoryStore::new();
        let generator = CodeGenerator::new(CodeStrategy::Random, 0);
        assert!(generator.generate(&store, "SENASA", 2026).is_err());
    }
}
