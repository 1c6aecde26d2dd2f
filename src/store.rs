//! Persistencia de expedientes detrás de la trait [`ExpedienteStore`].
//!
//! El motor no conoce la tecnología de almacenamiento. `update` es un
//! compare-and-swap sobre `version` contra el estado guardado: dos
//! escritores con la misma versión esperada no pueden ganar ambos.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SgtError};
use crate::expediente::{DocumentRecord, Expediente};

pub trait ExpedienteStore {
    fn get(&self, id: &Uuid) -> Result<Option<Expediente>>;

    fn find_by_code(&self, code: &str) -> Result<Option<Expediente>>;

    fn list(&self) -> Result<Vec<Expediente>>;

    /// Falla con `DuplicateCode` si el código ya existe.
    fn insert(&self, expediente: &Expediente) -> Result<()>;

    /// Reemplaza el expediente sólo si la versión guardada es `expected_version`.
    fn update(&self, expediente: &Expediente, expected_version: u64) -> Result<()>;

    /// Como [`update`](Self::update), y además inserta o reemplaza
    /// `document`. Se aplican las dos cosas o ninguna.
    fn update_with_document(
        &self,
        expediente: &Expediente,
        expected_version: u64,
        document: &DocumentRecord,
    ) -> Result<()>;

    fn code_exists(&self, code: &str) -> Result<bool>;

    fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    fn documents(&self, expediente_id: &Uuid) -> Result<Vec<DocumentRecord>>;
}

/// Snapshot completo del almacén; es también el formato del archivo JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    expedientes: Vec<Expediente>,
    #[serde(default)]
    documents: Vec<DocumentRecord>,
}

impl Snapshot {
    fn get(&self, id: &Uuid) -> Option<Expediente> {
        self.expedientes.iter().find(|e| e.id == *id).cloned()
    }

    fn find_by_code(&self, code: &str) -> Option<Expediente> {
        self.expedientes.iter().find(|e| e.code == code).cloned()
    }

    fn code_exists(&self, code: &str) -> bool {
        self.expedientes.iter().any(|e| e.code == code)
    }

    fn insert(&mut self, expediente: &Expediente) -> Result<()> {
        if self.code_exists(&expediente.code) {
            return Err(SgtError::DuplicateCode(expediente.code.clone()));
        }
        self.expedientes.push(expediente.clone());
        Ok(())
    }

    fn update(&mut self, expediente: &Expediente, expected_version: u64) -> Result<()> {
        let slot = self
            .expedientes
            .iter_mut()
            .find(|e| e.id == expediente.id)
            .ok_or_else(|| SgtError::ExpedienteNotFound(expediente.id.to_string()))?;
        if slot.version != expected_version {
            return Err(SgtError::ConcurrentModification {
                expected: expected_version,
                found: slot.version,
            });
        }
        *slot = expediente.clone();
        Ok(())
    }

    fn update_with_document(
        &mut self,
        expediente: &Expediente,
        expected_version: u64,
        document: &DocumentRecord,
    ) -> Result<()> {
        if document.expediente_id != expediente.id {
            return Err(SgtError::DocumentNotFound(document.id.to_string()));
        }
        self.update(expediente, expected_version)?;
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document.clone(),
            None => self.documents.push(document.clone()),
        }
        Ok(())
    }

    fn codes_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.expedientes
            .iter()
            .filter(|e| e.code.starts_with(prefix))
            .map(|e| e.code.clone())
            .collect()
    }

    fn documents(&self, expediente_id: &Uuid) -> Vec<DocumentRecord> {
        let mut docs: Vec<DocumentRecord> = self
            .documents
            .iter()
            .filter(|d| d.expediente_id == *expediente_id)
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.created_at);
        docs
    }
}

/// Almacén en memoria, usado por las pruebas y por `sgt demo`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Snapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        // Un pánico a mitad de escritura no deja el snapshot a medias:
        // cada operación reemplaza elementos completos.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ExpedienteStore for InMemoryStore {
    fn get(&self, id: &Uuid) -> Result<Option<Expediente>> {
        Ok(self.lock().get(id))
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Expediente>> {
        Ok(self.lock().find_by_code(code))
    }

    fn list(&self) -> Result<Vec<Expediente>> {
        Ok(self.lock().expedientes.clone())
    }

    fn insert(&self, expediente: &Expediente) -> Result<()> {
        self.lock().insert(expediente)
    }

    fn update(&self, expediente: &Expediente, expected_version: u64) -> Result<()> {
        self.lock().update(expediente, expected_version)
    }

    fn update_with_document(
        &self,
        expediente: &Expediente,
        expected_version: u64,
        document: &DocumentRecord,
    ) -> Result<()> {
        self.lock()
            .update_with_document(expediente, expected_version, document)
    }

    fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.lock().code_exists(code))
    }

    fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.lock().codes_with_prefix(prefix))
    }

    fn documents(&self, expediente_id: &Uuid) -> Result<Vec<DocumentRecord>> {
        Ok(self.lock().documents(expediente_id))
    }
}

/// Almacén respaldado por un archivo JSON compartible entre procesos.
///
/// No guarda nada en memoria: cada operación toma un lock del archivo
/// hermano `.lock` (compartido para leer, exclusivo para escribir) y lee
/// el JSON actual. Las escrituras aplican el cambio sobre lo leído y
/// reemplazan el archivo con un rename atómico.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    /// Abre el archivo indicado; si no existe, arranca vacío.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            path: path.to_path_buf(),
            lock_path: path.with_extension("json.lock"),
        };
        // Falla temprano si el archivo existente no es un snapshot válido.
        store.read(|_| ())?;
        Ok(store)
    }

    fn lock_file(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    fn load(&self) -> Result<Snapshot> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Result<T> {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock)?;
        let snapshot = self.load()?;
        Ok(f(&snapshot))
    }

    /// Relee el archivo bajo lock exclusivo, aplica `f` y persiste. Si `f`
    /// falla el archivo no se toca.
    fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Snapshot) -> Result<()>,
    {
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        let mut snapshot = self.load()?;
        f(&mut snapshot)?;

        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ExpedienteStore for JsonFileStore {
    fn get(&self, id: &Uuid) -> Result<Option<Expediente>> {
        self.read(|s| s.get(id))
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Expediente>> {
        self.read(|s| s.find_by_code(code))
    }

    fn list(&self) -> Result<Vec<Expediente>> {
        self.read(|s| s.expedientes.clone())
    }

    fn insert(&self, expediente: &Expediente) -> Result<()> {
        self.write(|s| s.insert(expediente))
    }

    fn update(&self, expediente: &Expediente, expected_version: u64) -> Result<()> {
        self.write(|s| s.update(expediente, expected_version))
    }

    fn update_with_document(
        &self,
        expediente: &Expediente,
        expected_version: u64,
        document: &DocumentRecord,
    ) -> Result<()> {
        self.write(|s| s.update_with_document(expediente, expected_version, document))
    }

    fn code_exists(&self, code: &str) -> Result<bool> {
        self.read(|s| s.code_exists(code))
    }

    fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.read(|s| s.codes_with_prefix(prefix))
    }

    fn documents(&self, expediente_id: &Uuid) -> Result<Vec<DocumentRecord>> {
        self.read(|s| s.documents(expediente_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentKind;
    use crate::expediente::{ExpedienteState, Priority, ReviewState};
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn expediente(code: &str) -> Expediente {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        Expediente {
            id: Uuid::new_v4(),
            code: code.into(),
            procedure_id: "reg-san-alim".into(),
            client: "Alimentos del Sur SAC".into(),
            alias: "Galletas".into(),
            priority: Priority::Normal,
            created_on: today,
            due_on: today,
            state: ExpedienteState::Iniciado,
            current_step: 0,
            total_steps: 3,
            observations: vec![],
            history: vec![],
            version: 1,
            updated_at: Utc::now(),
        }
    }

    fn document(expediente_id: Uuid) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            expediente_id,
            name: "solicitud.pdf".into(),
            checklist_item: Some("Solicitud firmada".into()),
            mandatory: true,
            kind: DocumentKind::Pdf,
            review: ReviewState::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_code() {
        let store = InMemoryStore::new();
        store.insert(&expediente("SGT-2026-X-00001")).unwrap();
        let err = store.insert(&expediente("SGT-2026-X-00001")).unwrap_err();
        assert!(matches!(err, SgtError::DuplicateCode(_)));
    }

    #[test]
    fn update_checks_version() {
        let store = InMemoryStore::new();
        let mut exp = expediente("SGT-2026-X-00001");
        store.insert(&exp).unwrap();

        exp.version = 2;
        store.update(&exp, 1).unwrap();

        // Un segundo escritor que aún cree tener la versión 1.
        let mut stale = exp.clone();
        stale.version = 2;
        let err = store.update(&stale, 1).unwrap_err();
        assert!(matches!(
            err,
            SgtError::ConcurrentModification {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn update_unknown_expediente_fails() {
        let store = InMemoryStore::new();
        let err = store.update(&expediente("X"), 1).unwrap_err();
        assert!(matches!(err, SgtError::ExpedienteNotFound(_)));
    }

    #[test]
    fn codes_with_prefix_filters() {
        let store = InMemoryStore::new();
        store.insert(&expediente("SGT-2026-SENASA-00001")).unwrap();
        store.insert(&expediente("SGT-2026-SENASA-00002")).unwrap();
        store.insert(&expediente("SGT-2025-SENASA-00001")).unwrap();
        let codes = store.codes_with_prefix("SGT-2026-SENASA-").unwrap();
        assert_eq!(codes.len(), 2);
        assert!(store.code_exists("SGT-2025-SENASA-00001").unwrap());
        assert!(!store.code_exists("SGT-2025-SENASA-00002").unwrap());
    }

    #[test]
    fn documents_are_scoped_to_expediente() {
        let store = InMemoryStore::new();
        let mut a = expediente("A");
        let b = expediente("B");
        store.insert(&a).unwrap();
        store.insert(&b).unwrap();
        for _ in 0..2 {
            a.version += 1;
            store.update_with_document(&a, a.version - 1, &document(a.id)).unwrap();
        }
        store.update_with_document(&b, 1, &document(b.id)).unwrap();
        assert_eq!(store.documents(&a.id).unwrap().len(), 2);
        assert_eq!(store.documents(&b.id).unwrap().len(), 1);
    }

    #[test]
    fn update_with_document_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let mut exp = expediente("SGT-2026-X-00001");
        store.insert(&exp).unwrap();

        exp.version = 2;
        let err = store.update_with_document(&exp, 7, &document(exp.id)).unwrap_err();
        assert!(matches!(err, SgtError::ConcurrentModification { expected: 7, found: 1 }));
        assert!(store.documents(&exp.id).unwrap().is_empty());
        assert_eq!(store.get(&exp.id).unwrap().unwrap().version, 1);

        // Un documento de otro expediente tampoco se acepta.
        let err = store
            .update_with_document(&exp, 1, &document(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, SgtError::DocumentNotFound(_)));
        assert_eq!(store.get(&exp.id).unwrap().unwrap().version, 1);
    }

    #[test]
    fn update_with_document_replaces_existing_document() {
        let store = InMemoryStore::new();
        let mut exp = expediente("SGT-2026-X-00001");
        store.insert(&exp).unwrap();
        let mut doc = document(exp.id);

        exp.version = 2;
        store.update_with_document(&exp, 1, &doc).unwrap();
        doc.review = ReviewState::Approved;
        exp.version = 3;
        store.update_with_document(&exp, 2, &doc).unwrap();

        let docs = store.documents(&exp.id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].review, ReviewState::Approved);
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sgt-data.json");

        let mut exp = expediente("SGT-2026-SENASA-00001");
        let mut doc = document(exp.id);
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.insert(&exp).unwrap();
            exp.version = 2;
            store.update_with_document(&exp, 1, &doc).unwrap();
            doc.review = ReviewState::Approved;
            exp.version = 3;
            store.update_with_document(&exp, 2, &doc).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        let loaded = store.find_by_code("SGT-2026-SENASA-00001").unwrap().unwrap();
        assert_eq!(loaded, exp);
        let docs = store.documents(&exp.id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].review, ReviewState::Approved);
    }

    #[test]
    fn json_store_failed_write_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(&dir.path().join("data.json")).unwrap();
        let exp = expediente("DUP");
        store.insert(&exp).unwrap();
        assert!(store.insert(&expediente("DUP")).is_err());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn json_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ no es json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(SgtError::Json(_))));
    }

    #[test]
    fn json_stores_on_same_file_see_each_other() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sgt-data.json");
        let a = JsonFileStore::open(&path).unwrap();
        let b = JsonFileStore::open(&path).unwrap();

        let exp = expediente("SGT-2026-SENASA-00001");
        a.insert(&exp).unwrap();
        assert_eq!(b.get(&exp.id).unwrap(), Some(exp.clone()));
        assert!(b.code_exists("SGT-2026-SENASA-00001").unwrap());

        // Ambos escritores parten de la versión 1; sólo el primero gana.
        let mut from_a = exp.clone();
        from_a.version = 2;
        from_a.current_step = 1;
        a.update(&from_a, 1).unwrap();

        let mut from_b = exp.clone();
        from_b.version = 2;
        from_b.observations.push("otra sesión".into());
        let err = b.update(&from_b, 1).unwrap_err();
        assert!(matches!(err, SgtError::ConcurrentModification { expected: 1, found: 2 }));

        // Lo que agrega un escritor no lo borra el otro.
        b.insert(&expediente("SGT-2026-SENASA-00002")).unwrap();
        a.insert(&expediente("SGT-2026-SENASA-00003")).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 3);
        assert_eq!(reopened.get(&exp.id).unwrap().unwrap().current_step, 1);
        assert!(matches!(
            b.insert(&expediente("SGT-2026-SENASA-00003")),
            Err(SgtError::DuplicateCode(_))
        ));
    }
}
