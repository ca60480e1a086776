//! Реализации локального хранилища прогресса

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use crate::error::{ReaderError, Result};
use crate::library::{LibraryRecord, ProgressStore};

/// Хранилище в памяти
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: RwLock<HashMap<String, LibraryRecord>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = LibraryRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(&self, id: &str) -> Result<Option<LibraryRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn put(&self, record: &LibraryRecord) -> Result<()> {
        self.records.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.write().remove(id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<LibraryRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }
}

/// Хранилище в каталоге: по одному JSON-файлу на запись
///
/// Имя файла - md5 идентификатора, поэтому идентификатор может содержать
/// любые символы. Запись и удаление выполняются по одному, так что
/// одновременные `put` одной записи не перемешивают файлы.
#[derive(Debug, Clone)]
pub struct JsonFileProgressStore {
    dir: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl JsonFileProgressStore {
    /// Открыть хранилище, создав каталог при необходимости
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("create store directory", &dir, e))?;
        Ok(Self {
            dir,
            writes: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{:x}.json", md5::compute(id.as_bytes())))
    }
}

fn storage_error(action: &str, path: &Path, e: impl std::fmt::Display) -> ReaderError {
    ReaderError::Storage(format!("{} {}: {}", action, path.display(), e))
}

#[async_trait]
impl ProgressStore for JsonFileProgressStore {
    async fn get(&self, id: &str) -> Result<Option<LibraryRecord>> {
        let path = self.record_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| storage_error("decode", &path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }

    async fn put(&self, record: &LibraryRecord) -> Result<()> {
        let path = self.record_path(&record.id);
        let bytes = serde_json::to_vec_pretty(record)?;

        // Запись через временный файл, чтобы не оставить обрезанный JSON
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        let _guard = self.writes.lock().await;
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_error("write", &tmp, e));
        }
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error("rename", &path, e))?;
        log::trace!("Stored record {} at {}", record.id, path.display());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.record_path(id);
        let _guard = self.writes.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete", &path, e)),
        }
    }

    async fn list_all(&self) -> Result<Vec<LibraryRecord>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| storage_error("list", &self.dir, e))?;
        let mut records = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| storage_error("read", &path, e))?;
            match serde_json::from_slice::<LibraryRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        Ok(records)
    }
}
