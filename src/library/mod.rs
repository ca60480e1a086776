//! Модуль библиотеки документов
//!
//! Запись библиотеки хранит прогресс чтения документа. Запись существует в
//! двух местах: в локальном хранилище и у удаленного сервиса. Конфликты
//! между ними разрешает только [`LibraryReconciler`] по правилу
//! "последняя запись побеждает".

pub mod reconciler;
pub mod remote;
pub mod store;

use std::collections::BTreeSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;

pub use reconciler::{merge, LibraryReconciler};
pub use remote::HttpLibraryApi;
pub use store::{JsonFileProgressStore, MemoryProgressStore};

/// Запись библиотеки
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub read_pages: BTreeSet<u32>,
    /// Время последнего чтения, миллисекунды эпохи Unix
    #[serde(default)]
    pub last_read: i64,
    /// Кэшированные слова документа
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<String>>,
    /// У удаленного сервиса есть копия исходного файла
    #[serde(default, rename = "hasBinary", alias = "hasRemoteCopy")]
    pub has_remote_copy: bool,
}

impl LibraryRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Новая запись для импортированного документа со случайным идентификатором
    pub fn generate(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name)
    }

    /// Отметить страницу прочитанной, если она существует в документе
    pub fn mark_read(&mut self, page: u32, page_count: u32) -> bool {
        if page == 0 || page > page_count {
            return false;
        }
        self.read_pages.insert(page)
    }

    /// Удалить номера страниц вне `1..=page_count`
    pub fn clamp_pages(&mut self, page_count: u32) {
        self.read_pages.retain(|page| (1..=page_count).contains(page));
    }
}

/// Пользовательские настройки, хранящиеся у удаленного сервиса
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust_speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<bool>,
    #[serde(default, rename = "voiceURI", skip_serializing_if = "Option::is_none")]
    pub voice_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<bool>,
}

/// Локальное хранилище записей
///
/// Одновременные записи одной и той же записи сериализует хранилище.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<LibraryRecord>>;

    async fn put(&self, record: &LibraryRecord) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<LibraryRecord>>;
}

/// Удаленный сервис библиотеки
#[async_trait]
pub trait RemoteLibraryApi: Send + Sync {
    async fn list(&self) -> Result<Vec<LibraryRecord>>;

    /// Создать или заменить запись целиком
    async fn create(&self, record: &LibraryRecord) -> Result<()>;

    async fn update_progress(&self, id: &str, read_pages: &BTreeSet<u32>, last_read: i64) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn get_settings(&self) -> Result<Option<RemoteSettings>>;

    async fn put_settings(&self, settings: &RemoteSettings) -> Result<()>;
}
