//! Навигация по страницам документа
//!
//! Навигатор загружает слова страницы через внешний [`TextProvider`],
//! сбрасывает контроллер, ведет учет прочитанных страниц и по окончании
//! страницы планирует автоматический переход на следующую.

use std::collections::BTreeSet;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::controller::{ControllerOutcome, PlaybackController};
use crate::error::{ReaderError, Result};
use crate::library::{LibraryRecord, ProgressStore, RemoteLibraryApi};
use crate::progress::PlaybackEvent;
use crate::speech::SpeechEvent;

/// Источник текста страниц
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Слова страницы `page` (нумерация с 1) в порядке чтения
    async fn extract(&self, document_id: &str, page: u32) -> Result<Vec<String>>;
}

/// Направление перехода
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

/// Прогресс чтения документа в текущем сеансе
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub document_id: String,
    pub read_pages: BTreeSet<u32>,
    pub last_read: i64,
}

impl PageRecord {
    pub fn from_library(record: &LibraryRecord) -> Self {
        Self {
            document_id: record.id.clone(),
            read_pages: record.read_pages.clone(),
            last_read: record.last_read,
        }
    }

    /// Вход на страницу
    pub fn enter(&mut self, page: u32, page_count: u32, now_ms: i64) {
        if (1..=page_count).contains(&page) {
            self.read_pages.insert(page);
        }
        self.last_read = now_ms;
    }

    /// Страница дочитана
    pub fn finish(&mut self, now_ms: i64) {
        self.last_read = now_ms;
    }
}

/// Навигатор страниц одного документа
pub struct PageNavigator {
    controller: PlaybackController,
    provider: Arc<dyn TextProvider>,
    store: Option<Arc<dyn ProgressStore>>,
    remote: Option<Arc<dyn RemoteLibraryApi>>,
    document: LibraryRecord,
    record: PageRecord,
    page_count: u32,
    current_page: Option<u32>,
}

impl PageNavigator {
    pub fn new(
        controller: PlaybackController,
        provider: Arc<dyn TextProvider>,
        document: LibraryRecord,
        page_count: u32,
    ) -> Self {
        let mut document = document;
        document.clamp_pages(page_count);
        Self {
            record: PageRecord::from_library(&document),
            controller,
            provider,
            store: None,
            remote: None,
            document,
            page_count,
            current_page: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteLibraryApi>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Перейти на страницу `page`
    ///
    /// Возвращает `Ok(false)` для страницы вне `1..=page_count`, ничего не
    /// меняя. Ошибка извлечения текста прерывает загрузку: текущая страница
    /// остается на паузе. Ошибка хранилища возвращается уже после загрузки
    /// страницы и запуска воспроизведения.
    pub async fn goto(&mut self, page: u32, auto_play: bool) -> Result<bool> {
        if !(1..=self.page_count).contains(&page) {
            log::debug!("Page {} outside 1..={}, ignoring", page, self.page_count);
            return Ok(false);
        }

        self.controller.pause();

        let words = self
            .provider
            .extract(&self.document.id, page)
            .await
            .map_err(|e| {
                log::error!("Failed to extract page {} of {}: {}", page, self.document.id, e);
                match e {
                    ReaderError::Extraction(_) => e,
                    other => ReaderError::Extraction(other.to_string()),
                }
            })?;

        log::info!("Loaded page {}/{} ({} words)", page, self.page_count, words.len());
        self.controller.load_page(words.clone())?;
        self.current_page = Some(page);

        let now = self.controller.clock().wall_clock_ms();
        self.record.enter(page, self.page_count, now);
        self.document.content = Some(words);
        self.controller.observers().notify(PlaybackEvent::PageLoaded {
            page,
            total_pages: self.page_count,
        });

        let persisted = self.persist().await;
        if auto_play {
            self.controller.play()?;
        }
        persisted?;
        Ok(true)
    }

    /// Перейти на соседнюю страницу
    pub async fn navigate(&mut self, direction: NavDirection, auto_play: bool) -> Result<bool> {
        let target = match (direction, self.current_page) {
            (NavDirection::Next, Some(page)) => page.saturating_add(1),
            (NavDirection::Next, None) => 1,
            (NavDirection::Previous, Some(page)) => page.saturating_sub(1),
            (NavDirection::Previous, None) => return Ok(false),
        };
        self.goto(target, auto_play).await
    }

    pub fn can_go_back(&self) -> bool {
        self.current_page.map(|page| page > 1).unwrap_or(false)
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_page.map(|page| page < self.page_count).unwrap_or(self.page_count > 0)
    }

    /// Выполнить наступившую задачу контроллера
    pub async fn tick(&mut self) -> Result<ControllerOutcome> {
        let outcome = self.controller.tick()?;
        self.route(outcome).await
    }

    /// Передать событие речевого движка контроллеру
    pub async fn handle_speech_event(&mut self, event: &SpeechEvent) -> Result<ControllerOutcome> {
        let outcome = self.controller.handle_speech_event(event)?;
        self.route(outcome).await
    }

    async fn route(&mut self, outcome: ControllerOutcome) -> Result<ControllerOutcome> {
        match outcome {
            ControllerOutcome::PageFinished => self.on_page_finished().await?,
            ControllerOutcome::AutoAdvanceDue => {
                if let Some(page) = self.current_page {
                    log::info!("Auto-advancing to page {}", page + 1);
                    self.goto(page + 1, true).await?;
                }
            }
            ControllerOutcome::Idle | ControllerOutcome::Advanced { .. } => {}
        }
        Ok(outcome)
    }

    async fn on_page_finished(&mut self) -> Result<()> {
        let Some(page) = self.current_page else {
            return Ok(());
        };

        self.record.finish(self.controller.clock().wall_clock_ms());
        self.controller.observers().notify(PlaybackEvent::PageFinished { page });

        if self.controller.config().auto_advance && page < self.page_count {
            self.controller.schedule_auto_advance();
        }
        self.persist().await
    }

    /// Сохранить прогресс: локально с ошибкой, удаленно без ожидания
    async fn persist(&mut self) -> Result<()> {
        self.document.read_pages = self.record.read_pages.clone();
        self.document.last_read = self.record.last_read;
        self.document.clamp_pages(self.page_count);

        if let Some(remote) = &self.remote {
            let remote = remote.clone();
            let id = self.document.id.clone();
            let pages = self.document.read_pages.clone();
            let last_read = self.document.last_read;
            tokio::spawn(async move {
                if let Err(e) = remote.update_progress(&id, &pages, last_read).await {
                    log::warn!("Failed to sync progress of {}: {}", id, e);
                }
            });
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.put(&self.document).await {
                log::error!("Failed to store progress of {}: {}", self.document.id, e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    pub fn current_page(&self) -> Option<u32> {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn page_record(&self) -> &PageRecord {
        &self.record
    }

    pub fn document(&self) -> &LibraryRecord {
        &self.document
    }
}
