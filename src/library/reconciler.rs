//! Согласование локальной и удаленной библиотеки
//!
//! Правило "последняя запись побеждает": запись со строго большим `lastRead`
//! определяет имя, прочитанные страницы и время чтения. При равенстве
//! побеждает локальная запись, поэтому `merge(a, a) == a`. Кэш содержимого
//! не теряется, даже если его владелец проиграл сравнение.

use std::collections::HashMap;
use std::sync::Arc;
use futures::future::join_all;
use crate::config::ReaderSettings;
use crate::error::Result;
use crate::library::{LibraryRecord, ProgressStore, RemoteLibraryApi, RemoteSettings};

/// Объединить локальную и удаленную версии записи
pub fn merge(local: &LibraryRecord, remote: &LibraryRecord) -> LibraryRecord {
    let (winner, loser) = if remote.last_read > local.last_read {
        (remote, local)
    } else {
        (local, remote)
    };

    let name = if winner.name.is_empty() {
        loser.name.clone()
    } else {
        winner.name.clone()
    };

    LibraryRecord {
        id: local.id.clone(),
        name,
        read_pages: winner.read_pages.clone(),
        last_read: winner.last_read,
        content: winner.content.clone().or_else(|| loser.content.clone()),
        has_remote_copy: local.has_remote_copy || remote.has_remote_copy,
    }
}

/// Что нужно отправить удаленному сервису после слияния
#[derive(Debug)]
enum Push {
    Progress(LibraryRecord),
    Create(LibraryRecord),
}

/// Согласователь библиотеки
pub struct LibraryReconciler {
    store: Arc<dyn ProgressStore>,
    remote: Option<Arc<dyn RemoteLibraryApi>>,
}

impl LibraryReconciler {
    pub fn new(store: Arc<dyn ProgressStore>, remote: Option<Arc<dyn RemoteLibraryApi>>) -> Self {
        Self { store, remote }
    }

    /// Работа только с локальным хранилищем
    pub fn local_only(store: Arc<dyn ProgressStore>) -> Self {
        Self::new(store, None)
    }

    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    /// Согласовать библиотеку и вернуть записи от самых свежих к старым
    ///
    /// Недоступность удаленного сервиса не считается ошибкой: библиотека
    /// возвращается из локального хранилища. Ошибки хранилища передаются
    /// вызывающему.
    pub async fn sync(&self) -> Result<Vec<LibraryRecord>> {
        if let Some(remote) = &self.remote {
            match remote.list().await {
                Ok(records) => self.merge_remote(remote, records).await?,
                Err(e) => log::warn!("Remote library unavailable, using local copy: {}", e),
            }
        }

        let mut library = self.store.list_all().await?;
        library.sort_by(|a, b| b.last_read.cmp(&a.last_read).then_with(|| a.id.cmp(&b.id)));
        Ok(library)
    }

    async fn merge_remote(
        &self,
        remote: &Arc<dyn RemoteLibraryApi>,
        remote_records: Vec<LibraryRecord>,
    ) -> Result<()> {
        let mut local: HashMap<String, LibraryRecord> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        let mut pushes = Vec::new();
        let mut updated = 0usize;

        for remote_record in remote_records {
            match local.remove(&remote_record.id) {
                Some(local_record) => {
                    let merged = merge(&local_record, &remote_record);
                    if merged != local_record {
                        self.store.put(&merged).await?;
                        updated += 1;
                    }
                    if local_record.last_read > remote_record.last_read {
                        pushes.push(Push::Progress(merged));
                    }
                }
                None => {
                    self.store.put(&remote_record).await?;
                    updated += 1;
                }
            }
        }

        // Записи, которых нет у удаленного сервиса
        for (_, record) in local {
            pushes.push(Push::Create(record));
        }

        log::info!(
            "Library sync: {} local records updated, {} pushed to remote",
            updated,
            pushes.len()
        );

        let results = join_all(pushes.iter().map(|push| {
            let remote = remote.clone();
            async move {
                match push {
                    Push::Progress(record) => {
                        remote
                            .update_progress(&record.id, &record.read_pages, record.last_read)
                            .await
                    }
                    Push::Create(record) => remote.create(record).await,
                }
            }
        }))
        .await;

        for (push, result) in pushes.iter().zip(results) {
            if let Err(e) = result {
                let id = match push {
                    Push::Progress(record) | Push::Create(record) => &record.id,
                };
                log::warn!("Failed to push record {} to remote: {}", id, e);
            }
        }

        Ok(())
    }

    /// Удалить документ: локально обязательно, удаленно по возможности
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.delete(id).await {
                log::warn!("Remote delete of {} failed: {}", id, e);
            }
        }
        Ok(())
    }

    /// Применить удаленные настройки поверх локальных
    pub async fn resolve_settings(&self, local: &ReaderSettings) -> ReaderSettings {
        let Some(remote) = &self.remote else {
            return local.clone();
        };

        match remote.get_settings().await {
            Ok(Some(settings)) => overlay_settings(local, &settings),
            Ok(None) => local.clone(),
            Err(e) => {
                log::warn!("Remote settings unavailable, keeping local: {}", e);
                local.clone()
            }
        }
    }

    /// Отправить настройки; сбой только логируется
    pub async fn push_settings(&self, settings: &ReaderSettings) {
        let Some(remote) = &self.remote else {
            return;
        };
        let payload = RemoteSettings {
            adjust_speed: Some(settings.wpm),
            auto_advance: Some(settings.auto_advance),
            voice_uri: settings.voice.clone(),
            narration: Some(settings.narration),
        };
        if let Err(e) = remote.put_settings(&payload).await {
            log::warn!("Failed to push settings: {}", e);
        }
    }
}

/// Наложить присутствующие удаленные поля на локальные настройки
pub fn overlay_settings(local: &ReaderSettings, remote: &RemoteSettings) -> ReaderSettings {
    ReaderSettings {
        wpm: remote.adjust_speed.unwrap_or(local.wpm),
        narration: remote.narration.unwrap_or(local.narration),
        auto_advance: remote.auto_advance.unwrap_or(local.auto_advance),
        voice: remote.voice_uri.clone().or_else(|| local.voice.clone()),
    }
}
