//! Модуль уведомлений о ходе чтения
//!
//! Этот модуль предоставляет реализацию паттерна Observer: контроллер и
//! навигатор сообщают о продвижении курсора, смене состояния и подсказках
//! прокрутки, а отрисовка остается заботой наблюдателя.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use crate::controller::PlaybackStatus;

/// Информация о прогрессе чтения страницы
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Номер текущего слова, начиная с 1 (0 - чтение не начато)
    pub current: usize,
    /// Количество слов на странице
    pub total: usize,
    /// Процент прочитанного (0.0 - 100.0)
    pub percent: f32,
}

impl ProgressInfo {
    /// Создает прогресс по значению курсора
    pub fn from_cursor(cursor: i64, total: usize) -> Self {
        let current = (cursor + 1).max(0) as usize;
        let percent = if total == 0 {
            0.0
        } else {
            (current as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
        };
        Self { current, total, percent }
    }

    /// Текстовая метка вида `Word 3 / 120`
    pub fn label(&self) -> String {
        format!("Word {} / {}", self.current, self.total)
    }
}

/// Событие для интерфейса
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Курсор перешел на слово
    WordAdvanced { index: usize, word: String },
    /// Изменилось состояние воспроизведения
    StatusChanged(PlaybackStatus),
    /// Подсказка прокрутить к слову
    ScrollHint { index: usize },
    /// Обновился прогресс страницы
    Progress(ProgressInfo),
    /// Подсветка слов сброшена
    HighlightCleared,
    /// Загружена страница
    PageLoaded { page: u32, total_pages: u32 },
    /// Страница дочитана до конца
    PageFinished { page: u32 },
}

/// Трейт для наблюдателя, получающего события воспроизведения
pub trait PlaybackObserver: Send + Sync {
    /// Метод, вызываемый при каждом событии
    fn on_event(&self, event: &PlaybackEvent);
}

/// Реестр наблюдателей
///
/// Наблюдатели уведомляются в порядке регистрации.
pub struct ObserverRegistry {
    /// Список наблюдателей
    observers: RwLock<BTreeMap<usize, Box<dyn PlaybackObserver>>>,
    /// Счетчик для генерации уникальных идентификаторов наблюдателей
    next_id: AtomicUsize,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(BTreeMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Добавить наблюдателя
    ///
    /// Возвращает уникальный идентификатор наблюдателя, который можно
    /// использовать для его удаления в будущем.
    pub fn add_observer(&self, observer: Box<dyn PlaybackObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, observer);
        id
    }

    /// Удалить наблюдателя по идентификатору
    pub fn remove_observer(&self, id: usize) -> Option<Box<dyn PlaybackObserver>> {
        self.observers.write().remove(&id)
    }

    /// Уведомить всех наблюдателей
    pub fn notify(&self, event: PlaybackEvent) {
        let observers = self.observers.read();
        for observer in observers.values() {
            observer.on_event(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
