//! Последовательность слов страницы и курсор чтения

use std::sync::Arc;
use crate::error::{ReaderError, Result};
use crate::progress::{ObserverRegistry, PlaybackEvent, ProgressInfo};

/// Неизменяемый список слов страницы и изменяемый курсор
///
/// Курсор всегда лежит в `[-1, len - 1]`; `-1` означает, что чтение не начато.
pub struct WordSequenceModel {
    words: Vec<String>,
    cursor: i64,
    observers: Arc<ObserverRegistry>,
}

impl WordSequenceModel {
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self {
            words: Vec::new(),
            cursor: -1,
            observers,
        }
    }

    /// Загрузить слова новой страницы и сбросить курсор
    pub fn load(&mut self, words: Vec<String>) {
        self.words = words;
        self.cursor = -1;
    }

    /// Переместить курсор и уведомить наблюдателей ровно один раз
    pub fn advance_to(&mut self, index: i64) -> Result<()> {
        if index < -1 || index > self.last_index() {
            log::error!(
                "Cursor target {} outside [-1, {}]",
                index,
                self.last_index()
            );
            return Err(ReaderError::OutOfRange {
                index,
                len: self.words.len(),
            });
        }

        self.cursor = index;
        if index >= 0 {
            let slot = index as usize;
            self.observers.notify(PlaybackEvent::WordAdvanced {
                index: slot,
                word: self.words[slot].clone(),
            });
        }
        self.observers.notify(PlaybackEvent::Progress(self.progress()));
        Ok(())
    }

    /// Слово под курсором
    pub fn current(&self) -> Option<&str> {
        self.word(self.cursor)
    }

    pub fn word(&self, index: i64) -> Option<&str> {
        if index < 0 {
            return None;
        }
        self.words.get(index as usize).map(String::as_str)
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Индекс последнего слова (`-1` для пустой страницы)
    pub fn last_index(&self) -> i64 {
        self.words.len() as i64 - 1
    }

    /// Курсор стоит на последнем слове
    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.last_index()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn progress(&self) -> ProgressInfo {
        ProgressInfo::from_cursor(self.cursor, self.words.len())
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }
}
