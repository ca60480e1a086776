//! Модуль обработки ошибок библиотеки reader-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе
//! движка воспроизведения и синхронизации библиотеки.

use thiserror::Error;

/// Ошибки библиотеки reader-sync
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Текст страницы недоступен
    #[error("Text extraction error: {0}")]
    Extraction(String),

    /// Сбой речевого движка во время произнесения
    #[error("Speech engine error: {0}")]
    Speech(String),

    /// Недопустимая позиция курсора
    #[error("Cursor index {index} is out of range for {len} words")]
    OutOfRange {
        /// Запрошенный индекс
        index: i64,
        /// Количество слов на странице
        len: usize,
    },

    /// Ошибка локального хранилища прогресса
    #[error("Storage error: {0}")]
    Storage(String),

    /// Ошибка удаленного API или сети
    #[error("Network error: {0}")]
    Network(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl ReaderError {
    /// Ошибка сети: поглощается на границе, работаем с локальным состоянием
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Ошибка хранилища: передается вызывающему, воспроизведение продолжается
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

impl From<reqwest::Error> for ReaderError {
    fn from(e: reqwest::Error) -> Self {
        ReaderError::Network(e.to_string())
    }
}

impl From<&str> for ReaderError {
    fn from(s: &str) -> Self {
        ReaderError::Other(s.to_string())
    }
}

impl From<String> for ReaderError {
    fn from(s: String) -> Self {
        ReaderError::Other(s)
    }
}

/// Тип Result для библиотеки reader-sync
pub type Result<T> = std::result::Result<T, ReaderError>;
