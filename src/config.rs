//! Модуль конфигурации библиотеки reader-sync
//!
//! Этот модуль содержит структуры для настройки темпа чтения, озвучивания
//! и автоматического перехода между страницами.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{ReaderError, Result};

/// Временные параметры движка (все значения в миллисекундах, если не указано иное)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Множитель задержки после слова, завершающего предложение (`. ! ?`)
    pub sentence_multiplier: f64,
    /// Множитель задержки после слова с `, ; :`
    pub clause_multiplier: f64,
    /// Максимальное количество слов в одном фрагменте речи
    pub max_chunk_words: usize,
    /// Пауза между фрагментами речи после конца предложения
    pub sentence_gap_ms: u64,
    /// Пауза между фрагментами речи в остальных случаях
    pub clause_gap_ms: u64,
    /// Задержка перед повтором фрагмента после ошибки речевого движка
    pub speech_retry_delay_ms: u64,
    /// Ограничение количества повторов подряд; `None` - без ограничения
    pub speech_retry_limit: Option<u32>,
    /// Задержка автоматического перехода на следующую страницу
    pub auto_advance_delay_ms: u64,
    /// Окно подавления автопрокрутки после ручной прокрутки
    pub scroll_suppression_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sentence_multiplier: 3.0,
            clause_multiplier: 1.5,
            max_chunk_words: 25,
            sentence_gap_ms: 600,
            clause_gap_ms: 200,
            speech_retry_delay_ms: 100,
            speech_retry_limit: None,
            auto_advance_delay_ms: 2_000,
            scroll_suppression_ms: 2_000,
        }
    }
}

/// Конфигурация сеанса чтения
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Скорость чтения в словах в минуту
    pub wpm: u32,
    /// Минимально допустимая скорость
    pub min_wpm: u32,
    /// Максимально допустимая скорость
    pub max_wpm: u32,
    /// Озвучивать текст речевым движком
    pub narration: bool,
    /// Переходить на следующую страницу после завершения текущей
    pub auto_advance: bool,
    /// Идентификатор голоса речевого движка
    pub voice: Option<String>,
    /// Высота голоса
    pub pitch: f32,
    /// Делитель для пересчета WPM в скорость речи (`wpm / rate_divisor`)
    pub rate_divisor: f32,
    /// Временные параметры
    pub timing: TimingConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            wpm: 180,
            min_wpm: 60,
            max_wpm: 1_000,
            narration: false,
            auto_advance: false,
            voice: None,
            pitch: 1.05,
            rate_divisor: 185.0,
            timing: TimingConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// Загрузить конфигурацию из строки JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфигурацию из файла JSON
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Проверить согласованность значений
    pub fn validate(&self) -> Result<()> {
        if self.min_wpm == 0 || self.min_wpm > self.max_wpm {
            return Err(ReaderError::Configuration(format!(
                "Invalid WPM bounds: {}..={}",
                self.min_wpm, self.max_wpm
            )));
        }
        if self.wpm < self.min_wpm || self.wpm > self.max_wpm {
            return Err(ReaderError::Configuration(format!(
                "WPM {} is outside {}..={}",
                self.wpm, self.min_wpm, self.max_wpm
            )));
        }
        if self.rate_divisor <= 0.0 {
            return Err(ReaderError::Configuration("rate_divisor must be positive".to_string()));
        }
        if self.timing.max_chunk_words == 0 {
            return Err(ReaderError::Configuration("max_chunk_words must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Ограничить скорость допустимым диапазоном
    ///
    /// При перепутанных границах побеждает `min_wpm`.
    pub fn clamp_wpm(&self, wpm: u32) -> u32 {
        wpm.min(self.max_wpm).max(self.min_wpm)
    }

    /// Скорость речи для речевого движка
    pub fn speech_rate(&self) -> f32 {
        self.wpm as f32 / self.rate_divisor
    }
}

/// Пользовательские настройки, синхронизируемые между устройствами
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderSettings {
    pub wpm: u32,
    pub narration: bool,
    pub auto_advance: bool,
    pub voice: Option<String>,
}

impl ReaderSettings {
    /// Снять пользовательские настройки с конфигурации
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            wpm: config.wpm,
            narration: config.narration,
            auto_advance: config.auto_advance,
            voice: config.voice.clone(),
        }
    }

    /// Применить настройки к конфигурации
    pub fn apply_to(&self, config: &mut ReaderConfig) {
        config.wpm = config.clamp_wpm(self.wpm);
        config.narration = self.narration;
        config.auto_advance = self.auto_advance;
        config.voice = self.voice.clone();
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self::from_config(&ReaderConfig::default())
    }
}
