//! Фиксированный темп чтения с учетом пунктуации
//!
//! Базовый интервал равен `60000 / wpm` мс. Слово, завершающее предложение,
//! удерживается втрое дольше, слово с запятой, точкой с запятой или
//! двоеточием - в полтора раза дольше.

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::sequence::WordSequenceModel;

/// Вид завершающей пунктуации слова
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    /// `. ! ?`
    Sentence,
    /// `, ; :`
    Clause,
    None,
}

impl Punctuation {
    pub fn of(word: &str) -> Self {
        match word.chars().last() {
            Some('.' | '!' | '?') => Self::Sentence,
            Some(',' | ';' | ':') => Self::Clause,
            _ => Self::None,
        }
    }
}

/// Результат одного шага
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingStep {
    /// Курсор сдвинут на одно слово; следующий шаг через `delay_ms`
    Advanced { delay_ms: u64 },
    /// Последнее слово уже показано
    PageFinished,
}

/// Планировщик фиксированного темпа
#[derive(Debug, Clone, PartialEq)]
pub struct PacingScheduler {
    wpm: u32,
    sentence_multiplier: f64,
    clause_multiplier: f64,
}

impl PacingScheduler {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            wpm: config.wpm.max(1),
            sentence_multiplier: config.timing.sentence_multiplier,
            clause_multiplier: config.timing.clause_multiplier,
        }
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    /// Базовый интервал в миллисекундах
    pub fn base_interval_ms(&self) -> f64 {
        60_000.0 / self.wpm as f64
    }

    pub fn multiplier(&self, word: Option<&str>) -> f64 {
        match word.map(Punctuation::of) {
            Some(Punctuation::Sentence) => self.sentence_multiplier,
            Some(Punctuation::Clause) => self.clause_multiplier,
            _ => 1.0,
        }
    }

    /// Сколько держать на экране слово `word` до следующего шага
    pub fn delay_after(&self, word: Option<&str>) -> u64 {
        (self.base_interval_ms() * self.multiplier(word)).round() as u64
    }

    /// Задержка до первого шага при запуске с текущей позиции
    pub fn initial_delay(&self, model: &WordSequenceModel) -> u64 {
        self.delay_after(model.current())
    }

    /// Выполнить шаг: сдвинуть курсор или сообщить о конце страницы
    pub fn step(&self, model: &mut WordSequenceModel) -> Result<PacingStep> {
        if model.is_at_end() {
            return Ok(PacingStep::PageFinished);
        }
        model.advance_to(model.cursor() + 1)?;
        Ok(PacingStep::Advanced {
            delay_ms: self.delay_after(model.current()),
        })
    }
}
