//! Разбиение оставшихся слов на фрагменты-предложения

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ABBREVIATION: Regex =
        Regex::new(r"(?i)^(mr|ms|dr|st|prof|etc|vs)\.$").expect("abbreviation pattern");
}

/// Распространенное сокращение, после которого предложение не заканчивается
pub fn is_abbreviation(word: &str) -> bool {
    ABBREVIATION.is_match(word)
}

/// Слово завершает предложение
pub fn ends_sentence(word: &str) -> bool {
    matches!(word.chars().last(), Some('.' | '!' | '?'))
}

/// Фрагмент подряд идущих слов, произносимый одним высказыванием
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceChunk {
    /// Значение курсора на момент начала фрагмента
    pub base_index: i64,
    pub words: Vec<String>,
}

impl SentenceChunk {
    /// Индекс первого слова фрагмента в последовательности
    pub fn first_index(&self) -> i64 {
        self.base_index + 1
    }

    /// Индекс последнего слова фрагмента в последовательности
    pub fn last_index(&self) -> i64 {
        self.base_index + self.words.len() as i64
    }

    pub fn last_word(&self) -> Option<&str> {
        self.words.last().map(String::as_str)
    }

    /// Фрагмент закончился концом предложения
    pub fn ends_sentence(&self) -> bool {
        self.last_word().map(ends_sentence).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Следующий фрагмент начиная с `cursor + 1`
///
/// Слова набираются жадно; фрагмент обрезается после слова с `. ! ?`, если
/// это не сокращение, либо по достижении `max_words`. `None`, если слов
/// не осталось.
pub fn next_chunk(words: &[String], cursor: i64, max_words: usize) -> Option<SentenceChunk> {
    let start = (cursor + 1).max(0) as usize;
    if start >= words.len() {
        return None;
    }

    let limit = max_words.max(1);
    let mut chunk = Vec::new();
    for word in &words[start..] {
        chunk.push(word.clone());
        if ends_sentence(word) && !is_abbreviation(word) {
            break;
        }
        if chunk.len() >= limit {
            break;
        }
    }

    Some(SentenceChunk {
        base_index: start as i64 - 1,
        words: chunk,
    })
}
