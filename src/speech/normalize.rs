//! Подготовка текста фрагмента к произнесению
//!
//! Нормализация меняет только строку для речевого движка, но не слова
//! страницы. Для каждого произносимого токена запоминается исходное слово,
//! чтобы смещение из события границы можно было вернуть на курсор.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STANDALONE_I: Regex = Regex::new(r"\bI\b").expect("pronoun pattern");
    static ref NUMBER_RANGE: Regex =
        Regex::new(r"\b([0-9]+)\s?-\s?([0-9]+)\b").expect("number range pattern");
    static ref HYPHEN_COMPOUND: Regex = Regex::new(r"(\w)-(\w)").expect("hyphen pattern");
}

/// Нормализовать одно слово
///
/// `I` -> `i`, `10-20` -> `10 to 20`, `well-known` -> `well known`.
pub fn normalize_word(word: &str) -> String {
    let text = STANDALONE_I.replace_all(word, "i");
    let mut text = NUMBER_RANGE.replace_all(&text, "${1} to ${2}").into_owned();

    // Соседние совпадения не пересекаются, поэтому повторяем до неподвижной точки
    loop {
        let next = HYPHEN_COMPOUND.replace_all(&text, "${1} ${2}").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Текст для речевого движка и отображение токенов на слова фрагмента
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenText {
    pub text: String,
    /// Для каждого токена текста - смещение исходного слова во фрагменте
    token_words: Vec<usize>,
}

impl SpokenText {
    /// Собрать произносимый текст из слов фрагмента
    pub fn build(words: &[String]) -> Self {
        let mut pieces: Vec<String> = Vec::with_capacity(words.len());
        let mut token_words = Vec::with_capacity(words.len());

        for (offset, word) in words.iter().enumerate() {
            let piece = if is_range_dash(words, offset) {
                "to".to_string()
            } else {
                normalize_word(word)
            };
            for _ in piece.split_whitespace() {
                token_words.push(offset);
            }
            pieces.push(piece);
        }

        Self {
            text: pieces.join(" "),
            token_words,
        }
    }

    /// Смещение слова во фрагменте для события границы на `char_index`
    ///
    /// Считается количество токенов до смещения; каждому токену соответствует
    /// исходное слово, поэтому разбиение `well-known` на два токена не
    /// сдвигает курсор.
    pub fn word_offset_at(&self, char_index: usize) -> usize {
        let byte_end = self
            .text
            .char_indices()
            .nth(char_index)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len());
        let prefix = self.text[..byte_end].trim();
        let tokens = if prefix.is_empty() {
            0
        } else {
            prefix.split_whitespace().count()
        };

        match self.token_words.get(tokens) {
            Some(offset) => *offset,
            None => self.token_words.last().copied().unwrap_or(0),
        }
    }

    pub fn token_count(&self) -> usize {
        self.token_words.len()
    }
}

/// Нормализовать произвольный текст так же, как фрагмент речи
pub fn normalize_text(text: &str) -> String {
    let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    SpokenText::build(&words).text
}

/// Отдельное тире между двумя числами (`10 - 20`)
fn is_range_dash(words: &[String], offset: usize) -> bool {
    if words[offset] != "-" || offset == 0 || offset + 1 >= words.len() {
        return false;
    }
    let before = words[offset - 1].chars().last().map(|c| c.is_ascii_digit()).unwrap_or(false);
    let after = words[offset + 1].chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false);
    before && after
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_pronoun_lowercased() {
        assert_eq!(normalize_word("I"), "i");
        assert_eq!(normalize_word("I,"), "i,");
        assert_eq!(normalize_word("It"), "It");
        assert_eq!(normalize_word("III"), "III");
    }

    #[test]
    fn test_number_ranges() {
        assert_eq!(normalize_word("10-20"), "10 to 20");
        assert_eq!(normalize_word("pages 5-9."), "pages 5 to 9.");
        assert_eq!(normalize_text("from 10 - 20 years"), "from 10 to 20 years");
    }

    #[test]
    fn test_hyphen_compounds_split() {
        assert_eq!(normalize_word("well-known"), "well known");
        assert_eq!(normalize_word("state-of-the-art"), "state of the art");
        assert_eq!(normalize_word("-dash"), "-dash");
    }

    #[test]
    fn test_source_words_untouched() {
        let chunk = words("I saw well-known 10-20 items.");
        let spoken = SpokenText::build(&chunk);
        assert_eq!(spoken.text, "i saw well known 10 to 20 items.");
        assert_eq!(chunk[0], "I");
        assert_eq!(chunk[2], "well-known");
    }

    #[test]
    fn test_offset_without_normalization_changes() {
        let spoken = SpokenText::build(&words("Hello there general Kenobi."));
        assert_eq!(spoken.word_offset_at(0), 0);
        assert_eq!(spoken.word_offset_at(6), 1);
        assert_eq!(spoken.word_offset_at(12), 2);
        assert_eq!(spoken.word_offset_at(20), 3);
    }

    #[test]
    fn test_offset_maps_split_tokens_back() {
        // "a well known fact" - "well-known" занимает два токена
        let spoken = SpokenText::build(&words("a well-known fact"));
        assert_eq!(spoken.token_count(), 4);
        assert_eq!(spoken.word_offset_at(2), 1);
        assert_eq!(spoken.word_offset_at(7), 1);
        assert_eq!(spoken.word_offset_at(13), 2);
        assert_eq!(spoken.word_offset_at(500), 2);
    }
}
