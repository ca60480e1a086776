//! Синхронизация курсора с речевым движком
//!
//! Драйвер отдает движку по одному фрагменту, переводит события границ
//! слов в позиции курсора и решает, что делать после конца фрагмента или
//! ошибки движка. Планирование пауз остается за контроллером.

use tokio_util::sync::CancellationToken;
use crate::config::ReaderConfig;
use crate::error::Result;
use crate::sequence::WordSequenceModel;
use crate::speech::chunker::{next_chunk, SentenceChunk};
use crate::speech::normalize::SpokenText;
use crate::speech::{SpeechEngine, SpeechEvent, SpeechEventKind, SpeechRequest, UtteranceId};

/// Результат действия драйвера речи
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Фрагмент передан движку
    Started(UtteranceId),
    /// Курсор сдвинут на слово `index`
    Advanced { index: usize },
    /// Фрагмент произнесен; следующий начать через `gap_ms`
    ChunkFinished { gap_ms: u64 },
    /// Страница дочитана
    PageFinished,
    /// Движок отказал; повторить тот же фрагмент через `delay_ms`
    RetryScheduled { delay_ms: u64 },
    /// Исчерпан лимит повторов
    RetriesExhausted,
    /// Устаревшее или не меняющее курсор событие
    Ignored,
}

/// Высказывание, находящееся у движка
#[derive(Debug)]
struct InFlight {
    utterance: UtteranceId,
    chunk: SentenceChunk,
    spoken: SpokenText,
    token: CancellationToken,
}

/// Драйвер синхронизации речи
#[derive(Debug, Default)]
pub struct SpeechSyncDriver {
    next_utterance: u64,
    in_flight: Option<InFlight>,
    /// Фрагмент, который нужно повторить после ошибки
    failed_chunk: Option<SentenceChunk>,
    consecutive_failures: u32,
}

impl SpeechSyncDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Есть ли высказывание у движка
    pub fn is_speaking(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.in_flight.as_ref().map(|f| f.utterance)
    }

    /// Начать следующий фрагмент от текущего курсора
    pub fn start_next(
        &mut self,
        model: &WordSequenceModel,
        engine: &mut dyn SpeechEngine,
        config: &ReaderConfig,
    ) -> Result<SpeechOutcome> {
        self.failed_chunk = None;
        match next_chunk(model.words(), model.cursor(), config.timing.max_chunk_words) {
            Some(chunk) => self.speak(chunk, engine, config),
            None => Ok(SpeechOutcome::PageFinished),
        }
    }

    /// Повторить фрагмент, на котором движок дал сбой
    pub fn retry(
        &mut self,
        model: &WordSequenceModel,
        engine: &mut dyn SpeechEngine,
        config: &ReaderConfig,
    ) -> Result<SpeechOutcome> {
        match self.failed_chunk.take() {
            Some(chunk) => {
                log::debug!(
                    "Retrying chunk {}..={} (attempt {})",
                    chunk.first_index(),
                    chunk.last_index(),
                    self.consecutive_failures + 1
                );
                self.speak(chunk, engine, config)
            }
            None => self.start_next(model, engine, config),
        }
    }

    fn speak(
        &mut self,
        chunk: SentenceChunk,
        engine: &mut dyn SpeechEngine,
        config: &ReaderConfig,
    ) -> Result<SpeechOutcome> {
        // Перед новым высказыванием движок не должен ничего произносить
        self.cancel(engine);

        self.next_utterance += 1;
        let utterance = UtteranceId(self.next_utterance);
        let spoken = SpokenText::build(&chunk.words);
        let token = CancellationToken::new();
        let request = SpeechRequest {
            utterance,
            text: spoken.text.clone(),
            voice: config.voice.clone(),
            rate: config.speech_rate(),
            pitch: config.pitch,
        };

        match engine.speak(request, token.clone()) {
            Ok(()) => {
                log::trace!("Utterance {:?} covers {} words", utterance, chunk.len());
                self.in_flight = Some(InFlight { utterance, chunk, spoken, token });
                Ok(SpeechOutcome::Started(utterance))
            }
            Err(e) => {
                log::warn!("Speech engine refused utterance {:?}: {}", utterance, e);
                Ok(self.register_failure(chunk, config))
            }
        }
    }

    /// Обработать событие движка
    pub fn handle_event(
        &mut self,
        event: &SpeechEvent,
        model: &mut WordSequenceModel,
        config: &ReaderConfig,
    ) -> Result<SpeechOutcome> {
        let matches = self
            .in_flight
            .as_ref()
            .map(|f| f.utterance == event.utterance)
            .unwrap_or(false);
        if !matches {
            log::debug!("Ignoring stale speech event for {:?}", event.utterance);
            return Ok(SpeechOutcome::Ignored);
        }

        match &event.kind {
            SpeechEventKind::Boundary { char_index } => self.on_boundary(*char_index, model),
            SpeechEventKind::End => self.on_end(model, config),
            SpeechEventKind::Error { reason } => {
                log::warn!("Speech engine error on {:?}: {}", event.utterance, reason);
                match self.in_flight.take() {
                    Some(flight) => Ok(self.register_failure(flight.chunk, config)),
                    None => Ok(SpeechOutcome::Ignored),
                }
            }
        }
    }

    fn on_boundary(&mut self, char_index: usize, model: &mut WordSequenceModel) -> Result<SpeechOutcome> {
        let Some(flight) = self.in_flight.as_ref() else {
            return Ok(SpeechOutcome::Ignored);
        };

        let offset = flight.spoken.word_offset_at(char_index) as i64;
        let target = (flight.chunk.base_index + 1 + offset).min(flight.chunk.last_index());

        // Курсор не откатывается назад (повтор фрагмента после ошибки)
        if target <= model.cursor() {
            return Ok(SpeechOutcome::Ignored);
        }

        model.advance_to(target)?;
        Ok(SpeechOutcome::Advanced { index: target as usize })
    }

    fn on_end(&mut self, model: &mut WordSequenceModel, config: &ReaderConfig) -> Result<SpeechOutcome> {
        let Some(flight) = self.in_flight.take() else {
            return Ok(SpeechOutcome::Ignored);
        };
        self.consecutive_failures = 0;

        // Движки без событий границ: фрагмент произнесен целиком
        if model.cursor() < flight.chunk.last_index() {
            model.advance_to(flight.chunk.last_index())?;
        }

        if model.is_at_end() {
            return Ok(SpeechOutcome::PageFinished);
        }

        let gap_ms = if flight.chunk.ends_sentence() {
            config.timing.sentence_gap_ms
        } else {
            config.timing.clause_gap_ms
        };
        Ok(SpeechOutcome::ChunkFinished { gap_ms })
    }

    fn register_failure(&mut self, chunk: SentenceChunk, config: &ReaderConfig) -> SpeechOutcome {
        self.consecutive_failures += 1;
        if let Some(limit) = config.timing.speech_retry_limit {
            if self.consecutive_failures > limit {
                self.consecutive_failures = 0;
                self.failed_chunk = None;
                return SpeechOutcome::RetriesExhausted;
            }
        }
        self.failed_chunk = Some(chunk);
        SpeechOutcome::RetryScheduled {
            delay_ms: config.timing.speech_retry_delay_ms,
        }
    }

    /// Отменить текущее высказывание и остановить движок
    pub fn cancel(&mut self, engine: &mut dyn SpeechEngine) {
        if let Some(flight) = self.in_flight.take() {
            flight.token.cancel();
            log::trace!("Cancelled utterance {:?}", flight.utterance);
        }
        engine.cancel();
    }

    /// Забыть ожидающий повтор (пауза, сброс, новая страница)
    pub fn clear_pending(&mut self) {
        self.failed_chunk = None;
        self.consecutive_failures = 0;
    }
}
