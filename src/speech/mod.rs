//! Модуль для работы с речевым движком
//!
//! Этот модуль описывает контракт внешнего речевого движка, разбиение
//! оставшихся слов на фрагменты-предложения, подготовку текста к
//! произнесению и сопоставление прогресса речи с курсором.

pub mod chunker;
pub mod normalize;
pub mod sync;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use crate::error::Result;

pub use chunker::SentenceChunk;
pub use normalize::SpokenText;
pub use sync::{SpeechOutcome, SpeechSyncDriver};

/// Идентификатор высказывания, переданного движку
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

/// Запрос на произнесение фрагмента
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub utterance: UtteranceId,
    /// Нормализованный текст для произнесения
    pub text: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

/// Вид события речевого движка
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    /// Движок дошел до границы слова; смещение в символах от начала текста
    Boundary { char_index: usize },
    /// Высказывание произнесено полностью
    End,
    /// Сбой движка во время произнесения
    Error { reason: String },
}

/// Событие речевого движка, привязанное к высказыванию
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn boundary(utterance: UtteranceId, char_index: usize) -> Self {
        Self { utterance, kind: SpeechEventKind::Boundary { char_index } }
    }

    pub fn end(utterance: UtteranceId) -> Self {
        Self { utterance, kind: SpeechEventKind::End }
    }

    pub fn error(utterance: UtteranceId, reason: impl Into<String>) -> Self {
        Self { utterance, kind: SpeechEventKind::Error { reason: reason.into() } }
    }
}

/// Внешний речевой движок
///
/// События (`Boundary`, `End`, `Error`) доставляются асинхронно через
/// [`SpeechEventSender`]. После `cancel()` или отмены токена движок не должен
/// присылать события для отмененного высказывания; запоздавшие события
/// контроллер все равно отбрасывает по идентификатору.
pub trait SpeechEngine: Send {
    /// Начать произнесение; ошибка означает, что движок отказал сразу
    fn speak(&mut self, request: SpeechRequest, cancel: CancellationToken) -> Result<()>;

    /// Синхронно остановить текущее высказывание
    fn cancel(&mut self);
}

/// Канал, по которому движок сообщает о ходе произнесения
#[derive(Debug, Clone)]
pub struct SpeechEventSender {
    tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl SpeechEventSender {
    pub fn new(tx: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: SpeechEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Speech event dropped: reader session is gone");
        }
    }

    pub fn boundary(&self, utterance: UtteranceId, char_index: usize) {
        self.send(SpeechEvent::boundary(utterance, char_index));
    }

    pub fn end(&self, utterance: UtteranceId) {
        self.send(SpeechEvent::end(utterance));
    }

    pub fn error(&self, utterance: UtteranceId, reason: impl Into<String>) {
        self.send(SpeechEvent::error(utterance, reason));
    }
}
