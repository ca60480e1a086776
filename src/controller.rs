//! Контроллер воспроизведения
//!
//! Конечный автомат `Idle -> Playing -> {Paused, Finished}`, владеющий
//! курсором. Контроллер выбирает активный драйвер (фиксированный темп или
//! синхронизация с речью) и держит не более одной отложенной задачи. Пока
//! состояние `Playing`, существует ровно одна незавершенная операция: либо
//! задача в слоте, либо высказывание у речевого движка.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::config::ReaderConfig;
use crate::error::Result;
use crate::pacing::{PacingScheduler, PacingStep};
use crate::progress::{ObserverRegistry, PlaybackEvent};
use crate::schedule::{Clock, TaskKind, TaskSlot};
use crate::sequence::WordSequenceModel;
use crate::speech::{SpeechEngine, SpeechEvent, SpeechOutcome, SpeechSyncDriver};

/// Активный драйвер
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Фиксированный темп
    Paced,
    /// Синхронизация с речевым движком
    Spoken,
}

/// Состояние воспроизведения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Finished,
}

/// Снимок состояния контроллера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub cursor: i64,
    pub mode: PlaybackMode,
    pub status: PlaybackStatus,
}

/// Что произошло при обработке таймера или события речи
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerOutcome {
    Idle,
    Advanced { index: usize },
    PageFinished,
    AutoAdvanceDue,
}

/// Контроллер воспроизведения одного сеанса чтения
pub struct PlaybackController {
    config: ReaderConfig,
    model: WordSequenceModel,
    status: PlaybackStatus,
    mode: PlaybackMode,
    slot: TaskSlot,
    pacing: PacingScheduler,
    speech: SpeechSyncDriver,
    engine: Box<dyn SpeechEngine>,
    observers: Arc<ObserverRegistry>,
    clock: Arc<dyn Clock>,
    last_manual_scroll: Option<u64>,
    /// Озвучивание отключено до конца сеанса после исчерпания повторов
    speech_suspended: bool,
}

impl PlaybackController {
    pub fn new(
        config: ReaderConfig,
        engine: Box<dyn SpeechEngine>,
        clock: Arc<dyn Clock>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("Reader configuration is inconsistent: {}", e);
        }
        let pacing = PacingScheduler::new(&config);
        Self {
            model: WordSequenceModel::new(observers.clone()),
            status: PlaybackStatus::Idle,
            mode: PlaybackMode::Paced,
            slot: TaskSlot::new(),
            pacing,
            speech: SpeechSyncDriver::new(),
            engine,
            observers,
            clock,
            last_manual_scroll: None,
            speech_suspended: false,
            config,
        }
    }

    /// Загрузить слова новой страницы; контроллер сбрасывается в `Idle`
    pub fn load_page(&mut self, words: Vec<String>) -> Result<()> {
        self.reset()?;
        self.model.load(words);
        self.observers.notify(PlaybackEvent::Progress(self.model.progress()));
        Ok(())
    }

    /// Запустить воспроизведение с текущей позиции
    pub fn play(&mut self) -> Result<()> {
        self.cancel_outstanding();

        if self.model.is_at_end() && self.model.cursor() != -1 {
            self.rewind()?;
        }

        self.mode = if self.config.narration && !self.speech_suspended {
            PlaybackMode::Spoken
        } else {
            PlaybackMode::Paced
        };
        self.set_status(PlaybackStatus::Playing);
        log::debug!("Playing from cursor {} in {:?} mode", self.model.cursor(), self.mode);

        match self.mode {
            PlaybackMode::Paced => {
                let delay = self.pacing.initial_delay(&self.model);
                self.slot.schedule(TaskKind::PacingTick, self.clock.now_ms(), delay);
            }
            PlaybackMode::Spoken => {
                let outcome = self
                    .speech
                    .start_next(&self.model, self.engine.as_mut(), &self.config)?;
                self.apply_speech_outcome(outcome)?;
            }
        }
        Ok(())
    }

    /// Приостановить: после возврата нет ни таймеров, ни высказываний
    pub fn pause(&mut self) {
        self.cancel_outstanding();
        if self.status == PlaybackStatus::Playing {
            self.set_status(PlaybackStatus::Paused);
        }
    }

    /// Переключить воспроизведение/паузу
    pub fn toggle(&mut self) -> Result<()> {
        if self.status == PlaybackStatus::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Изменить скорость; при воспроизведении активный драйвер перезапускается
    pub fn set_speed(&mut self, wpm: u32) -> Result<()> {
        let wpm = self.config.clamp_wpm(wpm);
        self.config.wpm = wpm;
        self.pacing = PacingScheduler::new(&self.config);
        log::debug!("Speed set to {} wpm", wpm);

        if self.status == PlaybackStatus::Playing {
            self.pause();
            self.play()?;
        }
        Ok(())
    }

    /// Включить или выключить озвучивание
    pub fn set_narration(&mut self, on: bool) -> Result<()> {
        self.config.narration = on;
        if on {
            self.speech_suspended = false;
        }

        if self.status == PlaybackStatus::Playing {
            // Драйвер меняется только через неявную паузу
            self.pause();
            self.play()?;
        } else if !on {
            self.speech.cancel(self.engine.as_mut());
        }
        Ok(())
    }

    pub fn set_auto_advance(&mut self, on: bool) {
        self.config.auto_advance = on;
        if !on && self.slot.peek().map(|t| t.kind) == Some(TaskKind::AutoAdvance) {
            self.slot.cancel();
        }
    }

    /// Сбросить курсор и подсветку
    pub fn reset(&mut self) -> Result<()> {
        self.pause();
        self.speech.clear_pending();
        self.rewind()?;
        self.set_status(PlaybackStatus::Idle);
        Ok(())
    }

    /// Пользователь прокрутил текст вручную
    pub fn note_manual_scroll(&mut self) {
        self.last_manual_scroll = Some(self.clock.now_ms());
    }

    /// Запланировать переход на следующую страницу после завершения текущей
    pub fn schedule_auto_advance(&mut self) {
        if self.status != PlaybackStatus::Finished {
            return;
        }
        let delay = self.config.timing.auto_advance_delay_ms;
        self.slot.schedule(TaskKind::AutoAdvance, self.clock.now_ms(), delay);
        log::debug!("Auto-advance scheduled in {} ms", delay);
    }

    /// Выполнить задачу, срок которой наступил
    pub fn tick(&mut self) -> Result<ControllerOutcome> {
        let Some(task) = self.slot.take_due(self.clock.now_ms()) else {
            return Ok(ControllerOutcome::Idle);
        };

        match task.kind {
            TaskKind::AutoAdvance => Ok(ControllerOutcome::AutoAdvanceDue),
            _ if self.status != PlaybackStatus::Playing => {
                log::debug!("Dropping {:?} task outside of playback", task.kind);
                Ok(ControllerOutcome::Idle)
            }
            TaskKind::PacingTick => match self.pacing.step(&mut self.model)? {
                PacingStep::Advanced { delay_ms } => {
                    self.slot.schedule(TaskKind::PacingTick, self.clock.now_ms(), delay_ms);
                    let index = self.model.cursor() as usize;
                    self.hint_scroll(index);
                    Ok(ControllerOutcome::Advanced { index })
                }
                PacingStep::PageFinished => {
                    self.finish_page();
                    Ok(ControllerOutcome::PageFinished)
                }
            },
            TaskKind::NextChunk => {
                let outcome = self
                    .speech
                    .start_next(&self.model, self.engine.as_mut(), &self.config)?;
                self.apply_speech_outcome(outcome)
            }
            TaskKind::RetryChunk => {
                let outcome = self.speech.retry(&self.model, self.engine.as_mut(), &self.config)?;
                self.apply_speech_outcome(outcome)
            }
        }
    }

    /// Обработать событие речевого движка
    pub fn handle_speech_event(&mut self, event: &SpeechEvent) -> Result<ControllerOutcome> {
        if self.status != PlaybackStatus::Playing || self.mode != PlaybackMode::Spoken {
            log::debug!("Ignoring speech event while {:?}", self.status);
            return Ok(ControllerOutcome::Idle);
        }
        let outcome = self.speech.handle_event(event, &mut self.model, &self.config)?;
        self.apply_speech_outcome(outcome)
    }

    fn apply_speech_outcome(&mut self, outcome: SpeechOutcome) -> Result<ControllerOutcome> {
        let now = self.clock.now_ms();
        match outcome {
            SpeechOutcome::Started(_) | SpeechOutcome::Ignored => Ok(ControllerOutcome::Idle),
            SpeechOutcome::Advanced { index } => {
                self.hint_scroll(index);
                Ok(ControllerOutcome::Advanced { index })
            }
            SpeechOutcome::ChunkFinished { gap_ms } => {
                self.slot.schedule(TaskKind::NextChunk, now, gap_ms);
                Ok(ControllerOutcome::Idle)
            }
            SpeechOutcome::RetryScheduled { delay_ms } => {
                self.slot.schedule(TaskKind::RetryChunk, now, delay_ms);
                Ok(ControllerOutcome::Idle)
            }
            SpeechOutcome::RetriesExhausted => {
                log::warn!("Speech engine keeps failing, continuing without narration");
                self.speech_suspended = true;
                self.mode = PlaybackMode::Paced;
                let delay = self.pacing.initial_delay(&self.model);
                self.slot.schedule(TaskKind::PacingTick, now, delay);
                Ok(ControllerOutcome::Idle)
            }
            SpeechOutcome::PageFinished => {
                self.finish_page();
                Ok(ControllerOutcome::PageFinished)
            }
        }
    }

    fn finish_page(&mut self) {
        self.cancel_outstanding();
        self.set_status(PlaybackStatus::Finished);
    }

    fn rewind(&mut self) -> Result<()> {
        self.model.advance_to(-1)?;
        self.observers.notify(PlaybackEvent::HighlightCleared);
        Ok(())
    }

    fn hint_scroll(&self, index: usize) {
        let now = self.clock.now_ms();
        let window = self.config.timing.scroll_suppression_ms;
        let suppressed = self
            .last_manual_scroll
            .map(|at| now.saturating_sub(at) <= window)
            .unwrap_or(false);
        if !suppressed {
            self.observers.notify(PlaybackEvent::ScrollHint { index });
        }
    }

    fn cancel_outstanding(&mut self) {
        self.slot.cancel();
        self.speech.cancel(self.engine.as_mut());
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status != status {
            self.status = status;
            self.observers.notify(PlaybackEvent::StatusChanged(status));
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            cursor: self.model.cursor(),
            mode: self.mode,
            status: self.status,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn cursor(&self) -> i64 {
        self.model.cursor()
    }

    pub fn model(&self) -> &WordSequenceModel {
        &self.model
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Срок ближайшей отложенной задачи (монотонные миллисекунды)
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.slot.peek().map(|task| task.due_ms)
    }

    /// Количество незавершенных операций: задача в слоте и высказывание у движка
    pub fn outstanding_operations(&self) -> usize {
        usize::from(self.slot.is_pending()) + usize::from(self.speech.is_speaking())
    }

    pub fn auto_advance_pending(&self) -> bool {
        self.slot.peek().map(|t| t.kind) == Some(TaskKind::AutoAdvance)
    }
}
