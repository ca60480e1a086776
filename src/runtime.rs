//! Асинхронный цикл сеанса чтения
//!
//! Один сеанс живет в одной задаче `tokio`. Задача ждет команду, событие
//! речевого движка или срок отложенной задачи контроллера и обрабатывает их
//! по одному, поэтому у курсора всегда один писатель.

use std::time::Duration;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use crate::controller::PlaybackState;
use crate::error::{ReaderError, Result};
use crate::navigator::{NavDirection, PageNavigator};
use crate::progress::ProgressInfo;
use crate::speech::SpeechEvent;

const COMMAND_BUFFER: usize = 64;

/// Снимок состояния сеанса
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReaderSnapshot {
    pub state: PlaybackState,
    pub page: Option<u32>,
    pub page_count: u32,
    pub progress: ProgressInfo,
    pub wpm: u32,
    pub narration: bool,
    pub auto_advance: bool,
}

impl ReaderSnapshot {
    fn capture(navigator: &PageNavigator) -> Self {
        let controller = navigator.controller();
        Self {
            state: controller.state(),
            page: navigator.current_page(),
            page_count: navigator.page_count(),
            progress: controller.model().progress(),
            wpm: controller.config().wpm,
            narration: controller.config().narration,
            auto_advance: controller.config().auto_advance,
        }
    }
}

#[derive(Debug)]
enum ReaderCommand {
    Play,
    Pause,
    Toggle,
    Reset,
    SetSpeed(u32),
    SetNarration(bool),
    SetAutoAdvance(bool),
    ManualScroll,
    Goto {
        page: u32,
        auto_play: bool,
        reply: oneshot::Sender<Result<bool>>,
    },
    Navigate {
        direction: NavDirection,
        auto_play: bool,
        reply: oneshot::Sender<Result<bool>>,
    },
    Snapshot(oneshot::Sender<ReaderSnapshot>),
    Shutdown,
}

/// Запущенный сеанс чтения
pub struct ReaderRuntime {
    handle: ReaderHandle,
    task: JoinHandle<PageNavigator>,
}

impl ReaderRuntime {
    /// Запустить сеанс в отдельной задаче
    ///
    /// `speech_events` - приемник канала, отправитель которого передан
    /// речевому движку.
    pub fn spawn(
        navigator: PageNavigator,
        speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(navigator, rx, speech_events));
        Self {
            handle: ReaderHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> ReaderHandle {
        self.handle.clone()
    }

    /// Остановить сеанс и вернуть навигатор
    pub async fn join(self) -> Result<PageNavigator> {
        // Сеанс мог уже завершиться, если все дескрипторы закрыты
        let _ = self.handle.tx.send(ReaderCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| ReaderError::Other(format!("reader task failed: {}", e)))
    }
}

async fn run(
    mut navigator: PageNavigator,
    mut commands: mpsc::Receiver<ReaderCommand>,
    mut speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
) -> PageNavigator {
    let clock = navigator.controller().clock().clone();
    log::debug!("Reader session started");

    loop {
        let wait = navigator
            .controller()
            .next_deadline_ms()
            .map(|due| due.saturating_sub(clock.now_ms()));

        tokio::select! {
            command = commands.recv() => match command {
                Some(ReaderCommand::Shutdown) | None => break,
                Some(command) => apply(&mut navigator, command).await,
            },
            Some(event) = speech_events.recv() => {
                if let Err(e) = navigator.handle_speech_event(&event).await {
                    log::error!("Failed to handle speech event: {}", e);
                }
            }
            _ = sleep_for(wait) => {
                if let Err(e) = navigator.tick().await {
                    log::error!("Scheduled task failed: {}", e);
                }
            }
        }
    }

    navigator.controller_mut().pause();
    log::debug!("Reader session stopped");
    navigator
}

async fn sleep_for(wait: Option<u64>) {
    match wait {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending::<()>().await,
    }
}

async fn apply(navigator: &mut PageNavigator, command: ReaderCommand) {
    let result = match command {
        ReaderCommand::Play => navigator.controller_mut().play(),
        ReaderCommand::Pause => {
            navigator.controller_mut().pause();
            Ok(())
        }
        ReaderCommand::Toggle => navigator.controller_mut().toggle(),
        ReaderCommand::Reset => navigator.controller_mut().reset(),
        ReaderCommand::SetSpeed(wpm) => navigator.controller_mut().set_speed(wpm),
        ReaderCommand::SetNarration(on) => navigator.controller_mut().set_narration(on),
        ReaderCommand::SetAutoAdvance(on) => {
            navigator.controller_mut().set_auto_advance(on);
            Ok(())
        }
        ReaderCommand::ManualScroll => {
            navigator.controller_mut().note_manual_scroll();
            Ok(())
        }
        ReaderCommand::Goto { page, auto_play, reply } => {
            let _ = reply.send(navigator.goto(page, auto_play).await);
            Ok(())
        }
        ReaderCommand::Navigate { direction, auto_play, reply } => {
            let _ = reply.send(navigator.navigate(direction, auto_play).await);
            Ok(())
        }
        ReaderCommand::Snapshot(reply) => {
            let _ = reply.send(ReaderSnapshot::capture(navigator));
            Ok(())
        }
        ReaderCommand::Shutdown => Ok(()),
    };

    if let Err(e) = result {
        log::error!("Reader command failed: {}", e);
    }
}

/// Дескриптор для управления сеансом из других задач
#[derive(Debug, Clone)]
pub struct ReaderHandle {
    tx: mpsc::Sender<ReaderCommand>,
}

impl ReaderHandle {
    async fn send(&self, command: ReaderCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ReaderError::Other("reader session is closed".to_string()))
    }

    async fn request<T>(&self, command: ReaderCommand, rx: oneshot::Receiver<T>) -> Result<T> {
        self.send(command).await?;
        rx.await
            .map_err(|_| ReaderError::Other("reader session dropped the request".to_string()))
    }

    pub async fn play(&self) -> Result<()> {
        self.send(ReaderCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(ReaderCommand::Pause).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(ReaderCommand::Toggle).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(ReaderCommand::Reset).await
    }

    pub async fn set_speed(&self, wpm: u32) -> Result<()> {
        self.send(ReaderCommand::SetSpeed(wpm)).await
    }

    pub async fn set_narration(&self, on: bool) -> Result<()> {
        self.send(ReaderCommand::SetNarration(on)).await
    }

    pub async fn set_auto_advance(&self, on: bool) -> Result<()> {
        self.send(ReaderCommand::SetAutoAdvance(on)).await
    }

    pub async fn manual_scroll(&self) -> Result<()> {
        self.send(ReaderCommand::ManualScroll).await
    }

    pub async fn goto(&self, page: u32, auto_play: bool) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.request(ReaderCommand::Goto { page, auto_play, reply }, rx).await?
    }

    pub async fn next_page(&self, auto_play: bool) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        let command = ReaderCommand::Navigate { direction: NavDirection::Next, auto_play, reply };
        self.request(command, rx).await?
    }

    pub async fn previous_page(&self, auto_play: bool) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        let command = ReaderCommand::Navigate { direction: NavDirection::Previous, auto_play, reply };
        self.request(command, rx).await?
    }

    pub async fn snapshot(&self) -> Result<ReaderSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.request(ReaderCommand::Snapshot(reply), rx).await
    }

    /// Попросить сеанс завершиться
    pub async fn shutdown(&self) -> Result<()> {
        self.send(ReaderCommand::Shutdown).await
    }
}
