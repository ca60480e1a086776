//! Основной файл библиотеки reader-sync
//!
//! Движок пословного чтения: курсор по словам страницы продвигается либо с
//! фиксированным темпом, либо вслед за внешним речевым движком. Навигатор
//! переключает страницы и ведет учет прочитанного, а согласователь
//! библиотеки объединяет локальный и удаленный прогресс.

pub mod config;
pub mod controller;
pub mod error;
pub mod library;
pub mod logging;
pub mod navigator;
pub mod notification;
pub mod pacing;
pub mod progress;
pub mod runtime;
pub mod schedule;
pub mod sequence;
pub mod speech;

pub use config::{ReaderConfig, ReaderSettings, TimingConfig};
pub use controller::{ControllerOutcome, PlaybackController, PlaybackMode, PlaybackState, PlaybackStatus};
pub use error::{ReaderError, Result};
pub use library::{
    merge, HttpLibraryApi, JsonFileProgressStore, LibraryReconciler, LibraryRecord,
    MemoryProgressStore, ProgressStore, RemoteLibraryApi, RemoteSettings,
};
pub use navigator::{NavDirection, PageNavigator, PageRecord, TextProvider};
pub use notification::{
    CallbackPlaybackObserver, ChannelPlaybackObserver, CompositePlaybackObserver,
    ConsolePlaybackObserver, MemoryPlaybackObserver,
};
pub use progress::{ObserverRegistry, PlaybackEvent, PlaybackObserver, ProgressInfo};
pub use runtime::{ReaderHandle, ReaderRuntime, ReaderSnapshot};
pub use schedule::{Clock, ManualClock, TokioClock};
pub use speech::{SpeechEngine, SpeechEvent, SpeechEventKind, SpeechEventSender, SpeechRequest, UtteranceId};
