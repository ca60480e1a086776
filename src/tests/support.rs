//! Общие заглушки для сценарных тестов

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use crate::config::ReaderConfig;
use crate::controller::{ControllerOutcome, PlaybackController};
use crate::error::{ReaderError, Result};
use crate::library::{LibraryRecord, ProgressStore, RemoteLibraryApi, RemoteSettings};
use crate::navigator::TextProvider;
use crate::notification::MemoryPlaybackObserver;
use crate::progress::ObserverRegistry;
use crate::schedule::{Clock, ManualClock};
use crate::speech::{SpeechEngine, SpeechEventSender, SpeechRequest, UtteranceId};

pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[derive(Default)]
struct EngineLog {
    requests: Vec<SpeechRequest>,
    tokens: Vec<CancellationToken>,
    cancels: usize,
    refuse: bool,
}

/// Доступ к тому, что видел речевой движок
#[derive(Clone, Default)]
pub struct EngineProbe {
    log: Arc<Mutex<EngineLog>>,
}

impl EngineProbe {
    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.log.lock().requests.clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.log.lock().requests.iter().map(|r| r.text.clone()).collect()
    }

    pub fn last_utterance(&self) -> UtteranceId {
        self.log.lock().requests.last().map(|r| r.utterance).expect("no utterance spoken")
    }

    pub fn last_token(&self) -> CancellationToken {
        self.log.lock().tokens.last().cloned().expect("no utterance spoken")
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().cancels
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.log.lock().refuse = refuse;
    }
}

/// Речевой движок для тестов
///
/// Без отправителя событий только записывает запросы. С отправителем сам
/// "произносит" текст: граница каждого слова через 100 мс, затем `End`.
pub struct ScriptedEngine {
    probe: EngineProbe,
    events: Option<SpeechEventSender>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (Self { probe: probe.clone(), events: None }, probe)
    }

    pub fn narrating(events: SpeechEventSender) -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (Self { probe: probe.clone(), events: Some(events) }, probe)
    }
}

/// Символьные смещения начала каждого слова
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous_space = true;
    for (index, ch) in text.chars().enumerate() {
        if !ch.is_whitespace() && previous_space {
            starts.push(index);
        }
        previous_space = ch.is_whitespace();
    }
    starts
}

impl SpeechEngine for ScriptedEngine {
    fn speak(&mut self, request: SpeechRequest, cancel: CancellationToken) -> Result<()> {
        let mut seen = self.probe.log.lock();
        if seen.refuse {
            return Err(ReaderError::Speech("engine refused".into()));
        }

        if let Some(events) = self.events.clone() {
            let utterance = request.utterance;
            let starts = word_starts(&request.text);
            let token = cancel.clone();
            tokio::spawn(async move {
                for char_index in starts {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                    }
                    events.boundary(utterance, char_index);
                }
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_millis(100)) => events.end(utterance),
                }
            });
        }

        seen.requests.push(request);
        seen.tokens.push(cancel);
        Ok(())
    }

    fn cancel(&mut self) {
        self.probe.log.lock().cancels += 1;
    }
}

/// Контроллер на ручных часах
pub struct Harness {
    pub controller: PlaybackController,
    pub clock: Arc<ManualClock>,
    pub memory: MemoryPlaybackObserver,
    pub probe: EngineProbe,
}

impl Harness {
    pub fn new(config: ReaderConfig, text: &str) -> Self {
        let clock = Arc::new(ManualClock::new());
        let observers = Arc::new(ObserverRegistry::new());
        let memory = MemoryPlaybackObserver::new();
        observers.add_observer(Box::new(memory.clone()));
        let (engine, probe) = ScriptedEngine::new();

        let mut controller = PlaybackController::new(config, Box::new(engine), clock.clone(), observers);
        controller.load_page(words(text)).unwrap();
        Self { controller, clock, memory, probe }
    }

    pub fn narrated(text: &str) -> Self {
        Self::new(ReaderConfig { narration: true, ..ReaderConfig::default() }, text)
    }

    pub fn clock_now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Сдвинуть часы и выполнить задачу, если ее срок наступил
    pub fn advance(&mut self, ms: u64) -> ControllerOutcome {
        self.clock.advance(ms);
        self.controller.tick().unwrap()
    }
}

/// Поставщик текста из заранее заданных страниц
#[derive(Default)]
pub struct FakeTextProvider {
    pages: HashMap<u32, Vec<String>>,
    failing: HashSet<u32>,
    requests: Mutex<Vec<u32>>,
}

impl FakeTextProvider {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, text)| (i as u32 + 1, words(text)))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextProvider for FakeTextProvider {
    async fn extract(&self, _document_id: &str, page: u32) -> Result<Vec<String>> {
        self.requests.lock().push(page);
        if self.failing.contains(&page) {
            return Err(ReaderError::Extraction(format!("page {} is unreadable", page)));
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

/// Хранилище, которое всегда отказывает
pub struct BrokenStore;

#[async_trait]
impl ProgressStore for BrokenStore {
    async fn get(&self, _id: &str) -> Result<Option<LibraryRecord>> {
        Err(ReaderError::Storage("disk full".into()))
    }

    async fn put(&self, _record: &LibraryRecord) -> Result<()> {
        Err(ReaderError::Storage("disk full".into()))
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        Err(ReaderError::Storage("disk full".into()))
    }

    async fn list_all(&self) -> Result<Vec<LibraryRecord>> {
        Err(ReaderError::Storage("disk full".into()))
    }
}

/// Вызовы, полученные удаленным сервисом
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Create(String),
    UpdateProgress { id: String, read_pages: BTreeSet<u32>, last_read: i64 },
    Delete(String),
    GetSettings,
    PutSettings,
}

/// Удаленный сервис в памяти
#[derive(Default)]
pub struct FakeRemote {
    records: Mutex<HashMap<String, LibraryRecord>>,
    settings: Mutex<Option<RemoteSettings>>,
    calls: Mutex<Vec<RemoteCall>>,
    offline: Mutex<bool>,
}

impl FakeRemote {
    pub fn with_records(records: impl IntoIterator<Item = LibraryRecord>) -> Self {
        let remote = Self::default();
        remote
            .records
            .lock()
            .extend(records.into_iter().map(|r| (r.id.clone(), r)));
        remote
    }

    pub fn offline() -> Self {
        let remote = Self::default();
        *remote.offline.lock() = true;
        remote
    }

    pub fn set_settings(&self, settings: RemoteSettings) {
        *self.settings.lock() = Some(settings);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub fn record(&self, id: &str) -> Option<LibraryRecord> {
        self.records.lock().get(id).cloned()
    }

    fn call(&self, call: RemoteCall) -> Result<()> {
        self.calls.lock().push(call);
        if *self.offline.lock() {
            return Err(ReaderError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteLibraryApi for FakeRemote {
    async fn list(&self) -> Result<Vec<LibraryRecord>> {
        self.call(RemoteCall::List)?;
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn create(&self, record: &LibraryRecord) -> Result<()> {
        self.call(RemoteCall::Create(record.id.clone()))?;
        self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_progress(&self, id: &str, read_pages: &BTreeSet<u32>, last_read: i64) -> Result<()> {
        self.call(RemoteCall::UpdateProgress {
            id: id.to_string(),
            read_pages: read_pages.clone(),
            last_read,
        })?;
        if let Some(record) = self.records.lock().get_mut(id) {
            record.read_pages = read_pages.clone();
            record.last_read = last_read;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.call(RemoteCall::Delete(id.to_string()))?;
        self.records.lock().remove(id);
        Ok(())
    }

    async fn get_settings(&self) -> Result<Option<RemoteSettings>> {
        self.call(RemoteCall::GetSettings)?;
        Ok(self.settings.lock().clone())
    }

    async fn put_settings(&self, settings: &RemoteSettings) -> Result<()> {
        self.call(RemoteCall::PutSettings)?;
        *self.settings.lock() = Some(settings.clone());
        Ok(())
    }
}
