use std::sync::Arc;
use super::support::*;
use crate::config::ReaderConfig;
use crate::controller::{PlaybackController, PlaybackStatus};
use crate::error::ReaderError;
use crate::library::{LibraryRecord, MemoryProgressStore, ProgressStore};
use crate::navigator::{NavDirection, PageNavigator};
use crate::notification::MemoryPlaybackObserver;
use crate::progress::{ObserverRegistry, PlaybackEvent};
use crate::schedule::{Clock, ManualClock};

const START: i64 = 1_700_000_000_000;

struct Setup {
    navigator: PageNavigator,
    clock: Arc<ManualClock>,
    memory: MemoryPlaybackObserver,
    provider: Arc<FakeTextProvider>,
    store: Arc<MemoryProgressStore>,
    remote: Arc<FakeRemote>,
}

fn setup_with(config: ReaderConfig, provider: FakeTextProvider, page_count: u32, document: LibraryRecord) -> Setup {
    let clock = Arc::new(ManualClock::new());
    clock.set_wall_clock(START);
    let observers = Arc::new(ObserverRegistry::new());
    let memory = MemoryPlaybackObserver::new();
    observers.add_observer(Box::new(memory.clone()));
    let (engine, _probe) = ScriptedEngine::new();
    let controller = PlaybackController::new(config, Box::new(engine), clock.clone(), observers);

    let provider = Arc::new(provider);
    let store = Arc::new(MemoryProgressStore::new());
    let remote = Arc::new(FakeRemote::default());
    let navigator = PageNavigator::new(controller, provider.clone(), document, page_count)
        .with_store(store.clone())
        .with_remote(remote.clone());

    Setup { navigator, clock, memory, provider, store, remote }
}

fn setup(config: ReaderConfig, pages: &[&str]) -> Setup {
    setup_with(
        config,
        FakeTextProvider::with_pages(pages),
        pages.len() as u32,
        LibraryRecord::new("doc-1", "Document"),
    )
}

impl Setup {
    /// Прогнать таймеры, пока страница воспроизводится
    async fn read_to_end(&mut self) {
        while self.navigator.controller().status() == PlaybackStatus::Playing {
            let due = self.navigator.controller().next_deadline_ms().unwrap();
            self.clock.advance(due - self.clock.now_ms());
            self.navigator.tick().await.unwrap();
        }
    }

    async fn wait(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.navigator.tick().await.unwrap();
    }
}

async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_goto_outside_bounds_is_noop() {
    let mut s = setup(ReaderConfig::default(), &["One.", "Two."]);
    assert!(!s.navigator.goto(0, true).await.unwrap());
    assert!(!s.navigator.goto(3, true).await.unwrap());
    assert!(s.provider.requests().is_empty());
    assert_eq!(s.navigator.current_page(), None);
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Idle);
}

#[tokio::test]
async fn test_goto_loads_page_and_records_progress() {
    let mut s = setup(ReaderConfig::default(), &["First page.", "Second page here."]);
    assert!(s.navigator.goto(2, false).await.unwrap());

    assert_eq!(s.navigator.current_page(), Some(2));
    assert_eq!(s.navigator.controller().cursor(), -1);
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Idle);
    assert_eq!(s.navigator.controller().model().len(), 3);
    assert!(s
        .memory
        .history()
        .contains(&PlaybackEvent::PageLoaded { page: 2, total_pages: 2 }));

    let stored = s.store.get("doc-1").await.unwrap().unwrap();
    assert_eq!(stored.read_pages.iter().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(stored.last_read, START);
    assert_eq!(stored.content, Some(words("Second page here.")));
    assert_eq!(s.navigator.page_record().read_pages, stored.read_pages);

    settle().await;
    assert!(s.remote.calls().contains(&RemoteCall::UpdateProgress {
        id: "doc-1".into(),
        read_pages: [2].into_iter().collect(),
        last_read: START,
    }));
}

#[tokio::test]
async fn test_goto_with_auto_play_starts_playback() {
    let mut s = setup(ReaderConfig::default(), &["Go go go."]);
    assert!(s.navigator.goto(1, true).await.unwrap());
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Playing);

    s.read_to_end().await;
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Finished);
    assert!(s.memory.history().contains(&PlaybackEvent::PageFinished { page: 1 }));
    assert!(!s.navigator.controller().auto_advance_pending());
}

#[tokio::test]
async fn test_extraction_error_aborts_page_load() {
    let provider = FakeTextProvider::with_pages(&["Readable page.", "never shown"]).failing_on(2);
    let mut s = setup_with(ReaderConfig::default(), provider, 2, LibraryRecord::new("doc-1", "Doc"));

    s.navigator.goto(1, true).await.unwrap();
    s.wait(333).await;
    assert_eq!(s.navigator.controller().cursor(), 0);

    let err = s.navigator.goto(2, true).await.unwrap_err();
    assert!(matches!(err, ReaderError::Extraction(_)));
    assert_eq!(s.navigator.current_page(), Some(1));
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Paused);
    assert_eq!(s.navigator.controller().cursor(), 0);
    assert!(!s.navigator.page_record().read_pages.contains(&2));
}

#[tokio::test]
async fn test_storage_error_surfaces_but_playback_continues() {
    let clock = Arc::new(ManualClock::new());
    let observers = Arc::new(ObserverRegistry::new());
    let (engine, _probe) = ScriptedEngine::new();
    let controller = PlaybackController::new(ReaderConfig::default(), Box::new(engine), clock, observers);
    let mut navigator = PageNavigator::new(
        controller,
        Arc::new(FakeTextProvider::with_pages(&["Still readable."])),
        LibraryRecord::new("doc-1", "Doc"),
        1,
    )
    .with_store(Arc::new(BrokenStore));

    let err = navigator.goto(1, true).await.unwrap_err();
    assert!(err.is_storage());
    assert_eq!(navigator.current_page(), Some(1));
    assert_eq!(navigator.controller().status(), PlaybackStatus::Playing);
}

#[tokio::test]
async fn test_finished_page_auto_advances() {
    let config = ReaderConfig { auto_advance: true, ..ReaderConfig::default() };
    let mut s = setup(config, &["One two.", "Three."]);
    s.navigator.goto(1, true).await.unwrap();
    s.read_to_end().await;

    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Finished);
    assert!(s.navigator.controller().auto_advance_pending());

    s.wait(1_999).await;
    assert_eq!(s.navigator.current_page(), Some(1));
    s.wait(1).await;
    assert_eq!(s.navigator.current_page(), Some(2));
    assert_eq!(s.navigator.controller().status(), PlaybackStatus::Playing);

    // На последней странице переход не планируется
    s.read_to_end().await;
    assert!(!s.navigator.controller().auto_advance_pending());
    assert_eq!(
        s.navigator.page_record().read_pages.iter().copied().collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[tokio::test]
async fn test_pause_cancels_pending_auto_advance() {
    let config = ReaderConfig { auto_advance: true, ..ReaderConfig::default() };
    let mut s = setup(config, &["One.", "Two."]);
    s.navigator.goto(1, true).await.unwrap();
    s.read_to_end().await;
    assert!(s.navigator.controller().auto_advance_pending());

    s.navigator.controller_mut().pause();
    s.wait(10_000).await;
    assert_eq!(s.navigator.current_page(), Some(1));
    assert_eq!(s.provider.requests(), vec![1]);
}

#[tokio::test]
async fn test_finishing_page_touches_last_read() {
    let mut s = setup(ReaderConfig::default(), &["Short page."]);
    s.navigator.goto(1, true).await.unwrap();
    s.read_to_end().await;

    let stored = s.store.get("doc-1").await.unwrap().unwrap();
    assert!(stored.last_read > START);
    assert_eq!(stored.last_read, s.clock.wall_clock_ms());
}

#[tokio::test]
async fn test_navigate_between_pages() {
    let mut s = setup(ReaderConfig::default(), &["a", "b", "c"]);
    assert!(!s.navigator.can_go_back());
    assert!(s.navigator.can_go_forward());
    assert!(!s.navigator.navigate(NavDirection::Previous, false).await.unwrap());

    assert!(s.navigator.navigate(NavDirection::Next, false).await.unwrap());
    assert_eq!(s.navigator.current_page(), Some(1));
    s.navigator.navigate(NavDirection::Next, false).await.unwrap();
    s.navigator.navigate(NavDirection::Next, false).await.unwrap();
    assert_eq!(s.navigator.current_page(), Some(3));
    assert!(!s.navigator.can_go_forward());
    assert!(!s.navigator.navigate(NavDirection::Next, false).await.unwrap());

    s.navigator.navigate(NavDirection::Previous, false).await.unwrap();
    assert_eq!(s.navigator.current_page(), Some(2));
    assert!(s.navigator.can_go_back());
}

#[tokio::test]
async fn test_read_pages_stay_within_document() {
    let mut document = LibraryRecord::new("doc-1", "Doc");
    document.read_pages.extend([1, 7, 99]);
    let mut s = setup_with(ReaderConfig::default(), FakeTextProvider::with_pages(&["x", "y"]), 2, document);

    assert_eq!(s.navigator.document().read_pages.iter().copied().collect::<Vec<_>>(), vec![1]);
    s.navigator.goto(2, false).await.unwrap();
    let stored = s.store.get("doc-1").await.unwrap().unwrap();
    assert_eq!(stored.read_pages.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_offline_remote_does_not_block_navigation() {
    let clock = Arc::new(ManualClock::new());
    let observers = Arc::new(ObserverRegistry::new());
    let (engine, _probe) = ScriptedEngine::new();
    let controller = PlaybackController::new(ReaderConfig::default(), Box::new(engine), clock, observers);
    let remote = Arc::new(FakeRemote::offline());
    let mut navigator = PageNavigator::new(
        controller,
        Arc::new(FakeTextProvider::with_pages(&["Offline words."])),
        LibraryRecord::new("doc-1", "Doc"),
        1,
    )
    .with_remote(remote.clone());

    assert!(navigator.goto(1, false).await.unwrap());
    settle().await;
    assert_eq!(remote.calls().len(), 1);
}
