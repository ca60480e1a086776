//! Пример сеанса чтения
//!
//! Текст делится на страницы по пустым строкам. С флагом `--narrate`
//! страницы "озвучивает" имитация речевого движка, которая сообщает о
//! границах слов в темпе, соответствующем скорости речи.
//!
//! Запуск: `cargo run --example reader_demo -- [--narrate] [файл.txt]`

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use reader_sync::{
    logging, ConsolePlaybackObserver, JsonFileProgressStore, LibraryReconciler, LibraryRecord,
    ObserverRegistry, PageNavigator, PlaybackController, PlaybackStatus, ReaderConfig, ReaderRuntime,
    SpeechEngine, SpeechEventSender, SpeechRequest, TextProvider, TokioClock,
};

const SAMPLE: &str = "Dr. Smith arrived at the station at 10-11 in the morning. \
The well-known train was late, as usual; nobody seemed surprised.\n\n\
Then he left. I waited a little longer, and the platform emptied.";

/// Страницы, разделенные пустыми строками
struct ParagraphPages {
    pages: Vec<Vec<String>>,
}

impl ParagraphPages {
    fn new(text: &str) -> Self {
        let pages = text
            .split("\n\n")
            .map(|page| page.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|words| !words.is_empty())
            .collect();
        Self { pages }
    }
}

#[async_trait]
impl TextProvider for ParagraphPages {
    async fn extract(&self, _document_id: &str, page: u32) -> reader_sync::Result<Vec<String>> {
        self.pages
            .get(page as usize - 1)
            .cloned()
            .ok_or_else(|| reader_sync::ReaderError::Extraction(format!("no page {}", page)))
    }
}

/// Имитация речевого движка: 60 слов в минуту при скорости 1.0
struct SimulatedVoice {
    events: SpeechEventSender,
}

impl SpeechEngine for SimulatedVoice {
    fn speak(&mut self, request: SpeechRequest, cancel: CancellationToken) -> reader_sync::Result<()> {
        let events = self.events.clone();
        let per_word = Duration::from_millis((1_000.0 / request.rate.max(0.1)) as u64);
        tokio::spawn(async move {
            let mut previous_space = true;
            for (index, ch) in request.text.chars().enumerate() {
                let starts_word = !ch.is_whitespace() && previous_space;
                previous_space = ch.is_whitespace();
                if !starts_word {
                    continue;
                }
                events.boundary(request.utterance, index);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(per_word) => {}
                }
            }
            events.end(request.utterance);
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let narrate = args.iter().any(|arg| arg == "--narrate");
    let text = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => SAMPLE.to_string(),
    };

    let provider = Arc::new(ParagraphPages::new(&text));
    let page_count = provider.pages.len() as u32;
    anyhow::ensure!(page_count > 0, "nothing to read");

    let store = Arc::new(JsonFileProgressStore::open(std::env::temp_dir().join("reader-sync-demo")).await?);
    let library = LibraryReconciler::local_only(store.clone()).sync().await?;
    let document = library
        .into_iter()
        .find(|record| record.id == "demo")
        .unwrap_or_else(|| LibraryRecord::new("demo", "Demo text"));
    println!("Прочитано ранее: {:?}", document.read_pages);

    let config = ReaderConfig {
        wpm: 300,
        narration: narrate,
        auto_advance: true,
        ..ReaderConfig::default()
    };
    config.validate()?;

    let observers = Arc::new(ObserverRegistry::new());
    observers.add_observer(Box::new(ConsolePlaybackObserver::with_prefix("  ")));

    let (events, speech_rx) = SpeechEventSender::channel();
    let controller = PlaybackController::new(
        config,
        Box::new(SimulatedVoice { events }),
        Arc::new(TokioClock::new()),
        observers,
    );
    let navigator = PageNavigator::new(controller, provider, document, page_count).with_store(store);

    let runtime = ReaderRuntime::spawn(navigator, speech_rx);
    let handle = runtime.handle();
    handle.goto(1, true).await?;

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snapshot = handle.snapshot().await?;
        let last_page = snapshot.page == Some(snapshot.page_count);
        if snapshot.state.status == PlaybackStatus::Finished && last_page {
            break;
        }
    }

    let navigator = runtime.join().await?;
    println!("Страниц прочитано: {}", navigator.page_record().read_pages.len());
    Ok(())
}
