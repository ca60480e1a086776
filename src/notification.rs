//! Модуль для реализации системы уведомлений
//!
//! Этот модуль предоставляет конкретные реализации наблюдателей для
//! событий воспроизведения.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use crate::progress::{PlaybackEvent, PlaybackObserver};

/// Наблюдатель, выводящий события в консоль
pub struct ConsolePlaybackObserver {
    /// Префикс для вывода (опционально)
    prefix: Option<String>,
}

impl ConsolePlaybackObserver {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    fn render(&self, event: &PlaybackEvent) -> Option<String> {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let line = match event {
            PlaybackEvent::WordAdvanced { index, word } => format!("{}[{}] {}", prefix, index, word),
            PlaybackEvent::StatusChanged(status) => format!("{}[Статус] {:?}", prefix, status),
            PlaybackEvent::Progress(info) => format!("{}{} ({:.1}%)", prefix, info.label(), info.percent),
            PlaybackEvent::PageLoaded { page, total_pages } => {
                format!("{}[Страница] {} / {}", prefix, page, total_pages)
            }
            PlaybackEvent::PageFinished { page } => format!("{}[Страница {} завершена]", prefix, page),
            PlaybackEvent::ScrollHint { .. } | PlaybackEvent::HighlightCleared => return None,
        };
        Some(line)
    }
}

impl Default for ConsolePlaybackObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackObserver for ConsolePlaybackObserver {
    fn on_event(&self, event: &PlaybackEvent) {
        if let Some(line) = self.render(event) {
            println!("{}", line);
        }
    }
}

/// Наблюдатель, сохраняющий события в памяти
#[derive(Clone)]
pub struct MemoryPlaybackObserver {
    /// История событий
    history: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl MemoryPlaybackObserver {
    pub fn new() -> Self {
        Self {
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Получить историю событий
    pub fn history(&self) -> Vec<PlaybackEvent> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Индексы слов в порядке продвижения курсора
    pub fn advanced_indices(&self) -> Vec<usize> {
        self.history()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::WordAdvanced { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Индексы, для которых была выдана подсказка прокрутки
    pub fn scroll_hints(&self) -> Vec<usize> {
        self.history()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::ScrollHint { index } => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Очистить историю
    pub fn clear_history(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }
}

impl Default for MemoryPlaybackObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackObserver for MemoryPlaybackObserver {
    fn on_event(&self, event: &PlaybackEvent) {
        if let Ok(mut history) = self.history.lock() {
            history.push(event.clone());
        }
    }
}

/// Наблюдатель, отправляющий события через неограниченный канал
///
/// Отправка не блокирует цикл событий; порядок событий сохраняется.
pub struct ChannelPlaybackObserver {
    sender: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ChannelPlaybackObserver {
    pub fn new(sender: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self { sender }
    }

    /// Создать наблюдателя вместе с приемником событий
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl PlaybackObserver for ChannelPlaybackObserver {
    fn on_event(&self, event: &PlaybackEvent) {
        if self.sender.send(event.clone()).is_err() {
            log::debug!("Playback event receiver dropped");
        }
    }
}

/// Наблюдатель, вызывающий функцию обратного вызова
pub struct CallbackPlaybackObserver<F>
where
    F: Fn(&PlaybackEvent) + Send + Sync + 'static,
{
    callback: F,
}

impl<F> CallbackPlaybackObserver<F>
where
    F: Fn(&PlaybackEvent) + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> PlaybackObserver for CallbackPlaybackObserver<F>
where
    F: Fn(&PlaybackEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &PlaybackEvent) {
        (self.callback)(event);
    }
}

/// Комбинированный наблюдатель, объединяющий несколько наблюдателей
#[derive(Default)]
pub struct CompositePlaybackObserver {
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl CompositePlaybackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

impl PlaybackObserver for CompositePlaybackObserver {
    fn on_event(&self, event: &PlaybackEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PlaybackStatus;
    use crate::progress::ProgressInfo;

    #[test]
    fn test_console_observer_renders() {
        let observer = ConsolePlaybackObserver::with_prefix("[Test] ");
        let line = observer
            .render(&PlaybackEvent::Progress(ProgressInfo::from_cursor(1, 4)))
            .unwrap();
        assert_eq!(line, "[Test] Word 2 / 4 (50.0%)");
        assert!(observer.render(&PlaybackEvent::HighlightCleared).is_none());

        // Просто проверяем, что вывод не вызывает панику
        observer.on_event(&PlaybackEvent::StatusChanged(PlaybackStatus::Playing));
    }

    #[test]
    fn test_memory_observer() {
        let observer = MemoryPlaybackObserver::new();
        observer.on_event(&PlaybackEvent::WordAdvanced { index: 0, word: "Hello,".into() });
        observer.on_event(&PlaybackEvent::ScrollHint { index: 0 });
        observer.on_event(&PlaybackEvent::WordAdvanced { index: 1, word: "world.".into() });

        assert_eq!(observer.history().len(), 3);
        assert_eq!(observer.advanced_indices(), vec![0, 1]);
        assert_eq!(observer.scroll_hints(), vec![0]);

        observer.clear_history();
        assert!(observer.history().is_empty());
    }

    #[test]
    fn test_channel_observer_preserves_order() {
        let (observer, mut rx) = ChannelPlaybackObserver::channel();
        observer.on_event(&PlaybackEvent::PageLoaded { page: 1, total_pages: 3 });
        observer.on_event(&PlaybackEvent::PageFinished { page: 1 });

        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::PageLoaded { page: 1, total_pages: 3 });
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::PageFinished { page: 1 });
    }

    #[test]
    fn test_composite_observer() {
        let memory = MemoryPlaybackObserver::new();
        let counter = Arc::new(Mutex::new(0));
        let counter_clone = counter.clone();

        let mut composite = CompositePlaybackObserver::new();
        composite.add_observer(Box::new(memory.clone()));
        composite.add_observer(Box::new(CallbackPlaybackObserver::new(move |_| {
            *counter_clone.lock().unwrap() += 1;
        })));

        composite.on_event(&PlaybackEvent::HighlightCleared);

        // Проверяем, что оба наблюдателя получили уведомление
        assert_eq!(memory.history().len(), 1);
        assert_eq!(*counter.lock().unwrap(), 1);
    }
}
