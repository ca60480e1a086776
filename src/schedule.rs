//! Планирование отложенных задач
//!
//! Вместо цепочек таймеров контроллер хранит не более одной отложенной задачи
//! и заменяет ее атомарно при каждом переходе. Время берется из внедряемых
//! часов, поэтому конечный автомат можно прогонять детерминированно.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Источник времени для движка
pub trait Clock: Send + Sync {
    /// Монотонное время в миллисекундах
    fn now_ms(&self) -> u64;

    /// Время по стенным часам (миллисекунды эпохи Unix) для `lastRead`
    fn wall_clock_ms(&self) -> i64;
}

/// Часы, которыми управляет вызывающий код (тесты и внешние циклы событий)
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    wall: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сдвинуть оба источника времени вперед
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
        self.wall.fetch_add(ms as i64, Ordering::SeqCst);
    }

    pub fn set_wall_clock(&self, epoch_ms: i64) {
        self.wall.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn wall_clock_ms(&self) -> i64 {
        self.wall.load(Ordering::SeqCst)
    }
}

/// Часы на основе `tokio::time`, совместимые с приостановленным временем в тестах
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall_clock_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Вид отложенной задачи
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Следующий шаг фиксированного темпа
    PacingTick,
    /// Следующий фрагмент речи после паузы между предложениями
    NextChunk,
    /// Повтор фрагмента после ошибки речевого движка
    RetryChunk,
    /// Автоматический переход на следующую страницу
    AutoAdvance,
}

/// Отложенная задача со сроком исполнения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub kind: TaskKind,
    pub due_ms: u64,
}

/// Слот, в котором находится не более одной отложенной задачи
#[derive(Debug, Default)]
pub struct TaskSlot {
    task: Option<ScheduledTask>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запланировать задачу, вытеснив предыдущую; возвращает вытесненную
    pub fn schedule(&mut self, kind: TaskKind, now_ms: u64, delay_ms: u64) -> Option<ScheduledTask> {
        let displaced = self.task.replace(ScheduledTask {
            kind,
            due_ms: now_ms.saturating_add(delay_ms),
        });
        if let Some(old) = displaced {
            log::trace!("Replaced pending {:?} task", old.kind);
        }
        displaced
    }

    /// Отменить задачу, если она есть
    pub fn cancel(&mut self) -> Option<ScheduledTask> {
        self.task.take()
    }

    /// Забрать задачу, если срок ее исполнения наступил
    pub fn take_due(&mut self, now_ms: u64) -> Option<ScheduledTask> {
        match self.task {
            Some(task) if task.due_ms <= now_ms => self.task.take(),
            _ => None,
        }
    }

    pub fn peek(&self) -> Option<&ScheduledTask> {
        self.task.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }
}
