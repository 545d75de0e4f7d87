use crate::domain::LogRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchTrigger {
    SizeBased,
    TimeBased,
    Manual,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_size: usize,
    pub flush_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Records drained from the buffer in arrival order.
#[derive(Debug, Clone)]
pub struct Batch {
    records: Vec<LogRecord>,
    trigger: BatchTrigger,
}

impl Batch {
    fn new(records: Vec<LogRecord>, trigger: BatchTrigger) -> Self {
        Self { records, trigger }
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn trigger(&self) -> BatchTrigger {
        self.trigger
    }
}

/// In-memory buffer with a size trigger and a time trigger.
///
/// Owned by the logger worker, so it needs no locking. After every `push`
/// the buffer holds fewer than `max_size` records: reaching the limit hands
/// the whole buffer back as a [`Batch`].
#[derive(Debug)]
pub struct RecordBatcher {
    config: BatchConfig,
    pending: Vec<LogRecord>,
    last_flush: Instant,
}

impl RecordBatcher {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            pending: Vec::with_capacity(config.max_size.min(1024)),
            config,
            last_flush: Instant::now(),
        }
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn push(&mut self, record: LogRecord) -> Option<Batch> {
        self.pending.push(record);
        if self.pending.len() >= self.config.max_size {
            self.drain(BatchTrigger::SizeBased)
        } else {
            None
        }
    }

    /// When the time trigger fires next.
    pub fn next_deadline(&self) -> Instant {
        self.last_flush + self.config.flush_interval
    }

    /// Drains the buffer if the flush interval has elapsed. An empty buffer
    /// still restarts the interval.
    pub fn poll_due(&mut self, now: Instant) -> Option<Batch> {
        if now < self.next_deadline() {
            return None;
        }
        self.drain(BatchTrigger::TimeBased)
    }

    pub fn drain(&mut self, trigger: BatchTrigger) -> Option<Batch> {
        self.last_flush = Instant::now();
        if self.pending.is_empty() {
            return None;
        }
        let records = std::mem::take(&mut self.pending);
        Some(Batch::new(records, trigger))
    }
}
