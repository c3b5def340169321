// THEORY:
// The output boundary. Once per tick the session produces one `DetectionRecord`
// and at most one `AlertEvent`; what happens to them (a database table, a push
// notification, stdout) belongs to the caller. The sink traits are the narrow
// seam between the two. Closures implement them directly, and the two bounded
// in-memory logs cover tests and small deployments.
//
// The logs are cheap handles: clones share one buffer, so a caller can keep a
// handle while the monitor owns another.

use crate::core_modules::alert_controller::AlertEvent;
use crate::session::DetectionRecord;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives every per-tick detection record.
pub trait DetectionSink: Send {
    fn record_detection(&mut self, record: &DetectionRecord);
}

/// Receives alerts that passed the cooldown gate.
pub trait AlertSink: Send {
    fn notify(&mut self, event: &AlertEvent);
}

impl<F> DetectionSink for F
where
    F: FnMut(&DetectionRecord) + Send,
{
    fn record_detection(&mut self, record: &DetectionRecord) {
        self(record)
    }
}

impl<F> AlertSink for F
where
    F: FnMut(&AlertEvent) + Send,
{
    fn notify(&mut self, event: &AlertEvent) {
        self(event)
    }
}

/// Ring buffer that drops its oldest entry when full.
#[derive(Debug)]
struct Bounded<T> {
    capacity: usize,
    entries: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for Bounded<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: Clone> Bounded<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, entry: T) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn newest_first(&self, limit: usize) -> Vec<T> {
        self.lock().iter().rev().take(limit).cloned().collect()
    }

    fn oldest_first(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// In-memory alert history.
#[derive(Debug, Clone)]
pub struct AlertLog {
    inner: Bounded<AlertEvent>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Bounded::new(capacity),
        }
    }

    /// Up to `limit` alerts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        self.inner.newest_first(limit)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(100)
    }
}

impl AlertSink for AlertLog {
    fn notify(&mut self, event: &AlertEvent) {
        self.inner.push(event.clone());
    }
}

/// In-memory detection history.
#[derive(Debug, Clone)]
pub struct DetectionLog {
    inner: Bounded<DetectionRecord>,
}

impl DetectionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Bounded::new(capacity),
        }
    }

    /// Every retained record, oldest first.
    pub fn records(&self) -> Vec<DetectionRecord> {
        self.inner.oldest_first()
    }

    pub fn recent(&self, limit: usize) -> Vec<DetectionRecord> {
        self.inner.newest_first(limit)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DetectionLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl DetectionSink for DetectionLog {
    fn record_detection(&mut self, record: &DetectionRecord) {
        self.inner.push(record.clone());
    }
}
