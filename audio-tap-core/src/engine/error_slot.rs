use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::models::error::TapErrorRecord;

/// Last-error slot shared between the render thread and the application.
///
/// Each publish overwrites the previous record. Publishing never blocks:
/// the slot itself is an atomic swap, and subscribers are only notified when
/// their list is not being modified at that instant and their channel has room.
pub struct ErrorSlot {
    last: ArcSwapOption<TapErrorRecord>,
    generation: AtomicU64,
    subscribers: Mutex<Vec<Sender<TapErrorRecord>>>,
    capacity: usize,
}

impl ErrorSlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            last: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn publish(&self, record: TapErrorRecord) {
        if let Some(mut subscribers) = self.subscribers.try_lock() {
            subscribers.retain(|tx| !matches!(tx.try_send(record.clone()), Err(TrySendError::Disconnected(_))));
        }
        self.last.store(Some(std::sync::Arc::new(record)));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn last(&self) -> Option<TapErrorRecord> {
        self.last.load_full().map(|record| (*record).clone())
    }

    /// Number of records published so far; changes whenever the slot is overwritten.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.last.store(None);
    }

    /// Receive every record published from now on.
    pub fn subscribe(&self) -> Receiver<TapErrorRecord> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }
}
