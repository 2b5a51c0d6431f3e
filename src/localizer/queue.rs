//! Unbounded FIFO between producers and the localizer worker.
//!
//! Producers never block. The single consumer sleeps on a condition
//! variable until data arrives or stop is requested. Stop wins over
//! pending data: once raised, `pop_or_wait` returns `None` even if items
//! are still queued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

pub struct IngestionQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    stop_requested: AtomicBool,
}

impl<T> IngestionQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Append an item and wake the consumer. Returns the queue length
    /// after the push.
    pub fn push(&self, item: T) -> usize {
        let len = {
            let mut items = self.items.lock();
            items.push_back(item);
            items.len()
        };
        self.available.notify_one();
        len
    }

    /// Block until an item is available or stop is requested.
    pub fn pop_or_wait(&self) -> Option<T> {
        let mut items = self.items.lock();
        loop {
            if self.is_stop_requested() {
                return None;
            }
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            self.available.wait(&mut items);
        }
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        // Taking the lock orders the flag with a consumer that is between
        // its stop check and its wait.
        let _items = self.items.lock();
        self.available.notify_all();
    }

    /// Clear the stop flag so a new consumer can be started.
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for IngestionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
