//! Named background thread that is joined when dropped.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

pub struct WorkerTask {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl WorkerTask {
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name.to_string()).spawn(body)?;
        debug!("Spawned worker thread '{}'", name);
        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the thread to exit. The caller must have signalled it.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Worker thread '{}' panicked", self.name);
            }
        }
    }
}

impl Drop for WorkerTask {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_drop_joins_thread() {
        let done = Arc::new(AtomicBool::new(false));
        {
            let done = Arc::clone(&done);
            let _task = WorkerTask::spawn("test-worker", move || {
                thread::sleep(std::time::Duration::from_millis(20));
                done.store(true, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_join_survives_panic() {
        let mut task = WorkerTask::spawn("panicking-worker", || panic!("boom")).unwrap();
        task.join();
        assert!(task.is_finished());
        assert_eq!(task.name(), "panicking-worker");
    }
}
