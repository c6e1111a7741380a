//! Dedicated callback worker.
//!
//! Every provider callback of one capture instance runs on this thread, so the
//! callbacks never race each other. Jobs are queued on an mpsc channel and run
//! in order; quitting drains what is already queued, then the thread exits.

use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;

use crate::models::error::CaptureError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct WorkerShared {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    thread_id: OnceLock<ThreadId>,
}

/// Cheap, clonable handle used to post jobs to a [`CallbackWorker`].
///
/// This is what providers receive: they must deliver every callback through
/// [`WorkerHandle::post`].
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<WorkerShared>,
}

impl WorkerHandle {
    /// Queue `job` on the worker. Returns `false` if the worker has quit, in
    /// which case the job is dropped without running.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.shared.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => {
                log::debug!("worker '{}' has quit, dropping job", self.shared.name);
                false
            }
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.shared.sender.lock().is_none()
    }

    /// Whether the calling thread is this worker's thread.
    pub fn is_current(&self) -> bool {
        self.shared.thread_id.get() == Some(&thread::current().id())
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle").field("name", &self.shared.name).finish()
    }
}

/// Owner of the worker thread.
pub struct CallbackWorker {
    handle: WorkerHandle,
    thread: Option<JoinHandle<()>>,
}

impl CallbackWorker {
    pub fn spawn(name: &str) -> Result<Self, CaptureError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let shared = Arc::new(WorkerShared {
            name: name.to_string(),
            sender: Mutex::new(Some(tx)),
            thread_id: OnceLock::new(),
        });

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Ends once every sender is gone and the queue is drained.
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .map_err(|e| {
                CaptureError::Worker(format!("failed to spawn '{}' thread: {}", name, e))
            })?;

        let _ = shared.thread_id.set(thread.thread().id());

        Ok(Self {
            handle: WorkerHandle { shared },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Stop accepting jobs, let queued jobs run, then join the thread.
    ///
    /// Joining is skipped when called from the worker itself.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.handle.shared.sender.lock().take();

        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.handle.is_current() {
            log::debug!("worker '{}' quit from its own thread, not joining", self.handle.name());
            return;
        }
        if thread.join().is_err() {
            log::error!("worker '{}' panicked", self.handle.name());
        }
    }
}

impl Drop for CallbackWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
