//! One-shot completion: resolved at most once, awaited by exactly one waiter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::models::error::{CameraAccessError, CaptureError};

enum Slot<T> {
    Pending,
    Ready(Result<T, CaptureError>),
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    completers: AtomicUsize,
    /// Failed because every completer was dropped unanswered.
    abandoned: AtomicBool,
}

impl<T> Shared<T> {
    /// Store `result` if nothing was stored yet. Hands it back otherwise.
    fn resolve(&self, result: Result<T, CaptureError>) -> Result<(), Result<T, CaptureError>> {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return Err(result);
        }
        *slot = Slot::Ready(result);
        self.ready.notify_all();
        Ok(())
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            self.abandoned.store(true, Ordering::Release);
            *slot = Slot::Ready(Err(CameraAccessError::DeviceError.into()));
            self.ready.notify_all();
        }
    }

    fn is_resolved(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending)
    }
}

/// Type-erased way to fail a pending completion.
pub(crate) trait Abort: Send + Sync {
    fn abort(&self, error: CaptureError) -> bool;
}

impl<T: Send> Abort for Shared<T> {
    fn abort(&self, error: CaptureError) -> bool {
        self.resolve(Err(error)).is_ok()
    }
}

/// Create a linked completer/waiter pair.
pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
        completers: AtomicUsize::new(1),
        abandoned: AtomicBool::new(false),
    });
    (
        Completer {
            shared: Arc::clone(&shared),
        },
        Completion { shared },
    )
}

/// Resolving side. Clonable so a callback may hold it for several events;
/// only the first terminal outcome is kept.
///
/// If every completer is dropped while the completion is still pending, it is
/// failed with `DeviceError` so the waiter is never stranded. The waiter logs
/// it; a completer dropped by a registration that was refused is not waited on.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    /// Resolve with a value. Returns the value back if already resolved.
    pub fn complete(&self, value: T) -> Result<(), T> {
        self.shared.resolve(Ok(value)).map_err(|rejected| match rejected {
            Ok(value) => value,
            Err(_) => unreachable!("resolve hands back what it was given"),
        })
    }

    /// Resolve with an error. Returns `false` if already resolved.
    pub fn fail(&self, error: CaptureError) -> bool {
        self.shared.resolve(Err(error)).is_ok()
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.is_resolved()
    }
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        self.shared.completers.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.shared.completers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.abandon();
        }
    }
}

/// Waiting side.
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Completion<T> {
    pub(crate) fn abort_handle(&self) -> Arc<dyn Abort> {
        self.shared.clone()
    }
}

impl<T> Completion<T> {
    /// Block until resolved and take the outcome.
    pub fn wait(self) -> Result<T, CaptureError> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        let result = match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => result,
            Slot::Pending | Slot::Taken => unreachable!("completion has a single waiter"),
        };
        drop(slot);
        if self.is_abandoned() {
            log::warn!("camera callback dropped before completing");
        }
        result
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.is_resolved()
    }

    /// Whether every completer was dropped without an outcome.
    pub fn is_abandoned(&self) -> bool {
        self.shared.abandoned.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn first_outcome_wins() {
        let (completer, completion) = completion::<u32>();
        assert!(completer.complete(1).is_ok());
        assert_eq!(completer.complete(2), Err(2));
        assert!(!completer.fail(CaptureError::Interrupted));
        assert_eq!(completion.wait(), Ok(1));
    }

    #[test]
    fn error_then_value_is_rejected() {
        let (completer, completion) = completion::<&str>();
        assert!(completer.fail(CameraAccessError::DeviceInUse.into()));
        assert_eq!(completer.complete("late"), Err("late"));
        assert_eq!(completion.wait(), Err(CaptureError::Access(CameraAccessError::DeviceInUse)));
    }

    #[test]
    fn wait_blocks_until_other_thread_resolves() {
        let (completer, completion) = completion::<String>();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete("opened".to_string()).unwrap();
        });
        assert_eq!(completion.wait().unwrap(), "opened");
        t.join().unwrap();
    }

    #[test]
    fn dropping_all_completers_fails_waiter() {
        let (completer, completion) = completion::<()>();
        let clone = completer.clone();
        drop(completer);
        assert!(!completion.is_resolved());
        drop(clone);
        assert!(completion.is_abandoned());
        assert_eq!(completion.wait(), Err(CaptureError::Access(CameraAccessError::DeviceError)));
    }

    #[test]
    fn answered_completion_is_not_abandoned() {
        let (completer, completion) = completion::<u8>();
        assert!(completer.fail(CameraAccessError::DeviceInUse.into()));
        drop(completer);
        assert!(!completion.is_abandoned());
        assert_eq!(completion.wait(), Err(CaptureError::Access(CameraAccessError::DeviceInUse)));

        let (completer, completion) = super::completion::<u8>();
        completion.abort_handle().abort(CaptureError::Interrupted);
        drop(completer);
        assert!(!completion.is_abandoned());
    }

    #[test]
    fn abort_handle_fails_pending_only() {
        let (completer, completion) = completion::<u8>();
        let abort = completion.abort_handle();
        assert!(abort.abort(CaptureError::Interrupted));
        assert!(!abort.abort(CaptureError::Interrupted));
        assert_eq!(completer.complete(3), Err(3));
        assert_eq!(completion.wait(), Err(CaptureError::Interrupted));
    }
}
