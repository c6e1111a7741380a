//! Blocking calls over callback-driven provider operations.

use std::sync::Arc;

use parking_lot::Mutex;

use super::completion::{completion, Abort, Completer};
use crate::models::error::CaptureError;

#[derive(Default)]
struct BridgeState {
    /// Abort hook of the wait currently in flight, if any.
    current: Option<Arc<dyn Abort>>,
    /// An interrupt arrived while nothing was waiting.
    interrupt_pending: bool,
    shut_down: bool,
}

#[derive(Default)]
struct BridgeShared {
    state: Mutex<BridgeState>,
}

impl BridgeShared {
    fn abort_current(&self, error: CaptureError) -> bool {
        let state = self.state.lock();
        match &state.current {
            Some(current) => current.abort(error),
            None => false,
        }
    }
}

/// Turns "register a callback" operations into blocking calls.
///
/// At most one call is in flight at a time. The wait has no timeout: a
/// provider that never calls back blocks the caller until the wait is
/// interrupted, aborted or the bridge is shut down.
#[derive(Default)]
pub struct AsyncBridge {
    shared: Arc<BridgeShared>,
}

impl AsyncBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `register` with a fresh completer and block until it resolves.
    ///
    /// `register` must start the operation and return immediately. An error it
    /// returns is reported as-is, without waiting, unless the bridge was shut
    /// down meanwhile. `register` is skipped if the wait was already aborted.
    pub fn call<T, F>(&self, register: F) -> Result<T, CaptureError>
    where
        T: Send + 'static,
        F: FnOnce(Completer<T>) -> Result<(), CaptureError>,
    {
        let (completer, completion) = completion::<T>();
        {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return Err(CaptureError::Interrupted);
            }
            if std::mem::take(&mut state.interrupt_pending) {
                return Err(CaptureError::Interrupted);
            }
            if state.current.is_some() {
                return Err(CaptureError::InvalidState(
                    "another camera operation is already in flight".into(),
                ));
            }
            state.current = Some(completion.abort_handle());
        }
        let _clear = ClearCurrent(&self.shared);

        // Aborted between publishing `current` and here: never start the operation.
        if completion.is_resolved() {
            return completion.wait();
        }
        if let Err(e) = register(completer) {
            if self.shared.state.lock().shut_down {
                return Err(CaptureError::Interrupted);
            }
            return Err(e);
        }
        completion.wait()
    }

    /// Handle for interrupting waits from another thread.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Reject every later call and fail the one in flight with `Interrupted`.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        state.shut_down = true;
        if let Some(current) = &state.current {
            current.abort(CaptureError::Interrupted);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    pub fn is_waiting(&self) -> bool {
        self.shared.state.lock().current.is_some()
    }
}

struct ClearCurrent<'a>(&'a BridgeShared);

impl Drop for ClearCurrent<'_> {
    fn drop(&mut self) {
        self.0.state.lock().current = None;
    }
}

/// Cancels the blocking wait of an [`AsyncBridge`].
///
/// Interrupting does not cancel the provider operation itself. An interrupt
/// issued while nothing waits makes the next call fail immediately.
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<BridgeShared>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        let mut state = self.shared.state.lock();
        let aborted = match &state.current {
            Some(current) => current.abort(CaptureError::Interrupted),
            None => false,
        };
        if !aborted {
            state.interrupt_pending = true;
        }
    }
}

/// Crate-internal handle used by device listeners to fail the wait in flight.
#[derive(Clone)]
pub(crate) struct BridgeHandle {
    shared: Arc<BridgeShared>,
}

impl BridgeHandle {
    pub(crate) fn abort(&self, error: CaptureError) -> bool {
        self.shared.abort_current(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::CameraAccessError;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn returns_value_from_other_thread() {
        let bridge = AsyncBridge::new();
        let value = bridge
            .call(|completer: Completer<u32>| {
                thread::spawn(move || {
                    let _ = completer.complete(42);
                });
                Ok(())
            })
            .unwrap();
        assert_eq!(value, 42);
        assert!(!bridge.is_waiting());
    }

    #[test]
    fn registration_error_is_returned() {
        let bridge = AsyncBridge::new();
        let err = bridge
            .call(|_: Completer<()>| Err(CameraAccessError::DeviceDisabled.into()))
            .unwrap_err();
        assert_eq!(err, CaptureError::Access(CameraAccessError::DeviceDisabled));
        assert!(!bridge.is_waiting());
    }

    #[test]
    fn only_first_outcome_is_honoured() {
        let bridge = AsyncBridge::new();
        let result = bridge.call(|completer: Completer<&'static str>| {
            thread::spawn(move || {
                let _ = completer.complete("started");
                completer.fail(CameraAccessError::DeviceError.into());
                let _ = completer.complete("again");
            });
            Ok(())
        });
        assert_eq!(result, Ok("started"));
    }

    #[test]
    fn interrupt_wakes_waiter() {
        let bridge = AsyncBridge::new();
        let interrupter = bridge.interrupter();
        let (registered_tx, registered_rx) = std::sync::mpsc::channel::<Completer<()>>();

        // Holds the completer so only the interrupt can resolve the wait.
        let t = thread::spawn(move || {
            let completer = registered_rx.recv().unwrap();
            interrupter.interrupt();
            completer.is_resolved()
        });
        let err = bridge
            .call(|completer: Completer<()>| {
                registered_tx.send(completer).unwrap();
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, CaptureError::Interrupted);
        assert!(t.join().unwrap());
    }

    #[test]
    fn pending_interrupt_fails_next_call() {
        let bridge = AsyncBridge::new();
        bridge.interrupter().interrupt();

        let err = bridge.call(|_: Completer<()>| Ok(())).unwrap_err();
        assert_eq!(err, CaptureError::Interrupted);

        // Consumed by the failed call.
        let value = bridge.call(|c: Completer<u8>| {
            let _ = c.complete(1);
            Ok(())
        });
        assert_eq!(value, Ok(1));
    }

    #[test]
    fn shutdown_aborts_and_rejects() {
        let bridge = Arc::new(AsyncBridge::new());
        let (keep_tx, keep_rx) = std::sync::mpsc::channel();

        let waiter = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                bridge.call(|completer: Completer<()>| {
                    keep_tx.send(completer).unwrap();
                    Ok(())
                })
            })
        };
        let _completer = keep_rx.recv().unwrap();
        while !bridge.is_waiting() {
            thread::sleep(Duration::from_millis(1));
        }
        bridge.shutdown();

        assert_eq!(waiter.join().unwrap(), Err(CaptureError::Interrupted));
        assert!(bridge.is_shut_down());
        assert_eq!(bridge.call(|_: Completer<()>| Ok(())), Err(CaptureError::Interrupted));
    }

    #[test]
    fn refused_registration_is_not_abandonment() {
        let bridge = AsyncBridge::new();
        let err = bridge
            .call(|completer: Completer<()>| {
                drop(completer);
                Err(CameraAccessError::DeviceInUse.into())
            })
            .unwrap_err();
        assert_eq!(err, CaptureError::Access(CameraAccessError::DeviceInUse));
    }

    #[test]
    fn shutdown_during_registration_reports_interrupted() {
        let bridge = AsyncBridge::new();
        let err = bridge
            .call(|_: Completer<()>| {
                bridge.shutdown();
                Err(CaptureError::InvalidState("camera device is closed".into()))
            })
            .unwrap_err();
        assert_eq!(err, CaptureError::Interrupted);
        assert!(!bridge.is_waiting());
    }

    #[test]
    fn handle_abort_fails_wait_with_given_error() {
        let bridge = AsyncBridge::new();
        let handle = bridge.handle();
        assert!(!handle.abort(CaptureError::Interrupted));

        let err = bridge
            .call(|completer: Completer<()>| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    handle.abort(CameraAccessError::DeviceError.into());
                    drop(completer);
                });
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, CaptureError::Access(CameraAccessError::DeviceError));
    }
}
