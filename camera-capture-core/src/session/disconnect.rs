//! Disconnect flag and reset signalling.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::bridge::async_bridge::BridgeHandle;
use crate::models::error::CameraAccessError;
use crate::traits::reset_sink::ResetSink;

const NOT_DISCONNECTED: u8 = 0;
const DISCONNECTED_AND_SIGNALED: u8 = 1;

/// Disconnect state of one capture instance.
///
/// The flag moves `NOT_DISCONNECTED → DISCONNECTED_AND_SIGNALED` exactly once;
/// the thread that performs the transition is the one that requests the reset.
pub struct DisconnectSignal {
    state: AtomicU8,
    reset_sink: Arc<dyn ResetSink>,
    bridge: BridgeHandle,
}

impl DisconnectSignal {
    pub(crate) fn new(reset_sink: Arc<dyn ResetSink>, bridge: BridgeHandle) -> Self {
        Self {
            state: AtomicU8::new(NOT_DISCONNECTED),
            reset_sink,
            bridge,
        }
    }

    /// Record a disconnect. Requests a reset only on the first call.
    pub fn notify_disconnected(&self) -> bool {
        let first = self
            .state
            .compare_exchange(
                NOT_DISCONNECTED,
                DISCONNECTED_AND_SIGNALED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if first {
            self.reset_sink.request_reset();
        }
        first
    }

    /// Fail the blocking operation in flight, if any, with `kind`.
    ///
    /// Does not touch the disconnect flag.
    pub fn notify_error(&self, kind: CameraAccessError) -> bool {
        self.bridge.abort(kind.into())
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.load(Ordering::Acquire) == DISCONNECTED_AND_SIGNALED
    }
}
