//! Synchronous waits over asynchronous, callback-driven provider operations.

pub mod async_bridge;
pub mod completion;

pub use async_bridge::{AsyncBridge, Interrupter};
pub use completion::{completion, Completer, Completion};
