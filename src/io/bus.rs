// src/io/bus.rs
//
// Bus capability trait implemented by every transport.

use async_trait::async_trait;
use std::time::Duration;

use crate::io::{CanFilter, CanMessage, IoError};

/// Generic CAN bus capability.
///
/// Transports are driven by a single owner; methods take `&mut self` and no
/// transport performs internal locking.
#[async_trait]
pub trait CanBus: Send {
    /// Human-readable description of the channel, for diagnostics
    fn channel_info(&self) -> &str;

    /// Transmit one message. Transports may ignore `timeout`.
    async fn send(&mut self, msg: &CanMessage, timeout: Option<Duration>) -> Result<(), IoError>;

    /// Return the next received message, if any, within `timeout`.
    ///
    /// The boolean reports whether the transport already applied the
    /// configured filters. `None` for the timeout waits indefinitely.
    async fn receive_next(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(Option<CanMessage>, bool), IoError>;

    /// Release the transport's resources. Idempotent.
    fn shutdown(&mut self);

    /// Replace the filter list. Default implementation ignores filters.
    fn set_filters(&mut self, _filters: Vec<CanFilter>) -> Result<(), IoError> {
        Ok(())
    }

    /// Currently configured filters.
    fn filters(&self) -> &[CanFilter] {
        &[]
    }
}
