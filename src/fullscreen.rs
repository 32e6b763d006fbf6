//! Host fullscreen capability
//!
//! Fullscreen is a thin pass-through: the viewer asks the host to enter or
//! leave fullscreen and mirrors the host's change notifications. It never
//! flips `is_fullscreen` on its own.

use flume::{Receiver, Sender};

/// Errors from the host fullscreen capability
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FullscreenError {
    #[error("fullscreen is not available in this host")]
    Unsupported,

    #[error("fullscreen request rejected: {0}")]
    Rejected(String),
}

/// A host environment capable of putting the viewer's presentation region
/// into fullscreen.
///
/// Implementations deliver the resulting state changes through the
/// [`FullscreenHost::changes`] channel; requests that succeed without a
/// notification have no visible effect on the viewer.
pub trait FullscreenHost: Send {
    fn request(&mut self) -> Result<(), FullscreenError>;

    fn exit(&mut self) -> Result<(), FullscreenError>;

    /// Change-notification subscription read by the viewer's `poll`
    fn changes(&self) -> Receiver<bool>;
}

/// Host that grants every request immediately and reports the change back
/// through the notification channel. Stands in for environments without a
/// real fullscreen capability.
pub struct EchoFullscreen {
    tx: Sender<bool>,
    rx: Receiver<bool>,
}

impl EchoFullscreen {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }
}

impl Default for EchoFullscreen {
    fn default() -> Self {
        Self::new()
    }
}

impl FullscreenHost for EchoFullscreen {
    fn request(&mut self) -> Result<(), FullscreenError> {
        let _ = self.tx.send(true);
        Ok(())
    }

    fn exit(&mut self) -> Result<(), FullscreenError> {
        let _ = self.tx.send(false);
        Ok(())
    }

    fn changes(&self) -> Receiver<bool> {
        self.rx.clone()
    }
}
