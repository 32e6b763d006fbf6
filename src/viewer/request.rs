//! Render request and response types

use std::sync::Arc;

use crate::engine::{DocumentInfo, EngineError, RenderParams, Surface};

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to render workers.
///
/// `generation` records which render generation the request belongs to;
/// workers echo it back so the controller can discard superseded results.
#[derive(Clone, Debug)]
pub enum RenderRequest {
    /// Render a page at the captured view parameters
    Page {
        id: RequestId,
        generation: u64,
        page: usize,
        params: RenderParams,
    },

    /// Shut down the worker
    Shutdown,
}

/// Response from render workers
#[derive(Clone, Debug)]
pub enum RenderResponse {
    /// The worker opened its document handle
    Opened {
        generation: u64,
        info: DocumentInfo,
    },

    /// The worker could not open the document
    OpenFailed {
        generation: u64,
        error: EngineError,
    },

    /// A page rendered successfully
    Page {
        id: RequestId,
        generation: u64,
        page: usize,
        surface: Arc<Surface>,
    },

    /// A page failed to render
    PageFailed {
        id: RequestId,
        generation: u64,
        page: usize,
        error: EngineError,
    },
}
