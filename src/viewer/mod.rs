//! Viewer state and rendering infrastructure

mod cache;
mod controller;
mod request;
mod state;
mod worker;
mod zoom;

pub use cache::{CacheKey, SurfaceCache};
pub use controller::{PageSlot, Status, Viewer, ViewerError, ViewerEvent};
pub use request::{RenderRequest, RenderResponse, RequestId};
pub use state::{Command, CommandError, Effect, ViewMode, ViewerState};
pub use zoom::{parse_zoom_text, ScaleLimits, ZoomTextError};

/// Default number of render worker threads
pub(crate) const DEFAULT_WORKERS: usize = 2;

/// Default surface cache capacity
pub(crate) const DEFAULT_CACHE_SIZE: usize = 32;
