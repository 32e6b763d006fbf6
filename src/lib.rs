//! Embeddable PDF viewer controller.
//!
//! `paperview` owns the view state of a document (page, zoom, rotation, view
//! mode), drives an external rendering engine through asynchronous render
//! requests, and publishes consistent pixel surfaces to a presentation layer.
//! Every request carries the generation it was issued under; results from
//! superseded generations are discarded, so rapid zooming or page flipping
//! never publishes an intermediate frame.

pub mod config;
pub mod engine;
pub mod fullscreen;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, ViewerConfig};
#[cfg(feature = "pdf")]
pub use engine::MupdfEngine;
pub use engine::{
    DocumentHandle, DocumentInfo, EngineError, RenderEngine, RenderParams, Rotation,
    SourceLocator, Surface,
};
pub use fullscreen::{EchoFullscreen, FullscreenError, FullscreenHost};
pub use viewer::{
    Command, CommandError, PageSlot, Status, ViewMode, Viewer, ViewerError, ViewerEvent,
};
