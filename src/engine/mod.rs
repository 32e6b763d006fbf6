//! Rendering engine collaborator contract.
//!
//! The viewer treats the engine as a black box: it opens documents from a
//! locator and rasterizes single pages at a requested scale/rotation. The
//! default implementation wraps MuPDF; tests substitute a scripted fake.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "pdf")]
mod mupdf;

#[cfg(feature = "pdf")]
pub use mupdf::MupdfEngine;

/// Errors from the rendering engine
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("rendering engine unavailable: {0}")]
    Unavailable(String),

    #[error("failed to open document: {0}")]
    OpenDocument(String),

    #[error("failed to render page {page}: {reason}")]
    RenderPage { page: usize, reason: String },
}

/// Where a document comes from
#[derive(Clone, Debug)]
pub enum SourceLocator {
    /// A document on the filesystem
    Path(PathBuf),
    /// An already-fetched document held in memory
    Memory(Arc<Vec<u8>>),
}

impl SourceLocator {
    /// Human-readable form for log messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Memory(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for SourceLocator {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// Page rotation, normalized to quarter turns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    #[must_use]
    pub const fn counterclockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg270,
            Self::Deg90 => Self::Deg0,
            Self::Deg180 => Self::Deg90,
            Self::Deg270 => Self::Deg180,
        }
    }
}

/// Viewport transform for rasterizing a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Scale factor (1.0 = 100%)
    pub scale: f32,
    /// Page rotation
    pub rotation: Rotation,
}

/// Document metadata reported after a successful open
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}

/// A rendered pixel buffer for one page at a specific scale/rotation.
///
/// Pixels are tightly packed RGB (3 bytes per pixel).
#[derive(Clone)]
pub struct Surface {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Page number (1-indexed) this surface was rendered from
    pub page: usize,
    /// Scale factor the surface was produced at
    pub scale: f32,
    /// Rotation the surface was produced at
    pub rotation: Rotation,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("page", &self.page)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}

/// An engine capable of opening documents.
///
/// Shared across viewers via `Arc`; each viewer opens its own document
/// handles even when the engine-loading step is shared.
pub trait RenderEngine: Send + Sync {
    fn open(&self, locator: &SourceLocator) -> Result<Box<dyn DocumentHandle>, EngineError>;
}

/// An open document owned by a single render worker.
///
/// Calls may be slow and may fail; the worker converts failures into
/// responses rather than letting them escape.
pub trait DocumentHandle {
    fn info(&self) -> Result<DocumentInfo, EngineError>;

    /// Rasterize one page (1-indexed) at the given viewport transform.
    fn render_page(&self, page: usize, params: &RenderParams) -> Result<Surface, EngineError>;
}
