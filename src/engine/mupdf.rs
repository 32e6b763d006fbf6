//! MuPDF-backed rendering engine

use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{
    DocumentHandle, DocumentInfo, EngineError, RenderEngine, RenderParams, SourceLocator, Surface,
};

/// Rendering engine backed by MuPDF
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfEngine;

impl MupdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for MupdfEngine {
    fn open(&self, locator: &SourceLocator) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let doc = match locator {
            SourceLocator::Path(path) => Document::open(path.to_string_lossy().as_ref()),
            SourceLocator::Memory(bytes) => Document::from_bytes(bytes, "application/pdf"),
        }
        .map_err(|e| EngineError::OpenDocument(e.to_string()))?;

        Ok(Box::new(MupdfDocument { doc }))
    }
}

struct MupdfDocument {
    doc: Document,
}

impl DocumentHandle for MupdfDocument {
    fn info(&self) -> Result<DocumentInfo, EngineError> {
        let page_count = self
            .doc
            .page_count()
            .map_err(|e| EngineError::OpenDocument(e.to_string()))? as usize;

        let title = self
            .doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());

        Ok(DocumentInfo { page_count, title })
    }

    fn render_page(&self, page: usize, params: &RenderParams) -> Result<Surface, EngineError> {
        let render_err = |e: mupdf::error::Error| EngineError::RenderPage {
            page,
            reason: e.to_string(),
        };

        // Public page numbers are 1-indexed; MuPDF counts from 0.
        let loaded = self
            .doc
            .load_page(page as i32 - 1)
            .map_err(render_err)?;

        let transform = viewport_transform(params);
        let rgb = Colorspace::device_rgb();
        let pixmap = loaded
            .to_pixmap(&transform, &rgb, false, false)
            .map_err(render_err)?;

        let pixels =
            pixmap_to_rgb(&pixmap).map_err(|reason| EngineError::RenderPage { page, reason })?;

        Ok(Surface {
            pixels,
            width: pixmap.width(),
            height: pixmap.height(),
            page,
            scale: params.scale,
            rotation: params.rotation,
        })
    }
}

/// Compose uniform scale with a quarter-turn rotation.
fn viewport_transform(params: &RenderParams) -> Matrix {
    let s = params.scale;
    match params.rotation {
        super::Rotation::Deg0 => Matrix::new_scale(s, s),
        super::Rotation::Deg90 => Matrix::new(0.0, s, -s, 0.0, 0.0, 0.0),
        super::Rotation::Deg180 => Matrix::new(-s, 0.0, 0.0, -s, 0.0, 0.0),
        super::Rotation::Deg270 => Matrix::new(0.0, -s, s, 0.0, 0.0, 0.0),
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, String> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(format!("Unsupported pixmap format: {n} channels"));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err("Pixmap buffer size mismatch".to_string());
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
