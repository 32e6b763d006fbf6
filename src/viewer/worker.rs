//! Render worker - runs in separate thread(s)
//!
//! Each worker opens its own document handle from the shared engine and
//! serves page requests from a shared queue until the queue disconnects.

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::{CacheKey, SurfaceCache};
use super::request::{RenderRequest, RenderResponse, RequestId};
use crate::engine::{DocumentHandle, RenderEngine, RenderParams, SourceLocator};

/// Main worker function - runs in a dedicated thread
pub(super) fn render_worker(
    engine: Arc<dyn RenderEngine>,
    locator: SourceLocator,
    load_generation: u64,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<SurfaceCache>>,
) {
    let doc = match engine.open(&locator) {
        Ok(doc) => doc,
        Err(error) => {
            let _ = responses.send(RenderResponse::OpenFailed {
                generation: load_generation,
                error,
            });
            return;
        }
    };

    match doc.info() {
        Ok(info) => {
            let _ = responses.send(RenderResponse::Opened {
                generation: load_generation,
                info,
            });
        }
        Err(error) => {
            let _ = responses.send(RenderResponse::OpenFailed {
                generation: load_generation,
                error,
            });
            return;
        }
    }

    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                generation,
                page,
                params,
            } => handle_page_request(
                doc.as_ref(),
                id,
                generation,
                page,
                &params,
                &cache,
                &responses,
            ),

            RenderRequest::Shutdown => break,
        }
    }

    debug!("render worker for {} exiting", locator.describe());
}

fn handle_page_request(
    doc: &dyn DocumentHandle,
    id: RequestId,
    generation: u64,
    page: usize,
    params: &RenderParams,
    cache: &Arc<Mutex<SurfaceCache>>,
    responses: &Sender<RenderResponse>,
) {
    let key = CacheKey::from_params(page, params);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = responses.send(RenderResponse::Page {
            id,
            generation,
            page,
            surface: cached,
        });
        return;
    }

    match doc.render_page(page, params) {
        Ok(surface) => {
            let surface = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, surface);
            let _ = responses.send(RenderResponse::Page {
                id,
                generation,
                page,
                surface,
            });
        }
        Err(error) => {
            warn!("render of page {page} failed: {error}");
            let _ = responses.send(RenderResponse::PageFailed {
                id,
                generation,
                page,
                error,
            });
        }
    }
}
