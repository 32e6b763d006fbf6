//! Viewer controller - owns the state, the worker pool, and the published
//! surfaces.
//!
//! All mutation goes through the controller; the presentation layer only
//! reads published state and issues operations. Rendering is asynchronous:
//! operations return immediately and `poll` applies completed work, dropping
//! any result that belongs to a superseded generation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use log::{debug, info, warn};

use super::cache::SurfaceCache;
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::state::{Command, CommandError, Effect, ViewMode, ViewerState};
use super::worker::render_worker;
use super::zoom::{parse_zoom_text, ZoomTextError};
use crate::config::ViewerConfig;
use crate::engine::{RenderEngine, RenderParams, Rotation, SourceLocator, Surface};
use crate::fullscreen::FullscreenHost;

/// Controller lifecycle status
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// No document has been requested yet
    Idle,
    /// A document open is in flight
    LoadingDocument,
    /// Renders for the current generation are in flight
    Rendering,
    /// All visible pages are settled
    Ready,
    /// The document load failed, or the sole visible page cannot render
    Failed(String),
}

/// Published render slot for one page
#[derive(Clone, Debug)]
pub enum PageSlot {
    /// A render is in flight
    Pending,
    /// The latest consistent surface
    Ready(Arc<Surface>),
    /// The page failed to render
    Failed(String),
}

impl PageSlot {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub fn surface(&self) -> Option<&Arc<Surface>> {
        match self {
            Self::Ready(surface) => Some(surface),
            _ => None,
        }
    }
}

/// State changes surfaced by [`Viewer::poll`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    DocumentLoaded { page_count: usize },
    LoadFailed { reason: String },
    PageRendered { page: usize },
    PageFailed { page: usize, reason: String },
    FullscreenChanged { active: bool },
}

/// Errors surfaced to callers of viewer operations
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("invalid zoom input: {0}")]
    ZoomText(#[from] ZoomTextError),

    #[error("fullscreen request failed: {0}")]
    Fullscreen(String),
}

/// The viewer controller.
///
/// Owns the authoritative [`ViewerState`], a pool of render workers for the
/// loaded document, and the published surface map. Dropping the viewer shuts
/// the pool down and releases the document handles.
pub struct Viewer {
    config: ViewerConfig,
    engine: Arc<dyn RenderEngine>,
    host: Box<dyn FullscreenHost>,
    fullscreen_rx: Receiver<bool>,
    state: ViewerState,
    status: Status,
    surfaces: BTreeMap<usize, PageSlot>,
    cache: Arc<Mutex<SurfaceCache>>,
    generation: u64,
    next_request_id: u64,
    pending: HashMap<RequestId, usize>,
    request_tx: Option<Sender<RenderRequest>>,
    response_tx: Sender<RenderResponse>,
    response_rx: Receiver<RenderResponse>,
    is_fullscreen: bool,
    title: Option<String>,
}

impl Viewer {
    /// Create a viewer with the default (echo) fullscreen host
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, config: ViewerConfig) -> Self {
        Self::with_host(
            engine,
            Box::new(crate::fullscreen::EchoFullscreen::new()),
            config,
        )
    }

    /// Create a viewer with an explicit fullscreen host
    #[must_use]
    pub fn with_host(
        engine: Arc<dyn RenderEngine>,
        host: Box<dyn FullscreenHost>,
        config: ViewerConfig,
    ) -> Self {
        let config = config.normalized();
        let fullscreen_rx = host.changes();
        let (response_tx, response_rx) = flume::unbounded();

        Self {
            state: ViewerState::new(&config),
            status: Status::Idle,
            surfaces: BTreeMap::new(),
            cache: Arc::new(Mutex::new(SurfaceCache::new(config.cache_size))),
            generation: 0,
            next_request_id: 1,
            pending: HashMap::new(),
            request_tx: None,
            response_tx,
            response_rx,
            fullscreen_rx,
            is_fullscreen: false,
            title: None,
            engine,
            host,
            config,
        }
    }

    /// Load (or replace) the viewed document.
    ///
    /// Supersedes any in-flight load or render: results of older generations
    /// are discarded when they arrive, regardless of arrival order. The open
    /// itself is asynchronous; observe progress through [`Viewer::poll`].
    pub fn load_document(&mut self, locator: SourceLocator) {
        let generation = self.begin_generation();
        info!(
            "loading document {} (generation {generation})",
            locator.describe()
        );

        self.surfaces.clear();
        // Fresh cache per document: a straggler from a replaced pool must not
        // seed surfaces for the new one.
        self.cache = Arc::new(Mutex::new(SurfaceCache::new(self.config.cache_size)));
        self.title = None;
        self.state.reset_document(self.config.initial_page);
        self.status = Status::LoadingDocument;

        self.shutdown_pool();

        let (request_tx, request_rx) = flume::unbounded();
        for _ in 0..self.worker_count() {
            let engine = Arc::clone(&self.engine);
            let locator = locator.clone();
            let requests = request_rx.clone();
            let responses = self.response_tx.clone();
            let cache = Arc::clone(&self.cache);

            std::thread::spawn(move || {
                render_worker(engine, locator, generation, requests, responses, cache);
            });
        }
        self.request_tx = Some(request_tx);
    }

    /// Apply a command to the view state
    pub fn apply_command(&mut self, cmd: Command) -> Result<(), ViewerError> {
        let effects = self.state.apply(cmd)?;
        self.run_effects(effects);
        Ok(())
    }

    /// Go to a specific page (single page mode only, 1-indexed).
    ///
    /// Out-of-range pages are a no-op; pagination in continuous mode is an
    /// error.
    pub fn set_page(&mut self, page: usize) -> Result<(), ViewerError> {
        self.apply_command(Command::SetPage(page))
    }

    pub fn next_page(&mut self) -> Result<(), ViewerError> {
        self.apply_command(Command::NextPage)
    }

    pub fn previous_page(&mut self) -> Result<(), ViewerError> {
        self.apply_command(Command::PreviousPage)
    }

    /// Set the scale factor, clamped to the configured limits
    pub fn set_scale(&mut self, factor: f32) {
        let _ = self.apply_command(Command::SetScale(factor));
    }

    pub fn zoom_in(&mut self) {
        let _ = self.apply_command(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        let _ = self.apply_command(Command::ZoomOut);
    }

    pub fn reset_zoom(&mut self) {
        let _ = self.apply_command(Command::ResetZoom);
    }

    /// Set the scale from free-form text such as `"150%"` or `"1.5"`
    pub fn set_zoom_text(&mut self, input: &str) -> Result<(), ViewerError> {
        let factor = parse_zoom_text(input)?;
        let _ = self.apply_command(Command::SetScale(factor));
        Ok(())
    }

    pub fn rotate_clockwise(&mut self) {
        let _ = self.apply_command(Command::RotateClockwise);
    }

    pub fn rotate_counterclockwise(&mut self) {
        let _ = self.apply_command(Command::RotateCounterclockwise);
    }

    pub fn toggle_view_mode(&mut self) {
        let _ = self.apply_command(Command::ToggleViewMode);
    }

    /// Drop cached surfaces and re-render the visible pages.
    ///
    /// This is the manual retry path for failed page renders. A failed
    /// document load is retried with [`Viewer::load_document`] instead.
    pub fn refresh(&mut self) {
        let _ = self.apply_command(Command::Refresh);
    }

    /// Ask the host to enter fullscreen. `is_fullscreen` updates only once
    /// the host reports the change.
    pub fn request_fullscreen(&mut self) -> Result<(), ViewerError> {
        self.host
            .request()
            .map_err(|e| ViewerError::Fullscreen(e.to_string()))
    }

    pub fn exit_fullscreen(&mut self) -> Result<(), ViewerError> {
        self.host
            .exit()
            .map_err(|e| ViewerError::Fullscreen(e.to_string()))
    }

    /// Drain completed work and host notifications, applying results that
    /// belong to the current generation and discarding the rest.
    pub fn poll(&mut self) -> Vec<ViewerEvent> {
        let mut events = Vec::new();

        while let Ok(active) = self.fullscreen_rx.try_recv() {
            if active != self.is_fullscreen {
                self.is_fullscreen = active;
                events.push(ViewerEvent::FullscreenChanged { active });
            }
        }

        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response, &mut events);
        }

        events
    }

    /// Block until all in-flight work has settled or the timeout elapses
    pub fn wait_until_settled(&mut self, timeout: Duration) -> Vec<ViewerEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.poll();

        while !self.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => self.handle_response(response, &mut events),
                Err(_) => break,
            }
        }

        events
    }

    /// True when no load or render is outstanding
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && !matches!(self.status, Status::LoadingDocument)
    }

    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.state.page_count
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.state.rotation
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.state.view_mode
    }

    /// Current render generation; results tagged with older generations are
    /// discarded on arrival.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Document title from metadata, if any
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Published surfaces, keyed by 1-indexed page number
    #[must_use]
    pub fn surfaces(&self) -> &BTreeMap<usize, PageSlot> {
        &self.surfaces
    }

    #[must_use]
    pub fn surface(&self, page: usize) -> Option<&PageSlot> {
        self.surfaces.get(&page)
    }

    fn worker_count(&self) -> usize {
        self.config.workers.max(1)
    }

    fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending.clear();
        self.generation
    }

    fn shutdown_pool(&mut self) {
        if let Some(request_tx) = self.request_tx.take() {
            for _ in 0..self.worker_count() {
                let _ = request_tx.send(RenderRequest::Shutdown);
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }

        self.begin_generation();
        let mut issued = false;

        for effect in effects {
            match effect {
                Effect::InvalidateCache => {
                    self.cache
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .invalidate_all();
                    self.surfaces.clear();
                }

                Effect::RetainCurrentPage => {
                    let current = self.state.current_page;
                    self.surfaces.retain(|page, _| *page == current);
                }

                Effect::RenderCurrentPage => {
                    issued |= self.request_page(self.state.current_page);
                }

                Effect::RenderAllPages => {
                    for page in 1..=self.state.page_count {
                        issued |= self.request_page(page);
                    }
                }
            }
        }

        if issued {
            if !matches!(self.status, Status::LoadingDocument) {
                self.status = Status::Rendering;
            }
        } else {
            self.settle_status();
        }
    }

    /// Issue a render for one page under the current generation. Pages whose
    /// published surface is still valid for the active parameters are
    /// skipped.
    fn request_page(&mut self, page: usize) -> bool {
        if self.state.page_count == 0 || page == 0 || page > self.state.page_count {
            return false;
        }
        if matches!(self.surfaces.get(&page), Some(PageSlot::Ready(_))) {
            return false;
        }
        let Some(request_tx) = &self.request_tx else {
            return false;
        };

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        let params = RenderParams {
            scale: self.state.scale,
            rotation: self.state.rotation,
        };

        if request_tx
            .send(RenderRequest::Page {
                id,
                generation: self.generation,
                page,
                params,
            })
            .is_err()
        {
            warn!("render workers unavailable; dropping request for page {page}");
            return false;
        }

        self.pending.insert(id, page);
        self.surfaces.insert(page, PageSlot::Pending);
        true
    }

    fn handle_response(&mut self, response: RenderResponse, events: &mut Vec<ViewerEvent>) {
        match response {
            RenderResponse::Opened { generation, info } => {
                if generation != self.generation
                    || !matches!(self.status, Status::LoadingDocument)
                {
                    debug!("discarding stale document open (generation {generation})");
                    return;
                }

                info!(
                    "document ready: {} pages{}",
                    info.page_count,
                    info.title.as_deref().map_or_else(String::new, |t| format!(", \"{t}\""))
                );
                self.title = info.title;
                let _ = self.state.apply(Command::SetPageCount(info.page_count));
                self.status = Status::Rendering;
                events.push(ViewerEvent::DocumentLoaded {
                    page_count: self.state.page_count,
                });

                let initial = match self.state.view_mode {
                    ViewMode::Single => vec![Effect::RenderCurrentPage],
                    ViewMode::Continuous => vec![Effect::RenderAllPages],
                };
                self.run_effects(initial);
            }

            RenderResponse::OpenFailed { generation, error } => {
                if generation != self.generation
                    || !matches!(self.status, Status::LoadingDocument)
                {
                    debug!("discarding stale open failure (generation {generation})");
                    return;
                }

                let reason = error.to_string();
                warn!("document load failed: {reason}");
                self.status = Status::Failed(reason.clone());
                events.push(ViewerEvent::LoadFailed { reason });
            }

            RenderResponse::Page {
                id,
                generation,
                page,
                surface,
            } => {
                if generation != self.generation {
                    debug!("discarding stale render of page {page} (generation {generation})");
                    return;
                }

                self.pending.remove(&id);
                self.surfaces.insert(page, PageSlot::Ready(surface));
                events.push(ViewerEvent::PageRendered { page });
                self.settle_status();
            }

            RenderResponse::PageFailed {
                id,
                generation,
                page,
                error,
            } => {
                if generation != self.generation {
                    debug!(
                        "discarding stale render failure of page {page} (generation {generation})"
                    );
                    return;
                }

                self.pending.remove(&id);
                let reason = error.to_string();
                self.surfaces.insert(page, PageSlot::Failed(reason.clone()));
                events.push(ViewerEvent::PageFailed {
                    page,
                    reason: reason.clone(),
                });

                if self.state.view_mode == ViewMode::Single && page == self.state.current_page {
                    // Nothing viewable is left in single page mode.
                    self.status = Status::Failed(reason);
                } else {
                    self.settle_status();
                }
            }
        }
    }

    fn settle_status(&mut self) {
        if self.pending.is_empty() && matches!(self.status, Status::Rendering) {
            self.status = Status::Ready;
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        // One final bump invalidates any still-outstanding renders.
        self.generation += 1;
        self.shutdown_pool();
        if self.is_fullscreen {
            let _ = self.host.exit();
        }
    }
}
