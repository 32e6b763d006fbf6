//! Test doubles for the engine and fullscreen collaborators.
//!
//! `FakeEngine` serves scripted documents and can hold opens or renders at a
//! gate until a test releases them, which makes async completion order
//! deterministic in race tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::engine::{
    DocumentHandle, DocumentInfo, EngineError, RenderEngine, RenderParams, SourceLocator, Surface,
};
use crate::fullscreen::{FullscreenError, FullscreenHost};

#[derive(Clone, Default)]
struct DocumentSpec {
    page_count: usize,
    title: Option<String>,
    open_error: Option<String>,
    failing_pages: HashSet<usize>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum GateKey {
    Open(String),
    Render { page: usize, scale_millionths: u32 },
}

/// Persistent release-set gate: waiters block until their key has been
/// released, no matter whether the release happened before or after they
/// arrived.
#[derive(Default)]
struct Gate {
    released: Mutex<HashSet<GateKey>>,
    condvar: Condvar,
}

impl Gate {
    fn wait(&self, key: &GateKey) {
        let mut released = self
            .released
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while !released.contains(key) {
            released = self
                .condvar
                .wait(released)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    fn release(&self, key: GateKey) {
        self.released
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key);
        self.condvar.notify_all();
    }
}

#[derive(Default)]
struct EngineInner {
    docs: Mutex<HashMap<String, DocumentSpec>>,
    offline: Mutex<Option<String>>,
    gate: Gate,
    hold_opens: AtomicBool,
    hold_renders: AtomicBool,
    open_count: AtomicUsize,
    render_count: AtomicUsize,
}

/// Scripted in-memory rendering engine
#[derive(Clone, Default)]
pub struct FakeEngine {
    inner: Arc<EngineInner>,
}

fn locator_name(locator: &SourceLocator) -> String {
    match locator {
        SourceLocator::Path(path) => path.to_string_lossy().into_owned(),
        SourceLocator::Memory(_) => "<memory>".to_string(),
    }
}

fn millionths(scale: f32) -> u32 {
    (scale * 1_000_000.0) as u32
}

impl FakeEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator for a document registered under `name`
    #[must_use]
    pub fn locator(name: &str) -> SourceLocator {
        SourceLocator::Path(PathBuf::from(name))
    }

    pub fn add_document(&self, name: &str, page_count: usize) {
        self.docs_mut().insert(
            name.to_string(),
            DocumentSpec {
                page_count,
                ..DocumentSpec::default()
            },
        );
    }

    pub fn add_document_titled(&self, name: &str, page_count: usize, title: &str) {
        self.docs_mut().insert(
            name.to_string(),
            DocumentSpec {
                page_count,
                title: Some(title.to_string()),
                ..DocumentSpec::default()
            },
        );
    }

    /// Make every open of `name` fail with the given reason
    pub fn fail_open(&self, name: &str, reason: &str) {
        self.docs_mut()
            .entry(name.to_string())
            .or_default()
            .open_error = Some(reason.to_string());
    }

    /// Make renders of one page of `name` fail
    pub fn fail_page(&self, name: &str, page: usize) {
        self.docs_mut()
            .entry(name.to_string())
            .or_default()
            .failing_pages
            .insert(page);
    }

    /// Make every open fail as if the engine never initialized
    pub fn take_offline(&self, reason: &str) {
        *self
            .inner
            .offline
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(reason.to_string());
    }

    /// Clear injected page failures for `name`
    pub fn clear_failures(&self, name: &str) {
        if let Some(spec) = self.docs_mut().get_mut(name) {
            spec.failing_pages.clear();
        }
    }

    /// Hold all subsequent opens at the gate until released by name
    pub fn hold_opens(&self) {
        self.inner.hold_opens.store(true, Ordering::SeqCst);
    }

    /// Hold all subsequent renders at the gate until released by
    /// (page, scale)
    pub fn hold_renders(&self) {
        self.inner.hold_renders.store(true, Ordering::SeqCst);
    }

    pub fn release_open(&self, name: &str) {
        self.inner.gate.release(GateKey::Open(name.to_string()));
    }

    pub fn release_render(&self, page: usize, scale: f32) {
        self.inner.gate.release(GateKey::Render {
            page,
            scale_millionths: millionths(scale),
        });
    }

    /// Completed open calls
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Completed render calls (including failed ones)
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.inner.render_count.load(Ordering::SeqCst)
    }

    fn docs_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, DocumentSpec>> {
        self.inner
            .docs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RenderEngine for FakeEngine {
    fn open(&self, locator: &SourceLocator) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let name = locator_name(locator);

        let offline = self
            .inner
            .offline
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(reason) = offline {
            return Err(EngineError::Unavailable(reason));
        }

        if self.inner.hold_opens.load(Ordering::SeqCst) {
            self.inner.gate.wait(&GateKey::Open(name.clone()));
        }
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);

        let spec = self
            .docs_mut()
            .get(&name)
            .cloned()
            .ok_or_else(|| EngineError::OpenDocument(format!("no such document: {name}")))?;

        if let Some(reason) = spec.open_error {
            return Err(EngineError::OpenDocument(reason));
        }

        Ok(Box::new(FakeDocument {
            name,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct FakeDocument {
    name: String,
    inner: Arc<EngineInner>,
}

impl FakeDocument {
    fn spec(&self) -> DocumentSpec {
        self.inner
            .docs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&self.name)
            .cloned()
            .unwrap_or_default()
    }
}

impl DocumentHandle for FakeDocument {
    fn info(&self) -> Result<DocumentInfo, EngineError> {
        let spec = self.spec();
        Ok(DocumentInfo {
            page_count: spec.page_count,
            title: spec.title,
        })
    }

    fn render_page(&self, page: usize, params: &RenderParams) -> Result<Surface, EngineError> {
        if self.inner.hold_renders.load(Ordering::SeqCst) {
            self.inner.gate.wait(&GateKey::Render {
                page,
                scale_millionths: millionths(params.scale),
            });
        }
        self.inner.render_count.fetch_add(1, Ordering::SeqCst);

        if self.spec().failing_pages.contains(&page) {
            return Err(EngineError::RenderPage {
                page,
                reason: "injected render failure".to_string(),
            });
        }

        Ok(Surface {
            pixels: vec![0; 12],
            width: 2,
            height: 2,
            page,
            scale: params.scale,
            rotation: params.rotation,
        })
    }
}

/// Fullscreen host whose notifications are driven by the test, not by the
/// requests themselves.
pub struct ManualFullscreen {
    tx: flume::Sender<bool>,
    rx: flume::Receiver<bool>,
}

impl ManualFullscreen {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    /// Handle for delivering change notifications from the test
    #[must_use]
    pub fn remote(&self) -> FullscreenRemote {
        FullscreenRemote {
            tx: self.tx.clone(),
        }
    }
}

impl Default for ManualFullscreen {
    fn default() -> Self {
        Self::new()
    }
}

impl FullscreenHost for ManualFullscreen {
    fn request(&mut self) -> Result<(), FullscreenError> {
        Ok(())
    }

    fn exit(&mut self) -> Result<(), FullscreenError> {
        Ok(())
    }

    fn changes(&self) -> flume::Receiver<bool> {
        self.rx.clone()
    }
}

/// Delivers host fullscreen notifications on demand
pub struct FullscreenRemote {
    tx: flume::Sender<bool>,
}

impl FullscreenRemote {
    pub fn notify(&self, active: bool) {
        let _ = self.tx.send(active);
    }
}
