//! Generation/staleness properties: published surfaces always reflect the
//! last operation issued, never an intermediate one, regardless of async
//! completion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use paperview::test_utils::FakeEngine;
use paperview::{PageSlot, Status, ViewMode, Viewer, ViewerConfig};

const SETTLE: Duration = Duration::from_secs(5);

fn load_ready(viewer: &mut Viewer, name: &str) {
    viewer.load_document(FakeEngine::locator(name));
    viewer.wait_until_settled(SETTLE);
    assert_eq!(viewer.status(), &Status::Ready);
}

/// Block until the engine has completed `count` render calls.
fn wait_render_count(engine: &FakeEngine, count: usize) {
    let deadline = Instant::now() + SETTLE;
    while engine.render_count() < count {
        assert!(
            Instant::now() < deadline,
            "engine never reached {count} renders (at {})",
            engine.render_count()
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Poll until `predicate` holds.
fn wait_for(viewer: &mut Viewer, predicate: impl Fn(&Viewer) -> bool) {
    let deadline = Instant::now() + SETTLE;
    loop {
        viewer.poll();
        if predicate(viewer) {
            return;
        }
        assert!(Instant::now() < deadline, "condition never reached");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn superseded_render_is_discarded_even_when_it_finishes_first() {
    let engine = FakeEngine::new();
    engine.add_document("doc.pdf", 5);
    let mut viewer = Viewer::new(Arc::new(engine.clone()), ViewerConfig::default());
    load_ready(&mut viewer, "doc.pdf");
    let renders_after_load = engine.render_count();

    engine.hold_renders();
    viewer.set_page(3).unwrap();
    viewer.set_scale(1.5);

    // Let the superseded page-3-at-1.0 render finish first.
    engine.release_render(3, 1.0);
    wait_render_count(&engine, renders_after_load + 1);
    viewer.poll();

    // Its result must not have been published.
    assert!(matches!(viewer.surface(3), Some(PageSlot::Pending)));
    assert!(!viewer.is_settled());

    engine.release_render(3, 1.5);
    viewer.wait_until_settled(SETTLE);

    assert_eq!(viewer.status(), &Status::Ready);
    assert_eq!(viewer.current_page(), 3);
    assert_eq!(viewer.surfaces().len(), 1);
    let surface = viewer.surface(3).and_then(PageSlot::surface).unwrap();
    assert_eq!(surface.page, 3);
    assert_eq!(surface.scale, 1.5);
}

#[test]
fn rapid_scale_changes_publish_only_the_last() {
    let engine = FakeEngine::new();
    engine.add_document("doc.pdf", 2);
    let mut viewer = Viewer::new(Arc::new(engine.clone()), ViewerConfig::default());
    load_ready(&mut viewer, "doc.pdf");

    engine.hold_renders();
    viewer.set_scale(0.5);
    viewer.set_scale(2.0);
    viewer.set_scale(1.5);

    // Release the intermediates out of order.
    engine.release_render(1, 2.0);
    engine.release_render(1, 0.5);
    engine.release_render(1, 1.5);
    viewer.wait_until_settled(SETTLE);

    assert_eq!(viewer.status(), &Status::Ready);
    assert_eq!(viewer.surfaces().len(), 1);
    let surface = viewer.surface(1).and_then(PageSlot::surface).unwrap();
    assert_eq!(surface.scale, 1.5);
}

#[test]
fn replacing_the_document_discards_renders_from_the_old_pool() {
    let engine = FakeEngine::new();
    engine.add_document("a.pdf", 2);
    engine.add_document("b.pdf", 3);
    let mut viewer = Viewer::new(Arc::new(engine.clone()), ViewerConfig::default());

    engine.hold_renders();
    viewer.load_document(FakeEngine::locator("a.pdf"));
    wait_for(&mut viewer, |v| matches!(v.status(), Status::Rendering));

    viewer.load_document(FakeEngine::locator("b.pdf"));

    // Both pools render page 1 at scale 1.0; only the new pool's result may
    // be published.
    engine.release_render(1, 1.0);
    viewer.wait_until_settled(SETTLE);

    assert_eq!(viewer.page_count(), 3);
    assert_eq!(viewer.status(), &Status::Ready);
    assert!(viewer.surface(1).is_some_and(PageSlot::is_ready));
}

#[test]
fn a_newer_load_supersedes_an_older_one_by_generation() {
    let engine = FakeEngine::new();
    engine.add_document("a.pdf", 5);
    engine.add_document("b.pdf", 3);
    let mut viewer = Viewer::new(Arc::new(engine.clone()), ViewerConfig::default());

    engine.hold_opens();
    viewer.load_document(FakeEngine::locator("a.pdf"));
    viewer.load_document(FakeEngine::locator("b.pdf"));

    // The newer document opens first.
    engine.release_open("b.pdf");
    viewer.wait_until_settled(SETTLE);
    assert_eq!(viewer.page_count(), 3);
    assert_eq!(viewer.status(), &Status::Ready);

    // The superseded open completes afterwards and must change nothing.
    // Both pools run two workers, so four opens complete in total.
    engine.release_open("a.pdf");
    let deadline = Instant::now() + SETTLE;
    while engine.open_count() < 4 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    std::thread::sleep(Duration::from_millis(20));
    viewer.poll();

    assert_eq!(viewer.page_count(), 3);
    assert_eq!(viewer.status(), &Status::Ready);
}

#[test]
fn continuous_mode_renders_fan_out_across_the_pool() {
    let engine = FakeEngine::new();
    engine.add_document("doc.pdf", 10);
    let config = ViewerConfig {
        view_mode: ViewMode::Continuous,
        workers: 4,
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(Arc::new(engine.clone()), config);

    viewer.load_document(FakeEngine::locator("doc.pdf"));
    viewer.wait_until_settled(SETTLE);

    assert_eq!(viewer.status(), &Status::Ready);
    assert_eq!(viewer.surfaces().len(), 10);
    assert!(viewer.surfaces().values().all(PageSlot::is_ready));
    assert_eq!(engine.render_count(), 10);
}

#[test]
fn dropping_the_viewer_with_renders_in_flight_does_not_block() {
    let engine = FakeEngine::new();
    engine.add_document("doc.pdf", 3);
    let mut viewer = Viewer::new(Arc::new(engine.clone()), ViewerConfig::default());
    load_ready(&mut viewer, "doc.pdf");

    engine.hold_renders();
    viewer.set_scale(2.0);
    drop(viewer);
}
