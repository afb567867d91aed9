use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use toplevel::headless::{HeadlessBackend, Recorded};
use toplevel::{
    Context, ContextAttributes, DebugFlags, FixedContent, GeometryHints, Monitor, MonitorSet,
    PositionPolicy, Rect, ReconcileState, WindowAttributes, WindowKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context(backend: &HeadlessBackend) -> Context {
    init_tracing();
    let attributes = ContextAttributes::default().with_debug_flags(DebugFlags::empty());
    Context::new(backend.boxed(), attributes).unwrap()
}

fn geometry_requests(backend: &HeadlessBackend) -> Vec<Recorded> {
    backend.requests().into_iter().filter(Recorded::is_geometry).collect()
}

#[test]
fn hints_only_change_does_not_resize() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_default_size(500, 400)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    backend.settle(&context).unwrap();
    backend.take_requests();

    window.set_geometry_hints(false, GeometryHints::default().with_max_size(800, 600));
    backend.settle(&context).unwrap();

    let requests = backend.take_requests();
    assert_eq!(requests.len(), 1);
    assert!(matches!(requests[0], Recorded::SetHints { .. }));
    assert_eq!(window.allocation(), Rect::from_size(500, 400));
}

#[test]
fn second_pass_without_changes_sends_nothing() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    backend.settle(&context).unwrap();
    let last = window.last_request();
    backend.take_requests();

    window.queue_resize();
    backend.settle(&context).unwrap();
    window.queue_resize();
    backend.settle(&context).unwrap();

    assert!(backend.requests().is_empty());
    assert_eq!(window.last_request(), last);
}

#[test]
fn unexpected_notifies_never_go_below_zero() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_default_size(400, 300)
            .with_content(FixedContent::new(100, 100)),
    );
    window.show();
    backend.settle(&context).unwrap();
    let native = window.native_window().unwrap();

    let accepted = Rc::new(RefCell::new(Vec::new()));
    let log = accepted.clone();
    window.on_configure_accepted(move |rect| log.borrow_mut().push(rect.size()));

    for width in [410, 420, 430] {
        backend.configure(native, Rect::new(0, 0, width, 300));
    }
    // The same size again is merely acknowledged.
    backend.configure(native, Rect::new(0, 0, 430, 300));
    backend.settle(&context).unwrap();

    assert_eq!(window.reconcile_state(), ReconcileState::Idle);
    assert_eq!(window.allocation(), Rect::from_size(430, 300));
    assert_eq!(accepted.borrow().last().map(|size| size.width), Some(430));
    assert!(backend.requests().contains(&Recorded::ConfigureFinished(native)));
}

#[test]
fn oversized_window_is_clamped_to_the_monitor_origin() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(2500, 1200)),
    );

    window.show();
    backend.settle(&context).unwrap();
    assert_eq!(window.last_request().unwrap().rect, Rect::new(0, 0, 2500, 1200));
}

#[test]
fn centering_follows_the_pointer_monitor() {
    let backend = HeadlessBackend::new(3840, 1080);
    backend.set_monitors(MonitorSet::new(vec![
        Monitor::from_geometry(Rect::new(1920, 0, 1920, 1080)),
        Monitor::from_geometry(Rect::new(0, 0, 1920, 1080)),
    ]));
    backend.set_pointer(2500, 300);
    let context = context(&backend);
    assert_eq!(context.screen().n_monitors(), 2);

    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    let native = window.native_window().unwrap();
    let expected = Recorded::Move { window: native, x: 2730, y: 440 };
    assert!(geometry_requests(&backend).contains(&expected));

    // A pointer on another screen falls back to the middle monitor.
    backend.set_pointer_same_screen(false);
    let other = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(300, 200)),
    );
    other.show();
    let native = other.native_window().unwrap();
    let expected = Recorded::Move { window: native, x: 2730, y: 440 };
    assert!(geometry_requests(&backend).contains(&expected));
}

#[test]
fn centering_uses_the_work_area() {
    let backend = HeadlessBackend::new(1920, 1080);
    backend.set_work_area(Some(Rect::new(0, 40, 1920, 1040)));
    let context = context(&backend);

    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    let native = window.native_window().unwrap();
    let expected = Recorded::Move { window: native, x: 810, y: 460 };
    assert!(geometry_requests(&backend).contains(&expected));
}

#[test]
fn center_always_recenters_after_a_resize() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::CenterAlways)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    backend.settle(&context).unwrap();
    let native = window.native_window().unwrap();
    backend.take_requests();

    window.resize(500, 400);
    backend.settle(&context).unwrap();

    assert!(geometry_requests(&backend)
        .contains(&Recorded::MoveResize { window: native, rect: Rect::new(710, 340, 500, 400) }));
    assert_eq!(window.allocation(), Rect::from_size(500, 400));
    assert_eq!(window.reconcile_state().pending(), 0);
}

#[test]
fn dialog_is_centered_on_its_parent() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let parent = context.create_window(
        WindowAttributes::default()
            .with_default_size(800, 600)
            .with_content(FixedContent::new(100, 100)),
    );
    parent.show();
    backend.settle(&context).unwrap();
    parent.move_to(100, 100);
    backend.settle(&context).unwrap();

    let dialog = context.create_window(
        WindowAttributes::default()
            .with_transient_for(&parent)
            .with_position(PositionPolicy::CenterOnParent)
            .with_content(FixedContent::new(200, 100)),
    );
    dialog.show();
    backend.settle(&context).unwrap();

    assert_eq!(dialog.last_request().unwrap().rect, Rect::new(400, 350, 200, 100));
    let dialog_native = dialog.native_window().unwrap();
    assert!(backend.requests().iter().any(|request| matches!(
        request,
        Recorded::Create { window, attributes }
            if *window == dialog_native && attributes.transient_for == parent.native_window()
    )));
}

#[test]
fn mouse_placement_is_clamped_to_the_monitor() {
    let backend = HeadlessBackend::new(1920, 1080);
    backend.set_pointer(1900, 20);
    let context = context(&backend);

    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Mouse)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    assert_eq!(window.last_request().unwrap().rect, Rect::new(1620, 0, 300, 200));
}

#[test]
fn failed_pointer_query_falls_back_to_the_middle_monitor() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    backend.set_failing_queries(true);

    let window = context.create_window(
        WindowAttributes::default()
            .with_position(PositionPolicy::Center)
            .with_content(FixedContent::new(300, 200)),
    );
    window.show();
    assert_eq!(window.last_request().unwrap().rect, Rect::new(810, 440, 300, 200));
}

#[test]
fn popups_are_allocated_without_waiting() {
    let backend = HeadlessBackend::new(1920, 1080);
    let context = context(&backend);
    let popup = context.create_window(
        WindowAttributes::default()
            .with_kind(WindowKind::Popup)
            .with_default_size(200, 100)
            .with_content(FixedContent::new(50, 50)),
    );
    popup.show();
    backend.settle(&context).unwrap();

    popup.resize(300, 150);
    context.dispatch(Some(Duration::ZERO)).unwrap();

    assert_eq!(popup.allocation(), Rect::from_size(300, 150));
    assert_eq!(popup.reconcile_state().pending(), 0);
    backend.settle(&context).unwrap();
    assert_eq!(popup.reconcile_state(), ReconcileState::Idle);
}

#[test]
fn resize_without_window_manager_stays_pending() {
    let backend = HeadlessBackend::new(1920, 1080);
    backend.set_configure_replies(false);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_default_size(400, 300)
            .with_content(FixedContent::new(100, 100)),
    );
    window.show();
    backend.settle(&context).unwrap();

    window.resize(600, 500);
    backend.settle(&context).unwrap();
    assert_eq!(window.reconcile_state(), ReconcileState::AwaitingNotify { pending: 1 });
    assert_eq!(window.allocation(), Rect::from_size(400, 300));

    // Unmapping forgets what was owed and lets the window draw again.
    let native = window.native_window().unwrap();
    backend.take_requests();
    window.hide();
    assert_eq!(window.reconcile_state(), ReconcileState::Idle);
    assert!(backend.requests().contains(&Recorded::Thaw(native)));
}

#[test]
fn layout_pass_waits_for_the_owed_notify() {
    let backend = HeadlessBackend::new(1920, 1080);
    backend.set_configure_replies(false);
    let context = context(&backend);
    let window = context.create_window(
        WindowAttributes::default()
            .with_default_size(400, 300)
            .with_content(FixedContent::new(100, 100)),
    );
    window.show();
    backend.settle(&context).unwrap();

    window.resize(600, 500);
    backend.settle(&context).unwrap();
    assert_eq!(window.reconcile_state().pending(), 1);
    backend.take_requests();

    window.queue_resize();
    backend.settle(&context).unwrap();
    assert!(backend.take_requests().is_empty());
    assert_eq!(window.allocation(), Rect::from_size(400, 300));

    // The notify for the owed resize runs the held back pass.
    backend.configure(window.native_window().unwrap(), Rect::new(0, 0, 600, 500));
    backend.settle(&context).unwrap();
    assert_eq!(window.allocation(), Rect::from_size(600, 500));
    assert_eq!(window.reconcile_state().pending(), 0);
}
