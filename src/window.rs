//! The [`Window`] struct and associated types.
//!
//! A [`Window`] owns the geometry state of one toplevel: the lifecycle flags, the lazily
//! created [`GeometryInfo`] and the [`ReconcileState`] tracking configure notifies owed by the
//! window system. Geometry operations do not talk to the window system directly. They update
//! the state and queue a reconciliation pass, which runs from the context's event loop and
//! sends whatever the [`plan_pass`] planner decides.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use dpi::{PhysicalPosition, PhysicalSize};
use smol_str::SmolStr;
use toplevel_core::backend::{NativeWindow, NativeWindowAttributes, WindowKind};
use toplevel_core::geometry::{Gravity, Rect};
use toplevel_core::hints::{GeometryHints, HintFlags};
use toplevel_core::state::{ModifierType, WindowState};
use tracing::{debug, trace, warn};

use crate::configure::{
    compute_configure_request, constrain_position, GeometryInfo, LastRequest, PointerSample,
    PositionPolicy, SizeRequest, Surroundings, WindowGeometry,
};
use crate::content::{Content, FixedContent};
use crate::context::{Context, ContextShared, DebugFlags};
use crate::deferred::Deferred;
use crate::group::WindowGroup;
use crate::icon::Icon;
use crate::keys::{MnemonicTable, WidgetId};
use crate::observer::Observers;
use crate::parse::{self, GeometryMask};
use crate::reconcile::{plan_pass, PassInput, PassOutcome, ReconcileState, WireRequest};
use crate::startup::{startup_id_is_fake, startup_id_timestamp};

/// Identifier of a window. Unique for each window within a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

impl WindowId {
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// A state change reported by the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// The flags that changed.
    pub changed: WindowState,
    /// The complete new state.
    pub new: WindowState,
}

/// Attributes used when creating a window.
#[derive(Debug)]
pub struct WindowAttributes {
    pub(crate) kind: WindowKind,
    pub(crate) title: Option<SmolStr>,
    pub(crate) resizable: bool,
    pub(crate) default_size: Option<(i32, i32)>,
    pub(crate) position: PositionPolicy,
    pub(crate) gravity: Gravity,
    pub(crate) transient_for: Option<Window>,
    pub(crate) initially: WindowState,
    pub(crate) geometry_hints: Option<(bool, GeometryHints)>,
    pub(crate) startup_id: Option<SmolStr>,
    pub(crate) content: Box<dyn Content>,
}

impl Default for WindowAttributes {
    #[inline]
    fn default() -> WindowAttributes {
        WindowAttributes {
            kind: WindowKind::Toplevel,
            title: None,
            resizable: true,
            default_size: None,
            position: PositionPolicy::None,
            gravity: Gravity::NorthWest,
            transient_for: None,
            initially: WindowState::empty(),
            geometry_hints: None,
            startup_id: None,
            content: Box::new(FixedContent::default()),
        }
    }
}

impl WindowAttributes {
    /// Sets the kind of window.
    ///
    /// [`WindowKind::Popup`] windows bypass the window manager and are resized without waiting
    /// for a configure notify.
    #[inline]
    pub fn with_kind(mut self, kind: WindowKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    pub fn with_title(mut self, title: impl Into<SmolStr>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets whether the window is resizable or not.
    ///
    /// The default is `true`. Windows that are not resizable advertise their natural size as
    /// their maximum size.
    #[inline]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// See [`Window::set_default_size`].
    #[inline]
    pub fn with_default_size(mut self, width: i32, height: i32) -> Self {
        self.default_size = Some((width, height));
        self
    }

    #[inline]
    pub fn with_position(mut self, policy: PositionPolicy) -> Self {
        self.position = policy;
        self
    }

    #[inline]
    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    #[inline]
    pub fn with_transient_for(mut self, parent: &Window) -> Self {
        self.transient_for = Some(parent.clone());
        self
    }

    #[inline]
    pub fn with_iconified(mut self, iconified: bool) -> Self {
        self.initially.set(WindowState::ICONIFIED, iconified);
        self
    }

    #[inline]
    pub fn with_maximized(mut self, maximized: bool) -> Self {
        self.initially.set(WindowState::MAXIMIZED, maximized);
        self
    }

    #[inline]
    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.initially.set(WindowState::STICKY, sticky);
        self
    }

    #[inline]
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.initially.set(WindowState::FULLSCREEN, fullscreen);
        self
    }

    #[inline]
    pub fn with_keep_above(mut self, above: bool) -> Self {
        self.initially.set(WindowState::ABOVE, above);
        if above {
            self.initially.remove(WindowState::BELOW);
        }
        self
    }

    #[inline]
    pub fn with_keep_below(mut self, below: bool) -> Self {
        self.initially.set(WindowState::BELOW, below);
        if below {
            self.initially.remove(WindowState::ABOVE);
        }
        self
    }

    /// See [`Window::set_geometry_hints`].
    #[inline]
    pub fn with_geometry_hints(mut self, geometry_widget: bool, hints: GeometryHints) -> Self {
        self.geometry_hints = Some((geometry_widget, hints));
        self
    }

    /// The startup notification id the window completes when it is first mapped.
    #[inline]
    pub fn with_startup_id(mut self, startup_id: impl Into<SmolStr>) -> Self {
        self.startup_id = Some(startup_id.into());
        self
    }

    #[inline]
    pub fn with_content(mut self, content: impl Content + 'static) -> Self {
        self.content = Box::new(content);
        self
    }
}

#[derive(Default)]
struct WindowObservers {
    configure_accepted: Observers<Rect>,
    state_changed: Observers<StateChange>,
    keys_changed: Observers<()>,
    mnemonics_visible_changed: Observers<bool>,
    delete_request: Observers<()>,
}

impl WindowObservers {
    fn clear(&self) {
        self.configure_accepted.clear();
        self.state_changed.clear();
        self.keys_changed.clear();
        self.mnemonics_visible_changed.clear();
        self.delete_request.clear();
    }
}

#[derive(Debug)]
struct WindowInner {
    native: Option<NativeWindow>,
    kind: WindowKind,
    title: Option<SmolStr>,
    content: Box<dyn Content>,
    /// `(0, 0)` based.
    allocation: Rect,
    alloc_needed: bool,

    visible: bool,
    mapped: bool,
    need_default_size: bool,
    need_default_position: bool,
    destroyed: bool,

    reconcile: ReconcileState,
    resize_queued: bool,

    policy: PositionPolicy,
    gravity: Gravity,
    resizable: bool,
    geometry: Option<GeometryInfo>,

    transient_parent: Option<Weak<WindowShared>>,
    /// Joined the parent's group when the parent was set.
    transient_parent_group: bool,
    group: Option<WindowGroup>,

    /// State requested for the next map.
    initially: WindowState,
    /// State last reported by the window manager.
    state: WindowState,

    icons: Vec<Icon>,
    startup_id: Option<SmolStr>,
    focus_on_map: bool,
    initial_timestamp: Option<u32>,

    mnemonics: MnemonicTable,
    mnemonics_visible: bool,
    mnemonics_visible_set: bool,
}

impl WindowInner {
    fn compute_request(&mut self, surroundings: &Surroundings<'_>) -> (Rect, GeometryHints) {
        let window = WindowGeometry {
            info: self.geometry.as_ref(),
            need_default_size: self.need_default_size,
            need_default_position: self.need_default_position,
            policy: self.policy,
            gravity: self.gravity,
            resizable: self.resizable,
            allocation: self.allocation,
        };
        compute_configure_request(self.content.as_mut(), &window, surroundings)
    }

    fn geometry_info(&mut self) -> &mut GeometryInfo {
        self.geometry.get_or_insert_with(GeometryInfo::default)
    }

    fn realized_native(&self) -> Option<NativeWindow> {
        self.native.filter(|_| !self.destroyed)
    }

    fn mapped_native(&self) -> Option<NativeWindow> {
        self.native.filter(|_| self.mapped)
    }
}

pub(crate) struct WindowShared {
    pub(crate) id: WindowId,
    ctx: Rc<ContextShared>,
    inner: RefCell<WindowInner>,
    observers: WindowObservers,
    keys_changed: Deferred,
    mnemonics_timer: Deferred,
}

impl Drop for WindowShared {
    fn drop(&mut self) {
        self.keys_changed.cancel();
        self.mnemonics_timer.cancel();

        if let Some(native) = self.inner.get_mut().native.take() {
            if let Ok(mut backend) = self.ctx.backend.try_borrow_mut() {
                if let Err(err) = backend.destroy_window(native) {
                    debug!(?native, "failed to destroy dropped window: {err}");
                }
            }
        }
    }
}

/// Sample what the request builder needs from outside the window.
fn sample_surroundings(
    ctx: &ContextShared,
    inner: &WindowInner,
) -> (Option<PointerSample>, Option<Rect>) {
    let backend = ctx.backend.borrow();

    let pointer = match inner.policy {
        PositionPolicy::Center | PositionPolicy::CenterAlways | PositionPolicy::Mouse => {
            match backend.query_pointer(None) {
                Ok(state) => Some(PointerSample {
                    position: state.root_position(),
                    same_screen: state.same_screen,
                }),
                Err(err) => {
                    debug!("pointer query failed: {err}");
                    None
                },
            }
        },
        PositionPolicy::None | PositionPolicy::CenterOnParent => None,
    };

    let parent = inner.transient_parent.as_ref().and_then(Weak::upgrade).and_then(|parent| {
        let parent = parent.inner.try_borrow().ok()?;
        let native = parent.mapped_native()?;
        match backend.window_origin(native) {
            Ok(origin) => Some(Rect::from((origin, parent.allocation.size()))),
            Err(err) => {
                debug!(?native, "transient parent origin query failed: {err}");
                None
            },
        }
    });

    (pointer, parent)
}

fn normalize_default_dimension(value: i32) -> i32 {
    match value {
        0 => 1,
        value if value < 0 => -1,
        value => value,
    }
}

/// A toplevel window.
///
/// Created through [`Context::create_window`]. Cheap to clone; clones refer to the same
/// window. The window lives until [`Window::destroy`] is called or the last clone is dropped.
#[derive(Clone)]
pub struct Window {
    shared: Rc<WindowShared>,
}

impl Window {
    pub(crate) fn new(ctx: Rc<ContextShared>, id: WindowId, attributes: WindowAttributes) -> Self {
        let WindowAttributes {
            kind,
            title,
            resizable,
            default_size,
            position,
            gravity,
            transient_for,
            initially,
            geometry_hints,
            startup_id,
            content,
        } = attributes;

        let inner = WindowInner {
            native: None,
            kind,
            title,
            content,
            allocation: Rect::from_size(1, 1),
            alloc_needed: true,
            visible: false,
            mapped: false,
            need_default_size: true,
            need_default_position: true,
            destroyed: false,
            reconcile: ReconcileState::Idle,
            resize_queued: false,
            policy: position,
            gravity,
            resizable,
            geometry: None,
            transient_parent: None,
            transient_parent_group: false,
            group: None,
            initially,
            state: WindowState::WITHDRAWN,
            icons: Vec::new(),
            startup_id,
            focus_on_map: false,
            initial_timestamp: None,
            mnemonics: MnemonicTable::new(),
            mnemonics_visible: true,
            mnemonics_visible_set: false,
        };

        let handle = ctx.handle.clone();
        let window = Window {
            shared: Rc::new(WindowShared {
                id,
                ctx,
                inner: RefCell::new(inner),
                observers: WindowObservers::default(),
                keys_changed: Deferred::new(handle.clone()),
                mnemonics_timer: Deferred::new(handle),
            }),
        };

        if let Some((width, height)) = default_size {
            window.set_default_size(width, height);
        }
        if let Some((geometry_widget, hints)) = geometry_hints {
            window.set_geometry_hints(geometry_widget, hints);
        }
        if let Some(parent) = transient_for {
            window.set_transient_for(Some(&parent));
        }

        window
    }

    pub(crate) fn downgrade(&self) -> Weak<WindowShared> {
        Rc::downgrade(&self.shared)
    }

    pub(crate) fn upgrade(weak: &Weak<WindowShared>) -> Option<Window> {
        weak.upgrade().map(|shared| Window { shared })
    }

    fn ctx(&self) -> &ContextShared {
        &self.shared.ctx
    }

    pub fn id(&self) -> WindowId {
        self.shared.id
    }

    /// The context the window was created in.
    pub fn context(&self) -> Context {
        Context { shared: self.shared.ctx.clone() }
    }

    pub fn kind(&self) -> WindowKind {
        self.shared.inner.borrow().kind
    }

    pub fn title(&self) -> Option<SmolStr> {
        self.shared.inner.borrow().title.clone()
    }

    /// The native window, if the window is realized.
    pub fn native_window(&self) -> Option<NativeWindow> {
        self.shared.inner.borrow().realized_native()
    }

    pub fn is_visible(&self) -> bool {
        self.shared.inner.borrow().visible
    }

    pub fn is_mapped(&self) -> bool {
        self.shared.inner.borrow().mapped
    }

    pub fn is_realized(&self) -> bool {
        self.native_window().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.inner.borrow().destroyed
    }

    /// The size the content was last allocated, `(0, 0)` based.
    pub fn allocation(&self) -> Rect {
        self.shared.inner.borrow().allocation
    }

    /// The reconciliation state: how many configure notifies are owed.
    pub fn reconcile_state(&self) -> ReconcileState {
        self.shared.inner.borrow().reconcile
    }

    /// The most recently sent configure request, if any geometry was ever computed.
    pub fn last_request(&self) -> Option<LastRequest> {
        self.shared.inner.borrow().geometry.as_ref().map(|info| info.last)
    }

    /// Run `f` with the content and queue a layout pass afterwards.
    pub fn with_content<R>(&self, f: impl FnOnce(&mut dyn Content) -> R) -> R {
        let result = f(self.shared.inner.borrow_mut().content.as_mut());
        self.queue_resize();
        result
    }

    /// Queue a layout pass, e.g. because the content changed its size request.
    ///
    /// While configure notifies are owed, the pass is held back until one arrives.
    pub fn queue_resize(&self) {
        self.queue_pass(true);
    }

    fn queue_pass(&self, layout: bool) {
        let mut inner = self.shared.inner.borrow_mut();
        if !inner.visible || inner.destroyed {
            return;
        }

        if layout && inner.reconcile.pending() > 0 {
            // Every expected notify queues a pass of its own.
            trace!(id = ?self.id(), "holding back layout pass until the window system answers");
            return;
        }

        if inner.resize_queued {
            return;
        }
        inner.resize_queued = true;
        drop(inner);

        let weak = self.downgrade();
        let _ = self.ctx().handle.insert_idle(move |_| {
            if let Some(window) = Window::upgrade(&weak) {
                window.run_pass();
            }
        });
    }

    /// One reconciliation pass: compute the request, diff it against the last one and send
    /// the difference.
    fn run_pass(&self) {
        let ctx = self.ctx();
        let mut guard = self.shared.inner.borrow_mut();
        let inner = &mut *guard;

        inner.resize_queued = false;
        if !inner.visible || inner.destroyed {
            return;
        }
        let Some(native) = inner.native else {
            return;
        };

        let (pointer, parent) = sample_surroundings(ctx, inner);
        let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
        let (request, hints) = inner.compute_request(&surroundings);
        let constrained = constrain_position(inner.policy, &surroundings, request);
        let policy = surroundings.effective_policy(inner.policy);

        let info = inner.geometry.get_or_insert_with(GeometryInfo::default);
        let input = PassInput {
            state: inner.reconcile,
            last: info.last,
            request,
            hints,
            constrained,
            position_constraints_changed: info.position_constraints_changed,
            honor_position: info.initial_position.is_some()
                || (inner.need_default_position && policy != PositionPolicy::None),
            allocation: inner.allocation,
            popup: inner.kind == WindowKind::Popup,
        };

        let plan = plan_pass(&input);
        inner.reconcile = plan.state;
        info.last = plan.last;
        if plan.consumes_one_shots() {
            info.position_constraints_changed = false;
            info.initial_position = None;
            info.resize = None;
        }

        if ctx.attributes.debug.contains(DebugFlags::GEOMETRY) {
            debug!(
                id = ?self.shared.id,
                last = ?input.last.rect,
                ?request,
                allocation = ?input.allocation,
                changes = ?plan.changes,
                pending = input.state.pending(),
                notify_received = input.state.notify_received(),
                outcome = ?plan.outcome,
                "reconciliation pass"
            );
        } else {
            trace!(
                id = ?self.shared.id,
                last = ?input.last.rect,
                ?request,
                allocation = ?input.allocation,
                changes = ?plan.changes,
                pending = input.state.pending(),
                notify_received = input.state.notify_received(),
                outcome = ?plan.outcome,
                "reconciliation pass"
            );
        }

        if let PassOutcome::Accepted { .. } = plan.outcome {
            inner.content.allocate(inner.allocation);
        }

        {
            let mut backend = ctx.backend.borrow_mut();
            for request in &plan.requests {
                let result = match *request {
                    WireRequest::SetHints(ref hints) => backend.set_geometry_hints(native, hints),
                    WireRequest::Move { x, y } => backend.move_window(native, x, y),
                    WireRequest::Resize { width, height } => {
                        backend.resize(native, PhysicalSize::new(width, height))
                    },
                    WireRequest::MoveResize(rect) => backend.move_resize(native, rect),
                    WireRequest::FreezeUpdates => backend.freeze_updates(native),
                    WireRequest::ConfigureFinished => backend.configure_finished(native),
                };

                if let Err(err) = result {
                    warn!(?native, ?request, "window system request failed: {err}");
                }
            }
        }

        let accepted = match plan.outcome {
            PassOutcome::Accepted { .. } => Some(inner.allocation),
            PassOutcome::AllocateNow(rect) => {
                inner.allocation = rect;
                inner.content.allocate(rect);
                Some(rect)
            },
            PassOutcome::Unchanged => {
                inner.content.allocate(inner.allocation);
                None
            },
            PassOutcome::AwaitingNotify => None,
        };
        drop(guard);

        if let Some(rect) = accepted {
            self.shared.observers.configure_accepted.emit(&rect);
        }

        if plan.outcome == (PassOutcome::Accepted { requeue: true }) {
            self.queue_pass(false);
        }
    }

    /// Make the window visible.
    ///
    /// The first time, the configure request is computed and the content allocated to it
    /// before the native window is created, so the native window starts out with the right
    /// size.
    pub fn show(&self) {
        let ctx = self.ctx();
        let need_resize;
        {
            let mut guard = self.shared.inner.borrow_mut();
            let inner = &mut *guard;
            if inner.visible || inner.destroyed {
                return;
            }
            inner.visible = true;

            need_resize = inner.alloc_needed || inner.native.is_none();
            if need_resize {
                let (pointer, parent) = sample_surroundings(ctx, inner);
                let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
                let (request, _) = inner.compute_request(&surroundings);

                let info = inner.geometry_info();
                info.last.rect.width = request.width;
                info.last.rect.height = request.height;

                inner.allocation = Rect::from_size(request.width, request.height);
                inner.alloc_needed = false;
                inner.content.allocate(inner.allocation);

                if let Some(native) = inner.native {
                    if let Err(err) = ctx.backend.borrow_mut().move_resize(native, request) {
                        warn!(?native, "failed to resize window before showing it: {err}");
                    }
                }
            }
        }

        if need_resize {
            self.realize();
        }

        self.run_pass();
        self.map();
    }

    /// Hide the window. Its size is kept for the next [`Window::show`]; its position is not.
    pub fn hide(&self) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            if !inner.visible {
                return;
            }
            inner.visible = false;
        }

        self.unmap();
    }

    /// Hide the window, forget its size and show it again as if for the first time.
    pub fn reshow_with_initial_size(&self) {
        self.hide();
        self.unrealize();
        self.show();
    }

    /// Create the native window.
    pub fn realize(&self) {
        let ctx = self.ctx();
        let mut guard = self.shared.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.native.is_some() || inner.destroyed {
            return;
        }

        if inner.alloc_needed {
            let (pointer, parent) = sample_surroundings(ctx, inner);
            let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
            let (request, _) = inner.compute_request(&surroundings);
            inner.allocation = Rect::from_size(request.width, request.height);
            inner.alloc_needed = false;
            inner.content.allocate(inner.allocation);
        }

        let transient_for = inner
            .transient_parent
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|parent| {
                let native = parent.inner.try_borrow().ok()?.realized_native();
                native
            });

        let attributes = NativeWindowAttributes {
            kind: inner.kind,
            rect: inner.allocation,
            title: inner.title.clone(),
            transient_for,
        };

        match ctx.backend.borrow_mut().create_window(&attributes) {
            Ok(native) => {
                debug!(id = ?self.shared.id, ?native, "window realized");
                inner.native = Some(native);
            },
            Err(err) => warn!(id = ?self.shared.id, "failed to create native window: {err}"),
        }
    }

    /// Destroy the native window. The next [`Window::show`] starts from a default size again.
    pub fn unrealize(&self) {
        if self.is_mapped() {
            self.unmap();
        }

        let mut inner = self.shared.inner.borrow_mut();
        let Some(native) = inner.native.take() else {
            return;
        };

        if let Err(err) = self.ctx().backend.borrow_mut().destroy_window(native) {
            warn!(?native, "failed to destroy native window: {err}");
        }

        inner.need_default_size = true;
        inner.reconcile.reset();
        if let Some(info) = inner.geometry.as_mut() {
            info.resize = None;
            info.last = LastRequest::default();
        }
        debug!(id = ?self.shared.id, ?native, "window unrealized");
    }

    fn map(&self) {
        let ctx = self.ctx();
        let hide_mnemonics;
        {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.mapped {
                return;
            }
            let Some(native) = inner.native else {
                return;
            };
            inner.mapped = true;

            let mut backend = ctx.backend.borrow_mut();
            let initially = inner.initially;
            for state in [
                WindowState::MAXIMIZED,
                WindowState::STICKY,
                WindowState::ICONIFIED,
                WindowState::FULLSCREEN,
                WindowState::ABOVE,
                WindowState::BELOW,
            ] {
                if let Err(err) = backend.change_state(native, state, initially.contains(state)) {
                    warn!(?native, ?state, "failed to apply initial state: {err}");
                }
            }

            inner.need_default_size = false;
            inner.need_default_position = false;

            if let Err(err) = backend.show(native) {
                warn!(?native, "failed to show window: {err}");
            }

            if mem::take(&mut inner.focus_on_map) {
                let timestamp = inner.initial_timestamp.take();
                if let Err(err) = backend.focus(native, timestamp) {
                    warn!(?native, "failed to focus window: {err}");
                }
            }

            if ctx.attributes.startup_notification {
                let result = match inner.startup_id.take() {
                    Some(id) if startup_id_is_fake(&id) => Ok(()),
                    Some(id) => backend.notify_startup_complete(Some(id.as_str())),
                    None if !ctx.startup_sent.replace(true) => {
                        backend.notify_startup_complete(None)
                    },
                    None => Ok(()),
                };
                if let Err(err) = result {
                    warn!("failed to complete startup notification: {err}");
                }
            }

            hide_mnemonics = ctx.attributes.auto_mnemonics && !inner.mnemonics_visible_set;
        }

        if hide_mnemonics {
            self.set_mnemonics_visible(false);
        }
    }

    fn unmap(&self) {
        let mut guard = self.shared.inner.borrow_mut();
        let inner = &mut *guard;
        if !inner.mapped {
            return;
        }
        inner.mapped = false;

        if let Some(native) = inner.native {
            let mut backend = self.ctx().backend.borrow_mut();
            if let Err(err) = backend.withdraw(native) {
                warn!(?native, "failed to withdraw window: {err}");
            }
            // The notify that would thaw the window is no longer waited for.
            if inner.reconcile.pending() > 0 {
                if let Err(err) = backend.thaw_updates(native) {
                    warn!(?native, "failed to thaw updates: {err}");
                }
            }
        }

        inner.reconcile.reset();
        inner.need_default_position = true;
        if let Some(info) = inner.geometry.as_mut() {
            info.initial_position = None;
            info.position_constraints_changed = false;
        }

        // Showing again restores what the window manager last reported.
        for state in [
            WindowState::ICONIFIED,
            WindowState::MAXIMIZED,
            WindowState::STICKY,
            WindowState::ABOVE,
            WindowState::BELOW,
            WindowState::FULLSCREEN,
        ] {
            inner.initially.set(state, inner.state.contains(state));
        }
    }

    /// Hide and unrealize the window and drop everything it holds.
    ///
    /// The window is removed from the context and from its group, dropping its grabs.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }

        self.hide();
        self.unrealize();

        let group = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.destroyed = true;
            inner.mnemonics.clear();
            inner.icons.clear();
            inner.transient_parent = None;
            inner.transient_parent_group = false;
            inner.startup_id = None;
            inner.group.take()
        };

        match group {
            Some(group) => group.cleanup_grabs(self.id()),
            None => self.ctx().default_group.cleanup_grabs(self.id()),
        }

        self.shared.keys_changed.cancel();
        self.shared.mnemonics_timer.cancel();
        self.shared.observers.clear();
        self.ctx().forget_toplevel(self.id());
        debug!(id = ?self.shared.id, "window destroyed");
    }

    /// Request a new size. The request is consumed by the next reconciliation pass.
    pub fn resize(&self, width: i32, height: i32) {
        self.request_resize(width, height, false);
    }

    /// Like [`Window::resize`], in resize increments of the geometry hints.
    pub fn resize_to_geometry(&self, width: i32, height: i32) {
        self.request_resize(width, height, true);
    }

    fn request_resize(&self, width: i32, height: i32, in_increments: bool) {
        if width <= 0 || height <= 0 {
            debug_assert!(false, "window size must be positive, got {width}x{height}");
            warn!(width, height, "ignoring resize to a non-positive size");
            return;
        }

        self.shared.inner.borrow_mut().geometry_info().resize =
            Some(SizeRequest { width, height, in_increments });
        self.queue_pass(false);
    }

    /// The current size: the native window's when mapped, otherwise the size the window
    /// would request.
    pub fn size(&self) -> PhysicalSize<i32> {
        let ctx = self.ctx();
        let mut guard = self.shared.inner.borrow_mut();
        let inner = &mut *guard;

        if let Some(native) = inner.mapped_native() {
            return match ctx.backend.borrow().window_size(native) {
                Ok(size) => size,
                Err(err) => {
                    debug!(?native, "window size query failed: {err}");
                    inner.allocation.size()
                },
            };
        }

        let (pointer, parent) = sample_surroundings(ctx, inner);
        let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
        inner.compute_request(&surroundings).0.size()
    }

    /// Set the size used the first time the window is shown.
    ///
    /// `-1` unsets a dimension and `0` is taken as `1`.
    pub fn set_default_size(&self, width: i32, height: i32) {
        self.set_default_size_internal(width, height, false);
    }

    /// Like [`Window::set_default_size`], in resize increments of the geometry hints.
    pub fn set_default_geometry(&self, width: i32, height: i32) {
        self.set_default_size_internal(width, height, true);
    }

    fn set_default_size_internal(&self, width: i32, height: i32, is_geometry: bool) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            let info = inner.geometry_info();
            info.default_is_geometry = is_geometry;
            info.default_width = normalize_default_dimension(width);
            info.default_height = normalize_default_dimension(height);
        }
        self.queue_pass(false);
    }

    /// The default size, `-1` for unset dimensions.
    pub fn default_size(&self) -> (i32, i32) {
        self.shared
            .inner
            .borrow()
            .geometry
            .as_ref()
            .map_or((-1, -1), |info| (info.default_width, info.default_height))
    }

    pub fn set_resizable(&self, resizable: bool) {
        self.shared.inner.borrow_mut().resizable = resizable;
        self.queue_pass(false);
    }

    pub fn is_resizable(&self) -> bool {
        self.shared.inner.borrow().resizable
    }

    /// Set geometry hints.
    ///
    /// With `geometry_widget`, the size fields refer to the geometry widget inside the
    /// content rather than to the whole window. A [`HintFlags::WIN_GRAVITY`] flag sets the
    /// window's gravity.
    pub fn set_geometry_hints(&self, geometry_widget: bool, hints: GeometryHints) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            let info = inner.geometry_info();
            info.hints = hints;
            info.hints.flags.remove(HintFlags::WIN_GRAVITY);
            info.geometry_widget = geometry_widget;
        }

        if hints.flags.contains(HintFlags::WIN_GRAVITY) {
            self.set_gravity(hints.win_gravity);
        }
        self.queue_pass(false);
    }

    /// Move the window.
    ///
    /// A mapped window is moved right away. Otherwise the position is used when the window
    /// is next placed.
    pub fn move_to(&self, x: i32, y: i32) {
        let ctx = self.ctx();
        {
            let mut guard = self.shared.inner.borrow_mut();
            let inner = &mut *guard;

            if let Some(native) = inner.mapped_native() {
                inner.geometry_info().position_constraints_changed = false;

                let (pointer, parent) = sample_surroundings(ctx, inner);
                let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
                let rect = constrain_position(
                    inner.policy,
                    &surroundings,
                    Rect::new(x, y, inner.allocation.width, inner.allocation.height),
                );

                if let Err(err) = ctx.backend.borrow_mut().move_window(native, rect.x, rect.y) {
                    warn!(?native, "failed to move window: {err}");
                }
                return;
            }

            inner.geometry_info().initial_position = Some(PhysicalPosition::new(x, y));
        }
        self.queue_pass(false);
    }

    /// The position of the window's reference point, according to its gravity.
    ///
    /// The result can be passed to [`Window::move_to`] to keep the window in place.
    pub fn position(&self) -> PhysicalPosition<i32> {
        let ctx = self.ctx();
        let mut guard = self.shared.inner.borrow_mut();
        let inner = &mut *guard;
        let gravity = inner.gravity;
        let mapped = inner.mapped_native();

        let backend = ctx.backend.borrow();
        if gravity == Gravity::Static {
            if let Some(native) = mapped {
                match backend.window_origin(native) {
                    Ok(origin) => return origin,
                    Err(err) => debug!(?native, "window origin query failed: {err}"),
                }
            }
        }

        let (frame, size) = match mapped {
            Some(native) => {
                let size = backend.window_size(native).unwrap_or_else(|err| {
                    debug!(?native, "window size query failed: {err}");
                    inner.allocation.size()
                });
                match backend.frame_extents(native) {
                    Ok(frame) => (frame, size),
                    Err(err) => {
                        debug!(?native, "frame extents query failed: {err}");
                        (Rect::new(0, 0, size.width, size.height), size)
                    },
                }
            },
            None => {
                drop(backend);
                let (pointer, parent) = sample_surroundings(ctx, inner);
                let surroundings = Surroundings { screen: &ctx.screen, pointer, parent };
                let (request, _) = inner.compute_request(&surroundings);
                (request, request.size())
            },
        };

        if gravity == Gravity::Static {
            return frame.origin();
        }

        let (mut x, mut y) = (frame.x, frame.y);
        match gravity {
            Gravity::North | Gravity::Center | Gravity::South => {
                x += frame.width / 2 - size.width / 2;
            },
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => {
                x += frame.width - size.width;
            },
            _ => {},
        }
        match gravity {
            Gravity::West | Gravity::Center | Gravity::East => {
                y += frame.height / 2 - size.height / 2;
            },
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => {
                y += frame.height - size.height;
            },
            _ => {},
        }

        PhysicalPosition::new(x, y)
    }

    /// Set the placement policy.
    pub fn set_position(&self, policy: PositionPolicy) {
        let mut inner = self.shared.inner.borrow_mut();
        let old = mem::replace(&mut inner.policy, policy);
        if old == PositionPolicy::CenterAlways || policy == PositionPolicy::CenterAlways {
            inner.geometry_info().position_constraints_changed = true;
            drop(inner);
            self.queue_pass(false);
        }
    }

    pub fn position_policy(&self) -> PositionPolicy {
        self.shared.inner.borrow().policy
    }

    pub fn set_gravity(&self, gravity: Gravity) {
        let changed = mem::replace(&mut self.shared.inner.borrow_mut().gravity, gravity) != gravity;
        if changed {
            self.queue_pass(false);
        }
    }

    pub fn gravity(&self) -> Gravity {
        self.shared.inner.borrow().gravity
    }

    /// Apply an X geometry string such as `640x480-0+10`.
    ///
    /// A size becomes the default size in resize increments. Negative offsets are measured
    /// from the right or bottom screen edge and select the matching gravity. Returns whether
    /// the string named anything; an invalid string is ignored with a warning.
    pub fn parse_geometry(&self, geometry: &str) -> bool {
        let Some(parsed) = parse::parse_geometry(geometry) else {
            warn!(geometry, "invalid geometry string");
            return false;
        };

        let mask = parsed.mask;
        let size_set = mask.intersects(GeometryMask::WIDTH | GeometryMask::HEIGHT);
        let pos_set = mask.intersects(GeometryMask::X | GeometryMask::Y);

        if size_set {
            let dimension = |flag: GeometryMask, value: u32| {
                if mask.contains(flag) {
                    i32::try_from(value).unwrap_or(i32::MAX)
                } else {
                    -1
                }
            };
            self.set_default_size_internal(
                dimension(GeometryMask::WIDTH, parsed.width),
                dimension(GeometryMask::HEIGHT, parsed.height),
                true,
            );
        }

        let PhysicalSize { width, height } = self.size();

        let x_negative = mask.contains(GeometryMask::X_NEGATIVE);
        let y_negative = mask.contains(GeometryMask::Y_NEGATIVE);
        let gravity = match (x_negative, y_negative) {
            (true, true) => Gravity::SouthEast,
            (true, false) => Gravity::NorthEast,
            (false, true) => Gravity::SouthWest,
            (false, false) => Gravity::NorthWest,
        };

        let screen = self.ctx().screen.rect();
        let mut x = if mask.contains(GeometryMask::X) { parsed.x } else { 0 };
        let mut y = if mask.contains(GeometryMask::Y) { parsed.y } else { 0 };
        if y_negative {
            y = screen.height - height + y;
        }
        if x_negative {
            x = screen.width - width + x;
        }

        if pos_set {
            self.set_gravity(gravity);
            self.move_to(x.max(0), y.max(0));
        }

        if size_set || pos_set {
            let mut inner = self.shared.inner.borrow_mut();
            let flags = &mut inner.geometry_info().hints.flags;
            if size_set {
                flags.insert(HintFlags::USER_SIZE);
            }
            if pos_set {
                flags.insert(HintFlags::USER_POS);
            }
            drop(inner);
            self.queue_pass(false);
        }

        !mask.is_empty()
    }

    /// Show the window if needed, raise it and ask for focus.
    pub fn present(&self) {
        self.present_with_time(None);
    }

    /// Like [`Window::present`], with the time of the user interaction that caused it.
    pub fn present_with_time(&self, timestamp: Option<u32>) {
        let visible_native = {
            let mut inner = self.shared.inner.borrow_mut();
            let native = inner.realized_native().filter(|_| inner.visible);
            if native.is_none() {
                inner.focus_on_map = true;
                inner.initial_timestamp = timestamp;
            }
            native
        };

        let Some(native) = visible_native else {
            self.show();
            return;
        };

        let mut backend = self.ctx().backend.borrow_mut();
        if let Err(err) = backend.show(native).and_then(|()| backend.focus(native, timestamp)) {
            warn!(?native, "failed to present window: {err}");
        }
    }

    /// Set the startup notification id.
    ///
    /// On a realized window, an id only carrying a timestamp presents the window with that
    /// timestamp, and a real id completes startup right away if the window is mapped.
    pub fn set_startup_id(&self, startup_id: &str) {
        let ctx = self.ctx();
        let (realized, mapped) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.startup_id = Some(startup_id.into());
            (inner.realized_native().is_some(), inner.mapped)
        };

        if !realized {
            return;
        }

        if startup_id_is_fake(startup_id) {
            self.present_with_time(startup_id_timestamp(startup_id));
        } else if mapped && ctx.attributes.startup_notification {
            self.shared.inner.borrow_mut().startup_id = None;
            if let Err(err) = ctx.backend.borrow_mut().notify_startup_complete(Some(startup_id)) {
                warn!("failed to complete startup notification: {err}");
            }
        }
    }

    pub fn startup_id(&self) -> Option<SmolStr> {
        self.shared.inner.borrow().startup_id.clone()
    }

    fn request_state(&self, state: WindowState, enable: bool) {
        let mut inner = self.shared.inner.borrow_mut();
        inner.initially.set(state, enable);
        if enable && state == WindowState::ABOVE {
            inner.initially.remove(WindowState::BELOW);
        } else if enable && state == WindowState::BELOW {
            inner.initially.remove(WindowState::ABOVE);
        }

        if let Some(native) = inner.realized_native() {
            if let Err(err) = self.ctx().backend.borrow_mut().change_state(native, state, enable) {
                warn!(?native, ?state, enable, "failed to change window state: {err}");
            }
        }
    }

    pub fn iconify(&self) {
        self.request_state(WindowState::ICONIFIED, true);
    }

    pub fn deiconify(&self) {
        self.request_state(WindowState::ICONIFIED, false);
    }

    pub fn maximize(&self) {
        self.request_state(WindowState::MAXIMIZED, true);
    }

    pub fn unmaximize(&self) {
        self.request_state(WindowState::MAXIMIZED, false);
    }

    pub fn stick(&self) {
        self.request_state(WindowState::STICKY, true);
    }

    pub fn unstick(&self) {
        self.request_state(WindowState::STICKY, false);
    }

    pub fn fullscreen(&self) {
        self.request_state(WindowState::FULLSCREEN, true);
    }

    pub fn unfullscreen(&self) {
        self.request_state(WindowState::FULLSCREEN, false);
    }

    /// Keep the window above others. Turning it on turns off [`Window::set_keep_below`].
    pub fn set_keep_above(&self, above: bool) {
        self.request_state(WindowState::ABOVE, above);
    }

    /// Keep the window below others. Turning it on turns off [`Window::set_keep_above`].
    pub fn set_keep_below(&self, below: bool) {
        self.request_state(WindowState::BELOW, below);
    }

    /// The state last reported by the window manager.
    pub fn state(&self) -> WindowState {
        self.shared.inner.borrow().state
    }

    /// The states applied the next time the window is mapped.
    pub fn initial_state(&self) -> WindowState {
        self.shared.inner.borrow().initially
    }

    /// Make the window a transient of `parent`, e.g. a dialog of its main window.
    ///
    /// A window with an explicit group joins the group of its parent.
    pub fn set_transient_for(&self, parent: Option<&Window>) {
        if parent == Some(self) {
            debug_assert!(false, "a window cannot be transient for itself");
            warn!(id = ?self.id(), "ignoring a window made transient for itself");
            return;
        }

        let left_parent_group = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.transient_parent = parent.map(Window::downgrade);
            mem::take(&mut inner.transient_parent_group)
        };

        if left_parent_group {
            if let Some(group) = self.explicit_group() {
                group.remove_window(self);
            }
        }

        if let Some(native) = self.native_window() {
            let parent_native = parent.and_then(Window::native_window);
            if parent.is_none() || parent_native.is_some() {
                let result =
                    self.ctx().backend.borrow_mut().set_transient_for(native, parent_native);
                if let Err(err) = result {
                    warn!(?native, "failed to set transient parent: {err}");
                }
            }
        }

        if let Some(group) = parent.and_then(Window::explicit_group) {
            group.add_window(self);
            self.shared.inner.borrow_mut().transient_parent_group = true;
        }
    }

    pub fn transient_for(&self) -> Option<Window> {
        let inner = self.shared.inner.borrow();
        inner.transient_parent.as_ref().and_then(Window::upgrade)
    }

    /// The window's group: its explicit one or the context's default group.
    pub fn group(&self) -> WindowGroup {
        self.explicit_group().unwrap_or_else(|| self.ctx().default_group.clone())
    }

    /// Whether the window was added to a group explicitly.
    pub fn has_group(&self) -> bool {
        self.shared.inner.borrow().group.is_some()
    }

    pub(crate) fn explicit_group(&self) -> Option<WindowGroup> {
        self.shared.inner.borrow().group.clone()
    }

    pub(crate) fn set_explicit_group(&self, group: Option<WindowGroup>) {
        self.shared.inner.borrow_mut().group = group;
    }

    /// Set the window's icons, largest first. An empty list falls back to the context's
    /// default icons.
    pub fn set_icon_list(&self, icons: Vec<Icon>) {
        self.shared.inner.borrow_mut().icons = icons;
    }

    pub fn icon_list(&self) -> Vec<Icon> {
        let inner = self.shared.inner.borrow();
        if inner.icons.is_empty() {
            self.ctx().default_icons()
        } else {
            inner.icons.clone()
        }
    }

    /// Make `keyval` together with the mnemonic modifier activate `target`.
    pub fn add_mnemonic(&self, keyval: u32, target: WidgetId) {
        let added = self.shared.inner.borrow_mut().mnemonics.add(keyval, target);
        if added {
            self.notify_keys_changed();
        }
    }

    pub fn remove_mnemonic(&self, keyval: u32, target: WidgetId) -> bool {
        let removed = self.shared.inner.borrow_mut().mnemonics.remove(keyval, target);
        if removed {
            self.notify_keys_changed();
        }
        removed
    }

    pub fn mnemonic_targets(&self, keyval: u32) -> Vec<WidgetId> {
        self.shared.inner.borrow().mnemonics.targets(keyval).to_vec()
    }

    pub fn mnemonic_modifier(&self) -> ModifierType {
        self.shared.inner.borrow().mnemonics.modifier()
    }

    pub fn set_mnemonic_modifier(&self, modifier: ModifierType) {
        let changed = self.shared.inner.borrow_mut().mnemonics.set_modifier(modifier);
        if changed {
            self.notify_keys_changed();
        }
    }

    /// Schedule a keys-changed notification. Calls before the next dispatch collapse into one.
    pub fn notify_keys_changed(&self) {
        let weak = self.downgrade();
        self.shared.keys_changed.schedule(None, move || {
            if let Some(window) = Window::upgrade(&weak) {
                window.shared.observers.keys_changed.emit(&());
            }
        });
    }

    pub fn mnemonics_visible(&self) -> bool {
        self.shared.inner.borrow().mnemonics_visible
    }

    /// Show or hide mnemonics right away, cancelling a scheduled reveal.
    pub fn set_mnemonics_visible(&self, visible: bool) {
        self.shared.mnemonics_timer.cancel();

        let changed = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.mnemonics_visible_set = true;
            mem::replace(&mut inner.mnemonics_visible, visible) != visible
        };

        if changed {
            self.shared.observers.mnemonics_visible_changed.emit(&visible);
        }
    }

    /// Reveal mnemonics after the context's mnemonic delay, e.g. when the modifier is pressed.
    pub fn schedule_mnemonics_visible(&self) {
        let weak = self.downgrade();
        let delay = self.ctx().attributes.mnemonic_delay;
        self.shared.mnemonics_timer.schedule(Some(delay), move || {
            if let Some(window) = Window::upgrade(&weak) {
                window.set_mnemonics_visible(true);
            }
        });
    }

    /// Call `handler` with the allocation whenever a size is accepted.
    pub fn on_configure_accepted(&self, handler: impl FnMut(&Rect) + 'static) {
        self.shared.observers.configure_accepted.add(handler);
    }

    pub fn on_state_changed(&self, handler: impl FnMut(&StateChange) + 'static) {
        self.shared.observers.state_changed.add(handler);
    }

    pub fn on_keys_changed(&self, mut handler: impl FnMut() + 'static) {
        self.shared.observers.keys_changed.add(move |_: &()| handler());
    }

    pub fn on_mnemonics_visible_changed(&self, mut handler: impl FnMut(bool) + 'static) {
        let observers = &self.shared.observers;
        observers.mnemonics_visible_changed.add(move |visible: &bool| handler(*visible));
    }

    /// Call `handler` when the user asks to close the window.
    pub fn on_delete_request(&self, mut handler: impl FnMut() + 'static) {
        self.shared.observers.delete_request.add(move |_: &()| handler());
    }

    pub(crate) fn handle_configure(&self, rect: Rect) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            let Some(native) = inner.native else {
                return;
            };

            let matches_allocation =
                inner.allocation.width == rect.width && inner.allocation.height == rect.height;
            let decision = inner.reconcile.on_configure(matches_allocation);
            trace!(id = ?self.shared.id, ?rect, ?decision, state = ?inner.reconcile, "configure");

            let mut backend = self.ctx().backend.borrow_mut();
            if decision.thaw {
                if let Err(err) = backend.thaw_updates(native) {
                    warn!(?native, "failed to thaw updates: {err}");
                }
            }

            if decision.finished {
                if let Err(err) = backend.configure_finished(native) {
                    warn!(?native, "failed to acknowledge configure: {err}");
                }
                return;
            }

            inner.allocation.width = rect.width;
            inner.allocation.height = rect.height;
        }

        self.queue_pass(false);
    }

    pub(crate) fn handle_map_event(&self) {
        let inner = self.shared.inner.borrow();
        if inner.mapped {
            return;
        }

        // Hidden again before the map went through.
        if let Some(native) = inner.native {
            if let Err(err) = self.ctx().backend.borrow_mut().withdraw(native) {
                warn!(?native, "failed to withdraw window: {err}");
            }
        }
    }

    pub(crate) fn handle_state_changed(&self, changed: WindowState, new: WindowState) {
        self.shared.inner.borrow_mut().state = new;
        self.shared.observers.state_changed.emit(&StateChange { changed, new });
    }

    pub(crate) fn handle_delete_request(&self) {
        self.shared.observers.delete_request.emit(&());
    }

    pub(crate) fn handle_destroyed(&self) {
        let mut inner = self.shared.inner.borrow_mut();
        debug!(id = ?self.shared.id, native = ?inner.native, "native window destroyed");
        inner.native = None;
        inner.mapped = false;
        inner.need_default_size = true;
        inner.reconcile.reset();
        if let Some(info) = inner.geometry.as_mut() {
            info.last = LastRequest::default();
        }
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Window");
        debug.field("id", &self.shared.id);
        match self.shared.inner.try_borrow() {
            Ok(inner) => debug
                .field("native", &inner.native)
                .field("visible", &inner.visible)
                .field("mapped", &inner.mapped)
                .field("allocation", &inner.allocation)
                .field("reconcile", &inner.reconcile),
            Err(_) => debug.field("inner", &"<borrowed>"),
        };
        debug.finish_non_exhaustive()
    }
}

/// Windows whose size can be requested.
pub trait Resizable {
    fn resize(&self, width: i32, height: i32);
    fn size(&self) -> PhysicalSize<i32>;
    fn set_default_size(&self, width: i32, height: i32);
    fn default_size(&self) -> (i32, i32);
    fn set_resizable(&self, resizable: bool);
    fn is_resizable(&self) -> bool;
}

/// Windows whose position can be requested.
pub trait Positionable {
    fn move_to(&self, x: i32, y: i32);
    fn position(&self) -> PhysicalPosition<i32>;
    fn set_position(&self, policy: PositionPolicy);
    fn set_gravity(&self, gravity: Gravity);
    fn gravity(&self) -> Gravity;
}

/// Windows backed by a native window that is created and destroyed on demand.
pub trait Realizable {
    fn realize(&self);
    fn unrealize(&self);
    fn is_realized(&self) -> bool;
    fn native_window(&self) -> Option<NativeWindow>;
}

impl Resizable for Window {
    fn resize(&self, width: i32, height: i32) {
        Window::resize(self, width, height)
    }

    fn size(&self) -> PhysicalSize<i32> {
        Window::size(self)
    }

    fn set_default_size(&self, width: i32, height: i32) {
        Window::set_default_size(self, width, height)
    }

    fn default_size(&self) -> (i32, i32) {
        Window::default_size(self)
    }

    fn set_resizable(&self, resizable: bool) {
        Window::set_resizable(self, resizable)
    }

    fn is_resizable(&self) -> bool {
        Window::is_resizable(self)
    }
}

impl Positionable for Window {
    fn move_to(&self, x: i32, y: i32) {
        Window::move_to(self, x, y)
    }

    fn position(&self) -> PhysicalPosition<i32> {
        Window::position(self)
    }

    fn set_position(&self, policy: PositionPolicy) {
        Window::set_position(self, policy)
    }

    fn set_gravity(&self, gravity: Gravity) {
        Window::set_gravity(self, gravity)
    }

    fn gravity(&self) -> Gravity {
        Window::gravity(self)
    }
}

impl Realizable for Window {
    fn realize(&self) {
        Window::realize(self)
    }

    fn unrealize(&self) {
        Window::unrealize(self)
    }

    fn is_realized(&self) -> bool {
        Window::is_realized(self)
    }

    fn native_window(&self) -> Option<NativeWindow> {
        Window::native_window(self)
    }
}
