//! The move/resize reconciliation state machine.
//!
//! A toplevel window asks the window system for a geometry and later learns, through a
//! configure notify, what it actually got. Requests and notifies do not pair up one to one:
//! the window manager may coalesce requests, ignore them, or send notifies nobody asked for.
//! [`ReconcileState`] therefore only tracks a lower bound of notifies still owed, plus whether
//! a notify arrived that the next pass has to accept.
//!
//! A pass is planned by [`plan_pass`], a pure function of the state, the last request sent and
//! the freshly computed request. The resulting [`PassPlan`] lists the wire requests in the
//! order they must be sent: hints always go first so a resize is never judged against stale
//! hints.

use toplevel_core::geometry::Rect;
use toplevel_core::hints::{GeometryHints, HintFlags};

use crate::configure::LastRequest;

/// How far the window system is behind the toolkit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// No configure notify is owed.
    #[default]
    Idle,
    /// At least `pending` configure notifies are owed.
    AwaitingNotify { pending: u32 },
    /// A notify was received and the next pass must accept its size. `pending` more are owed.
    NotifyReceived { pending: u32 },
}

/// What [`ReconcileState::on_configure`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureDecision {
    /// The notify answered a request; updates frozen for it can resume.
    pub thaw: bool,
    /// Nothing to do but acknowledge the notify.
    pub finished: bool,
}

impl ReconcileState {
    /// Lower bound of configure notifies still owed by the window system.
    pub fn pending(&self) -> u32 {
        match *self {
            ReconcileState::Idle => 0,
            ReconcileState::AwaitingNotify { pending }
            | ReconcileState::NotifyReceived { pending } => pending,
        }
    }

    pub fn notify_received(&self) -> bool {
        matches!(self, ReconcileState::NotifyReceived { .. })
    }

    fn with_pending(pending: u32, notify_received: bool) -> Self {
        match (pending, notify_received) {
            (_, true) => ReconcileState::NotifyReceived { pending },
            (0, false) => ReconcileState::Idle,
            (pending, false) => ReconcileState::AwaitingNotify { pending },
        }
    }

    /// A configure request was sent that the window system is expected to answer.
    pub fn on_request_sent(&mut self) {
        *self = Self::with_pending(self.pending().saturating_add(1), self.notify_received());
    }

    /// A configure notify arrived.
    ///
    /// `matches_allocation` tells whether the notified size equals the current allocation.
    /// An unexpected notify that changes nothing is merely acknowledged; anything else must be
    /// accepted by the next pass.
    pub fn on_configure(&mut self, matches_allocation: bool) -> ConfigureDecision {
        let pending = self.pending();
        let expected = pending > 0;
        let pending = pending.saturating_sub(1);

        if !expected && matches_allocation {
            *self = Self::with_pending(pending, self.notify_received());
            return ConfigureDecision { thaw: false, finished: true };
        }

        *self = ReconcileState::NotifyReceived { pending };
        ConfigureDecision { thaw: expected, finished: false }
    }

    /// Consume a received notify. Returns whether there was one.
    pub fn take_notify(&mut self) -> bool {
        let received = self.notify_received();
        *self = Self::with_pending(self.pending(), false);
        received
    }

    /// Forget everything owed, e.g. because the window was unmapped.
    pub fn reset(&mut self) {
        *self = ReconcileState::Idle;
    }
}

/// A request the window sends to the window system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireRequest {
    SetHints(GeometryHints),
    Move { x: i32, y: i32 },
    Resize { width: i32, height: i32 },
    MoveResize(Rect),
    /// Hold back new content until the matching notify arrives.
    FreezeUpdates,
    ConfigureFinished,
}

/// Everything a pass needs to know.
#[derive(Debug, Clone, Copy)]
pub struct PassInput {
    pub state: ReconcileState,
    pub last: LastRequest,
    /// The freshly computed configure request.
    pub request: Rect,
    /// The freshly computed hints.
    pub hints: GeometryHints,
    /// `request` with the standing position constraint applied.
    pub constrained: Rect,
    pub position_constraints_changed: bool,
    /// The position must be honoured even if it did not change: an explicit initial position
    /// was set, or the window is being placed by a policy.
    pub honor_position: bool,
    /// Current allocation, `(0, 0)` based.
    pub allocation: Rect,
    /// Override-redirect windows get no configure notifies.
    pub popup: bool,
}

/// What the window should do after sending the requests of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// A notify was accepted: allocate the content to the current allocation.
    ///
    /// With `requeue`, the request changed while the notify was pending. The pass has not
    /// really been processed: the last request was left alone and another pass must run.
    Accepted { requeue: bool },
    /// A resize was requested; wait for the notify.
    AwaitingNotify,
    /// A popup was resized; allocate the content to the new size right away.
    AllocateNow(Rect),
    /// The size is unchanged; lay the content out again in the current allocation.
    Unchanged,
}

/// Which parts of the request differ from the last one sent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Changes {
    pub position: bool,
    pub size: bool,
    pub hints: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.position || self.size || self.hints
    }
}

/// The result of planning a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    /// Requests to send, in order.
    pub requests: Vec<WireRequest>,
    pub outcome: PassOutcome,
    /// The request to remember as sent.
    pub last: LastRequest,
    pub state: ReconcileState,
    pub changes: Changes,
}

impl PassPlan {
    /// Whether the one-shot settings consumed by this pass should be cleared.
    pub fn consumes_one_shots(&self) -> bool {
        !matches!(self.outcome, PassOutcome::Accepted { .. })
    }
}

/// Plan one reconciliation pass.
pub fn plan_pass(input: &PassInput) -> PassPlan {
    let last = input.last;
    let mut request = input.request;
    let mut state = input.state;

    let mut changes = Changes {
        position: last.rect.x != request.x || last.rect.y != request.y,
        size: last.rect.width != request.width || last.rect.height != request.height,
        hints: last.hints != input.hints,
    };

    // A resize can move where "centered" is, so the standing constraint is applied again
    // whenever anything changed.
    if changes.any() || input.position_constraints_changed {
        request.x = input.constrained.x;
        request.y = input.constrained.y;
        changes.position = last.rect.x != request.x || last.rect.y != request.y;
    }

    let new_last = LastRequest { hints: input.hints, rect: request };

    // The position flag is only ever added to the hints on the wire, so a request for an
    // explicit position is honoured even if the position did not change.
    let mut hints = input.hints;
    let mut hints_changed = changes.hints;
    if (changes.position || input.honor_position) && !hints.flags.contains(HintFlags::POS) {
        hints.flags |= HintFlags::POS;
        hints_changed = true;
    }

    let mut requests = Vec::new();
    if hints_changed {
        requests.push(WireRequest::SetHints(hints));
    }

    let size_differs = input.allocation.width != request.width
        || input.allocation.height != request.height;

    let (outcome, last) = if state.take_notify() {
        requests.push(WireRequest::ConfigureFinished);

        if changes.size || changes.position {
            (PassOutcome::Accepted { requeue: true }, last)
        } else {
            (PassOutcome::Accepted { requeue: false }, new_last)
        }
    } else if (changes.size || hints_changed) && size_differs {
        if changes.position {
            requests.push(WireRequest::MoveResize(request));
        } else {
            requests.push(WireRequest::Resize { width: request.width, height: request.height });
        }

        if input.popup {
            (PassOutcome::AllocateNow(Rect::from_size(request.width, request.height)), new_last)
        } else {
            state.on_request_sent();
            requests.push(WireRequest::FreezeUpdates);
            (PassOutcome::AwaitingNotify, new_last)
        }
    } else {
        if changes.position {
            requests.push(WireRequest::Move { x: request.x, y: request.y });
        }
        (PassOutcome::Unchanged, new_last)
    };

    PassPlan { requests, outcome, last, state, changes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> GeometryHints {
        GeometryHints::default().with_min_size(100, 100)
    }

    fn input(last: Rect, request: Rect, allocation: Rect) -> PassInput {
        PassInput {
            state: ReconcileState::Idle,
            last: LastRequest { hints: hints(), rect: last },
            request,
            hints: hints(),
            constrained: request,
            position_constraints_changed: false,
            honor_position: false,
            allocation,
            popup: false,
        }
    }

    #[test]
    fn counter_saturates_at_zero() {
        let mut state = ReconcileState::Idle;
        for _ in 0..3 {
            state.on_configure(false);
            state.take_notify();
        }
        assert_eq!(state, ReconcileState::Idle);

        state.on_request_sent();
        state.on_request_sent();
        assert_eq!(state.pending(), 2);

        let decision = state.on_configure(true);
        assert!(decision.thaw && !decision.finished);
        assert_eq!(state, ReconcileState::NotifyReceived { pending: 1 });
        assert!(state.take_notify());
        assert_eq!(state, ReconcileState::AwaitingNotify { pending: 1 });
    }

    #[test]
    fn unexpected_notify_matching_allocation_is_only_acknowledged() {
        let mut state = ReconcileState::Idle;
        let decision = state.on_configure(true);
        assert_eq!(decision, ConfigureDecision { thaw: false, finished: true });
        assert_eq!(state, ReconcileState::Idle);
    }

    #[test]
    fn unchanged_request_sends_nothing() {
        let rect = Rect::new(10, 10, 300, 200);
        let plan = plan_pass(&input(rect, rect, Rect::from_size(300, 200)));
        assert!(plan.requests.is_empty());
        assert_eq!(plan.outcome, PassOutcome::Unchanged);
        assert_eq!(plan.last.rect, rect);
    }

    #[test]
    fn resize_is_sent_after_hints_and_waits() {
        let mut input = input(
            Rect::new(0, 0, 300, 200),
            Rect::new(0, 0, 500, 400),
            Rect::from_size(300, 200),
        );
        input.hints = GeometryHints::default().with_min_size(200, 200);

        let plan = plan_pass(&input);
        assert_eq!(plan.requests, vec![
            WireRequest::SetHints(input.hints),
            WireRequest::Resize { width: 500, height: 400 },
            WireRequest::FreezeUpdates,
        ]);
        assert_eq!(plan.outcome, PassOutcome::AwaitingNotify);
        assert_eq!(plan.state.pending(), 1);
        assert!(plan.consumes_one_shots());
    }

    #[test]
    fn hints_only_change_skips_the_resize() {
        let rect = Rect::new(0, 0, 300, 200);
        let mut input = input(rect, rect, Rect::from_size(300, 200));
        input.hints = GeometryHints::default().with_min_size(50, 50);

        let plan = plan_pass(&input);
        assert_eq!(plan.requests, vec![WireRequest::SetHints(input.hints)]);
        assert_eq!(plan.state, ReconcileState::Idle);
    }

    #[test]
    fn move_only_does_not_count() {
        let plan = plan_pass(&input(
            Rect::new(0, 0, 300, 200),
            Rect::new(40, 50, 300, 200),
            Rect::from_size(300, 200),
        ));

        let mut with_pos = hints();
        with_pos.flags |= HintFlags::POS;
        assert_eq!(plan.requests, vec![
            WireRequest::SetHints(with_pos),
            WireRequest::Move { x: 40, y: 50 },
        ]);
        assert_eq!(plan.state.pending(), 0);
        // The remembered hints never carry the position flag.
        assert!(!plan.last.hints.flags.contains(HintFlags::POS));
    }

    #[test]
    fn changed_request_during_notify_is_deferred() {
        let last = Rect::new(0, 0, 300, 200);
        let mut input = input(last, Rect::new(0, 0, 320, 200), Rect::from_size(320, 200));
        input.state = ReconcileState::NotifyReceived { pending: 0 };

        let plan = plan_pass(&input);
        assert_eq!(plan.outcome, PassOutcome::Accepted { requeue: true });
        assert_eq!(plan.last.rect, last);
        assert_eq!(plan.requests, vec![WireRequest::ConfigureFinished]);
        assert_eq!(plan.state, ReconcileState::Idle);
        assert!(!plan.consumes_one_shots());
    }

    #[test]
    fn popups_are_allocated_immediately() {
        let mut input = input(
            Rect::new(0, 0, 300, 200),
            Rect::new(5, 5, 100, 50),
            Rect::from_size(300, 200),
        );
        input.popup = true;

        let plan = plan_pass(&input);
        assert_eq!(plan.outcome, PassOutcome::AllocateNow(Rect::from_size(100, 50)));
        assert!(matches!(plan.requests.last(), Some(WireRequest::MoveResize(_))));
        assert_eq!(plan.state.pending(), 0);
    }

    #[test]
    fn standing_constraint_recenters_after_a_resize() {
        let mut input = input(
            Rect::new(810, 440, 300, 200),
            Rect::new(810, 440, 500, 400),
            Rect::from_size(300, 200),
        );
        input.constrained = Rect::new(710, 340, 500, 400);

        let plan = plan_pass(&input);
        assert!(plan.changes.position);
        assert!(plan.requests.contains(&WireRequest::MoveResize(Rect::new(710, 340, 500, 400))));
    }
}
