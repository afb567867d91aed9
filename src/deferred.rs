use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::warn;

/// A single piece of work scheduled on the event loop.
///
/// Scheduling again before the work ran replaces it, so rapid requests collapse into one run.
pub(crate) struct Deferred {
    handle: LoopHandle<'static, ()>,
    token: Rc<RefCell<Option<RegistrationToken>>>,
}

impl Deferred {
    pub(crate) fn new(handle: LoopHandle<'static, ()>) -> Self {
        Deferred { handle, token: Rc::new(RefCell::new(None)) }
    }

    /// Run `work` once, after `delay` or on the next dispatch when `None`.
    pub(crate) fn schedule(&self, delay: Option<Duration>, mut work: impl FnMut() + 'static) {
        self.cancel();

        let timer = match delay {
            Some(delay) => Timer::from_duration(delay),
            None => Timer::immediate(),
        };

        let slot = self.token.clone();
        let inserted = self.handle.insert_source(timer, move |_, _, _| {
            slot.borrow_mut().take();
            work();
            TimeoutAction::Drop
        });

        match inserted {
            Ok(token) => *self.token.borrow_mut() = Some(token),
            Err(err) => warn!("failed to schedule deferred work: {}", err.error),
        }
    }

    /// Drop the pending run, if any.
    pub(crate) fn cancel(&self) {
        let token = self.token.borrow_mut().take();
        if let Some(token) = token {
            self.handle.remove(token);
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.token.borrow().is_some()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").field("pending", &self.is_pending()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use calloop::EventLoop;

    use super::*;

    #[test]
    fn rescheduling_collapses_runs() {
        let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new().unwrap();
        let deferred = Deferred::new(event_loop.handle());
        let runs = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let runs = runs.clone();
            deferred.schedule(None, move || runs.set(runs.get() + 1));
        }
        assert!(deferred.is_pending());

        event_loop.dispatch(Some(Duration::ZERO), &mut ()).unwrap();
        assert_eq!(runs.get(), 1);
        assert!(!deferred.is_pending());

        event_loop.dispatch(Some(Duration::ZERO), &mut ()).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn cancelled_work_never_runs() {
        let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new().unwrap();
        let deferred = Deferred::new(event_loop.handle());
        let ran = Rc::new(Cell::new(false));

        let flag = ran.clone();
        deferred.schedule(None, move || flag.set(true));
        deferred.cancel();

        event_loop.dispatch(Some(Duration::ZERO), &mut ()).unwrap();
        assert!(!ran.get());
    }
}
