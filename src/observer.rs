use std::cell::RefCell;
use std::fmt;
use std::mem;

/// A list of handlers called synchronously, in registration order.
///
/// Handlers may register further handlers while being called; those are kept but only run
/// from the next emission on.
pub(crate) struct Observers<T: ?Sized> {
    handlers: RefCell<Vec<Box<dyn FnMut(&T)>>>,
}

impl<T: ?Sized> Observers<T> {
    pub(crate) fn new() -> Self {
        Observers { handlers: RefCell::new(Vec::new()) }
    }

    pub(crate) fn add(&self, handler: impl FnMut(&T) + 'static) {
        self.handlers.borrow_mut().push(Box::new(handler));
    }

    pub(crate) fn emit(&self, value: &T) {
        let mut running = mem::take(&mut *self.handlers.borrow_mut());
        for handler in running.iter_mut() {
            handler(value);
        }

        let mut handlers = self.handlers.borrow_mut();
        running.append(&mut handlers);
        *handlers = running;
    }

    pub(crate) fn clear(&self) {
        // Dropping handlers may drop captured windows; do it outside the borrow.
        let handlers = mem::take(&mut *self.handlers.borrow_mut());
        drop(handlers);
    }
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.handlers.borrow().len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn handlers_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let observers = Observers::<u32>::new();

        let first = log.clone();
        observers.add(move |value| first.borrow_mut().push(("first", *value)));
        let second = log.clone();
        observers.add(move |value| second.borrow_mut().push(("second", *value)));

        observers.emit(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn handler_added_during_emit_runs_next_time() {
        let observers = Rc::new(Observers::<()>::new());
        let count = Rc::new(RefCell::new(0));

        let inner_observers = observers.clone();
        let inner_count = count.clone();
        let mut added = false;
        observers.add(move |_| {
            if !added {
                added = true;
                let count = inner_count.clone();
                inner_observers.add(move |_| *count.borrow_mut() += 1);
            }
        });

        observers.emit(&());
        assert_eq!(*count.borrow(), 0);
        observers.emit(&());
        assert_eq!(*count.borrow(), 1);
    }
}
