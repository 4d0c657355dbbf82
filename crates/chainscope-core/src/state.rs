use std::cell::{Cell, RefCell};

/// Value cell that only changes on a structural difference.
///
/// Offering an equal value (even a freshly allocated one) keeps the stored
/// value and revision; a different value replaces it and bumps the revision.
#[derive(Debug)]
pub struct Stabilized<A> {
    current: RefCell<A>,
    revision: Cell<u64>,
}

impl<A: Clone + PartialEq> Stabilized<A> {
    pub fn new(value: A) -> Self {
        Self {
            current: RefCell::new(value),
            revision: Cell::new(0),
        }
    }

    pub fn get(&self) -> A {
        self.current.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Returns true if `next` replaced the stored value.
    pub fn offer(&self, next: A) -> bool {
        if *self.current.borrow() == next {
            return false;
        }
        *self.current.borrow_mut() = next;
        self.revision.set(self.revision.get() + 1);
        true
    }
}

/// Tracks which revision of a [`Stabilized`] value last triggered work.
#[derive(Debug, Default)]
pub struct LaunchGate {
    launched: Cell<Option<u64>>,
}

impl LaunchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until `revision` has been marked.
    pub fn is_pending(&self, revision: u64) -> bool {
        self.launched.get() != Some(revision)
    }

    pub fn mark(&self, revision: u64) {
        self.launched.set(Some(revision));
    }

    /// True exactly once per distinct `revision`.
    pub fn take(&self, revision: u64) -> bool {
        if !self.is_pending(revision) {
            return false;
        }
        self.mark(revision);
        true
    }
}
