// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! A generic, fixed-capacity, mutex-guarded LIFO stack. See [`BoundedStack`].

use std::sync::Mutex;

/// A fixed-capacity LIFO stack with newest-first draining.
///
/// Every mutating operation — including [`len`](Self::len) — takes the same internal
/// [`Mutex`], so a caller never observes a length that's stale with respect to a
/// concurrent `push_front`/`pop_back`. The mailbox (the only caller) never holds this
/// lock across an `.await`, so there's no contention with async cancellation.
#[derive(Debug)]
pub struct BoundedStack<T> {
    capacity: usize,
    items: Mutex<Vec<T>>,
}

impl<T> BoundedStack<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "BoundedStack capacity must be >= 1");
        Self { capacity, items: Mutex::new(Vec::with_capacity(capacity)) }
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    #[must_use]
    pub fn len(&self) -> usize { self.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Pushes `v` onto the front (the "newest" end). Caller is responsible for making
    /// room first — this never evicts on its own.
    ///
    /// # Panics
    /// Panics if called while already at capacity; the mailbox always pops first.
    pub fn push_front(&self, v: T) {
        let mut guard = self.lock();
        assert!(guard.len() < self.capacity, "push_front on a full BoundedStack");
        guard.push(v);
    }

    /// Removes and returns the newest element, if any.
    pub fn pop(&self) -> Option<T> { self.lock().pop() }

    /// Removes and returns the oldest element, if any.
    pub fn pop_back(&self) -> Option<T> {
        let mut guard = self.lock();
        if guard.is_empty() { None } else { Some(guard.remove(0)) }
    }

    /// Removes every element and returns them newest-first. The stack is empty after
    /// this returns.
    pub fn drain_all(&self) -> Vec<T> {
        let mut guard = self.lock();
        let mut out = std::mem::take(&mut *guard);
        out.reverse();
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_is_newest_first() {
        let stack = BoundedStack::new(4);
        stack.push_front(1);
        stack.push_front(2);
        stack.push_front(3);
        assert_eq!(stack.drain_all(), vec![3, 2, 1]);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_back_removes_oldest() {
        let stack = BoundedStack::new(4);
        stack.push_front(1);
        stack.push_front(2);
        assert_eq!(stack.pop_back(), Some(1));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn pop_removes_newest() {
        let stack = BoundedStack::new(4);
        stack.push_front(1);
        stack.push_front(2);
        assert_eq!(stack.pop(), Some(2));
    }

    #[test]
    fn drain_all_on_empty_stack_is_empty() {
        let stack: BoundedStack<i32> = BoundedStack::new(2);
        assert_eq!(stack.drain_all(), Vec::<i32>::new());
    }

    #[test]
    #[should_panic(expected = "push_front on a full BoundedStack")]
    fn push_front_past_capacity_panics() {
        let stack = BoundedStack::new(1);
        stack.push_front(1);
        stack.push_front(2);
    }
}
