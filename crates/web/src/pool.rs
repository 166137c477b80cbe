//! A bounded store of released contexts.
//!
//! The pool never builds contexts itself: [`App::acquire_ctx`](crate::App::acquire_ctx)
//! pops a released one or falls back to the context factory. Releasing into a full pool
//! drops the context.

use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct CtxPool<C> {
    idle: ArrayQueue<Box<C>>,
    created: AtomicUsize,
}

impl<C> CtxPool<C> {
    /// A zero capacity is raised to one, the queue cannot be empty sized.
    pub(crate) fn new(capacity: usize) -> Self {
        Self { idle: ArrayQueue::new(capacity.max(1)), created: AtomicUsize::new(0) }
    }

    #[inline]
    pub(crate) fn pop(&self) -> Option<Box<C>> {
        self.idle.pop()
    }

    /// Stores a released context, returns `false` when it was dropped because the pool is full.
    #[inline]
    pub(crate) fn push(&self, ctx: Box<C>) -> bool {
        self.idle.push(ctx).is_ok()
    }

    #[inline]
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of contexts built by the factory so far.
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of contexts waiting for reuse.
    pub(crate) fn idle(&self) -> usize {
        self.idle.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.idle.capacity()
    }
}

impl<C> fmt::Debug for CtxPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtxPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity())
            .field("created", &self.created())
            .finish()
    }
}
