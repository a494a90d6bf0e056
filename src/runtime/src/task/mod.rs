//! Cooperative tasks for consumer loops.

use alloc::boxed::Box;
use core::{
    fmt,
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};

pub mod executor;

/// Identifier handed out by [`executor::Executor::spawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Scheduling class of a task.
///
/// Ready real-time tasks are always polled before any background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Ordinary work.
    Background = 0,
    /// Event consumers.
    Realtime = 1,
}

impl Priority {
    pub(crate) const COUNT: usize = 2;

    /// Highest class first.
    pub(crate) const DESCENDING: [Priority; Self::COUNT] = [Priority::Realtime, Priority::Background];
}

/// A future scheduled on the [`executor::Executor`].
pub struct Task {
    id: TaskId,
    priority: Priority,
    future: Pin<Box<dyn Future<Output = ()>>>,
}

impl Task {
    /// Wrap `future` as a background task.
    pub fn new(future: impl Future<Output = ()> + 'static) -> Task {
        Self::with_priority(future, Priority::Background)
    }

    /// Wrap `future` with an explicit scheduling class.
    pub fn with_priority(future: impl Future<Output = ()> + 'static, priority: Priority) -> Task {
        Task {
            id: TaskId::next(),
            priority,
            future: Box::pin(future),
        }
    }

    /// Scheduling class of this task.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    fn poll(&mut self, context: &mut Context) -> Poll<()> {
        self.future.as_mut().poll(context)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
