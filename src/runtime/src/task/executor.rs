//! Single-threaded executor driving event consumers.
//!
//! Each scheduling class has its own bounded run queue. Wakers push the task
//! id back onto the queue of the class the task was spawned with, and every
//! poll picks from the highest non-empty class, so a woken real-time consumer
//! runs before the next background task.

use super::{Priority, Task, TaskId};
use alloc::{collections::BTreeMap, sync::Arc};
use core::task::{Context, Poll, Waker};
use crossbeam_queue::ArrayQueue;
use futures_util::task::ArcWake;
use log::{trace, warn};

/// Default run-queue depth per scheduling class.
const QUEUE_DEPTH: usize = 100;

type RunQueue = Arc<ArrayQueue<TaskId>>;

struct Entry {
    task: Task,
    waker: Waker,
}

/// Runs spawned tasks whenever their wakers fire.
pub struct Executor {
    entries: BTreeMap<TaskId, Entry>,
    queues: [RunQueue; Priority::COUNT],
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Create an executor with the default queue depth.
    pub fn new() -> Self {
        Self::with_queue_depth(QUEUE_DEPTH)
    }

    /// Create an executor whose run queues hold `depth` entries each.
    pub fn with_queue_depth(depth: usize) -> Self {
        Executor {
            entries: BTreeMap::new(),
            queues: core::array::from_fn(|_| Arc::new(ArrayQueue::new(depth))),
        }
    }

    /// Spawn a task. The task is handed back if its run queue is full.
    pub fn spawn(&mut self, task: Task) -> Result<TaskId, Task> {
        let (id, priority) = (task.id, task.priority);
        let queue = &self.queues[priority as usize];
        if queue.push(id).is_err() {
            return Err(task);
        }
        let waker = QueueWaker::waker(id, Arc::clone(queue));
        self.entries.insert(id, Entry { task, waker });
        trace!("spawned {:?} at {:?}", id, priority);
        Ok(id)
    }

    /// Number of tasks that have not finished.
    pub fn task_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether no task is queued to run.
    pub fn is_idle(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    fn next_ready(&self) -> Option<TaskId> {
        Priority::DESCENDING
            .iter()
            .find_map(|&p| self.queues[p as usize].pop())
    }

    /// Poll ready tasks until none is left.
    ///
    /// Tasks parked on a signal stay in the executor and run again on a later
    /// call once woken.
    pub fn run_until_idle(&mut self) {
        while let Some(id) = self.next_ready() {
            // Stale wake-ups for finished tasks are skipped.
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            let mut context = Context::from_waker(&entry.waker);
            if let Poll::Ready(()) = entry.task.poll(&mut context) {
                self.entries.remove(&id);
            }
        }
    }
}

struct QueueWaker {
    id: TaskId,
    queue: RunQueue,
}

impl QueueWaker {
    fn waker(id: TaskId, queue: RunQueue) -> Waker {
        futures_util::task::waker(Arc::new(QueueWaker { id, queue }))
    }
}

impl ArcWake for QueueWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if arc_self.queue.push(arc_self.id).is_err() {
            warn!("run queue full, dropping wake-up for {:?}", arc_self.id);
        }
    }
}
