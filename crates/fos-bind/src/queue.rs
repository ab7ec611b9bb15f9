//! Deferred task queue
//!
//! Microtask-style queue owned by the host. Tasks scheduled while running
//! are picked up by the same [`TaskQueue::run_until_idle`] call.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// FIFO queue of deferred tasks. Clones share the queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after the current synchronous work
    pub fn schedule_microtask(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run tasks until the queue is empty. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "task queue idle");
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.schedule_microtask(move || log.borrow_mut().push(i));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nested_scheduling() {
        let queue = TaskQueue::new();
        let count = Rc::new(Cell::new(0));
        let inner_queue = queue.clone();
        let inner_count = Rc::clone(&count);
        queue.schedule_microtask(move || {
            inner_count.set(inner_count.get() + 1);
            let again = Rc::clone(&inner_count);
            inner_queue.schedule_microtask(move || again.set(again.get() + 1));
        });
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(count.get(), 2);
    }
}
