//! One-shot deferred tasks.
//!
//! A [`Scheduler`] only knows how to fire a [`TaskId`] after a delay. What the task *does* stays
//! on the controller side in a [`TaskQueue`], so cancelling a task means removing it from the
//! queue: a timer that fires for a cancelled id finds nothing to run, even when the platform
//! timer could not be cleared in time.

use std::{collections::BTreeMap, fmt, time::Duration};

use crate::error::SiteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> TaskId {
        TaskId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

pub trait Scheduler {
    /// Arrange for `task` to be delivered back to the controller once `delay` has passed.
    fn schedule(&mut self, task: TaskId, delay: Duration) -> Result<(), SiteError>;

    /// Best-effort cancellation of a scheduled timer. Returns whether a timer was cleared.
    fn cancel(&mut self, task: TaskId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Move keyboard focus to the element with this id.
    Focus(String),
    /// Re-evaluate the navbar scroll styling.
    EvaluateScroll,
    /// Hide the page loader.
    DismissLoader,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    next_id: u64,
    pending: BTreeMap<TaskId, DeferredTask>,
}

impl TaskQueue {
    pub fn new() -> TaskQueue {
        TaskQueue::default()
    }

    /// Register `task` and hand its id to the scheduler. Returns `None` if the scheduler refused,
    /// in which case the task is dropped.
    pub fn schedule(
        &mut self,
        scheduler: &mut dyn Scheduler,
        task: DeferredTask,
        delay: Duration,
    ) -> Option<TaskId> {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        match scheduler.schedule(id, delay) {
            Ok(()) => {
                tracing::trace!("scheduled {id} ({task:?}) in {delay:?}");
                self.pending.insert(id, task);
                Some(id)
            }
            Err(e) => {
                tracing::warn!("Could not schedule {task:?}: {e}");
                None
            }
        }
    }

    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler, id: TaskId) -> bool {
        scheduler.cancel(id);
        self.pending.remove(&id).is_some()
    }

    /// Claim a fired task. Cancelled or already-run ids return `None`.
    pub fn take(&mut self, id: TaskId) -> Option<DeferredTask> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Live platform timers by task. A slot holds whatever has to outlive the call to
/// [`Scheduler::schedule`], typically the timer handle and the callback it will invoke, and is
/// released exactly once: when the timer fires or when it is cleared.
#[derive(Debug)]
pub struct TimerSlots<T> {
    slots: BTreeMap<TaskId, T>,
}

impl<T> Default for TimerSlots<T> {
    fn default() -> Self {
        TimerSlots {
            slots: BTreeMap::new(),
        }
    }
}

impl<T> TimerSlots<T> {
    pub fn new() -> TimerSlots<T> {
        TimerSlots::default()
    }

    /// Track the slot for `task`, returning the slot it replaces.
    pub fn insert(&mut self, task: TaskId, slot: T) -> Option<T> {
        self.slots.insert(task, slot)
    }

    /// Stop tracking `task` and hand its slot back so the caller decides when to drop it.
    pub fn release(&mut self, task: TaskId) -> Option<T> {
        self.slots.remove(&task)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ManualScheduler;
    use test_log::test;

    #[test]
    fn test_cancelled_task_is_not_claimed_even_if_timer_fires() {
        let scheduler = ManualScheduler::new();
        let mut handle = scheduler.clone();
        let mut queue = TaskQueue::new();

        let first = queue
            .schedule(
                &mut handle,
                DeferredTask::Focus("sidebarClose".into()),
                Duration::from_millis(100),
            )
            .unwrap();
        let second = queue
            .schedule(
                &mut handle,
                DeferredTask::Focus("hamburgerMenu".into()),
                Duration::from_millis(100),
            )
            .unwrap();
        assert_ne!(first, second);
        assert!(queue.cancel(&mut handle, first));
        assert!(!queue.cancel(&mut handle, first));

        // The platform delivers the cancelled id anyway
        assert_eq!(queue.take(first), None);
        assert_eq!(
            queue.take(second),
            Some(DeferredTask::Focus("hamburgerMenu".into()))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_timer_slots_release_callbacks_on_fire_and_clear() {
        let callback = std::rc::Rc::new(());
        let mut slots = TimerSlots::new();
        for raw in 1..=3 {
            slots.insert(TaskId::new(raw), (raw as i32, callback.clone()));
        }
        assert_eq!(std::rc::Rc::strong_count(&callback), 4);

        // Two superseded moves are cleared, the last one fires
        let cleared = [slots.release(TaskId::new(1)), slots.release(TaskId::new(2))];
        assert!(cleared.iter().all(Option::is_some));
        drop(cleared);
        let fired = slots.release(TaskId::new(3));
        assert_eq!(fired.as_ref().map(|(handle, _)| *handle), Some(3));
        drop(fired);

        assert!(slots.is_empty());
        assert!(slots.release(TaskId::new(3)).is_none());
        assert_eq!(std::rc::Rc::strong_count(&callback), 1);
    }

    #[test]
    fn test_refused_schedule_drops_task() {
        let scheduler = ManualScheduler::new();
        scheduler.set_refuse(true);
        let mut handle = scheduler.clone();
        let mut queue = TaskQueue::new();
        assert!(queue
            .schedule(&mut handle, DeferredTask::DismissLoader, Duration::ZERO)
            .is_none());
        assert!(queue.is_empty());
    }
}
