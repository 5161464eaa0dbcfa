//! Cancellable scheduled tasks.
//!
//! Every timer in a session (countdown ticks, nudge auto-dismiss, the idle
//! check) goes through one [`TaskScheduler`]. The host pumps it with the
//! current time and receives the events that came due; nothing runs on its
//! own, so the scheduler works the same under a tokio loop or a test driving
//! a manual clock.
//!
//! Repeating tasks fire at most once per [`TaskScheduler::take_due`] call and
//! are rescheduled from the pump time. A host that stops pumping (backgrounded
//! window, suspended laptop) therefore never replays a burst of missed ticks.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Opaque handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct ScheduledTask<E> {
    due: DateTime<Utc>,
    every: Option<Duration>,
    event: E,
}

/// Single-threaded timer queue keyed by [`TaskHandle`].
#[derive(Debug)]
pub struct TaskScheduler<E> {
    next_id: u64,
    tasks: BTreeMap<TaskHandle, ScheduledTask<E>>,
}

impl<E: Clone> TaskScheduler<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
        }
    }

    fn insert(&mut self, task: ScheduledTask<E>) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.tasks.insert(handle, task);
        handle
    }

    /// Fire `event` once, `delay` after `now`.
    pub fn schedule_once(&mut self, now: DateTime<Utc>, delay: Duration, event: E) -> TaskHandle {
        self.insert(ScheduledTask {
            due: now + delay,
            every: None,
            event,
        })
    }

    /// Fire `event` every `interval`, starting one interval after `now`.
    pub fn schedule_every(
        &mut self,
        now: DateTime<Utc>,
        interval: Duration,
        event: E,
    ) -> TaskHandle {
        self.insert(ScheduledTask {
            due: now + interval,
            every: Some(interval),
            event,
        })
    }

    /// Cancel a task. Returns false if it already fired (one-shot) or was
    /// already cancelled; cancelling twice is harmless.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest due time, if anything is pending
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.tasks.values().map(|t| t.due).min()
    }

    /// Remove and return every task due at `now`, ordered by due time then
    /// scheduling order. Repeating tasks are re-armed for `now + interval`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<(TaskHandle, E)> {
        let mut due: Vec<(DateTime<Utc>, TaskHandle)> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(handle, task)| (task.due, *handle))
            .collect();
        due.sort();

        let mut fired = Vec::with_capacity(due.len());
        for (_, handle) in due {
            let Some(task) = self.tasks.get_mut(&handle) else {
                continue;
            };
            let event = task.event.clone();
            match task.every {
                Some(interval) => task.due = now + interval,
                None => {
                    self.tasks.remove(&handle);
                }
            }
            fired.push((handle, event));
        }
        fired
    }
}

impl<E: Clone> Default for TaskScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_once_fires_once() {
        let mut scheduler = TaskScheduler::new();
        let handle = scheduler.schedule_once(t0(), Duration::seconds(30), "expire");

        assert!(scheduler.take_due(t0() + Duration::seconds(29)).is_empty());
        let fired = scheduler.take_due(t0() + Duration::seconds(30));
        assert_eq!(fired, vec![(handle, "expire")]);
        assert!(scheduler.take_due(t0() + Duration::seconds(60)).is_empty());
        assert!(!scheduler.is_scheduled(handle));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut scheduler = TaskScheduler::new();
        let handle = scheduler.schedule_every(t0(), Duration::seconds(1), 7u8);

        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.take_due(t0() + Duration::seconds(5)).is_empty());
    }

    #[test]
    fn test_repeating_task_does_not_replay_missed_intervals() {
        let mut scheduler = TaskScheduler::new();
        let handle = scheduler.schedule_every(t0(), Duration::seconds(1), "tick");

        // Host was away for a minute: one delivery, not sixty.
        let later = t0() + Duration::seconds(60);
        assert_eq!(scheduler.take_due(later).len(), 1);
        assert_eq!(scheduler.next_due(), Some(later + Duration::seconds(1)));
        assert!(scheduler.is_scheduled(handle));
    }

    #[test]
    fn test_due_tasks_are_ordered() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule_once(t0(), Duration::seconds(3), "c");
        scheduler.schedule_once(t0(), Duration::seconds(1), "a");
        scheduler.schedule_once(t0(), Duration::seconds(2), "b");

        let events: Vec<_> = scheduler
            .take_due(t0() + Duration::seconds(10))
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        assert_eq!(events, vec!["a", "b", "c"]);
        assert!(scheduler.is_empty());
    }
}
