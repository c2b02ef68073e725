//! Virtual-clock timer registry
//!
//! Every delayed or periodic effect in a session is a [`TimerTask`] scheduled
//! here and identified by a [`TimerHandle`]. The clock only moves when the
//! session advances it, so a run is fully reproducible from its inputs.
//!
//! Firing order for tasks due at or before a given instant:
//! 1. earlier due time first
//! 2. one-shot tasks before the periodic session tick at the same instant
//! 3. scheduling order

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Work the session performs when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerTask {
    /// Fixed-rate clock tick (elapsed time, end checks, spawn roll)
    SessionTick,
    /// A critical patient was left unattended for the whole grace period
    GraceExpired { patient: u32 },
    /// Mini-game round ran out of time
    RoundDeadline { round: u64 },
    /// Apply a resolved round's outcome after its reveal delay
    RoundResolve { round: u64 },
    /// Saved patient returns to the normal pool
    PatientRecovered { patient: u32 },
    /// Queued boss shows up; the warning starts
    BossArrival,
    /// Warning is over; the fight starts
    BossEnter,
}

impl TimerTask {
    /// Tie-break lane at equal due times (lower fires first)
    fn lane(&self) -> u8 {
        match self {
            TimerTask::SessionTick => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Scheduled {
    task: TimerTask,
    due_ms: u64,
    interval_ms: Option<u64>,
    /// Remaining time while paused
    paused: Option<u64>,
}

/// Registry of pending tasks against a virtual millisecond clock
#[derive(Debug, Clone, Default)]
pub struct TimerService {
    now_ms: u64,
    next_id: u64,
    timers: BTreeMap<TimerHandle, Scheduled>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule a one-shot task `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: u64, task: TimerTask) -> TimerHandle {
        self.insert(delay_ms, None, task)
    }

    /// Schedule a task every `interval_ms` (a zero interval is treated as 1ms)
    pub fn schedule_repeating(&mut self, interval_ms: u64, task: TimerTask) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        self.insert(interval_ms, Some(interval_ms), task)
    }

    fn insert(&mut self, delay_ms: u64, interval_ms: Option<u64>, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            handle,
            Scheduled {
                task,
                due_ms: self.now_ms.saturating_add(delay_ms),
                interval_ms,
                paused: None,
            },
        );
        handle
    }

    /// Cancel a task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            log::debug!("Cancelling {} pending timers", self.timers.len());
        }
        self.timers.clear();
    }

    /// Freeze a task, returning the time it had left.
    /// Pausing an already paused task returns its frozen remainder.
    pub fn pause(&mut self, handle: TimerHandle) -> Option<u64> {
        let now = self.now_ms;
        let timer = self.timers.get_mut(&handle)?;
        if timer.paused.is_none() {
            timer.paused = Some(timer.due_ms.saturating_sub(now));
        }
        timer.paused
    }

    /// Unfreeze a paused task; it fires after its remaining time
    pub fn resume(&mut self, handle: TimerHandle) -> bool {
        let now = self.now_ms;
        match self.timers.get_mut(&handle) {
            Some(timer) => match timer.paused.take() {
                Some(remaining) => {
                    timer.due_ms = now.saturating_add(remaining);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Time left before a task fires (frozen value while paused)
    pub fn remaining(&self, handle: TimerHandle) -> Option<u64> {
        self.timers
            .get(&handle)
            .map(|t| t.paused.unwrap_or_else(|| t.due_ms.saturating_sub(self.now_ms)))
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    pub fn is_paused(&self, handle: TimerHandle) -> bool {
        self.timers.get(&handle).is_some_and(|t| t.paused.is_some())
    }

    /// Number of tasks still scheduled (paused ones included)
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Pop the next task due at or before `until_ms`, moving the clock to its
    /// due time. Repeating tasks are rescheduled, one-shots removed. A
    /// repeating task whose next due time is past the end of the clock is
    /// dropped.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, TimerTask)> {
        let (handle, due_ms) = self
            .timers
            .iter()
            .filter(|(_, t)| t.paused.is_none() && t.due_ms <= until_ms)
            .min_by_key(|(handle, t)| (t.due_ms, t.task.lane(), **handle))
            .map(|(handle, t)| (*handle, t.due_ms))?;

        self.now_ms = self.now_ms.max(due_ms);

        let timer = self.timers.get_mut(&handle)?;
        let task = timer.task;
        match timer.interval_ms.and_then(|interval| timer.due_ms.checked_add(interval)) {
            Some(next) => timer.due_ms = next,
            None => {
                self.timers.remove(&handle);
            }
        }
        Some((handle, task))
    }

    /// Move the clock to `until_ms` once every due task has been popped
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timers: &mut TimerService, until: u64) -> Vec<TimerTask> {
        let mut fired = Vec::new();
        while let Some((_, task)) = timers.pop_due(until) {
            fired.push(task);
        }
        timers.settle(until);
        fired
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut timers = TimerService::new();
        timers.schedule(100, TimerTask::BossArrival);

        assert!(drain(&mut timers, 99).is_empty());
        assert_eq!(drain(&mut timers, 100), vec![TimerTask::BossArrival]);
        assert!(drain(&mut timers, 1_000).is_empty());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_cancelled_handle_never_fires() {
        let mut timers = TimerService::new();
        let handle = timers.schedule(50, TimerTask::BossArrival);
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(drain(&mut timers, 500).is_empty());
    }

    #[test]
    fn test_repeating_until_cancelled() {
        let mut timers = TimerService::new();
        let tick = timers.schedule_repeating(1_000, TimerTask::SessionTick);

        assert_eq!(drain(&mut timers, 3_500).len(), 3);
        assert_eq!(timers.now_ms(), 3_500);
        timers.cancel(tick);
        assert!(drain(&mut timers, 10_000).is_empty());
    }

    #[test]
    fn test_pause_and_resume_keep_remaining_time() {
        let mut timers = TimerService::new();
        let grace = timers.schedule(8_000, TimerTask::GraceExpired { patient: 1 });

        drain(&mut timers, 3_000);
        assert_eq!(timers.pause(grace), Some(5_000));
        assert!(timers.is_paused(grace));

        // Frozen while paused
        assert!(drain(&mut timers, 20_000).is_empty());
        assert_eq!(timers.remaining(grace), Some(5_000));

        assert!(timers.resume(grace));
        assert!(drain(&mut timers, 24_999).is_empty());
        assert_eq!(
            drain(&mut timers, 25_000),
            vec![TimerTask::GraceExpired { patient: 1 }]
        );
    }

    #[test]
    fn test_one_shots_fire_before_tick_at_same_instant() {
        let mut timers = TimerService::new();
        timers.schedule_repeating(1_000, TimerTask::SessionTick);
        timers.schedule(1_000, TimerTask::GraceExpired { patient: 0 });
        timers.schedule(500, TimerTask::BossArrival);

        assert_eq!(
            drain(&mut timers, 1_000),
            vec![
                TimerTask::BossArrival,
                TimerTask::GraceExpired { patient: 0 },
                TimerTask::SessionTick,
            ]
        );
    }

    #[test]
    fn test_huge_delay_saturates() {
        let mut timers = TimerService::new();
        drain(&mut timers, 1);
        let grace = timers.schedule(u64::MAX, TimerTask::GraceExpired { patient: 0 });
        assert_eq!(timers.remaining(grace), Some(u64::MAX - 1));
        assert!(drain(&mut timers, u64::MAX - 1).is_empty());
        assert_eq!(
            drain(&mut timers, u64::MAX),
            vec![TimerTask::GraceExpired { patient: 0 }]
        );
    }

    #[test]
    fn test_resume_near_end_of_clock_saturates() {
        let mut timers = TimerService::new();
        let grace = timers.schedule(10, TimerTask::GraceExpired { patient: 3 });
        timers.pause(grace);
        drain(&mut timers, u64::MAX - 5);
        assert!(timers.resume(grace));
        assert_eq!(timers.remaining(grace), Some(5));
        assert_eq!(
            drain(&mut timers, u64::MAX),
            vec![TimerTask::GraceExpired { patient: 3 }]
        );
    }

    #[test]
    fn test_repeating_stops_at_end_of_clock() {
        let mut timers = TimerService::new();
        timers.schedule_repeating(u64::MAX / 2 + 1, TimerTask::SessionTick);
        assert_eq!(drain(&mut timers, u64::MAX), vec![TimerTask::SessionTick]);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_cancel_all_clears_everything() {
        let mut timers = TimerService::new();
        timers.schedule_repeating(1_000, TimerTask::SessionTick);
        let paused = timers.schedule(10, TimerTask::PatientRecovered { patient: 2 });
        timers.pause(paused);
        timers.cancel_all();
        assert_eq!(timers.pending(), 0);
        assert!(!timers.resume(paused));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fires_in_due_order(delays in prop::collection::vec(0u64..5_000, 1..40), step in 1u64..700) {
                let mut timers = TimerService::new();
                for (i, delay) in delays.iter().enumerate() {
                    timers.schedule(*delay, TimerTask::PatientRecovered { patient: i as u32 });
                }

                let mut fired = Vec::new();
                let mut until = 0;
                while timers.pending() > 0 {
                    until += step;
                    while let Some((_, TimerTask::PatientRecovered { patient })) = timers.pop_due(until) {
                        prop_assert!(delays[patient as usize] <= until);
                        fired.push(patient);
                    }
                    timers.settle(until);
                }

                let mut expected: Vec<u32> = (0..delays.len() as u32).collect();
                expected.sort_by_key(|i| (delays[*i as usize], *i));
                prop_assert_eq!(fired, expected);
            }
        }
    }
}
