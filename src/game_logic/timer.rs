use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Whole-session countdown (time attack).
    SessionClock,
    /// Per-question answer limit; expiry forces an unanswered submission.
    QuestionClock,
    /// Delayed move to the next question or to the end of the session.
    Advance,
    /// One second of the versus reveal countdown.
    RevealTick,
}

/// A scheduled timer, bound to the question it was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub kind: TimerKind,
    pub question_index: usize,
    pub generation: u64,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Fired,
    /// The handle was cancelled or superseded; nothing happened.
    Stale,
}

/// Holds at most one armed timer. Every schedule bumps the generation, so a
/// handle from an earlier schedule can never match again.
#[derive(Debug, Default)]
pub struct TimerSlot {
    generation: u64,
    armed: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn schedule(
        &mut self,
        kind: TimerKind,
        question_index: usize,
        deadline: Instant,
    ) -> TimerHandle {
        self.generation += 1;
        let handle = TimerHandle {
            kind,
            question_index,
            generation: self.generation,
            deadline,
        };
        self.armed = Some(handle);
        handle
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn armed(&self) -> Option<TimerHandle> {
        self.armed
    }

    pub fn is_current(&self, handle: &TimerHandle) -> bool {
        self.armed.as_ref() == Some(handle)
    }

    /// Disarms and returns true if `handle` is the armed timer.
    pub fn claim(&mut self, handle: &TimerHandle) -> bool {
        if self.is_current(handle) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

/// A pausable countdown. It only runs between `start` and `pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
    running_since: Option<Instant>,
}

impl Countdown {
    pub fn new(total: Duration) -> Self {
        Self {
            remaining: total,
            running_since: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.remaining = self
                .remaining
                .saturating_sub(now.saturating_duration_since(since));
        }
    }

    pub fn add(&mut self, extra: Duration) {
        self.remaining += extra;
    }

    pub fn subtract(&mut self, penalty: Duration) {
        self.remaining = self.remaining.saturating_sub(penalty);
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self
                .remaining
                .saturating_sub(now.saturating_duration_since(since)),
            None => self.remaining,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.running_since.map(|since| since + self.remaining)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescheduling_makes_old_handles_stale() {
        let now = Instant::now();
        let mut slot = TimerSlot::default();
        let first = slot.schedule(TimerKind::QuestionClock, 0, now + Duration::from_secs(5));
        let second = slot.schedule(TimerKind::Advance, 0, now + Duration::from_secs(1));

        assert!(!slot.is_current(&first));
        assert!(!slot.claim(&first));
        assert!(slot.claim(&second));
        assert!(slot.armed().is_none());
        assert!(!slot.claim(&second));
    }

    #[test]
    fn test_cancel_disarms() {
        let now = Instant::now();
        let mut slot = TimerSlot::default();
        let handle = slot.schedule(TimerKind::SessionClock, 2, now);
        slot.cancel();
        assert!(!slot.claim(&handle));
    }

    #[test]
    fn test_countdown_only_runs_while_started() {
        let t0 = Instant::now();
        let mut clock = Countdown::new(Duration::from_secs(60));
        assert_eq!(clock.remaining(t0 + Duration::from_secs(10)), Duration::from_secs(60));
        assert!(clock.deadline().is_none());

        clock.start(t0);
        assert_eq!(clock.deadline(), Some(t0 + Duration::from_secs(60)));
        clock.pause(t0 + Duration::from_secs(15));
        assert_eq!(clock.remaining(t0 + Duration::from_secs(40)), Duration::from_secs(45));

        clock.add(Duration::from_secs(2));
        clock.subtract(Duration::from_secs(100));
        assert!(clock.is_expired(t0));
    }
}
