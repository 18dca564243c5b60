use std::time::{Duration, Instant};

/// Delay between the last keystroke and the full re-parse.
pub const REPARSE_DELAY: Duration = Duration::from_millis(120);

/// Delay between the last keystroke and committing a history snapshot.
pub const HISTORY_COMMIT_DELAY: Duration = Duration::from_millis(160);

/// Deadline that is replaced, never stacked, each time it is armed.
///
/// No thread or runtime is involved: the host polls with the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescingTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl CoalescingTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Schedule the action `delay` after `now`, replacing any pending one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now.checked_add(self.delay).unwrap_or(now));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` exactly once when `now` has reached the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// The two debounced deferrals driven by text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTimers {
    pub reparse: CoalescingTimer,
    pub history_commit: CoalescingTimer,
}

impl Default for SyncTimers {
    fn default() -> Self {
        Self {
            reparse: CoalescingTimer::new(REPARSE_DELAY),
            history_commit: CoalescingTimer::new(HISTORY_COMMIT_DELAY),
        }
    }
}

impl SyncTimers {
    /// Earliest pending deadline, for host scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.reparse.deadline(), self.history_commit.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_replaces_pending_deadline() {
        let start = Instant::now();
        let mut timer = CoalescingTimer::new(REPARSE_DELAY);

        assert!(!timer.is_pending());
        timer.arm(start);
        timer.arm(start + Duration::from_millis(100));
        assert!(timer.is_pending());

        assert!(!timer.fire_if_due(start + Duration::from_millis(150)));
        assert!(timer.fire_if_due(start + Duration::from_millis(220)));
        assert!(!timer.fire_if_due(start + Duration::from_millis(400)));
    }

    #[test]
    fn next_deadline_is_earliest_pending() {
        let start = Instant::now();
        let mut timers = SyncTimers::default();
        assert_eq!(timers.next_deadline(), None);

        timers.history_commit.arm(start);
        timers.reparse.arm(start);
        assert_eq!(timers.next_deadline(), Some(start + REPARSE_DELAY));

        timers.reparse.cancel();
        assert_eq!(timers.next_deadline(), Some(start + HISTORY_COMMIT_DELAY));
    }
}
