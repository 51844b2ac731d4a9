use std::time::{Duration, Instant};

/// Window after a local mutation during which a remote version bump is
/// assumed to be our own doing.
pub const GRACE_PERIOD: Duration = Duration::from_millis(5000);

/// Timestamp of the most recent locally initiated mutation. Stamped at the
/// start of every mutating request, never explicitly cleared; it simply ages
/// past the grace period.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionClock {
    last_action_at: Option<Instant>,
}

impl ActionClock {
    pub fn mark(&mut self, now: Instant) {
        self.last_action_at = Some(now);
    }

    pub fn within_grace(&self, now: Instant, grace: Duration) -> bool {
        self.last_action_at
            .is_some_and(|at| now.duration_since(at) < grace)
    }

    pub fn last_action_at(&self) -> Option<Instant> {
        self.last_action_at
    }
}
