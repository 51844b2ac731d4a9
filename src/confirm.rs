use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// How long an armed element waits for its confirming second press.
pub const ARM_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Armed { expires_at: Instant },
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// First press: the element now wants a confirming second press.
    Armed,
    /// Second press inside the timeout: the caller must stamp the action
    /// clock and issue the mutating request.
    Commit,
    /// Press on an element whose request is already in flight.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Committed,
    RolledBack,
    Ignored,
}

/// One logical group of confirmable elements (all habit cells, or all delete
/// buttons), keyed by element identity. Interaction state lives here, never
/// on the rendered element itself. At most one key in the group is non-idle
/// at any moment.
#[derive(Debug)]
pub struct ConfirmGroup<K: Eq + Hash + Clone> {
    states: HashMap<K, InteractionState>,
}

impl<K: Eq + Hash + Clone> Default for ConfirmGroup<K> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> ConfirmGroup<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, key: &K) -> InteractionState {
        self.states
            .get(key)
            .copied()
            .unwrap_or(InteractionState::Idle)
    }

    pub fn is_idle(&self, key: &K) -> bool {
        matches!(self.state_of(key), InteractionState::Idle)
    }

    pub fn press(&mut self, key: K, now: Instant) -> PressOutcome {
        match self.state_of(&key) {
            InteractionState::Committing => PressOutcome::Ignored,
            InteractionState::Armed { expires_at } if now < expires_at => {
                self.states.insert(key, InteractionState::Committing);
                PressOutcome::Commit
            }
            // Idle, or an arm whose timer already lapsed: (re-)arm, which
            // supersedes any other non-idle element in the group.
            _ => {
                self.states.retain(|_, state| {
                    !matches!(
                        state,
                        InteractionState::Armed { .. } | InteractionState::Committing
                    )
                });
                self.states.insert(
                    key,
                    InteractionState::Armed {
                        expires_at: now + ARM_TIMEOUT,
                    },
                );
                PressOutcome::Armed
            }
        }
    }

    /// Sweeps lapsed arms back to idle and reports which keys reverted, so
    /// the caller can undo their "confirm me" visuals.
    pub fn expire(&mut self, now: Instant) -> Vec<K> {
        let expired: Vec<K> = self
            .states
            .iter()
            .filter_map(|(key, state)| match state {
                InteractionState::Armed { expires_at } if now >= *expires_at => {
                    Some(key.clone())
                }
                _ => None,
            })
            .collect();
        for key in &expired {
            self.states.remove(key);
        }
        expired
    }

    /// Finishes a commit. Success leaves the committed state to the caller
    /// (keep the element locked, or drop it entirely); failure reverts to
    /// idle so the element can be re-armed.
    pub fn resolve(&mut self, key: &K, success: bool) -> Resolution {
        match self.state_of(key) {
            InteractionState::Committing => {
                self.states.remove(key);
                if success {
                    Resolution::Committed
                } else {
                    Resolution::RolledBack
                }
            }
            _ => Resolution::Ignored,
        }
    }
}
