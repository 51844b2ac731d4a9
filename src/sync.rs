use crate::clock::{ActionClock, GRACE_PERIOD};
use crate::errors::SyncError;
use crate::models::Snapshot;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;

pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Everything the client knows about where it stands relative to the server.
/// Mutated only by the sync controller (version) and by marking the action
/// clock; both happen under one lock.
#[derive(Debug, Default)]
pub struct ViewState {
    pub last_known_version: Option<u64>,
    pub clock: ActionClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// First successful fetch after load; adopt the version, never reload.
    Baseline,
    /// Fetched version is not newer than ours.
    InSync,
    /// Newer version inside the grace window: our own mutation already
    /// updated the view, only the counter needed syncing.
    SilentAdopt,
    /// Newer version from outside: the local view may be arbitrarily stale,
    /// rebuild everything.
    Reload,
}

impl ViewState {
    pub fn reconcile(&mut self, fetched_version: u64, now: Instant) -> SyncDecision {
        match self.last_known_version {
            None => {
                self.last_known_version = Some(fetched_version);
                SyncDecision::Baseline
            }
            Some(known) if fetched_version > known => {
                if self.clock.within_grace(now, GRACE_PERIOD) {
                    self.last_known_version = Some(fetched_version);
                    SyncDecision::SilentAdopt
                } else {
                    SyncDecision::Reload
                }
            }
            Some(_) => SyncDecision::InSync,
        }
    }

    /// Post-mutation force sync: adopt unconditionally so the next poll sees
    /// our own bump as already known.
    pub fn adopt(&mut self, version: u64) {
        self.last_known_version = Some(version);
    }

    pub fn reset(&mut self) {
        *self = ViewState::default();
    }
}

pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<Snapshot, SyncError>> + Send;
}

#[derive(Debug)]
pub struct PollUpdate {
    pub snapshot: Snapshot,
    pub decision: SyncDecision,
}

/// Owns the fixed-interval poll task. Started on load and whenever the view
/// becomes visible, stopped while it is hidden.
#[derive(Default)]
pub struct PollDriver {
    handle: Option<JoinHandle<()>>,
}

impl PollDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: starting while already running is a no-op.
    pub fn start<S: SnapshotSource>(
        &mut self,
        source: Arc<S>,
        view: Arc<Mutex<ViewState>>,
        updates: mpsc::UnboundedSender<PollUpdate>,
    ) {
        if self.handle.is_some() {
            return;
        }
        self.handle = Some(tokio::spawn(poll_loop(source, view, updates)));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for PollDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<S: SnapshotSource>(
    source: Arc<S>,
    view: Arc<Mutex<ViewState>>,
    updates: mpsc::UnboundedSender<PollUpdate>,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        match source.fetch_snapshot().await {
            Ok(snapshot) => {
                let decision = {
                    let mut view = view.lock().await;
                    view.reconcile(snapshot.version, Instant::now())
                };
                if updates.send(PollUpdate { snapshot, decision }).is_err() {
                    return;
                }
            }
            // No backoff: the next fixed tick is the retry.
            Err(err) => warn!("poll failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fetch_establishes_baseline() {
        let mut view = ViewState::default();
        let decision = view.reconcile(5, Instant::now());
        assert_eq!(decision, SyncDecision::Baseline);
        assert_eq!(view.last_known_version, Some(5));
    }

    #[test]
    fn equal_or_older_version_is_in_sync() {
        let mut view = ViewState::default();
        let now = Instant::now();
        view.adopt(7);
        assert_eq!(view.reconcile(7, now), SyncDecision::InSync);
        assert_eq!(view.reconcile(3, now), SyncDecision::InSync);
        assert_eq!(view.last_known_version, Some(7));
    }

    #[test]
    fn bump_inside_grace_is_adopted_silently() {
        let mut view = ViewState::default();
        let t0 = Instant::now();
        view.adopt(5);
        view.clock.mark(t0);

        let decision = view.reconcile(6, t0 + Duration::from_millis(1000));
        assert_eq!(decision, SyncDecision::SilentAdopt);
        assert_eq!(view.last_known_version, Some(6));
    }

    #[test]
    fn bump_outside_grace_triggers_reload() {
        let mut view = ViewState::default();
        let t0 = Instant::now();
        view.adopt(6);
        view.clock.mark(t0);

        let decision = view.reconcile(7, t0 + Duration::from_millis(6000));
        assert_eq!(decision, SyncDecision::Reload);
        // The reload path restarts from scratch; the stale version is not
        // adopted on the way out.
        assert_eq!(view.last_known_version, Some(6));
    }

    #[test]
    fn bump_with_no_recorded_action_triggers_reload() {
        let mut view = ViewState::default();
        view.adopt(5);
        assert_eq!(view.reconcile(8, Instant::now()), SyncDecision::Reload);
    }

    #[test]
    fn self_caused_sequence_never_reloads() {
        // Log action at t=0: clock marked, request succeeds, force sync
        // adopts 6. Poll at t=1s returns 6: already known, nothing happens.
        let mut view = ViewState::default();
        let t0 = Instant::now();
        view.reconcile(5, t0);
        view.clock.mark(t0);
        view.adopt(6);

        let decision = view.reconcile(6, t0 + Duration::from_millis(1000));
        assert_eq!(decision, SyncDecision::InSync);
        assert_eq!(view.last_known_version, Some(6));
    }

    #[test]
    fn foreign_bump_after_grace_reloads() {
        // Same start, but another session bumps to 7 and our poll lands at
        // t=6s, past the grace window.
        let mut view = ViewState::default();
        let t0 = Instant::now();
        view.reconcile(5, t0);
        view.clock.mark(t0);
        view.adopt(6);

        let decision = view.reconcile(7, t0 + Duration::from_millis(6000));
        assert_eq!(decision, SyncDecision::Reload);
    }

    #[test]
    fn reset_clears_version_and_clock() {
        let mut view = ViewState::default();
        view.adopt(9);
        view.clock.mark(Instant::now());
        view.reset();
        assert_eq!(view.last_known_version, None);
        assert!(view.clock.last_action_at().is_none());
    }
}
