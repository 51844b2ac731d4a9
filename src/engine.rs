use crate::api::ApiClient;
use crate::confirm::{ConfirmGroup, PressOutcome};
use crate::errors::SyncError;
use crate::models::{Snapshot, TaskDraft};
use crate::render::{
    CellState, GaugeBoard, HabitGrid, NEUTRAL_FILL, reconcile_gauges, reconcile_grid,
};
use crate::sync::{PollUpdate, SyncDecision, ViewState};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

/// A habit cell is identified by its habit and its calendar day.
pub type CellKey = (u64, NaiveDate);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressResult {
    Armed,
    Committed,
    Ignored,
}

/// Composition root: owns the rendered structures and both confirm groups,
/// shares `ViewState` with the poll driver, and enforces the one ordering
/// rule that matters: the action clock is stamped before any mutating
/// request leaves the process.
pub struct Engine {
    api: ApiClient,
    view: Arc<Mutex<ViewState>>,
    habit_presses: ConfirmGroup<CellKey>,
    delete_presses: ConfirmGroup<u64>,
    metrics: BTreeMap<String, f64>,
    gauges: Option<GaugeBoard>,
    grid: Option<HabitGrid>,
}

impl Engine {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            view: Arc::new(Mutex::new(ViewState::default())),
            habit_presses: ConfirmGroup::new(),
            delete_presses: ConfirmGroup::new(),
            metrics: BTreeMap::new(),
            gauges: None,
            grid: None,
        }
    }

    /// Handle for the poll driver; the driver and the engine reconcile
    /// against the same state.
    pub fn view_handle(&self) -> Arc<Mutex<ViewState>> {
        Arc::clone(&self.view)
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn gauges(&self) -> Option<&GaugeBoard> {
        self.gauges.as_ref()
    }

    pub fn grid(&self) -> Option<&HabitGrid> {
        self.grid.as_ref()
    }

    async fn mark_action(&self) {
        self.view.lock().await.clock.mark(Instant::now());
    }

    /// Fetches and unconditionally adopts the current version, so the poll
    /// cycle sees our own bump as already known.
    pub async fn force_sync(&self) -> Result<(), SyncError> {
        let snapshot = self.api.fetch_snapshot().await?;
        self.view.lock().await.adopt(snapshot.version);
        Ok(())
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Option<u64>, SyncError> {
        self.mark_action().await;
        let ack = self.api.create_task(draft).await?;
        if !ack.success {
            return Err(SyncError::Rejected);
        }
        self.force_sync().await?;
        Ok(ack.id)
    }

    pub async fn edit_task(&self, id: u64, draft: &TaskDraft) -> Result<(), SyncError> {
        self.mark_action().await;
        let ack = self.api.edit_task(id, draft).await?;
        if !ack.success {
            return Err(SyncError::Rejected);
        }
        self.force_sync().await
    }

    pub async fn toggle_task(&self, id: u64) -> Result<bool, SyncError> {
        self.mark_action().await;
        let ack = self.api.toggle_task(id).await?;
        if !ack.success {
            return Err(SyncError::Rejected);
        }
        self.force_sync().await?;
        Ok(ack.new_state)
    }

    /// One press on a habit cell. The first press arms it; a second press
    /// inside the timeout paints it optimistically, logs the entry, and
    /// force-syncs. A rejected or failed log rolls the paint back.
    pub async fn press_cell(
        &mut self,
        habit_id: u64,
        date: NaiveDate,
    ) -> Result<PressResult, SyncError> {
        if !self.cell_is_interactive(habit_id, date) {
            return Ok(PressResult::Ignored);
        }
        let color = self
            .grid
            .as_ref()
            .and_then(|grid| grid.row(habit_id))
            .map(|row| row.color.clone())
            .unwrap_or_default();

        match self.habit_presses.press((habit_id, date), Instant::now()) {
            PressOutcome::Armed => Ok(PressResult::Armed),
            PressOutcome::Ignored => Ok(PressResult::Ignored),
            PressOutcome::Commit => {
                // Remember the pre-commit visual; a failed request restores
                // it, not some assumed default.
                let prior = self
                    .grid
                    .as_ref()
                    .and_then(|grid| grid.row(habit_id))
                    .and_then(|row| row.cells.iter().find(|cell| cell.date == date))
                    .map(|cell| (cell.state, cell.fill.clone()));
                if let Some(grid) = self.grid.as_mut() {
                    grid.set_cell(habit_id, date, CellState::Done, color);
                }
                self.mark_action().await;
                match self.api.log_history(habit_id, date).await {
                    Ok(ack) if ack.success => {
                        self.habit_presses.resolve(&(habit_id, date), true);
                        self.force_sync().await?;
                        Ok(PressResult::Committed)
                    }
                    Ok(_) => {
                        self.rollback_cell(habit_id, date, prior);
                        Err(SyncError::Rejected)
                    }
                    Err(err) => {
                        self.rollback_cell(habit_id, date, prior);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Same protocol for deletion; a confirmed delete removes the row from
    /// the rendered grid entirely.
    pub async fn press_delete(&mut self, task_id: u64) -> Result<PressResult, SyncError> {
        match self.delete_presses.press(task_id, Instant::now()) {
            PressOutcome::Armed => Ok(PressResult::Armed),
            PressOutcome::Ignored => Ok(PressResult::Ignored),
            PressOutcome::Commit => {
                self.mark_action().await;
                match self.api.delete_task(task_id).await {
                    Ok(ack) if ack.success => {
                        self.delete_presses.resolve(&task_id, true);
                        if let Some(grid) = self.grid.as_mut() {
                            grid.remove_row(task_id);
                        }
                        self.force_sync().await?;
                        Ok(PressResult::Committed)
                    }
                    Ok(_) => {
                        self.delete_presses.resolve(&task_id, false);
                        Err(SyncError::Rejected)
                    }
                    Err(err) => {
                        self.delete_presses.resolve(&task_id, false);
                        Err(err)
                    }
                }
            }
        }
    }

    fn rollback_cell(
        &mut self,
        habit_id: u64,
        date: NaiveDate,
        prior: Option<(CellState, String)>,
    ) {
        self.habit_presses.resolve(&(habit_id, date), false);
        let (state, fill) =
            prior.unwrap_or((CellState::Empty, NEUTRAL_FILL.to_string()));
        if let Some(grid) = self.grid.as_mut() {
            grid.set_cell(habit_id, date, state, fill);
        }
    }

    /// Sweeps lapsed arm timers back to idle. The armed styling lives in
    /// the interaction state, so nothing needs repainting; the next patch
    /// pass covers the cell again once it is unlocked. Returns how many
    /// elements reverted.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.habit_presses.expire(now).len() + self.delete_presses.expire(now).len()
    }

    /// Consumes one poll result. Metrics update unconditionally; a `Reload`
    /// decision is the headless analog of a full page reload: drop every
    /// rendered structure and all interaction state, re-baseline on the
    /// fetched snapshot, and let the reconcile pass rebuild from it.
    pub async fn apply_update(&mut self, update: PollUpdate) -> SyncDecision {
        self.metrics = update.snapshot.metrics.clone();
        if update.decision == SyncDecision::Reload {
            info!("version {} arrived from outside, rebuilding", update.snapshot.version);
            let mut view = self.view.lock().await;
            view.reset();
            view.adopt(update.snapshot.version);
            drop(view);
            self.gauges = None;
            self.grid = None;
            self.habit_presses = ConfirmGroup::new();
            self.delete_presses = ConfirmGroup::new();
        }
        self.render(&update.snapshot, Local::now().date_naive());
        update.decision
    }

    /// One reconcile pass over both aggregates. `today` is taken per pass,
    /// which is the policy for tabs living across midnight.
    pub fn render(&mut self, snapshot: &Snapshot, today: NaiveDate) {
        let (board, _) = reconcile_gauges(self.gauges.take(), &snapshot.gauges);
        self.gauges = Some(board);

        let presses = &self.habit_presses;
        let (grid, _) = reconcile_grid(self.grid.take(), &snapshot.habits, today, |id, date| {
            !presses.is_idle(&(id, date))
        });
        self.grid = Some(grid);
    }

    fn cell_is_interactive(&self, habit_id: u64, date: NaiveDate) -> bool {
        self.grid
            .as_ref()
            .and_then(|grid| grid.row(habit_id))
            .and_then(|row| row.cells.iter().find(|cell| cell.date == date))
            .is_none_or(|cell| cell.is_interactive())
    }
}
