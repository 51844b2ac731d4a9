use crate::models::{GaugeSample, HabitSeries};
use chrono::NaiveDate;
use std::time::Duration;

/// Per-index entrance delay on rebuild, so fresh elements pop in as a wave
/// instead of all at once.
pub const STAGGER_STEP: Duration = Duration::from_millis(30);

/// Fill for cells with no entry and gauges with no data.
pub const NEUTRAL_FILL: &str = "rgba(255,255,255,0.1)";
pub const UNKNOWN_LABEL: &str = "-";

const PALETTE: [&str; 5] = ["#3b5bdb", "#2ecc71", "#f1c40f", "#e74c3c", "#9b59b6"];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Previous structure was discarded and every element recreated.
    Rebuilt,
    /// Existing elements were updated attribute-by-attribute in place.
    Patched,
}

#[derive(Debug, Clone)]
pub struct RenderedGauge {
    pub label: String,
    pub percent: Option<u8>,
    pub fill_ratio: f32,
    pub color: String,
    pub text: String,
    pub entrance_delay: Option<Duration>,
}

/// Live representation of the percent-ring panel, tagged with the item count
/// it was built for. A count mismatch means the structure is stale and must
/// be rebuilt, never patched.
#[derive(Debug, Clone)]
pub struct GaugeBoard {
    gauges: Vec<RenderedGauge>,
    built_for: usize,
}

impl GaugeBoard {
    pub fn gauges(&self) -> &[RenderedGauge] {
        &self.gauges
    }

    pub fn built_for(&self) -> usize {
        self.built_for
    }
}

fn build_gauge(index: usize, sample: &GaugeSample, entrance_delay: Option<Duration>) -> RenderedGauge {
    // Unknown is a distinct visual state, never rendered as 0%.
    let (fill_ratio, color, text) = match sample.percent {
        Some(percent) => (
            f32::from(percent.min(100)) / 100.0,
            palette_color(index).to_string(),
            format!("{percent}%"),
        ),
        None => (0.0, NEUTRAL_FILL.to_string(), UNKNOWN_LABEL.to_string()),
    };
    RenderedGauge {
        label: sample.label.clone(),
        percent: sample.percent,
        fill_ratio,
        color,
        text,
        entrance_delay,
    }
}

pub fn reconcile_gauges(
    prev: Option<GaugeBoard>,
    series: &[GaugeSample],
) -> (GaugeBoard, RenderPath) {
    match prev {
        Some(mut board) if board.built_for == series.len() => {
            for (index, sample) in series.iter().enumerate() {
                let keep_delay = board.gauges[index].entrance_delay;
                board.gauges[index] = build_gauge(index, sample, keep_delay);
            }
            (board, RenderPath::Patched)
        }
        _ => {
            let gauges = series
                .iter()
                .enumerate()
                .map(|(index, sample)| {
                    build_gauge(index, sample, Some(STAGGER_STEP * index as u32))
                })
                .collect();
            (
                GaugeBoard {
                    gauges,
                    built_for: series.len(),
                },
                RenderPath::Rebuilt,
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// Date beyond today: dashed, non-interactive.
    Future,
    /// Entry logged: filled with the habit's color.
    Done,
    /// In range but nothing logged: neutral fill, pressable.
    Empty,
}

#[derive(Debug, Clone)]
pub struct RenderedCell {
    pub date: NaiveDate,
    pub state: CellState,
    pub fill: String,
    pub entrance_delay: Option<Duration>,
}

impl RenderedCell {
    pub fn is_interactive(&self) -> bool {
        !matches!(self.state, CellState::Future)
    }
}

#[derive(Debug, Clone)]
pub struct RenderedRow {
    pub habit_id: u64,
    pub title: String,
    pub color: String,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone)]
pub struct HabitGrid {
    rows: Vec<RenderedRow>,
    built_for: usize,
}

impl HabitGrid {
    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    pub fn built_for(&self) -> usize {
        self.built_for
    }

    pub fn row(&self, habit_id: u64) -> Option<&RenderedRow> {
        self.rows.iter().find(|row| row.habit_id == habit_id)
    }

    /// Delete case of a confirmed commit: the row leaves the view entirely.
    pub fn remove_row(&mut self, habit_id: u64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.habit_id != habit_id);
        let removed = self.rows.len() != before;
        if removed {
            self.built_for = self.rows.len();
        }
        removed
    }

    /// Optimistic paint (and its rollback) for a single cell.
    pub fn set_cell(&mut self, habit_id: u64, date: NaiveDate, state: CellState, fill: String) {
        if let Some(row) = self.rows.iter_mut().find(|row| row.habit_id == habit_id)
            && let Some(cell) = row.cells.iter_mut().find(|cell| cell.date == date)
        {
            cell.state = state;
            cell.fill = fill;
        }
    }
}

/// Classified against the client's current date at render time, not a
/// server-supplied flag, so a device or timezone change between loads does
/// not freeze stale "future" cells.
pub fn cell_state(date: NaiveDate, count: u32, today: NaiveDate) -> CellState {
    if date > today {
        CellState::Future
    } else if count > 0 {
        CellState::Done
    } else {
        CellState::Empty
    }
}

fn cell_fill(state: CellState, habit_color: &str) -> String {
    match state {
        CellState::Future => "transparent".to_string(),
        CellState::Done => habit_color.to_string(),
        CellState::Empty => NEUTRAL_FILL.to_string(),
    }
}

fn shape_matches(grid: &HabitGrid, series: &[HabitSeries]) -> bool {
    grid.built_for == series.len()
        && grid
            .rows
            .iter()
            .zip(series)
            .all(|(row, habit)| row.habit_id == habit.id && row.cells.len() == habit.days.len())
}

/// `locked` reports cells held by a non-idle interaction state; those are
/// skipped on the patch path so an in-progress confirmation is never
/// visually cancelled.
pub fn reconcile_grid(
    prev: Option<HabitGrid>,
    series: &[HabitSeries],
    today: NaiveDate,
    locked: impl Fn(u64, NaiveDate) -> bool,
) -> (HabitGrid, RenderPath) {
    match prev {
        Some(mut grid) if shape_matches(&grid, series) => {
            for (row, habit) in grid.rows.iter_mut().zip(series) {
                row.title = habit.name.clone();
                row.color = habit.color.clone();
                for (cell, day) in row.cells.iter_mut().zip(&habit.days) {
                    if locked(habit.id, day.date) {
                        continue;
                    }
                    // "Today" is recomputed on every pass, so a cell that
                    // was future yesterday comes into range here.
                    let state = cell_state(day.date, day.count, today);
                    cell.date = day.date;
                    cell.state = state;
                    cell.fill = cell_fill(state, &habit.color);
                }
            }
            (grid, RenderPath::Patched)
        }
        _ => {
            let rows = series
                .iter()
                .map(|habit| RenderedRow {
                    habit_id: habit.id,
                    title: habit.name.clone(),
                    color: habit.color.clone(),
                    cells: habit
                        .days
                        .iter()
                        .enumerate()
                        .map(|(index, day)| {
                            let state = cell_state(day.date, day.count, today);
                            RenderedCell {
                                date: day.date,
                                state,
                                fill: cell_fill(state, &habit.color),
                                entrance_delay: Some(STAGGER_STEP * index as u32),
                            }
                        })
                        .collect(),
                })
                .collect();
            (
                HabitGrid {
                    rows,
                    built_for: series.len(),
                },
                RenderPath::Rebuilt,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DaySample;

    fn gauge(label: &str, percent: Option<u8>) -> GaugeSample {
        GaugeSample {
            label: label.to_string(),
            percent,
        }
    }

    fn habit(id: u64, color: &str, days: &[(NaiveDate, u32)]) -> HabitSeries {
        HabitSeries {
            id,
            name: format!("habit-{id}"),
            color: color.to_string(),
            days: days
                .iter()
                .map(|&(date, count)| DaySample { date, count })
                .collect(),
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, n).unwrap()
    }

    #[test]
    fn first_pass_rebuilds_with_staggered_entrances() {
        let series = [gauge("work", Some(40)), gauge("dev", Some(75))];
        let (board, path) = reconcile_gauges(None, &series);

        assert_eq!(path, RenderPath::Rebuilt);
        assert_eq!(board.gauges().len(), 2);
        assert_eq!(board.gauges()[0].entrance_delay, Some(Duration::ZERO));
        assert_eq!(board.gauges()[1].entrance_delay, Some(STAGGER_STEP));
        assert_eq!(board.gauges()[1].text, "75%");
    }

    #[test]
    fn same_cardinality_patches_in_place() {
        let (board, _) = reconcile_gauges(None, &[gauge("work", Some(40)), gauge("dev", None)]);
        let (board, path) =
            reconcile_gauges(Some(board), &[gauge("work", Some(60)), gauge("dev", Some(10))]);

        assert_eq!(path, RenderPath::Patched);
        assert_eq!(board.gauges()[0].text, "60%");
        assert!((board.gauges()[0].fill_ratio - 0.6).abs() < f32::EPSILON);
        // Entrance state survives the patch.
        assert_eq!(board.gauges()[1].entrance_delay, Some(STAGGER_STEP));
    }

    #[test]
    fn cardinality_change_forces_full_rebuild() {
        let five: Vec<GaugeSample> = (0..5).map(|i| gauge("g", Some(i * 10))).collect();
        let four: Vec<GaugeSample> = (0..4).map(|i| gauge("g", Some(i * 10))).collect();

        let (board, _) = reconcile_gauges(None, &five);
        let (board, path) = reconcile_gauges(Some(board), &four);

        assert_eq!(path, RenderPath::Rebuilt);
        assert_eq!(board.gauges().len(), 4);
        assert_eq!(board.built_for(), 4);
        assert!(board.gauges().iter().all(|g| g.entrance_delay.is_some()));
    }

    #[test]
    fn unknown_gauge_is_neutral_not_zero() {
        let (board, _) = reconcile_gauges(None, &[gauge("health", None), gauge("work", Some(0))]);

        let unknown = &board.gauges()[0];
        assert_eq!(unknown.text, UNKNOWN_LABEL);
        assert_eq!(unknown.color, NEUTRAL_FILL);

        let zero = &board.gauges()[1];
        assert_eq!(zero.text, "0%");
        assert_ne!(zero.color, NEUTRAL_FILL);
    }

    #[test]
    fn cells_classify_future_done_empty() {
        let today = day(10);
        let series = [habit(1, "#f00", &[(day(9), 2), (day(10), 0), (day(11), 0)])];
        let (grid, path) = reconcile_grid(None, &series, today, |_, _| false);

        assert_eq!(path, RenderPath::Rebuilt);
        let cells = &grid.rows()[0].cells;
        assert_eq!(cells[0].state, CellState::Done);
        assert_eq!(cells[0].fill, "#f00");
        assert_eq!(cells[1].state, CellState::Empty);
        assert!(cells[1].is_interactive());
        assert_eq!(cells[2].state, CellState::Future);
        assert!(!cells[2].is_interactive());
    }

    #[test]
    fn unchanged_shape_patches_and_skips_locked_cells() {
        let today = day(10);
        let before = [habit(1, "#f00", &[(day(9), 0), (day(10), 0)])];
        let after = [habit(1, "#f00", &[(day(9), 1), (day(10), 1)])];

        let (grid, _) = reconcile_grid(None, &before, today, |_, _| false);
        let locked_date = day(10);
        let (grid, path) =
            reconcile_grid(Some(grid), &after, today, |_, date| date == locked_date);

        assert_eq!(path, RenderPath::Patched);
        let cells = &grid.rows()[0].cells;
        assert_eq!(cells[0].state, CellState::Done);
        // The locked cell keeps whatever its confirmation left on it.
        assert_eq!(cells[1].state, CellState::Empty);
        assert_eq!(cells[1].fill, NEUTRAL_FILL);
    }

    #[test]
    fn row_count_change_rebuilds() {
        let today = day(10);
        let two = [
            habit(1, "#f00", &[(day(9), 1)]),
            habit(2, "#0f0", &[(day(9), 0)]),
        ];
        let one = [habit(1, "#f00", &[(day(9), 1)])];

        let (grid, _) = reconcile_grid(None, &two, today, |_, _| false);
        let (grid, path) = reconcile_grid(Some(grid), &one, today, |_, _| false);
        assert_eq!(path, RenderPath::Rebuilt);
        assert_eq!(grid.rows().len(), 1);
    }

    #[test]
    fn row_identity_change_rebuilds() {
        let today = day(10);
        let a = [habit(1, "#f00", &[(day(9), 1)])];
        let b = [habit(3, "#f00", &[(day(9), 1)])];

        let (grid, _) = reconcile_grid(None, &a, today, |_, _| false);
        let (_, path) = reconcile_grid(Some(grid), &b, today, |_, _| false);
        assert_eq!(path, RenderPath::Rebuilt);
    }

    #[test]
    fn day_window_growth_rebuilds() {
        let today = day(10);
        let short = [habit(1, "#f00", &[(day(9), 1)])];
        let long = [habit(1, "#f00", &[(day(9), 1), (day(10), 0)])];

        let (grid, _) = reconcile_grid(None, &short, today, |_, _| false);
        let (_, path) = reconcile_grid(Some(grid), &long, today, |_, _| false);
        assert_eq!(path, RenderPath::Rebuilt);
    }

    #[test]
    fn future_cell_comes_into_range_on_later_pass() {
        let series = [habit(1, "#f00", &[(day(11), 0)])];
        let (grid, _) = reconcile_grid(None, &series, day(10), |_, _| false);
        assert_eq!(grid.rows()[0].cells[0].state, CellState::Future);

        let (grid, path) = reconcile_grid(Some(grid), &series, day(11), |_, _| false);
        assert_eq!(path, RenderPath::Patched);
        assert_eq!(grid.rows()[0].cells[0].state, CellState::Empty);
    }

    #[test]
    fn remove_row_drops_it_from_the_view() {
        let today = day(10);
        let series = [
            habit(1, "#f00", &[(day(9), 1)]),
            habit(2, "#0f0", &[(day(9), 0)]),
        ];
        let (mut grid, _) = reconcile_grid(None, &series, today, |_, _| false);

        assert!(grid.remove_row(1));
        assert!(grid.row(1).is_none());
        assert_eq!(grid.built_for(), 1);
        assert!(!grid.remove_row(1));
    }
}
