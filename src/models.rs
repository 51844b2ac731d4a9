use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-reported point-in-time view of the dashboard plus its version
/// counter. Immutable once fetched; the engine only compares snapshots,
/// it never edits one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub gauges: Vec<GaugeSample>,
    #[serde(default)]
    pub habits: Vec<HabitSeries>,
}

/// One percent ring. `None` means the server has no data for this slot,
/// which is not the same thing as 0%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeSample {
    pub label: String,
    pub percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitSeries {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub days: Vec<DaySample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySample {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub content: String,
    pub priority: String,
    pub datetime: Option<String>,
    pub color: String,
    pub category: String,
    pub is_habit: bool,
}

#[derive(Debug, Deserialize)]
pub struct MutationAck {
    pub success: bool,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleAck {
    pub success: bool,
    pub new_state: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
}
