pub mod api;
pub mod clock;
pub mod confirm;
pub mod engine;
pub mod errors;
pub mod models;
pub mod render;
pub mod sync;

pub use api::ApiClient;
pub use clock::{ActionClock, GRACE_PERIOD};
pub use confirm::{ARM_TIMEOUT, ConfirmGroup, InteractionState, PressOutcome};
pub use engine::{Engine, PressResult};
pub use errors::SyncError;
pub use models::Snapshot;
pub use render::{GaugeBoard, HabitGrid, RenderPath};
pub use sync::{POLL_INTERVAL, PollDriver, PollUpdate, SnapshotSource, SyncDecision, ViewState};
