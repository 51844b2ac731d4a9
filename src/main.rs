use dash_client::render::CellState;
use dash_client::{ApiClient, Engine, PollDriver, SyncDecision};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let base_url =
        std::env::var("SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
    let api = ApiClient::new(&base_url);
    let mut engine = Engine::new(api.clone());

    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let mut driver = PollDriver::new();
    driver.start(Arc::new(api), engine.view_handle(), updates_tx);
    info!("watching {base_url}");

    // Arm timers have no callback of their own; a coarse sweep reverts them.
    let mut sweeper = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                driver.stop();
                break;
            }
            _ = sweeper.tick() => {
                engine.tick(Instant::now());
            }
            update = updates_rx.recv() => {
                let Some(update) = update else { break };
                let decision = engine.apply_update(update).await;
                report(&engine, decision).await;
            }
        }
    }

    Ok(())
}

async fn report(engine: &Engine, decision: SyncDecision) {
    if decision == SyncDecision::InSync {
        return;
    }
    let version = engine.view_handle().lock().await.last_known_version;
    let gauges: Vec<String> = engine
        .gauges()
        .map(|board| {
            board
                .gauges()
                .iter()
                .map(|gauge| format!("{} {}", gauge.label, gauge.text))
                .collect()
        })
        .unwrap_or_default();
    let rows: Vec<String> = engine
        .grid()
        .map(|grid| {
            grid.rows()
                .iter()
                .map(|row| {
                    let done = row
                        .cells
                        .iter()
                        .filter(|cell| cell.state == CellState::Done)
                        .count();
                    format!("{} {done}/{}", row.title, row.cells.len())
                })
                .collect()
        })
        .unwrap_or_default();

    info!(
        "{decision:?} version={version:?} gauges=[{}] habits=[{}]",
        gauges.join(", "),
        rows.join(", ")
    );
}
