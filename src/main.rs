use std::{
    env,
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;

use lr_sweep::{
    SweepConfig, SweepCoordinator, SweepEvent,
    sweep::{GridPoint, GridStatistics},
};

const DEFAULT_TIME_LIMIT_SECS: u64 = 300;

#[derive(Serialize)]
struct GridSummary {
    #[serde(flatten)]
    point: GridPoint,
    stats: Option<GridStatistics>,
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => SweepConfig::from_path(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => SweepConfig::default(),
    };

    let time_limit = env::var("SWEEP_TIME_LIMIT_SECS")
        .ok()
        .map(|secs| secs.parse::<u64>())
        .transpose()
        .context("SWEEP_TIME_LIMIT_SECS must be a number of seconds")?
        .unwrap_or(DEFAULT_TIME_LIMIT_SECS);

    let (mut coordinator, events) = SweepCoordinator::new()?;
    let workers = coordinator.rebuild(config)?;
    let grid = coordinator.grid();

    // Every grid point is highlighted so the trimmed statistic is reported too.
    for grid_index in 0..grid.len() {
        coordinator.set_highlighted(grid_index, true)?;
    }

    info!("training {workers} workers over {} learning rates", grid.len());
    coordinator.resume();

    let deadline = Instant::now() + Duration::from_secs(time_limit);
    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(timeout) {
            Ok(SweepEvent::Milestone {
                grid_index,
                replicate_index,
                epoch,
                error,
            }) => {
                let label = &grid[grid_index].label;
                debug!("{label} #{replicate_index}: epoch {epoch}, error {error:.4}");
            }
            Ok(SweepEvent::Final {
                grid_index,
                replicate_index,
                epoch,
                converged,
            }) => {
                let label = &grid[grid_index].label;
                let outcome = if converged { "converged" } else { "cancelled" };
                info!("{label} #{replicate_index}: {outcome} at epoch {epoch}");
            }
            Ok(SweepEvent::Statistics { grid_index, stats }) => {
                info!("{}: {stats:?}", grid[grid_index].label);
            }
            Ok(SweepEvent::WorkerFailed {
                grid_index,
                replicate_index,
                reason,
            }) => warn!("{} #{replicate_index}: {reason}", grid[grid_index].label),
            Ok(SweepEvent::SweepStopped) => {
                info!("every worker is done");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("time limit of {time_limit}s reached, stopping the sweep");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    coordinator.pause();

    let summary: Vec<GridSummary> = grid
        .into_iter()
        .enumerate()
        .map(|(grid_index, point)| GridSummary {
            point,
            stats: coordinator.statistics(grid_index),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&summary)?);

    coordinator.shutdown()?;
    Ok(())
}
