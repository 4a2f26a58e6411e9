use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use rand::{SeedableRng, rngs::StdRng};

use super::{
    AggregateRecord, CurvePoint, FinalOutcome, GridPoint, GridStatistics, SweepEvent,
    policy,
    record::WorkerRecord,
};
use crate::{
    Result, SweepErr,
    config::{ReplicateMode, SweepConfig},
    dataset::Dataset,
    training::{Hyperparameters, NetworkTrainer, ReplicaTrainer, Trainer},
    worker::{
        TrainingWorker, WorkerConfig, WorkerEvent, WorkerEventKind, WorkerId, WorkerSnapshot,
    },
};

/// Where the sweep as a whole stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    /// No grid has been built.
    Empty,
    /// The grid is built but hasn't been started since it was built or restarted.
    Idle,
    Running,
    Paused,
    /// Every worker is done, milestones are ignored until the next `resume`.
    Stopped,
}

struct Inner {
    phase: SweepPhase,
    generation: u64,
    grid: Vec<GridPoint>,
    per_grid: usize,
    records: Vec<WorkerRecord>,
    aggregates: Vec<AggregateRecord>,
    join_timeout: Duration,
}

/// Builds and drives a grid of training workers, one learning rate per grid point.
///
/// Worker events are handled on a dedicated dispatcher thread. Every operation takes the
/// coordinator lock for its whole critical section and sends the events it produced to the
/// observer after releasing it, in the order they were produced.
pub struct SweepCoordinator {
    inner: Arc<Mutex<Inner>>,
    outbox: Arc<Mutex<Sender<SweepEvent>>>,
    worker_tx: Option<Sender<WorkerEvent>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl SweepCoordinator {
    /// Creates a coordinator with an empty grid.
    ///
    /// # Returns
    /// The coordinator and the receiving end of its events, or a `Spawn` error.
    pub fn new() -> Result<(Self, Receiver<SweepEvent>)> {
        let (observer_tx, observer_rx) = mpsc::channel();
        let (worker_tx, worker_rx) = mpsc::channel();

        let inner = Arc::new(Mutex::new(Inner::new()));
        let outbox = Arc::new(Mutex::new(observer_tx));

        let dispatcher = thread::Builder::new()
            .name("sweep-dispatcher".into())
            .spawn({
                let inner = Arc::clone(&inner);
                let outbox = Arc::clone(&outbox);
                move || dispatch(inner, outbox, worker_rx)
            })
            .map_err(SweepErr::Spawn)?;

        let coordinator = Self {
            inner,
            outbox,
            worker_tx: Some(worker_tx),
            dispatcher: Some(dispatcher),
        };

        Ok((coordinator, observer_rx))
    }

    /// Replaces the grid with one built from `config`, training on the parity problem of
    /// `config.input_nodes` bits.
    ///
    /// # Returns
    /// The amount of workers built.
    pub fn rebuild(&self, config: SweepConfig) -> Result<usize> {
        config.validate()?;
        let dataset = Dataset::parity(config.input_nodes, config.output_nodes)?;
        self.rebuild_with_dataset(config, Arc::new(dataset))
    }

    /// Replaces the grid with one built from `config`, training on `dataset`.
    ///
    /// The previous grid is torn down first. Its workers are cancelled, stopped and joined
    /// before their records are released, and none of their events reach the observer once
    /// this returns.
    ///
    /// # Arguments
    /// * `config` - The sweep's configuration.
    /// * `dataset` - The samples every worker trains on.
    ///
    /// # Returns
    /// The amount of workers built, `EmptyRange` with no workers left when `eta_end` is
    /// negligible, or `JoinTimeout` if an old worker didn't stop in time.
    pub fn rebuild_with_dataset(
        &self,
        config: SweepConfig,
        dataset: Arc<Dataset>,
    ) -> Result<usize> {
        config.validate()?;
        let worker_tx = self.worker_tx.as_ref().ok_or(SweepErr::ShutDown)?;

        let mut inner = self.inner.lock();
        inner.teardown(config.join_timeout())?;

        let result = inner.build(&config, dataset, worker_tx);
        publish(&self.outbox, inner, Vec::new());
        result
    }

    /// Starts or resumes every worker that isn't done.
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        let events = inner.resume();
        publish(&self.outbox, inner, events);
    }

    /// Pauses every running worker.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        inner.pause();
        publish(&self.outbox, inner, Vec::new());
    }

    /// Reinitializes every worker and clears the gathered outcomes, the sweep waits for the
    /// next `resume`.
    pub fn restart(&self) {
        let mut inner = self.inner.lock();
        inner.restart();
        publish(&self.outbox, inner, Vec::new());
    }

    /// Toggles whether the trimmed statistic of a grid point is computed, publishing the
    /// statistics again if the grid point is already complete.
    pub fn set_highlighted(&self, grid_index: usize, highlighted: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        let events = inner.set_highlighted(grid_index, highlighted)?;
        publish(&self.outbox, inner, events);
        Ok(())
    }

    pub fn phase(&self) -> SweepPhase {
        self.inner.lock().phase
    }

    pub fn grid(&self) -> Vec<GridPoint> {
        self.inner.lock().grid.clone()
    }

    /// Returns the amount of live workers.
    pub fn worker_count(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns the statistics of a grid point, `None` until every replicate is done.
    pub fn statistics(&self, grid_index: usize) -> Option<GridStatistics> {
        self.inner.lock().aggregates.get(grid_index)?.statistics()
    }

    pub fn aggregate(&self, grid_index: usize) -> Option<AggregateRecord> {
        self.inner.lock().aggregates.get(grid_index).cloned()
    }

    /// Returns the milestones reported by a worker since it was last (re)started.
    pub fn history(&self, id: WorkerId) -> Option<Vec<CurvePoint>> {
        let inner = self.inner.lock();
        inner.record(id).map(|record| record.history.clone())
    }

    pub fn outcome(&self, id: WorkerId) -> Option<FinalOutcome> {
        self.inner.lock().record(id)?.outcome
    }

    pub fn snapshot(&self, id: WorkerId) -> Option<WorkerSnapshot> {
        let inner = self.inner.lock();
        inner.record(id).map(|record| record.worker.snapshot())
    }

    /// Tears down every worker and the dispatcher thread.
    ///
    /// # Errors
    /// `JoinTimeout` if a worker didn't stop in time, the dispatcher is left detached.
    pub fn shutdown(&mut self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            let timeout = inner.join_timeout;
            inner.teardown(timeout)?;
        }

        self.worker_tx.take();

        if let Some(dispatcher) = self.dispatcher.take()
            && dispatcher.join().is_err()
        {
            warn!("sweep dispatcher panicked");
        }

        Ok(())
    }
}

impl Drop for SweepCoordinator {
    fn drop(&mut self) {
        if self.dispatcher.is_some()
            && let Err(e) = self.shutdown()
        {
            warn!("sweep shutdown failed: {e}");
        }
    }
}

fn dispatch(
    inner: Arc<Mutex<Inner>>,
    outbox: Arc<Mutex<Sender<SweepEvent>>>,
    worker_rx: Receiver<WorkerEvent>,
) {
    for event in worker_rx.iter() {
        let mut guard = inner.lock();
        let events = guard.handle(event);
        publish(&outbox, guard, events);
    }

    debug!("sweep dispatcher exiting");
}

/// Releases the coordinator lock and sends `events`, holding the outbox so events are
/// delivered in the order the lock was taken.
fn publish(
    outbox: &Mutex<Sender<SweepEvent>>,
    inner: MutexGuard<'_, Inner>,
    events: Vec<SweepEvent>,
) {
    let outbox = outbox.lock();
    drop(inner);

    for event in events {
        if outbox.send(event).is_err() {
            debug!("sweep observer dropped");
            break;
        }
    }
}

/// Seeds a worker's random source from the sweep seed and its position in the grid.
fn worker_rng(seed: Option<u64>, position: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(position as u64)),
        None => StdRng::from_os_rng(),
    }
}

impl Inner {
    fn new() -> Self {
        Self {
            phase: SweepPhase::Empty,
            generation: 0,
            grid: Vec::new(),
            per_grid: 0,
            records: Vec::new(),
            aggregates: Vec::new(),
            join_timeout: SweepConfig::default().join_timeout(),
        }
    }

    fn record(&self, id: WorkerId) -> Option<&WorkerRecord> {
        self.index_of(id).map(|i| &self.records[i])
    }

    fn index_of(&self, id: WorkerId) -> Option<usize> {
        if id.replicate_index >= self.per_grid {
            return None;
        }

        let index = id.grid_index * self.per_grid + id.replicate_index;
        self.records
            .get(index)
            .filter(|record| record.id() == id)
            .map(|_| index)
    }

    /// Stops every worker, waits for them and releases their records. Workers that don't
    /// stop in time stay tracked.
    fn teardown(&mut self, timeout: Duration) -> Result<()> {
        self.phase = SweepPhase::Empty;
        self.generation += 1;
        self.grid.clear();
        self.aggregates.clear();

        for record in &self.records {
            record.worker.cancel();
            record.worker.stop();
        }

        let mut first_err = None;
        let mut unjoined = Vec::new();

        for mut record in std::mem::take(&mut self.records) {
            let id = record.id();
            match record.worker.join(timeout) {
                Ok(()) => {}
                Err(e @ SweepErr::JoinTimeout { .. }) => {
                    warn!(grid = id.grid_index, replicate = id.replicate_index; "{e}");
                    first_err.get_or_insert(e);
                    unjoined.push(record);
                }
                Err(e) => warn!(grid = id.grid_index, replicate = id.replicate_index; "{e}"),
            }
        }

        self.records = unjoined;

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn build(
        &mut self,
        config: &SweepConfig,
        dataset: Arc<Dataset>,
        events: &Sender<WorkerEvent>,
    ) -> Result<usize> {
        let grid_size = config.grid_size()?;
        let topology = config.topology()?;
        dataset.check_topology(&topology)?;

        let interval = NonZeroUsize::new(config.milestone_interval).ok_or_else(|| {
            SweepErr::InvalidConfig("milestone_interval must be at least 1".into())
        })?;

        self.per_grid = match config.replicate_mode {
            ReplicateMode::Independent => config.replicate_count,
            ReplicateMode::Averaged => 1,
        };
        self.join_timeout = config.join_timeout();

        for g in 0..grid_size {
            let eta = config.eta(g);
            let hyper = Hyperparameters {
                eta: eta as f32,
                momentum: config.momentum as f32,
                stop_threshold: config.stop_threshold as f32,
            };

            self.grid.push(GridPoint::new(eta));
            self.aggregates.push(AggregateRecord::new(self.per_grid));

            for r in 0..self.per_grid {
                let id = WorkerId::new(g, r);
                let rng = worker_rng(config.seed, g * self.per_grid + r);

                let trainer: Box<dyn Trainer> = match config.replicate_mode {
                    ReplicateMode::Independent => Box::new(NetworkTrainer::new(
                        topology.clone(),
                        Arc::clone(&dataset),
                        hyper,
                        rng,
                    )?),
                    ReplicateMode::Averaged => Box::new(ReplicaTrainer::new(
                        topology.clone(),
                        config.replicate_count,
                        Arc::clone(&dataset),
                        hyper,
                        rng,
                    )?),
                };

                let worker_config = WorkerConfig::new(id, interval, self.generation);
                let worker = TrainingWorker::spawn(worker_config, trainer, events.clone())?;
                self.records.push(WorkerRecord::new(worker));
            }
        }

        self.phase = SweepPhase::Idle;

        info!(
            grid_size = grid_size,
            workers = self.records.len(),
            generation = self.generation;
            "sweep built over {topology}"
        );

        Ok(self.records.len())
    }

    fn resume(&mut self) -> Vec<SweepEvent> {
        let mut events = Vec::new();
        if self.phase == SweepPhase::Empty {
            return events;
        }

        self.phase = SweepPhase::Running;
        self.pace();
        self.check_stopped(&mut events);
        events
    }

    fn pause(&mut self) {
        if self.phase != SweepPhase::Running {
            return;
        }

        self.phase = SweepPhase::Paused;
        for record in self.records.iter().filter(|r| !r.is_done()) {
            record.worker.pause();
        }
    }

    fn restart(&mut self) {
        if self.phase == SweepPhase::Empty {
            return;
        }

        self.generation += 1;
        for record in &mut self.records {
            record.worker.restart_into(self.generation);
            record.reset();
        }
        for aggregate in &mut self.aggregates {
            aggregate.reset();
        }

        self.phase = SweepPhase::Idle;
        info!(generation = self.generation; "sweep restarted");
    }

    fn set_highlighted(
        &mut self,
        grid_index: usize,
        highlighted: bool,
    ) -> Result<Vec<SweepEvent>> {
        let grid_size = self.aggregates.len();
        let aggregate = self
            .aggregates
            .get_mut(grid_index)
            .ok_or(SweepErr::GridIndexOutOfRange {
                grid_index,
                grid_size,
            })?;

        aggregate.set_highlighted(highlighted);

        let mut events = Vec::new();
        if aggregate.is_published()
            && let Some(stats) = aggregate.statistics()
        {
            events.push(SweepEvent::Statistics { grid_index, stats });
        }

        Ok(events)
    }

    fn handle(&mut self, event: WorkerEvent) -> Vec<SweepEvent> {
        let mut events = Vec::new();

        if event.generation != self.generation {
            debug!(generation = event.generation; "dropping stale event from {}", event.id);
            return events;
        }

        let Some(index) = self.index_of(event.id) else {
            return events;
        };

        let WorkerId {
            grid_index,
            replicate_index,
        } = event.id;

        match event.kind {
            WorkerEventKind::Milestone { epoch, error } => {
                let record = &mut self.records[index];
                if record.is_done() {
                    return events;
                }

                record.report(epoch, error);
                events.push(SweepEvent::Milestone {
                    grid_index,
                    replicate_index,
                    epoch,
                    error,
                });

                self.cancel_outliers(grid_index, &mut events);
                if self.phase == SweepPhase::Running {
                    self.pace();
                }
                self.check_stopped(&mut events);
            }
            WorkerEventKind::Converged { epoch, error } => {
                let record = &mut self.records[index];
                if record.is_done() {
                    return events;
                }

                // The last point of the curve, unless it landed on a milestone.
                if record.last_epoch != Some(epoch) {
                    record.report(epoch, error);
                    events.push(SweepEvent::Milestone {
                        grid_index,
                        replicate_index,
                        epoch,
                        error,
                    });
                }

                self.finish(index, FinalOutcome::Converged { epoch }, &mut events);
                self.cancel_outliers(grid_index, &mut events);

                if self.phase == SweepPhase::Running {
                    self.pace();
                }
                self.check_stopped(&mut events);
            }
            WorkerEventKind::Failed { epoch, reason } => {
                warn!(
                    grid = grid_index,
                    replicate = replicate_index,
                    epoch = epoch;
                    "worker failed: {reason}"
                );
                events.push(SweepEvent::WorkerFailed {
                    grid_index,
                    replicate_index,
                    reason,
                });
            }
        }

        events
    }

    /// Records a final outcome, publishing the grid point's statistics once it's complete.
    fn finish(&mut self, index: usize, outcome: FinalOutcome, events: &mut Vec<SweepEvent>) {
        let record = &mut self.records[index];
        record.outcome = Some(outcome);

        let WorkerId {
            grid_index,
            replicate_index,
        } = record.id();

        events.push(SweepEvent::Final {
            grid_index,
            replicate_index,
            epoch: outcome.epoch(),
            converged: outcome.is_converged(),
        });

        let aggregate = &mut self.aggregates[grid_index];
        aggregate.push(outcome);

        if let Some(stats) = aggregate.statistics()
            && !aggregate.publish()
        {
            info!(grid = grid_index; "grid point done: {stats:?}");
            events.push(SweepEvent::Statistics { grid_index, stats });
        }
    }

    /// Cancels the replicates of a grid point lagging too far behind the converged ones.
    fn cancel_outliers(&mut self, grid_index: usize, events: &mut Vec<SweepEvent>) {
        if self.per_grid < 2 {
            return;
        }

        let start = grid_index * self.per_grid;
        let running: Vec<usize> = (start..start + self.per_grid)
            .filter(|&i| !self.records[i].is_done())
            .collect();
        let reported: Vec<Option<usize>> =
            running.iter().map(|&i| self.records[i].last_epoch).collect();

        let converged = self.aggregates[grid_index].converged_epochs();

        for k in policy::outliers(&converged, &reported) {
            let index = running[k];
            let Some(epoch) = reported[k] else {
                continue;
            };

            let record = &self.records[index];
            record.worker.cancel();

            let id = record.id();
            info!(
                grid = id.grid_index,
                replicate = id.replicate_index,
                epoch = epoch;
                "cancelling outlier"
            );

            self.finish(index, FinalOutcome::Cancelled { epoch }, events);
        }
    }

    /// Pauses the workers ahead of the slowest one and resumes the rest.
    fn pace(&self) {
        let running: Vec<&WorkerRecord> = self.records.iter().filter(|r| !r.is_done()).collect();
        let reported: Vec<Option<usize>> = running.iter().map(|r| r.last_epoch).collect();

        for (record, hold) in running.iter().zip(policy::pace(&reported)) {
            if hold {
                record.worker.pause();
            } else {
                record.worker.resume();
            }
        }
    }

    fn check_stopped(&mut self, events: &mut Vec<SweepEvent>) {
        let live = matches!(
            self.phase,
            SweepPhase::Idle | SweepPhase::Running | SweepPhase::Paused
        );

        if live && !self.records.is_empty() && self.records.iter().all(WorkerRecord::is_done) {
            self.phase = SweepPhase::Stopped;
            info!(generation = self.generation; "every worker is done");
            events.push(SweepEvent::SweepStopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::worker::WorkerState;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// A grid whose workers never report on their own.
    fn quiet_config(grid: usize, replicates: usize) -> SweepConfig {
        SweepConfig {
            eta_start: 0.5,
            eta_end: 0.5 + 0.1 * (grid - 1) as f64,
            eta_increment: 0.1,
            replicate_count: replicates,
            stop_threshold: 1e-9,
            milestone_interval: 1_000_000_000,
            seed: Some(1),
            ..Default::default()
        }
    }

    fn built(config: SweepConfig) -> (Inner, Receiver<WorkerEvent>) {
        let (tx, rx) = mpsc::channel();
        let dataset = Arc::new(Dataset::parity(4, 1).unwrap());

        let mut inner = Inner::new();
        inner.generation = 1;
        inner.build(&config, dataset, &tx).unwrap();
        (inner, rx)
    }

    fn event(inner: &Inner, id: WorkerId, kind: WorkerEventKind) -> WorkerEvent {
        WorkerEvent {
            id,
            generation: inner.generation,
            kind,
        }
    }

    fn milestone(inner: &mut Inner, g: usize, r: usize, epoch: usize) -> Vec<SweepEvent> {
        let kind = WorkerEventKind::Milestone { epoch, error: 0.5 };
        let e = event(inner, WorkerId::new(g, r), kind);
        inner.handle(e)
    }

    fn converged(inner: &mut Inner, g: usize, r: usize, epoch: usize) -> Vec<SweepEvent> {
        let kind = WorkerEventKind::Converged { epoch, error: 0.01 };
        let e = event(inner, WorkerId::new(g, r), kind);
        inner.handle(e)
    }

    #[test]
    fn builds_grid() {
        let (mut inner, _rx) = built(quiet_config(3, 2));

        assert_eq!(inner.phase, SweepPhase::Idle);
        assert_eq!(inner.records.len(), 6);
        assert_eq!(inner.grid.len(), 3);
        assert_eq!(inner.grid[2].label, "η = 0.70");
        assert_eq!(inner.index_of(WorkerId::new(2, 1)), Some(5));
        assert_eq!(inner.index_of(WorkerId::new(1, 2)), None);
        assert_eq!(inner.index_of(WorkerId::new(3, 0)), None);

        inner.teardown(TIMEOUT).unwrap();
        assert!(inner.records.is_empty());
        assert_eq!(inner.phase, SweepPhase::Empty);
    }

    #[test]
    fn averaged_mode_builds_one_worker_per_grid_point() {
        let config = SweepConfig {
            replicate_mode: ReplicateMode::Averaged,
            ..quiet_config(2, 3)
        };
        let (mut inner, _rx) = built(config);

        assert_eq!(inner.records.len(), 2);
        assert_eq!(inner.per_grid, 1);

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn cancels_straggler_and_excludes_it() {
        let (mut inner, _rx) = built(quiet_config(1, 5));
        inner.aggregates[0].set_highlighted(true);

        for (r, epoch) in [100, 102, 98, 105].into_iter().enumerate() {
            converged(&mut inner, 0, r, epoch);
        }

        let events = milestone(&mut inner, 0, 4, 10_000);

        assert_eq!(
            events[1],
            SweepEvent::Final {
                grid_index: 0,
                replicate_index: 4,
                epoch: 10_000,
                converged: false,
            }
        );
        assert_eq!(inner.records[4].worker.state(), WorkerState::Cancelled);
        assert_eq!(
            inner.records[4].outcome,
            Some(FinalOutcome::Cancelled { epoch: 10_000 })
        );

        let Some(SweepEvent::Statistics { stats, .. }) = events.get(2) else {
            panic!("expected statistics, got {events:?}");
        };
        assert_eq!(stats.raw.unwrap().count, 5);
        let trimmed = stats.trimmed.unwrap();
        assert_eq!(trimmed.count, 4);
        assert!((trimmed.mean - 101.25).abs() < 1e-9);
        assert_eq!(stats.cancelled, 1);

        assert_eq!(events.last(), Some(&SweepEvent::SweepStopped));
        assert_eq!(inner.phase, SweepPhase::Stopped);

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn replicates_within_bound_keep_running() {
        let (mut inner, _rx) = built(quiet_config(1, 3));

        converged(&mut inner, 0, 0, 1000);
        let events = milestone(&mut inner, 0, 1, 1000);

        assert_eq!(events.len(), 1);
        assert!(inner.records[1].outcome.is_none());
        assert!(inner.records[2].outcome.is_none());

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn first_converger_cancels_nobody() {
        let (mut inner, _rx) = built(quiet_config(1, 5));

        for r in 0..4 {
            milestone(&mut inner, 0, r, 1000);
        }
        converged(&mut inner, 0, 4, 1053);
        for r in 0..4 {
            milestone(&mut inner, 0, r, 1100);
        }
        milestone(&mut inner, 0, 0, 1300);

        for r in 0..4 {
            assert!(inner.records[r].outcome.is_none(), "replicate {r} was cancelled");
            assert_ne!(inner.records[r].worker.state(), WorkerState::Cancelled);
        }

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn drops_stale_events() {
        let (mut inner, _rx) = built(quiet_config(1, 1));

        let stale = WorkerEvent {
            id: WorkerId::new(0, 0),
            generation: inner.generation - 1,
            kind: WorkerEventKind::Converged { epoch: 5, error: 0. },
        };
        assert!(inner.handle(stale).is_empty());
        assert!(inner.records[0].outcome.is_none());

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn statistics_follow_highlight() {
        let (mut inner, _rx) = built(quiet_config(2, 2));

        converged(&mut inner, 1, 0, 300);
        let events = converged(&mut inner, 1, 1, 500);

        let Some(SweepEvent::Statistics { grid_index: 1, stats }) = events.last() else {
            panic!("expected statistics, got {events:?}");
        };
        assert_eq!(stats.raw.unwrap().mean, 400.);
        assert!(stats.trimmed.is_none());

        let events = inner.set_highlighted(1, true).unwrap();
        let [SweepEvent::Statistics { stats, .. }] = &events[..] else {
            panic!("expected statistics, got {events:?}");
        };
        assert!(stats.trimmed.is_some());

        assert!(inner.set_highlighted(0, true).unwrap().is_empty());
        assert!(matches!(
            inner.set_highlighted(2, true),
            Err(SweepErr::GridIndexOutOfRange { grid_index: 2, grid_size: 2 })
        ));

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn paces_workers_ahead_of_the_slowest() {
        let (mut inner, _rx) = built(quiet_config(3, 1));
        inner.resume();

        milestone(&mut inner, 0, 0, 3000);
        milestone(&mut inner, 1, 0, 2000);

        // The third worker hasn't reported, it keeps running.
        assert_eq!(inner.records[0].worker.state(), WorkerState::Paused);
        assert_eq!(inner.records[1].worker.state(), WorkerState::Running);
        assert_eq!(inner.records[2].worker.state(), WorkerState::Running);

        milestone(&mut inner, 1, 0, 3000);
        assert_eq!(inner.records[0].worker.state(), WorkerState::Running);

        converged(&mut inner, 2, 0, 1500);
        milestone(&mut inner, 0, 0, 4000);
        assert_eq!(inner.records[0].worker.state(), WorkerState::Paused);
        assert_eq!(inner.records[1].worker.state(), WorkerState::Running);

        inner.pause();
        assert_eq!(inner.phase, SweepPhase::Paused);
        assert_eq!(inner.records[1].worker.state(), WorkerState::Paused);

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn restart_clears_outcomes() {
        let (mut inner, _rx) = built(quiet_config(1, 2));
        let generation = inner.generation;

        converged(&mut inner, 0, 0, 700);
        converged(&mut inner, 0, 1, 900);
        assert_eq!(inner.phase, SweepPhase::Stopped);

        inner.restart();

        assert_eq!(inner.phase, SweepPhase::Idle);
        assert_eq!(inner.generation, generation + 1);
        assert!(inner.records.iter().all(|r| !r.is_done() && r.history.is_empty()));
        assert!(inner.aggregates[0].finals().is_empty());
        assert_eq!(inner.records[0].worker.snapshot().epoch, 0);

        inner.teardown(TIMEOUT).unwrap();
    }

    #[test]
    fn resume_on_empty_grid_is_noop() {
        let mut inner = Inner::new();

        assert!(inner.resume().is_empty());
        assert_eq!(inner.phase, SweepPhase::Empty);
    }
}
