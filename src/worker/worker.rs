use std::{
    sync::{Arc, mpsc::Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{
    WorkerConfig, WorkerEvent, WorkerEventKind, WorkerId, WorkerSnapshot, WorkerState,
};
use crate::{Result, SweepErr, training::Trainer};

struct Inner {
    state: WorkerState,
    generation: u64,
    stop_requested: bool,
    exited: bool,
    trainer: Box<dyn Trainer>,
}

struct Shared {
    inner: Mutex<Inner>,
    cvar: Condvar,
}

/// Trains one `Trainer` on a dedicated thread, driven by a small state machine.
///
/// Every command takes the worker lock, which the training thread only releases between
/// epochs, so a command never observes a half trained epoch.
pub struct TrainingWorker {
    config: WorkerConfig,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl TrainingWorker {
    /// Spawns the training thread, the worker starts `Idle`.
    ///
    /// # Args
    /// * `config` - The worker's identity and milestone interval.
    /// * `trainer` - The trainer owning the networks to train.
    /// * `events` - Where progress events are sent.
    ///
    /// # Returns
    /// A new worker instance or a `Spawn` error.
    pub fn spawn(
        config: WorkerConfig,
        trainer: Box<dyn Trainer>,
        events: Sender<WorkerEvent>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: WorkerState::Idle,
                generation: config.generation(),
                stop_requested: false,
                exited: false,
                trainer,
            }),
            cvar: Condvar::new(),
        });

        let id = config.id();
        let handle = thread::Builder::new()
            .name(format!("worker-{}-{}", id.grid_index, id.replicate_index))
            .spawn({
                let config = config.clone();
                let shared = Arc::clone(&shared);
                move || run(config, shared, events)
            })
            .map_err(SweepErr::Spawn)?;

        Ok(Self {
            config,
            shared,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> WorkerId {
        self.config.id()
    }

    pub fn state(&self) -> WorkerState {
        self.shared.inner.lock().state
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        let inner = self.shared.inner.lock();
        WorkerSnapshot {
            state: inner.state,
            epoch: inner.trainer.epoch(),
            error: inner.trainer.error(),
        }
    }

    /// Lets an idle or paused worker train.
    pub fn resume(&self) {
        self.transition(|state| match state {
            WorkerState::Idle | WorkerState::Paused => Some(WorkerState::Running),
            _ => None,
        });
    }

    /// Parks a running worker after its current epoch.
    pub fn pause(&self) {
        self.transition(|state| match state {
            WorkerState::Running => Some(WorkerState::Paused),
            _ => None,
        });
    }

    /// Gives up on training, the worker parks until it's restarted or stopped.
    pub fn cancel(&self) {
        self.transition(|state| match state {
            WorkerState::Idle | WorkerState::Running | WorkerState::Paused => {
                Some(WorkerState::Cancelled)
            }
            _ => None,
        });
    }

    /// Reinitializes the trainer and goes back to `Idle`, from any state but `Stopped`.
    pub fn restart(&self) {
        let generation = self.shared.inner.lock().generation;
        self.restart_into(generation);
    }

    /// Restarts the worker and tags every event it sends from now on with `generation`.
    pub fn restart_into(&self, generation: u64) {
        let mut inner = self.shared.inner.lock();
        if inner.state == WorkerState::Stopped || inner.stop_requested {
            return;
        }

        inner.trainer.reinitialize();
        inner.state = WorkerState::Idle;
        inner.generation = generation;
        self.shared.cvar.notify_all();

        let id = self.id();
        debug!(grid = id.grid_index, replicate = id.replicate_index; "restarted");
    }

    /// Asks the training thread to exit at its next opportunity.
    pub fn stop(&self) {
        let mut inner = self.shared.inner.lock();
        inner.stop_requested = true;
        self.shared.cvar.notify_all();
    }

    /// Waits for the training thread to exit, `stop` must have been requested first.
    ///
    /// # Args
    /// * `timeout` - The maximum time to wait for.
    ///
    /// # Errors
    /// `JoinTimeout` if the thread is still alive after `timeout`, `WorkerPanicked` if the
    /// thread died while training.
    pub fn join(&mut self, timeout: Duration) -> Result<()> {
        let id = self.id();
        let deadline = Instant::now() + timeout;

        {
            let mut inner = self.shared.inner.lock();
            while !inner.exited {
                if self.shared.cvar.wait_until(&mut inner, deadline).timed_out() && !inner.exited
                {
                    return Err(SweepErr::JoinTimeout {
                        grid_index: id.grid_index,
                        replicate_index: id.replicate_index,
                    });
                }
            }
        }

        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| SweepErr::WorkerPanicked {
                grid_index: id.grid_index,
                replicate_index: id.replicate_index,
            })?;
        }

        Ok(())
    }

    fn transition<F>(&self, next: F)
    where
        F: FnOnce(WorkerState) -> Option<WorkerState>,
    {
        let mut inner = self.shared.inner.lock();
        if let Some(state) = next(inner.state) {
            inner.state = state;
            self.shared.cvar.notify_all();
        }
    }
}

impl Drop for TrainingWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

/// Marks the worker as exited even if the training thread unwinds.
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut inner = self.0.inner.lock();
        inner.state = WorkerState::Stopped;
        inner.exited = true;
        self.0.cvar.notify_all();
    }
}

fn run(config: WorkerConfig, shared: Arc<Shared>, events: Sender<WorkerEvent>) {
    let _exit = ExitGuard(Arc::clone(&shared));
    let id = config.id();
    let interval = config.milestone_interval();

    let send = |generation, kind| {
        let event = WorkerEvent {
            id,
            generation,
            kind,
        };
        events.send(event).is_ok()
    };

    let mut inner = shared.inner.lock();

    loop {
        if inner.stop_requested {
            break;
        }

        if inner.state != WorkerState::Running {
            shared.cvar.wait(&mut inner);
            continue;
        }

        let generation = inner.generation;
        let delivered = match inner.trainer.train_one_epoch() {
            Ok(report) => {
                let mut delivered = true;

                if report.epoch % interval == 0 {
                    delivered &= send(
                        generation,
                        WorkerEventKind::Milestone {
                            epoch: report.epoch,
                            error: report.error,
                        },
                    );
                }

                if report.converged {
                    inner.state = WorkerState::Successful;
                    info!(
                        grid = id.grid_index,
                        replicate = id.replicate_index,
                        epoch = report.epoch,
                        error = report.error;
                        "converged"
                    );
                    delivered &= send(
                        generation,
                        WorkerEventKind::Converged {
                            epoch: report.epoch,
                            error: report.error,
                        },
                    );
                }

                delivered
            }
            Err(e) => {
                let epoch = inner.trainer.epoch();
                warn!(
                    grid = id.grid_index,
                    replicate = id.replicate_index,
                    epoch = epoch;
                    "epoch aborted: {e}"
                );
                send(
                    generation,
                    WorkerEventKind::Failed {
                        epoch,
                        reason: e.to_string(),
                    },
                )
            }
        };

        if !delivered {
            debug!(
                grid = id.grid_index,
                replicate = id.replicate_index;
                "event receiver dropped, exiting"
            );
            break;
        }

        MutexGuard::bump(&mut inner);
    }

    debug!(
        grid = id.grid_index,
        replicate = id.replicate_index,
        epoch = inner.trainer.epoch();
        "training thread exiting"
    );
}
