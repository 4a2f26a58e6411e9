use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
    time::Duration,
};

use rand::{SeedableRng, rngs::StdRng};

use lr_sweep::{
    Dataset, SweepErr,
    arch::LayerTopology,
    training::{Hyperparameters, NetworkTrainer},
    worker::{TrainingWorker, WorkerConfig, WorkerEvent, WorkerEventKind, WorkerId, WorkerState},
};

const WAIT: Duration = Duration::from_secs(10);

fn parity_worker(
    topology: &[usize],
    stop_threshold: f32,
    interval: usize,
) -> (TrainingWorker, Receiver<WorkerEvent>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let topology = LayerTopology::new(topology.iter().copied()).unwrap();
    let dataset = Arc::new(Dataset::parity(4, 1).unwrap());
    let hyper = Hyperparameters {
        eta: 0.5,
        momentum: 0.,
        stop_threshold,
    };
    let trainer = NetworkTrainer::new(topology, dataset, hyper, StdRng::seed_from_u64(0)).unwrap();

    let (tx, rx) = mpsc::channel();
    let config = WorkerConfig::new(
        WorkerId::new(0, 0),
        NonZeroUsize::new(interval).unwrap(),
        1,
    );
    let worker = TrainingWorker::spawn(config, Box::new(trainer), tx).unwrap();
    (worker, rx)
}

#[test]
fn milestones_follow_interval() {
    let (mut worker, rx) = parity_worker(&[4, 4, 1], 1e-9, 20);
    worker.resume();

    let mut last_error = None;
    for k in 1..=3 {
        let event = rx.recv_timeout(WAIT).unwrap();
        match event.kind {
            WorkerEventKind::Milestone { epoch, error } => {
                assert_eq!(epoch, 20 * k);
                assert!(error.is_finite() && error >= 0.);
                last_error = Some(error);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    worker.pause();
    let snapshot = worker.snapshot();
    assert_eq!(snapshot.state, WorkerState::Paused);
    assert!(snapshot.epoch >= 60);
    assert!(last_error.is_some());

    worker.stop();
    worker.join(WAIT).unwrap();
}

#[test]
fn restart_rewinds_epochs() {
    let (mut worker, rx) = parity_worker(&[4, 4, 1], 1e-9, 10);
    worker.resume();
    rx.recv_timeout(WAIT).unwrap();

    worker.restart();
    let snapshot = worker.snapshot();
    assert_eq!(snapshot.state, WorkerState::Idle);
    assert_eq!(snapshot.epoch, 0);
    assert_eq!(snapshot.error, 0.);

    worker.stop();
    worker.join(WAIT).unwrap();
    assert_eq!(worker.state(), WorkerState::Stopped);
}

#[test]
fn mismatched_dataset_reports_failures() {
    let (mut worker, rx) = parity_worker(&[3, 4, 1], 0.05, 1000);
    worker.resume();

    let event = rx.recv_timeout(WAIT).unwrap();
    let WorkerEventKind::Failed { epoch, reason } = event.kind else {
        panic!("expected a failure, got {:?}", event.kind);
    };
    assert_eq!(epoch, 1);
    assert!(reason.contains("shape mismatch"));

    // Training goes on with the next epoch.
    let event = rx.recv_timeout(WAIT).unwrap();
    assert!(matches!(event.kind, WorkerEventKind::Failed { epoch: 2, .. }));
    assert_eq!(worker.state(), WorkerState::Running);

    worker.stop();
    worker.join(WAIT).unwrap();
}

#[test]
fn cancelled_worker_parks_until_stopped() {
    let (mut worker, _rx) = parity_worker(&[4, 4, 1], 1e-9, 1000);

    worker.cancel();
    assert_eq!(worker.state(), WorkerState::Cancelled);

    worker.resume();
    assert_eq!(worker.state(), WorkerState::Cancelled);
    assert_eq!(worker.snapshot().epoch, 0);

    worker.stop();
    assert!(!matches!(worker.join(WAIT), Err(SweepErr::JoinTimeout { .. })));
}
