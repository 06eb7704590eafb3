use crate::diagnosis::DiagnosisService;
use crate::error::{FundusError, Result};
use crate::model::{EyeImagePair, PairDiagnosis};
use crate::workflow::{BatchEvent, BatchFailure, BatchRun, BatchState, Phase};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

struct BatchJob {
    rx: mpsc::Receiver<BatchEvent>,
    cancel: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Owns a queue of pairs and runs it on a background worker.
///
/// The worker reports each step as a [`BatchEvent`]; the owner pulls them in
/// with [`BatchController::poll`] (non-blocking, once per UI frame) or
/// [`BatchController::wait`] (blocking).
#[derive(Default)]
pub struct BatchController {
    pairs: Vec<EyeImagePair>,
    run: BatchRun,
    job: Option<BatchJob>,
}

impl BatchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> &[EyeImagePair] {
        &self.pairs
    }

    /// Replace the queue. Clears the results of any previous run.
    pub fn set_pairs(&mut self, pairs: Vec<EyeImagePair>) -> Result<()> {
        if self.is_processing() {
            return Err(FundusError::AlreadyRunning);
        }
        self.pairs = pairs;
        self.run = BatchRun::new();
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.set_pairs(Vec::new())
    }

    pub fn state(&self) -> BatchState {
        self.run.state()
    }

    pub fn is_processing(&self) -> bool {
        self.run.is_processing()
    }

    pub fn progress(&self) -> f32 {
        self.run.progress()
    }

    pub fn results(&self) -> &[PairDiagnosis] {
        self.run.results()
    }

    pub fn failures(&self) -> &[BatchFailure] {
        self.run.failures()
    }

    /// The pair currently being stitched or diagnosed.
    pub fn current_pair(&self) -> Option<(&EyeImagePair, Phase)> {
        let (index, phase) = self.run.state().current()?;
        self.pairs.get(index).map(|p| (p, phase))
    }

    /// Begin processing the queue. Rejected without any state change when a
    /// run is already active or the queue is empty.
    pub fn start(&mut self, service: Arc<dyn DiagnosisService>) -> Result<()> {
        if self.is_processing() {
            return Err(FundusError::AlreadyRunning);
        }
        if self.pairs.is_empty() {
            return Err(FundusError::EmptyQueue);
        }

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_pairs = self.pairs.clone();
        let worker_cancel = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("batch-worker".into())
            .spawn(move || run_worker(&worker_pairs, service.as_ref(), &tx, &worker_cancel))?;

        self.run.apply(
            BatchEvent::Start {
                total: self.pairs.len(),
            },
            &self.pairs,
        );
        self.job = Some(BatchJob { rx, cancel, handle });
        tracing::info!("Batch started with {} pairs", self.pairs.len());
        Ok(())
    }

    /// Ask the worker to stop before its next phase. Results already
    /// collected are kept.
    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            tracing::info!("Batch cancellation requested");
            job.cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Apply every event the worker has sent so far without blocking.
    /// Returns the number of accepted events.
    pub fn poll(&mut self) -> Result<usize> {
        let mut applied = 0;
        let mut disconnected = false;
        if let Some(job) = &self.job {
            loop {
                match job.rx.try_recv() {
                    Ok(event) => {
                        if self.run.apply(event, &self.pairs) {
                            applied += 1;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        self.settle(disconnected)?;
        Ok(applied)
    }

    /// Block until the run reaches a terminal state.
    pub fn wait(&mut self) -> Result<BatchState> {
        self.wait_with(|_| {})
    }

    /// Like [`BatchController::wait`], calling `observe` after each accepted
    /// event.
    pub fn wait_with(&mut self, mut observe: impl FnMut(&BatchRun)) -> Result<BatchState> {
        let mut disconnected = false;
        if let Some(job) = &self.job {
            while self.run.is_processing() {
                match job.rx.recv() {
                    Ok(event) => {
                        if self.run.apply(event, &self.pairs) {
                            observe(&self.run);
                        }
                    }
                    Err(_) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        self.settle(disconnected)?;
        Ok(self.run.state())
    }

    fn settle(&mut self, disconnected: bool) -> Result<()> {
        if disconnected && self.run.is_processing() {
            tracing::error!("Batch worker exited before finishing the queue");
            self.run.apply(BatchEvent::Cancelled, &self.pairs);
            self.reap();
            return Err(FundusError::WorkerDisconnected);
        }
        if !self.run.is_processing() {
            self.reap();
        }
        Ok(())
    }

    fn reap(&mut self) {
        if let Some(job) = self.job.take() {
            if job.handle.join().is_err() {
                tracing::error!("Batch worker panicked");
            }
            match self.run.state() {
                BatchState::Done => tracing::info!(
                    "Batch finished: {} diagnosed, {} failed",
                    self.run.results().len(),
                    self.run.failures().len()
                ),
                BatchState::Cancelled => tracing::info!(
                    "Batch cancelled after {} results",
                    self.run.results().len()
                ),
                _ => {}
            }
        }
    }
}

impl Drop for BatchController {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_worker(
    pairs: &[EyeImagePair],
    service: &dyn DiagnosisService,
    tx: &mpsc::Sender<BatchEvent>,
    cancel: &AtomicBool,
) {
    for (index, pair) in pairs.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            let _ = tx.send(BatchEvent::Cancelled);
            return;
        }
        let event = match service.combine(pair) {
            Ok(combined) => BatchEvent::Stitched { index, combined },
            Err(e) => BatchEvent::Failed {
                index,
                phase: Phase::Stitching,
                message: e.to_string(),
            },
        };
        let stitched = matches!(event, BatchEvent::Stitched { .. });
        if tx.send(event).is_err() {
            return;
        }
        if !stitched {
            continue;
        }

        if cancel.load(Ordering::Relaxed) {
            let _ = tx.send(BatchEvent::Cancelled);
            return;
        }
        let event = match service.diagnose_one(&pair.left.path, &pair.right.path) {
            Ok(result) => BatchEvent::Diagnosed { index, result },
            Err(e) => BatchEvent::Failed {
                index,
                phase: Phase::Diagnosing,
                message: e.to_string(),
            },
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}
