//! Batch diagnosis state machine.
//!
//! A run walks the queue strictly in order. Each pair passes through a
//! stitching phase and a diagnosing phase; every transition is driven by a
//! [`BatchEvent`] applied through [`BatchRun::apply`], which is the only place
//! that mutates run state.

use crate::model::{CombinedImage, DiagnosisResult, EyeImagePair, PairDiagnosis};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stitching,
    Diagnosing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Stitching => write!(f, "Stitching"),
            Phase::Diagnosing => write!(f, "Diagnosing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Stitching(usize),
    Diagnosing(usize),
    Done,
    Cancelled,
}

impl BatchState {
    pub fn is_processing(self) -> bool {
        matches!(self, BatchState::Stitching(_) | BatchState::Diagnosing(_))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Done | BatchState::Cancelled)
    }

    /// Index and phase of the pair being worked on.
    pub fn current(self) -> Option<(usize, Phase)> {
        match self {
            BatchState::Stitching(i) => Some((i, Phase::Stitching)),
            BatchState::Diagnosing(i) => Some((i, Phase::Diagnosing)),
            _ => None,
        }
    }
}

/// Messages that drive a run forward.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Start { total: usize },
    Stitched { index: usize, combined: CombinedImage },
    Diagnosed { index: usize, result: DiagnosisResult },
    Failed { index: usize, phase: Phase, message: String },
    Cancelled,
}

/// A pair the run could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub index: usize,
    pub pair_id: String,
    pub phase: Phase,
    pub message: String,
}

/// Result accumulator and state for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    state: BatchState,
    total: usize,
    /// Pairs fully handled, successfully or not.
    processed: usize,
    /// Combined image of the pair currently in `Diagnosing`.
    pending_combined: Option<CombinedImage>,
    results: Vec<PairDiagnosis>,
    failures: Vec<BatchFailure>,
}

impl BatchRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn results(&self) -> &[PairDiagnosis] {
        &self.results
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing()
    }

    /// Overall progress in [0,1]. Each pair is worth `1/total`, half of which
    /// is credited when stitching finishes.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return match self.state {
                BatchState::Done => 1.0,
                _ => 0.0,
            };
        }
        let half = match self.state {
            BatchState::Diagnosing(_) => 0.5,
            _ => 0.0,
        };
        ((self.processed as f32 + half) / self.total as f32).min(1.0)
    }

    /// Apply one event. Returns `false`, leaving the run untouched, when the
    /// event is not valid in the current state.
    pub fn apply(&mut self, event: BatchEvent, pairs: &[EyeImagePair]) -> bool {
        match (self.state, event) {
            (state, BatchEvent::Start { total }) if !state.is_processing() && total > 0 => {
                *self = BatchRun {
                    state: BatchState::Stitching(0),
                    total,
                    ..BatchRun::default()
                };
                true
            }
            (BatchState::Stitching(i), BatchEvent::Stitched { index, combined }) if i == index => {
                self.pending_combined = Some(combined);
                self.state = BatchState::Diagnosing(i);
                true
            }
            (BatchState::Diagnosing(i), BatchEvent::Diagnosed { index, result }) if i == index => {
                match pairs.get(i) {
                    Some(pair) => {
                        self.results.push(PairDiagnosis {
                            pair: pair.clone(),
                            combined: self.pending_combined.take(),
                            result,
                        });
                        self.advance();
                        true
                    }
                    None => false,
                }
            }
            (state, BatchEvent::Failed { index, phase, message })
                if state.current() == Some((index, phase)) =>
            {
                let pair_id = pairs.get(index).map(|p| p.id.clone()).unwrap_or_default();
                tracing::warn!("{phase} failed for {pair_id}: {message}");
                self.failures.push(BatchFailure {
                    index,
                    pair_id,
                    phase,
                    message,
                });
                self.pending_combined = None;
                self.advance();
                true
            }
            (state, BatchEvent::Cancelled) if state.is_processing() => {
                self.pending_combined = None;
                self.state = BatchState::Cancelled;
                true
            }
            (state, event) => {
                tracing::warn!("Ignoring {event:?} in state {state:?}");
                false
            }
        }
    }

    fn advance(&mut self) {
        self.processed += 1;
        self.state = if self.processed >= self.total {
            BatchState::Done
        } else {
            BatchState::Stitching(self.processed)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Disease, ImageRef};
    use approx::assert_relative_eq;
    use chrono::Utc;
    use std::path::PathBuf;

    fn pairs(ids: &[&str]) -> Vec<EyeImagePair> {
        ids.iter()
            .map(|id| {
                EyeImagePair::new(
                    *id,
                    ImageRef::from_path(format!("/l/{id}.jpg")),
                    ImageRef::from_path(format!("/r/{id}.jpg")),
                )
            })
            .collect()
    }

    fn stitched(index: usize) -> BatchEvent {
        BatchEvent::Stitched {
            index,
            combined: CombinedImage {
                path: PathBuf::from(format!("/c/{index}.jpg")),
            },
        }
    }

    fn diagnosed(index: usize) -> BatchEvent {
        BatchEvent::Diagnosed {
            index,
            result: DiagnosisResult {
                disease: Disease::Myopia,
                confidence: 0.8,
                diagnosed_at: Utc::now(),
            },
        }
    }

    #[test]
    fn walks_every_pair_through_both_phases() {
        let queue = pairs(&["p1", "p2", "p3"]);
        let mut run = BatchRun::new();
        assert_eq!(run.state(), BatchState::Idle);

        assert!(run.apply(BatchEvent::Start { total: 3 }, &queue));
        assert_eq!(run.state(), BatchState::Stitching(0));
        assert!(run.is_processing());

        let mut progress = vec![run.progress()];
        for i in 0..3 {
            assert!(run.apply(stitched(i), &queue));
            assert_eq!(run.state(), BatchState::Diagnosing(i));
            progress.push(run.progress());
            assert!(run.apply(diagnosed(i), &queue));
            progress.push(run.progress());
        }

        assert_eq!(run.state(), BatchState::Done);
        assert!(!run.is_processing());
        let ids: Vec<_> = run.results().iter().map(|r| r.pair.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(
            run.results()[1].combined.as_ref().map(|c| c.path.clone()),
            Some(PathBuf::from("/c/1.jpg"))
        );

        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_relative_eq!(progress[2], 1.0 / 3.0);
        assert_relative_eq!(progress[4], 2.0 / 3.0);
        assert_eq!(progress[6], 1.0);
        assert!(progress[..6].iter().all(|p| *p < 1.0));
    }

    #[test]
    fn start_is_rejected_while_running_or_empty() {
        let queue = pairs(&["p1"]);
        let mut run = BatchRun::new();
        assert!(!run.apply(BatchEvent::Start { total: 0 }, &queue));
        assert_eq!(run.state(), BatchState::Idle);

        assert!(run.apply(BatchEvent::Start { total: 1 }, &queue));
        assert!(!run.apply(BatchEvent::Start { total: 1 }, &queue));
        assert_eq!(run.state(), BatchState::Stitching(0));
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let queue = pairs(&["p1", "p2"]);
        let mut run = BatchRun::new();
        run.apply(BatchEvent::Start { total: 2 }, &queue);

        assert!(!run.apply(diagnosed(0), &queue));
        assert!(!run.apply(stitched(1), &queue));
        assert_eq!(run.state(), BatchState::Stitching(0));
        assert!(run.results().is_empty());
    }

    #[test]
    fn failure_is_recorded_and_run_continues() {
        let queue = pairs(&["p1", "p2"]);
        let mut run = BatchRun::new();
        run.apply(BatchEvent::Start { total: 2 }, &queue);
        run.apply(stitched(0), &queue);
        assert!(run.apply(
            BatchEvent::Failed {
                index: 0,
                phase: Phase::Diagnosing,
                message: "model offline".into(),
            },
            &queue,
        ));
        assert_eq!(run.state(), BatchState::Stitching(1));
        assert_relative_eq!(run.progress(), 0.5);

        run.apply(stitched(1), &queue);
        run.apply(diagnosed(1), &queue);
        assert_eq!(run.state(), BatchState::Done);
        assert_eq!(run.results().len(), 1);
        assert_eq!(run.results()[0].pair.id, "p2");
        assert_eq!(
            run.failures(),
            &[BatchFailure {
                index: 0,
                pair_id: "p1".into(),
                phase: Phase::Diagnosing,
                message: "model offline".into(),
            }]
        );
    }

    #[test]
    fn failure_for_wrong_phase_is_ignored() {
        let queue = pairs(&["p1"]);
        let mut run = BatchRun::new();
        run.apply(BatchEvent::Start { total: 1 }, &queue);
        assert!(!run.apply(
            BatchEvent::Failed {
                index: 0,
                phase: Phase::Diagnosing,
                message: "x".into(),
            },
            &queue,
        ));
        assert!(run.failures().is_empty());
    }

    #[test]
    fn cancel_keeps_completed_results_and_allows_restart() {
        let queue = pairs(&["p1", "p2", "p3"]);
        let mut run = BatchRun::new();
        run.apply(BatchEvent::Start { total: 3 }, &queue);
        run.apply(stitched(0), &queue);
        run.apply(diagnosed(0), &queue);
        run.apply(stitched(1), &queue);

        assert!(run.apply(BatchEvent::Cancelled, &queue));
        assert_eq!(run.state(), BatchState::Cancelled);
        assert_eq!(run.results().len(), 1);
        assert!(!run.apply(BatchEvent::Cancelled, &queue));

        assert!(run.apply(BatchEvent::Start { total: 3 }, &queue));
        assert!(run.results().is_empty());
        assert_eq!(run.progress(), 0.0);
    }
}
