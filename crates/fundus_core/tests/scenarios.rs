use anyhow::Result;
use approx::assert_relative_eq;
use fundus_core::{
    BatchController, BatchState, Dialogs, Eye, EyeImagePair, FileFilter, HistoryQuery,
    HistoryRepository, ImageRef, InMemoryHistory, NewHistoryRecord, SimulatedDiagnosis,
    SimulationConfig, SingleSession, export_history_csv, export_results_csv, export_with_dialog,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

struct CannedDialogs(RefCell<VecDeque<Option<PathBuf>>>);

impl CannedDialogs {
    fn new(answers: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self(RefCell::new(answers.into_iter().collect()))
    }

    fn next(&self) -> Option<PathBuf> {
        self.0.borrow_mut().pop_front().flatten()
    }
}

impl Dialogs for CannedDialogs {
    fn pick_file(&self, _: &[FileFilter], _: &str) -> Option<PathBuf> {
        self.next()
    }
    fn pick_directory(&self, _: &str) -> Option<PathBuf> {
        self.next()
    }
    fn pick_save_path(&self, _: &str, _: &[FileFilter], _: &str) -> Option<PathBuf> {
        self.next()
    }
}

fn named_pairs(ids: &[&str]) -> Vec<EyeImagePair> {
    ids.iter()
        .map(|id| {
            EyeImagePair::new(
                *id,
                ImageRef::from_path(format!("/scans/left/{id}.jpg")),
                ImageRef::from_path(format!("/scans/right/{id}.jpg")),
            )
        })
        .collect()
}

#[test]
fn three_pairs_progress_through_thirds_and_keep_order() -> Result<()> {
    let mut ctl = BatchController::new();
    ctl.set_pairs(named_pairs(&["p1", "p2", "p3"]))?;
    ctl.start(Arc::new(SimulatedDiagnosis::new(SimulationConfig::instant(21))))?;
    assert_eq!(ctl.state(), BatchState::Stitching(0));

    let mut states = Vec::new();
    let mut after_pair = Vec::new();
    let mut progress = Vec::new();
    ctl.wait_with(|run| {
        states.push(run.state());
        progress.push(run.progress());
        if matches!(run.state(), BatchState::Stitching(_) | BatchState::Done) {
            after_pair.push(run.progress());
        }
    })?;

    assert_eq!(states.first(), Some(&BatchState::Diagnosing(0)));
    assert_eq!(states.last(), Some(&BatchState::Done));
    assert_eq!(after_pair.len(), 3);
    assert_relative_eq!(after_pair[0], 1.0 / 3.0);
    assert_relative_eq!(after_pair[1], 2.0 / 3.0);
    assert_eq!(after_pair[2], 1.0);

    assert!(progress[0] > 0.0);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress[..progress.len() - 1].iter().all(|p| *p < 1.0));

    let ids: Vec<_> = ctl.results().iter().map(|r| r.pair.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    Ok(())
}

#[test]
fn cancelled_left_dialog_keeps_actions_disabled() {
    let dialogs = CannedDialogs::new([None]);
    let mut session = SingleSession::new();
    assert!(!session.select(Eye::Left, &dialogs));
    assert!(session.image(Eye::Left).is_none());
    assert!(!session.can_clear());
    assert!(!session.can_diagnose());
}

#[test]
fn single_pair_diagnosis_lands_in_history_and_exports() -> Result<()> {
    let dir = tempdir()?;
    let dialogs = CannedDialogs::new([
        Some(PathBuf::from("/scans/L.jpg")),
        Some(PathBuf::from("/scans/R.jpg")),
        Some(dir.path().join("single.csv")),
        Some(dir.path().join("history.csv")),
    ]);

    let mut session = SingleSession::new();
    session.select(Eye::Left, &dialogs);
    session.select(Eye::Right, &dialogs);
    let pair = session.pair().expect("both eyes selected");

    let mut ctl = BatchController::new();
    ctl.set_pairs(vec![pair])?;
    ctl.start(Arc::new(SimulatedDiagnosis::new(SimulationConfig::instant(5))))?;
    assert_eq!(ctl.wait()?, BatchState::Done);
    assert_eq!(ctl.results().len(), 1);

    let mut history = InMemoryHistory::new();
    for done in ctl.results() {
        history.create(NewHistoryRecord::from(done));
    }
    let records = history.list(&HistoryQuery::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].left_path, PathBuf::from("/scans/L.jpg"));
    assert_eq!(records[0].combined_path, Some(PathBuf::from("/scans/R.jpg")));

    let single = export_with_dialog(&dialogs, "d.csv", "Save", |p| {
        export_results_csv(ctl.results(), p)
    })?
    .expect("save path chosen");
    assert_eq!(std::fs::read_to_string(single)?.lines().count(), 2);

    let hist = export_with_dialog(&dialogs, "h.csv", "Save", |p| {
        export_history_csv(&records, p)
    })?
    .expect("save path chosen");
    let mut rdr = csv::Reader::from_path(hist)?;
    assert_eq!(
        rdr.headers()?.iter().collect::<Vec<_>>(),
        vec![
            "timestamp",
            "disease",
            "confidence",
            "left_image",
            "right_image",
            "combined_image"
        ]
    );
    Ok(())
}
