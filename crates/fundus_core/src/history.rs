use crate::model::{DiagnosisResult, Disease, HistoryRecord, NewHistoryRecord, format_timestamp};
use chrono::{Duration, Utc};
use rand::Rng;
use std::path::PathBuf;

/// Filter applied when listing history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// `None` means all diseases.
    pub disease: Option<Disease>,
    /// Case-insensitive match on the disease label, or substring of the
    /// formatted timestamp. Empty matches everything.
    pub search: String,
}

impl HistoryQuery {
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        if let Some(disease) = self.disease
            && record.result.disease != disease
        {
            return false;
        }
        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        record
            .result
            .disease
            .label()
            .to_lowercase()
            .contains(&needle.to_lowercase())
            || format_timestamp(&record.result.diagnosed_at).contains(needle)
    }
}

/// Storage for diagnosis history.
pub trait HistoryRepository {
    /// Store a record and return it with its assigned id.
    fn create(&mut self, record: NewHistoryRecord) -> HistoryRecord;

    /// Records matching `query`, newest first.
    fn list(&self, query: &HistoryQuery) -> Vec<HistoryRecord>;

    fn get(&self, id: &str) -> Option<HistoryRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session-only repository; contents vanish when the app exits.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Vec<HistoryRecord>,
    next_id: u64,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `count` random records spread over the last 30 days.
    pub fn with_demo_records(count: usize, rng: &mut impl Rng) -> Self {
        let mut repo = Self::new();
        let now = Utc::now();
        for k in 1..=count {
            let age = Duration::seconds(rng.gen_range(0..30 * 24 * 60 * 60));
            repo.create(NewHistoryRecord {
                left_path: PathBuf::from(format!("/path/to/left_eye_{k}.jpg")),
                right_path: PathBuf::from(format!("/path/to/right_eye_{k}.jpg")),
                combined_path: Some(PathBuf::from(format!("/path/to/combined_{k}.jpg"))),
                result: DiagnosisResult {
                    disease: Disease::ALL[rng.gen_range(0..Disease::ALL.len())],
                    confidence: rng.gen_range(0.70..0.99),
                    diagnosed_at: now - age,
                },
            });
        }
        repo
    }
}

impl HistoryRepository for InMemoryHistory {
    fn create(&mut self, record: NewHistoryRecord) -> HistoryRecord {
        self.next_id += 1;
        let stored = HistoryRecord {
            id: format!("record_{}", self.next_id),
            left_path: record.left_path,
            right_path: record.right_path,
            combined_path: record.combined_path,
            result: record.result,
        };
        self.records.push(stored.clone());
        stored
    }

    fn list(&self, query: &HistoryQuery) -> Vec<HistoryRecord> {
        let mut out: Vec<HistoryRecord> = self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.result.diagnosed_at.cmp(&a.result.diagnosed_at));
        out
    }

    fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a, T> {
    pub items: &'a [T],
    /// Zero-based, clamped to the last page.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> PageView<'_, T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let page_count = total.div_ceil(per_page).max(1);
    let page = page.min(page_count - 1);
    let start = (page * per_page).min(total);
    let end = (start + per_page).min(total);
    PageView {
        items: &items[start..end],
        page,
        page_count,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn new_record(disease: Disease, day: u32) -> NewHistoryRecord {
        NewHistoryRecord {
            left_path: PathBuf::from(format!("/l/{day}.jpg")),
            right_path: PathBuf::from(format!("/r/{day}.jpg")),
            combined_path: None,
            result: DiagnosisResult {
                disease,
                confidence: 0.9,
                diagnosed_at: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            },
        }
    }

    fn sample() -> InMemoryHistory {
        let mut repo = InMemoryHistory::new();
        repo.create(new_record(Disease::Glaucoma, 3));
        repo.create(new_record(Disease::Normal, 10));
        repo.create(new_record(Disease::Glaucoma, 7));
        repo.create(new_record(Disease::DiabeticRetinopathy, 1));
        repo
    }

    #[test]
    fn create_assigns_sequential_ids_and_get_finds_them() {
        let repo = sample();
        assert_eq!(repo.len(), 4);
        let rec = repo.get("record_2").unwrap();
        assert_eq!(rec.result.disease, Disease::Normal);
        assert!(repo.get("record_99").is_none());
    }

    #[test]
    fn empty_query_lists_everything_newest_first() {
        let repo = sample();
        let days: Vec<_> = repo
            .list(&HistoryQuery::default())
            .iter()
            .map(|r| r.left_path.clone())
            .collect();
        assert_eq!(
            days,
            vec![
                PathBuf::from("/l/10.jpg"),
                PathBuf::from("/l/7.jpg"),
                PathBuf::from("/l/3.jpg"),
                PathBuf::from("/l/1.jpg"),
            ]
        );
    }

    #[rstest]
    #[case(Disease::Glaucoma, 2)]
    #[case(Disease::Normal, 1)]
    #[case(Disease::Cataract, 0)]
    fn disease_filter_returns_only_that_disease(#[case] disease: Disease, #[case] count: usize) {
        let repo = sample();
        let query = HistoryQuery {
            disease: Some(disease),
            search: String::new(),
        };
        let listed = repo.list(&query);
        assert_eq!(listed.len(), count);
        assert!(listed.iter().all(|r| r.result.disease == disease));
    }

    #[rstest]
    #[case("glau", 2)]
    #[case("RETINO", 1)]
    #[case("zzz", 0)]
    fn search_matches_label_case_insensitively(#[case] search: &str, #[case] count: usize) {
        let repo = sample();
        let query = HistoryQuery {
            disease: None,
            search: search.to_string(),
        };
        assert_eq!(repo.list(&query).len(), count);
    }

    #[test]
    fn search_matches_formatted_timestamp() {
        let repo = sample();
        let target = repo.get("record_1").unwrap();
        let stamp = format_timestamp(&target.result.diagnosed_at);
        let query = HistoryQuery {
            disease: None,
            search: stamp,
        };
        let listed = repo.list(&query);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "record_1");
    }

    #[test]
    fn demo_records_respect_bounds() {
        let mut rng = StdRng::seed_from_u64(8);
        let repo = InMemoryHistory::with_demo_records(20, &mut rng);
        assert_eq!(repo.len(), 20);
        let cutoff = Utc::now() - Duration::days(31);
        for r in repo.list(&HistoryQuery::default()) {
            assert!((0.70..0.99).contains(&r.result.confidence));
            assert!(r.result.diagnosed_at > cutoff);
            assert!(r.combined_path.is_some());
        }
    }

    #[rstest]
    #[case(0, 10, 10, 0, 3)]
    #[case(2, 10, 5, 2, 3)]
    #[case(9, 10, 5, 2, 3)]
    #[case(0, 25, 25, 0, 1)]
    fn paginate_clamps_and_slices(
        #[case] page: usize,
        #[case] per_page: usize,
        #[case] expected_len: usize,
        #[case] expected_page: usize,
        #[case] expected_count: usize,
    ) {
        let items: Vec<u32> = (0..25).collect();
        let view = paginate(&items, page, per_page);
        assert_eq!(view.items.len(), expected_len);
        assert_eq!(view.page, expected_page);
        assert_eq!(view.page_count, expected_count);
        assert_eq!(view.total, 25);
    }

    #[test]
    fn paginate_empty_has_one_empty_page() {
        let items: Vec<u32> = Vec::new();
        let view = paginate(&items, 3, 10);
        assert!(view.items.is_empty());
        assert_eq!(view.page, 0);
        assert_eq!(view.page_count, 1);
    }
}
