//! Selecting which ranked matches are written, and grouping the matches of one scan

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    ranking::{Ranked, rank_group},
    search_hit::SearchHit,
    search_tool::RankingScheme,
};

/// Which matches are written
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum OutputMode {
    /// Only the best match for each scan and charge
    FirstHits,
    /// All matches passing the synopsis thresholds
    #[default]
    Synopsis,
}

impl OutputMode {
    /// The suffix added to the file stem of the output file
    pub const fn file_suffix(self) -> &'static str {
        match self {
            Self::FirstHits => "_fht.txt",
            Self::Synopsis => "_syn.txt",
        }
    }
}

/// How a score is compared with a threshold
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Comparison {
    /// The score has to be smaller than or equal to the threshold
    AtMost,
    /// The score has to be bigger than or equal to the threshold
    AtLeast,
}

/// A single threshold on a score column
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ThresholdPredicate {
    /// The output column name of the score (case insensitive)
    pub column: String,
    /// The comparison
    pub comparison: Comparison,
    /// The threshold value
    pub value: f64,
}

impl ThresholdPredicate {
    /// The score has to be at most the given value
    pub fn at_most(column: impl Into<String>, value: f64) -> Self {
        Self {
            column: column.into(),
            comparison: Comparison::AtMost,
            value,
        }
    }

    /// The score has to be at least the given value
    pub fn at_least(column: impl Into<String>, value: f64) -> Self {
        Self {
            column: column.into(),
            comparison: Comparison::AtLeast,
            value,
        }
    }

    /// Check if the score passes, a missing score never passes
    pub fn holds(&self, score: f64) -> bool {
        match self.comparison {
            Comparison::AtMost => score <= self.value,
            Comparison::AtLeast => score >= self.value,
        }
    }
}

/// The thresholds for the synopsis file, a match is kept if any of the predicates holds
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SynopsisThresholds {
    /// The predicates, combined with OR
    pub predicates: Vec<ThresholdPredicate>,
}

impl SynopsisThresholds {
    /// Create thresholds from a list of predicates
    pub const fn new(predicates: Vec<ThresholdPredicate>) -> Self {
        Self { predicates }
    }

    /// Check if the match passes any of the predicates. Without predicates all matches pass.
    pub fn passes(&self, hit: &SearchHit) -> bool {
        self.predicates.is_empty()
            || self
                .predicates
                .iter()
                .any(|p| p.holds(hit.score(&p.column)))
    }
}

/// Decides which matches of a scan group are written
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSelector {
    mode: OutputMode,
    thresholds: SynopsisThresholds,
    scheme: RankingScheme,
}

impl MatchSelector {
    /// Create a new selector
    pub const fn new(
        mode: OutputMode,
        thresholds: SynopsisThresholds,
        scheme: RankingScheme,
    ) -> Self {
        Self {
            mode,
            thresholds,
            scheme,
        }
    }

    /// The output mode
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Rank the matches of one scan per charge and select the ones to write. The result is ordered
    /// on charge, then on rank.
    pub fn select(&self, hits: Vec<SearchHit>) -> Vec<Ranked<SearchHit>> {
        let mut by_charge: BTreeMap<u8, Vec<SearchHit>> = BTreeMap::new();
        for hit in hits {
            by_charge.entry(hit.charge).or_default().push(hit);
        }
        let mut selected = Vec::new();
        for (_, group) in by_charge {
            let ranked = rank_group(group, &self.scheme);
            match self.mode {
                OutputMode::FirstHits => selected.extend(ranked.into_iter().take(1)),
                OutputMode::Synopsis => selected.extend(
                    ranked
                        .into_iter()
                        .filter(|r| self.thresholds.passes(&r.hit)),
                ),
            }
        }
        selected
    }

    /// Sort all selected matches of a file, best primary score first, then on scan, charge,
    /// peptide, and protein.
    pub fn sort_globally(&self, records: &mut [Ranked<SearchHit>]) {
        let direction = self.scheme.primary_direction;
        records.sort_by(|a, b| {
            direction
                .best_first(a.hit.primary, b.hit.primary)
                .then(a.hit.scan.cmp(&b.hit.scan))
                .then(a.hit.charge.cmp(&b.hit.charge))
                .then_with(|| a.hit.canonical_peptide.cmp(&b.hit.canonical_peptide))
                .then_with(|| a.hit.protein.cmp(&b.hit.protein))
        });
    }
}

/// Collects the matches of one scan. Scan ordered input is flushed at every scan boundary, other
/// input is kept until the end of the file and then returned in ascending scan order. A scan that
/// shows up again in scan ordered input after it was flushed is logged, and ranked separately.
#[derive(Clone, Debug)]
pub enum ScanGrouper {
    /// Input where all matches for one scan are consecutive
    Streaming {
        /// The scan currently collected
        scan: Option<u32>,
        /// The matches of the current scan
        hits: Vec<SearchHit>,
        /// All scans that were already flushed
        flushed: HashSet<u32>,
    },
    /// Input in any order
    Buffered(BTreeMap<u32, Vec<SearchHit>>),
}

impl ScanGrouper {
    /// Create a grouper for scan ordered or unordered input
    pub fn new(scan_ordered: bool) -> Self {
        if scan_ordered {
            Self::Streaming {
                scan: None,
                hits: Vec::new(),
                flushed: HashSet::new(),
            }
        } else {
            Self::Buffered(BTreeMap::new())
        }
    }

    /// Add a match, returns the complete previous scan group if this match starts a new scan
    pub fn push(&mut self, hit: SearchHit) -> Option<Vec<SearchHit>> {
        match self {
            Self::Streaming {
                scan,
                hits,
                flushed,
            } => {
                if let Some(previous) = scan.filter(|s| *s != hit.scan) {
                    flushed.insert(previous);
                    if flushed.contains(&hit.scan) {
                        warn!(
                            "Scan {} appears again after other scans and is ranked separately",
                            hit.scan
                        );
                    }
                    *scan = Some(hit.scan);
                    Some(std::mem::replace(hits, vec![hit]))
                } else {
                    *scan = Some(hit.scan);
                    hits.push(hit);
                    None
                }
            }
            Self::Buffered(groups) => {
                groups.entry(hit.scan).or_default().push(hit);
                None
            }
        }
    }

    /// The number of matches currently held
    pub fn len(&self) -> usize {
        match self {
            Self::Streaming { hits, .. } => hits.len(),
            Self::Buffered(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    /// Check if no matches are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return all remaining groups in scan order, the grouper is empty afterwards
    pub fn finish(&mut self) -> Vec<Vec<SearchHit>> {
        match self {
            Self::Streaming {
                scan,
                hits,
                flushed,
            } => {
                if let Some(previous) = scan.take() {
                    flushed.insert(previous);
                }
                let hits = std::mem::take(hits);
                if hits.is_empty() {
                    Vec::new()
                } else {
                    vec![hits]
                }
            }
            Self::Buffered(groups) => std::mem::take(groups).into_values().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use crate::{
        formats::InspectHit,
        modification::ModificationRegistry,
        search_hit::{ScoreValue, SearchHitData},
        search_tool::SearchTool,
    };

    fn inspect_hit(
        scan: u32,
        charge: u8,
        peptide: &str,
        total_prm: f64,
        p_value: f64,
    ) -> SearchHit {
        let data = InspectHit {
            scan,
            z: charge,
            annotation: peptide.to_string(),
            protein: "SO_0001".to_string(),
            total_prm_score: ScoreValue::new(total_prm),
            f_score: ScoreValue::new(1.0),
            p_value: ScoreValue::new(p_value),
            ..InspectHit::default()
        };
        let mut registry = ModificationRegistry::new(Vec::new());
        SearchHit::new(SearchHitData::Inspect(data), &mut registry)
            .unwrap()
            .0
    }

    fn selector(mode: OutputMode) -> MatchSelector {
        MatchSelector::new(
            mode,
            SearchTool::Inspect.default_thresholds(),
            SearchTool::Inspect.ranking(),
        )
    }

    #[test]
    fn first_hits_per_charge() {
        let hits = vec![
            inspect_hit(10, 2, "K.AAAK.A", 30.0, 0.5),
            inspect_hit(10, 3, "K.CCCK.A", 20.0, 0.5),
            inspect_hit(10, 2, "K.DDDK.A", 40.0, 0.5),
            inspect_hit(10, 3, "K.EEEK.A", 25.0, 0.5),
            inspect_hit(10, 2, "K.FFFK.A", 10.0, 0.5),
            inspect_hit(10, 3, "K.GGGK.A", 5.0, 0.5),
        ];
        let selected = selector(OutputMode::FirstHits).select(hits);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].hit.charge, 2);
        assert_eq!(selected[0].hit.canonical_peptide, "K.DDDK.A");
        assert_eq!(selected[1].hit.charge, 3);
        assert_eq!(selected[1].hit.canonical_peptide, "K.EEEK.A");
        assert!(selected.iter().all(|r| r.rank == 1));
    }

    #[test]
    fn synopsis_thresholds() {
        let hits = vec![
            inspect_hit(10, 2, "K.AAAK.A", 60.0, 0.5),
            inspect_hit(10, 2, "K.CCCK.A", 10.0, 0.5),
            inspect_hit(10, 2, "K.DDDK.A", 5.0, 0.1),
        ];
        let selected = selector(OutputMode::Synopsis).select(hits);
        let peptides: Vec<_> = selected
            .iter()
            .map(|r| (r.hit.canonical_peptide.as_str(), r.rank))
            .collect();
        assert_eq!(peptides, [("K.AAAK.A", 1), ("K.DDDK.A", 3)]);
    }

    #[test]
    fn missing_scores_never_pass() {
        let predicate = ThresholdPredicate::at_most("PValue", 0.2);
        assert!(!predicate.holds(f64::NAN));
        assert!(predicate.holds(0.2));
        assert!(SynopsisThresholds::default().passes(&inspect_hit(1, 2, "K.AAAK.A", 0.0, 1.0)));
    }

    #[test]
    fn streaming_groups() {
        let mut grouper = ScanGrouper::new(true);
        assert!(grouper.push(inspect_hit(1, 2, "K.AAAK.A", 1.0, 1.0)).is_none());
        assert!(grouper.push(inspect_hit(1, 3, "K.CCCK.A", 1.0, 1.0)).is_none());
        let group = grouper.push(inspect_hit(2, 2, "K.DDDK.A", 1.0, 1.0)).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(grouper.len(), 1);
        let rest = grouper.finish();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0][0].scan, 2);
        assert!(grouper.is_empty());
        assert!(grouper.finish().is_empty());
    }

    #[test]
    fn streaming_revisited_scan() {
        let mut grouper = ScanGrouper::new(true);
        assert!(grouper.push(inspect_hit(5, 2, "K.AAAK.A", 1.0, 1.0)).is_none());
        let first = grouper.push(inspect_hit(6, 2, "K.CCCK.A", 1.0, 1.0)).unwrap();
        assert_eq!(first[0].scan, 5);
        let second = grouper.push(inspect_hit(5, 2, "K.DDDK.A", 1.0, 1.0)).unwrap();
        assert_eq!(second[0].scan, 6);
        let ScanGrouper::Streaming { flushed, .. } = &grouper else {
            panic!("scan ordered input should stream");
        };
        assert!(flushed.contains(&5) && flushed.contains(&6));
        assert_eq!(grouper.finish()[0][0].scan, 5);
    }

    #[test]
    fn buffered_groups() {
        let mut grouper = ScanGrouper::new(false);
        for scan in [5, 1, 5, 3, 1] {
            assert!(grouper.push(inspect_hit(scan, 2, "K.AAAK.A", 1.0, 1.0)).is_none());
        }
        let groups = grouper.finish();
        assert_eq!(
            groups
                .iter()
                .map(|g| (g[0].scan, g.len()))
                .collect::<Vec<_>>(),
            [(1, 2), (3, 1), (5, 2)]
        );
    }

    #[test]
    fn global_sort() {
        let selector = selector(OutputMode::Synopsis);
        let mut records = selector.select(vec![inspect_hit(1, 2, "K.AAAK.A", 51.0, 0.5)]);
        records.extend(selector.select(vec![
            inspect_hit(2, 2, "K.CCCK.A", 80.0, 0.5),
            inspect_hit(2, 2, "K.DDDK.A", 51.0, 0.5),
        ]));
        selector.sort_globally(&mut records);
        assert_eq!(
            records
                .iter()
                .map(|r| (r.hit.scan, r.hit.canonical_peptide.as_str()))
                .collect::<Vec<_>>(),
            [(2, "K.CCCK.A"), (1, "K.AAAK.A"), (2, "K.DDDK.A")]
        );
    }
}
