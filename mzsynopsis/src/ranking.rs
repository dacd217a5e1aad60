//! Ranking all matches of one scan and charge

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{search_hit::SearchHit, search_tool::RankingScheme};

/// Primary scores that differ less than this fraction of the largest of the two are seen as equal
/// and share a rank. The tolerance is relative so e-values far below it still rank apart.
pub const RANK_EPSILON: f64 = 1e-6;

/// Anything that can be ranked within a scan group
pub trait Rankable {
    /// The primary sort score, missing scores should be the worst value for the direction
    fn primary(&self) -> f64;
    /// The tie breaking sort score
    fn secondary(&self) -> f64;
    /// The score used to calculate the normalised delta score
    fn delta_score(&self) -> f64;
    /// The canonical peptide, used to break full ties
    fn peptide(&self) -> &str;
    /// The protein, used to break full ties
    fn protein(&self) -> &str;
}

impl Rankable for SearchHit {
    fn primary(&self) -> f64 {
        self.primary
    }
    fn secondary(&self) -> f64 {
        self.secondary
    }
    fn delta_score(&self) -> f64 {
        self.delta_score
    }
    fn peptide(&self) -> &str {
        &self.canonical_peptide
    }
    fn protein(&self) -> &str {
        &self.protein
    }
}

/// A match with its rank within its scan group
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Ranked<T> {
    /// The match
    pub hit: T,
    /// The rank, 1 is best, matches with an equal primary score share a rank
    pub rank: usize,
    /// The normalised difference in delta score with the next match in the group, in `0..=1`
    pub delta_norm: f64,
}

/// The best first ordering of two matches in the same group
pub fn compare_hits<T: Rankable>(scheme: &RankingScheme, a: &T, b: &T) -> Ordering {
    scheme
        .primary_direction
        .best_first(a.primary(), b.primary())
        .then_with(|| {
            scheme
                .secondary_direction
                .best_first(a.secondary(), b.secondary())
        })
        .then_with(|| a.peptide().cmp(b.peptide()))
        .then_with(|| a.protein().cmp(b.protein()))
}

/// The normalised delta score between a match and the next one, `|a - b| / a` limited to `0..=1`
pub fn delta_norm(score: f64, next: f64) -> f64 {
    if score == 0.0 {
        return 0.0;
    }
    let delta = ((score - next) / score).abs();
    if delta.is_finite() {
        delta.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Rank all matches of one scan and charge. The matches are sorted best first, ties on the primary
/// score (within [`RANK_EPSILON`]) share a rank and the ranks are contiguous starting at 1.
pub fn rank_group<T: Rankable>(mut hits: Vec<T>, scheme: &RankingScheme) -> Vec<Ranked<T>> {
    hits.sort_by(|a, b| compare_hits(scheme, a, b));
    let delta_scores: Vec<f64> = hits.iter().map(Rankable::delta_score).collect();
    let mut ranked: Vec<Ranked<T>> = Vec::with_capacity(hits.len());
    for (index, hit) in hits.into_iter().enumerate() {
        let rank = match ranked.last() {
            None => 1,
            Some(previous) if same_score(previous.hit.primary(), hit.primary()) => previous.rank,
            Some(previous) => previous.rank + 1,
        };
        let delta_norm = delta_scores
            .get(index + 1)
            .map_or(0.0, |next| delta_norm(delta_scores[index], *next));
        ranked.push(Ranked {
            hit,
            rank,
            delta_norm,
        });
    }
    ranked
}

/// Check if two primary scores share a rank, see [`RANK_EPSILON`]
pub fn same_score(a: f64, b: f64) -> bool {
    // Infinite values are the missing scores, these are equal to each other
    OrderedFloat(a) == OrderedFloat(b)
        || (a.is_finite() && b.is_finite() && (a - b).abs() <= RANK_EPSILON * a.abs().max(b.abs()))
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::search_tool::SearchTool;

    #[derive(Clone, Debug, PartialEq)]
    struct Hit {
        primary: f64,
        secondary: f64,
        peptide: &'static str,
    }

    impl Rankable for Hit {
        fn primary(&self) -> f64 {
            self.primary
        }
        fn secondary(&self) -> f64 {
            self.secondary
        }
        fn delta_score(&self) -> f64 {
            self.primary
        }
        fn peptide(&self) -> &str {
            self.peptide
        }
        fn protein(&self) -> &str {
            "protein"
        }
    }

    const fn hit(primary: f64, secondary: f64, peptide: &'static str) -> Hit {
        Hit {
            primary,
            secondary,
            peptide,
        }
    }

    #[test]
    fn ties_share_rank() {
        let scheme = SearchTool::Inspect.ranking();
        let ranked = rank_group(
            vec![
                hit(40.0, 1.0, "K.C.K"),
                hit(50.0, 1.0, "K.A.K"),
                hit(50.0, 1.0, "K.B.K"),
            ],
            &scheme,
        );
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 1, 2]);
        assert_eq!(ranked[0].hit.peptide, "K.A.K");
        assert_eq!(ranked[0].delta_norm, 0.0);
        assert!((ranked[1].delta_norm - 0.2).abs() < 1e-12);
        assert_eq!(ranked[2].delta_norm, 0.0);
    }

    #[test]
    fn ascending_primary() {
        let scheme = SearchTool::MSGFPlus.ranking();
        let ranked = rank_group(
            vec![
                hit(1e-3, 10.0, "K.A.K"),
                hit(1e-9, 30.0, "K.B.K"),
                hit(f64::INFINITY, 50.0, "K.C.K"),
                hit(1e-9, 40.0, "K.D.K"),
            ],
            &scheme,
        );
        assert_eq!(
            ranked.iter().map(|r| r.hit.peptide).collect::<Vec<_>>(),
            ["K.D.K", "K.B.K", "K.A.K", "K.C.K"]
        );
        assert_eq!(
            ranked.iter().map(|r| r.rank).collect::<Vec<_>>(),
            [1, 1, 2, 3]
        );
    }

    #[test]
    fn e_values_rank_apart() {
        let scheme = SearchTool::MSGFPlus.ranking();
        let ranked = rank_group(
            vec![
                hit(1e-7, 10.0, "K.C.K"),
                hit(1e-12, 10.0, "K.A.K"),
                hit(1e-9, 10.0, "K.B.K"),
                hit(1.0000000001e-9, 10.0, "K.D.K"),
            ],
            &scheme,
        );
        assert_eq!(
            ranked
                .iter()
                .map(|r| (r.hit.peptide, r.rank))
                .collect::<Vec<_>>(),
            [("K.A.K", 1), ("K.B.K", 2), ("K.D.K", 2), ("K.C.K", 3)]
        );
        assert!(same_score(0.0, 0.0));
        assert!(!same_score(1e-12, 1e-9));
        assert!(same_score(50.0, 50.00001));
        assert!(!same_score(f64::INFINITY, 1e-3));
    }

    #[test]
    fn contiguous_ranks() {
        let scheme = SearchTool::Sage.ranking();
        let scores = [3.0, 7.5, 7.5, 0.0, 1.0, 7.5, 3.0000001, 12.0];
        let ranked = rank_group(
            scores.iter().map(|s| hit(*s, 0.0, "K.A.K")).collect(),
            &scheme,
        );
        assert_eq!(ranked[0].rank, 1);
        for pair in ranked.windows(2) {
            let step = pair[1].rank - pair[0].rank;
            assert!(step <= 1);
            assert_eq!(
                step == 0,
                same_score(pair[0].hit.primary, pair[1].hit.primary)
            );
        }
        assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.delta_norm)));
        assert_eq!(ranked.last().unwrap().delta_norm, 0.0);
    }

    #[test]
    fn delta_norm_limits() {
        assert_eq!(delta_norm(0.0, 10.0), 0.0);
        assert_eq!(delta_norm(-2.0, 10.0), 1.0);
        assert!((delta_norm(10.0, 8.0) - 0.2).abs() < 1e-12);
        assert_eq!(delta_norm(f64::NEG_INFINITY, 8.0), 0.0);
    }
}
