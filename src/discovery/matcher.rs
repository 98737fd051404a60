//! Pair matcher.
//!
//! Scores column pairs between two tables with four strategies and keeps
//! the best one per pair:
//!
//! - **direct**: identical canonical names, or identical once short table
//!   aliases are dropped (`L_PARTKEY` / `P_PARTKEY`)
//! - **suffix**: one name is a trailing token run of the other
//!   (`ORDER_DATE_KEY` / `DATE_KEY`)
//! - **fuzzy**: edit-distance similarity of the alias-free names
//! - **fk_pattern**: a foreign-key-shaped name that names the other table
//!   (`customer_id` / `CUSTOMERS.id`)
//!
//! Bare generic keys (`ID`, `KEY`, `CODE`) never match each other; two
//! unrelated tables that both have an `id` column share nothing.

use strsim::normalized_levenshtein;
use tracing::trace;

use super::cardinality::AdaptiveThresholds;
use super::keywords::KeywordTables;
use super::roles::KeyShape;
use super::thresholds::matching;
use super::types::TypeCompatibility;
use crate::config::ThresholdBaseline;
use crate::model::{CandidatePair, MatchStrategy, TableDescriptor};

/// Scores candidate column pairs between tables.
pub struct PairMatcher<'a> {
    keywords: &'a KeywordTables,
    baseline: &'a ThresholdBaseline,
    thresholds: &'a AdaptiveThresholds,
}

impl<'a> PairMatcher<'a> {
    pub fn new(
        keywords: &'a KeywordTables,
        baseline: &'a ThresholdBaseline,
        thresholds: &'a AdaptiveThresholds,
    ) -> Self {
        Self {
            keywords,
            baseline,
            thresholds,
        }
    }

    /// Every scored pair from key columns of `tables[left]` to columns of
    /// `tables[right]`. Ties are not resolved here; see [`keep_ties`].
    pub fn scan(&self, tables: &[TableDescriptor], left: usize, right: usize) -> Vec<CandidatePair> {
        if left == right {
            return Vec::new();
        }
        let (lt, rt) = (&tables[left], &tables[right]);
        let mut found = Vec::new();

        for lc in 0..lt.columns.len() {
            if !lt.eligible[lc] || !lt.key_roles[lc].is_key() {
                continue;
            }
            for rc in 0..rt.columns.len() {
                if let Some((strategy, score)) = self.score(lt, lc, rt, rc) {
                    found.push(CandidatePair {
                        left_table: left,
                        left_column: lc,
                        right_table: right,
                        right_column: rc,
                        match_strategy: strategy,
                        raw_score: score,
                    });
                }
            }
        }
        found
    }

    /// Best strategy and raw score for one column pair, if any applies.
    pub fn score(
        &self,
        lt: &TableDescriptor,
        lc: usize,
        rt: &TableDescriptor,
        rc: usize,
    ) -> Option<(MatchStrategy, f64)> {
        if !lt.eligible[lc] || !rt.eligible[rc] {
            return None;
        }
        if !lt.key_roles[lc].is_primary() && !rt.key_roles[rc].is_primary() {
            return None;
        }
        let (lcol, rcol) = (&lt.columns[lc], &rt.columns[rc]);
        let types = TypeCompatibility::check(&lcol.base_type, &rcol.base_type);
        if !types.is_compatible {
            trace!(
                left = %lcol.raw_name,
                right = %rcol.raw_name,
                reason = %types.explanation,
                "type mismatch"
            );
            return None;
        }

        let strategies = [
            (MatchStrategy::Direct, self.direct(lt, lc, rt, rc)),
            (MatchStrategy::Suffix, self.suffix(lt, lc, rt, rc)),
            (MatchStrategy::Fuzzy, self.fuzzy(lt, lc, rt, rc)),
            (MatchStrategy::FkPattern, self.fk_pattern(lt, lc, rt, rc)),
        ];

        // Strict comparison keeps the earlier strategy on equal scores.
        let mut best: Option<(MatchStrategy, f64)> = None;
        for (strategy, score) in strategies {
            if let Some(score) = score {
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((strategy, score));
                }
            }
        }
        best
    }

    fn direct(&self, lt: &TableDescriptor, lc: usize, rt: &TableDescriptor, rc: usize) -> Option<f64> {
        let (l, r) = (&lt.columns[lc].normalized, &rt.columns[rc].normalized);
        if l.canonical == r.canonical {
            let bare = |shape: Option<&KeyShape>| shape.is_some_and(KeyShape::is_bare);
            if bare(shape_of(lt, lc)) && bare(shape_of(rt, rc)) {
                return None;
            }
            return Some(matching::DIRECT);
        }

        let (ls, rs) = (l.without_alias(), r.without_alias());
        if ls == rs && !self.keywords.is_key_token(&ls) {
            return Some(matching::DIRECT_ALIAS);
        }
        None
    }

    fn suffix(&self, lt: &TableDescriptor, lc: usize, rt: &TableDescriptor, rc: usize) -> Option<f64> {
        let (l, r) = (&lt.columns[lc].normalized, &rt.columns[rc].normalized);
        let shorter = if l.ends_with_tokens(r) {
            shape_of(rt, rc).map(|s| (r, s))
        } else if r.ends_with_tokens(l) {
            shape_of(lt, lc).map(|s| (l, s))
        } else {
            None
        };
        match shorter {
            Some((name, shape)) if name.tokens.len() >= 2 && !shape.is_bare() => {
                Some(self.baseline.suffix_score)
            }
            _ => None,
        }
    }

    fn fuzzy(&self, lt: &TableDescriptor, lc: usize, rt: &TableDescriptor, rc: usize) -> Option<f64> {
        let ls = shape_of(lt, lc)?;
        let rs = shape_of(rt, rc)?;
        if ls.is_bare() || rs.is_bare() || ls.key_token != rs.key_token {
            return None;
        }
        let l = lt.columns[lc].normalized.without_alias().replace('_', "");
        let r = rt.columns[rc].normalized.without_alias().replace('_', "");
        if l.len() < matching::FUZZY_MIN_LEN || r.len() < matching::FUZZY_MIN_LEN {
            return None;
        }
        let similarity = normalized_levenshtein(&l, &r);
        if similarity >= self.thresholds.fuzzy_similarity {
            Some(similarity * self.baseline.fuzzy_weight)
        } else {
            None
        }
    }

    fn fk_pattern(
        &self,
        lt: &TableDescriptor,
        lc: usize,
        rt: &TableDescriptor,
        rc: usize,
    ) -> Option<f64> {
        let forward = references(lt, lc, rt, rc);
        let backward = references(rt, rc, lt, lc);
        (forward || backward).then_some(self.baseline.fk_pattern_score)
    }
}

fn shape_of(table: &TableDescriptor, column: usize) -> Option<&KeyShape> {
    table.key_shapes[column].as_ref()
}

/// `fk_table.fk_col` is shaped like a reference to `pk_table`, and
/// `pk_table.pk_col` looks like that table's key.
fn references(
    fk_table: &TableDescriptor,
    fk_col: usize,
    pk_table: &TableDescriptor,
    pk_col: usize,
) -> bool {
    let Some(fk_shape) = shape_of(fk_table, fk_col) else {
        return false;
    };
    let Some(pk_shape) = shape_of(pk_table, pk_col) else {
        return false;
    };
    fk_shape.is_foreign_shaped()
        && pk_table.key_roles[pk_col].is_primary()
        && (fk_shape.key_token == pk_shape.key_token || pk_shape.is_bare())
        && fk_shape.names_table(&pk_table.name_variants, true)
}

/// Keep, per left column, every candidate within tie tolerance of its best
/// score across all right tables. Input order is preserved.
pub fn keep_ties(candidates: Vec<CandidatePair>) -> Vec<CandidatePair> {
    use std::collections::HashMap;

    let mut best: HashMap<(usize, usize), f64> = HashMap::new();
    for c in &candidates {
        let entry = best
            .entry((c.left_table, c.left_column))
            .or_insert(f64::NEG_INFINITY);
        if c.raw_score > *entry {
            *entry = c.raw_score;
        }
    }
    candidates
        .into_iter()
        .filter(|c| {
            let top = best
                .get(&(c.left_table, c.left_column))
                .copied()
                .unwrap_or(f64::NEG_INFINITY);
            let keep = top - c.raw_score <= matching::TIE_EPSILON;
            if !keep {
                trace!(
                    left_table = c.left_table,
                    left_column = c.left_column,
                    score = c.raw_score,
                    best = top,
                    "candidate below best score"
                );
            }
            keep
        })
        .collect()
}
