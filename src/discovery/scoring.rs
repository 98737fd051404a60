//! Confidence scoring.
//!
//! Six bounded signals plus domain boosts, summed and capped at 1.0:
//!
//! | signal       | max  |
//! |--------------|------|
//! | primary key  | 0.40 |
//! | name match   | 0.30 |
//! | uniqueness   | 0.25 |
//! | role pattern | 0.20 |
//! | type         | 0.15 |
//! | composite    | 0.10 |
//! | domain boost | 0.25 |
//!
//! Every non-zero contribution leaves an evidence line.

use super::cardinality::{AdaptiveThresholds, CardinalityDecision, SideEvidence};
use super::keywords::KeywordTables;
use super::orientation::CandidateGroup;
use super::thresholds::weight;
use super::types::TypeCompatibility;
use crate::config::ThresholdBaseline;
use crate::model::{ConfidenceLevel, KeyRole, MatchStrategy, TableDescriptor, TableRole};

/// A single contribution to a confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub signal: &'static str,
    pub delta: f64,
    pub reason: String,
}

impl Contribution {
    /// Evidence line, e.g. `name: direct match customer_id = customer_id (+0.30)`.
    pub fn evidence(&self) -> String {
        format!("{}: {} ({:+.2})", self.signal, self.reason, self.delta)
    }
}

/// Scored confidence with its breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub score: f64,
    pub level: ConfidenceLevel,
    pub contributions: Vec<Contribution>,
}

impl ConfidenceScore {
    pub fn evidence(&self) -> Vec<String> {
        self.contributions.iter().map(Contribution::evidence).collect()
    }
}

/// Relative weight of each strategy within the name signal.
pub fn strategy_weight(strategy: MatchStrategy) -> f64 {
    match strategy {
        MatchStrategy::Direct => 1.0,
        MatchStrategy::Suffix => 0.9,
        MatchStrategy::Fuzzy => 0.8,
        MatchStrategy::FkPattern => 0.7,
    }
}

/// Combines evidence for an oriented candidate group.
pub struct ConfidenceScorer<'a> {
    keywords: &'a KeywordTables,
    baseline: &'a ThresholdBaseline,
    thresholds: &'a AdaptiveThresholds,
}

impl<'a> ConfidenceScorer<'a> {
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

    /// Score `group` (left = referencing side) given its resolved cardinality.
    pub fn score(
        &self,
        tables: &[TableDescriptor],
        group: &CandidateGroup,
        cardinality: &CardinalityDecision,
    ) -> ConfidenceScore {
        let fk = &tables[group.fk_table];
        let pk = &tables[group.pk_table];

        let mut contributions = Vec::new();
        let mut push = |signal: &'static str, delta: f64, reason: String| {
            if delta > 0.0 {
                contributions.push(Contribution {
                    signal,
                    delta,
                    reason,
                });
            }
        };

        let (delta, reason) = self.primary_key(fk, pk, group, cardinality);
        push("primary key", delta, reason);

        let (delta, reason) = self.name(fk, pk, group);
        push("name", delta, reason);

        let (delta, reason) = self.uniqueness(cardinality);
        push("uniqueness", delta, reason);

        let (delta, reason) = self.types(fk, pk, group);
        push("type", delta, reason);

        let (delta, reason) = self.role(fk, pk);
        push("role", delta, reason);

        let (delta, reason) = self.composite(group);
        push("composite", delta, reason);

        for (family, boost) in self.domain_boosts(fk, pk, group) {
            push("domain", boost, format!("{} entity family", family));
        }

        let total: f64 = contributions.iter().map(|c| c.delta).sum();
        let score = total.min(1.0);
        ConfidenceScore {
            score,
            level: ConfidenceLevel::from_score(score),
            contributions,
        }
    }

    fn primary_key(
        &self,
        fk: &TableDescriptor,
        pk: &TableDescriptor,
        group: &CandidateGroup,
        cardinality: &CardinalityDecision,
    ) -> (f64, String) {
        let pk_cols = group.pk_columns();
        let (base, what) = match cardinality.right.evidence {
            SideEvidence::DeclaredKey => (weight::PRIMARY_KEY, "declared primary key"),
            SideEvidence::DeclaredPartial => (weight::PRIMARY_KEY * 0.75, "declared composite key member"),
            _ if pk_cols
                .iter()
                .all(|&c| pk.key_roles[c] == KeyRole::PrimaryKey { declared: false }) =>
            {
                (weight::PRIMARY_KEY * 0.5, "primary key by naming")
            }
            _ => return (0.0, String::new()),
        };

        let fk_shaped = group
            .fk_columns()
            .iter()
            .all(|&c| fk.key_roles[c] == KeyRole::ForeignKey);
        let delta = if fk_shaped { base } else { base * 0.75 };
        let columns: Vec<&str> = pk_cols.iter().map(|&c| pk.columns[c].raw_name.as_str()).collect();
        let mut reason = format!("{} on {}.{}", what, pk.name(), columns.join(", "));
        if !fk_shaped {
            reason.push_str(", referencing column is not foreign-key shaped");
        }
        (delta, reason)
    }

    fn name(&self, fk: &TableDescriptor, pk: &TableDescriptor, group: &CandidateGroup) -> (f64, String) {
        let n = group.pairs.len() as f64;
        let weighted: f64 = group
            .pairs
            .iter()
            .map(|p| strategy_weight(p.match_strategy) * p.raw_score)
            .sum::<f64>()
            / n;
        let matches: Vec<String> = group
            .pairs
            .iter()
            .map(|p| {
                format!(
                    "{} {} = {}",
                    p.match_strategy,
                    fk.columns[p.left_column].raw_name,
                    pk.columns[p.right_column].raw_name
                )
            })
            .collect();
        (weight::NAME * weighted, matches.join("; "))
    }

    fn uniqueness(&self, cardinality: &CardinalityDecision) -> (f64, String) {
        let threshold = self.thresholds.uniqueness_ratio;
        match cardinality.right.evidence {
            SideEvidence::SampledUnique { ratio, sample_size } => {
                let clearance = if threshold >= 1.0 {
                    1.0
                } else {
                    0.5 + 0.5 * ((ratio - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
                };
                (
                    weight::UNIQUENESS * clearance,
                    format!(
                        "referenced side {:.0}% unique over {} samples",
                        ratio * 100.0,
                        sample_size
                    ),
                )
            }
            SideEvidence::Undersampled { ratio, sample_size } if ratio >= threshold => {
                let adequacy = sample_size as f64 / self.thresholds.min_sample_size as f64;
                (
                    weight::UNIQUENESS * 0.5 * adequacy.min(1.0),
                    format!(
                        "referenced side unique over only {} of {} required samples",
                        sample_size, self.thresholds.min_sample_size
                    ),
                )
            }
            _ => (0.0, String::new()),
        }
    }

    fn types(&self, fk: &TableDescriptor, pk: &TableDescriptor, group: &CandidateGroup) -> (f64, String) {
        let checks: Vec<TypeCompatibility> = group
            .pairs
            .iter()
            .map(|p| {
                TypeCompatibility::check(
                    &fk.columns[p.left_column].base_type,
                    &pk.columns[p.right_column].base_type,
                )
            })
            .collect();
        let worst = checks
            .iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
            .map(|c| (c.score, c.explanation.clone()))
            .unwrap_or((0.0, String::new()));
        (weight::TYPE * worst.0, worst.1)
    }

    fn role(&self, fk: &TableDescriptor, pk: &TableDescriptor) -> (f64, String) {
        use TableRole::*;

        let pk_is_time = pk
            .normalized
            .tokens
            .iter()
            .any(|t| self.keywords.time_dimension.contains(&t.as_str()));
        let factor = if pk_is_time {
            1.0
        } else {
            match (fk.inferred_role, pk.inferred_role) {
                (Fact, Dimension) | (Bridge, Dimension) | (Bridge, Unknown) => 1.0,
                (Staging, _) | (_, Staging) => 0.25,
                (Fact, Unknown) | (Unknown, Dimension) | (Dimension, Dimension) => 0.5,
                _ => 0.0,
            }
        };
        let reason = if pk_is_time {
            format!("{} -> time dimension {}", fk.inferred_role, pk.name())
        } else {
            format!("{} -> {}", fk.inferred_role, pk.inferred_role)
        };
        (weight::ROLE * factor, reason)
    }

    fn composite(&self, group: &CandidateGroup) -> (f64, String) {
        if !group.is_composite() {
            return (0.0, String::new());
        }
        let strong = group
            .pairs
            .iter()
            .filter(|p| p.raw_score >= self.baseline.suffix_score)
            .count();
        let total = group.pairs.len();
        (
            weight::COMPOSITE * strong as f64 / total as f64,
            format!("{} of {} key columns match strongly", strong, total),
        )
    }

    /// Entity families shared by the referencing column's core and the
    /// referenced table's name. The sum is capped.
    fn domain_boosts(
        &self,
        fk: &TableDescriptor,
        pk: &TableDescriptor,
        group: &CandidateGroup,
    ) -> Vec<(&'static str, f64)> {
        let core_tokens: Vec<&str> = group
            .pairs
            .iter()
            .filter_map(|p| fk.key_shapes[p.left_column].as_ref())
            .flat_map(|s| s.core_tokens.iter().map(String::as_str))
            .collect();
        let table_tokens: Vec<&str> = pk
            .normalized
            .tokens
            .iter()
            .map(String::as_str)
            .chain(pk.name_variants.iter().map(String::as_str))
            .collect();

        let mut boosts = Vec::new();
        let mut remaining = weight::DOMAIN_BOOST_CAP;
        for family in self.keywords.domain_families {
            let hit = |tokens: &[&str]| tokens.iter().any(|t| family.markers.contains(t));
            if hit(&core_tokens) && hit(&table_tokens) && remaining > 0.0 {
                let boost = family.boost.min(remaining);
                remaining -= boost;
                boosts.push((family.name, boost));
            }
        }
        boosts
    }
}
