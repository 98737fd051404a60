//! Cardinality and bridge analysis.
//!
//! Each side of a relationship is `many` unless proven `one`. Proof comes
//! from declared key metadata first, then from sampled uniqueness, and
//! sampled uniqueness only counts once the sample is large enough. Small
//! samples of a foreign key are very often fully distinct by chance.
//!
//! The sample-size gate and uniqueness threshold are tuned per run by
//! [`AdaptiveThresholds::compute`], a pure function of schema-wide
//! [`SchemaStatistics`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::thresholds::sampling;
use crate::config::ThresholdBaseline;
use crate::model::{Cardinality, KeyRole, Side, TableDescriptor, TableRole};

/// Schema-wide statistics gathered once after ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaStatistics {
    pub table_count: usize,
    /// Eligible key-shaped columns across all tables.
    pub key_column_count: usize,
    /// Share of key columns using the most common key token (`ID`, `KEY`, ...).
    pub naming_consistency: f64,
    /// Key columns with enough non-null samples to compute a ratio.
    pub sampled_key_columns: usize,
    /// Share of sampled key columns that are clearly unique or clearly
    /// repeated (ratio >= 0.95 or <= 0.5).
    pub bimodal_share: f64,
}

impl SchemaStatistics {
    /// Gather statistics over ingested tables.
    pub fn collect(tables: &[TableDescriptor]) -> Self {
        let mut token_counts: HashMap<&str, usize> = HashMap::new();
        let mut key_column_count = 0;
        let mut sampled = 0;
        let mut bimodal = 0;

        for table in tables {
            for (idx, shape) in table.key_shapes.iter().enumerate() {
                let Some(shape) = shape else { continue };
                if !table.eligible[idx] {
                    continue;
                }
                key_column_count += 1;
                *token_counts.entry(shape.key_token).or_default() += 1;

                let tally = SampleTally::of(table, &[idx]);
                if tally.count >= 2 {
                    sampled += 1;
                    let ratio = tally.ratio();
                    if ratio >= 0.95 || ratio <= 0.5 {
                        bimodal += 1;
                    }
                }
            }
        }

        let dominant = token_counts.values().copied().max().unwrap_or(0);
        Self {
            table_count: tables.len(),
            key_column_count,
            naming_consistency: share(dominant, key_column_count),
            sampled_key_columns: sampled,
            bimodal_share: share(bimodal, sampled),
        }
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Thresholds in force for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveThresholds {
    pub min_sample_size: usize,
    pub uniqueness_ratio: f64,
    pub fuzzy_similarity: f64,
    /// Human-readable record of each adjustment applied.
    pub adjustments: Vec<String>,
}

impl AdaptiveThresholds {
    /// Baseline thresholds with no adjustment.
    pub fn baseline(baseline: &ThresholdBaseline) -> Self {
        Self {
            min_sample_size: baseline.min_sample_size,
            uniqueness_ratio: baseline.uniqueness_ratio,
            fuzzy_similarity: baseline.fuzzy_similarity,
            adjustments: Vec::new(),
        }
    }

    /// Tune the baseline against schema statistics.
    ///
    /// Consistent key naming lowers the sample gate, inconsistent naming
    /// raises it and tightens the ratio. Large schemas tighten the ratio a
    /// little; a clearly bimodal uniqueness distribution relaxes it.
    pub fn compute(stats: &SchemaStatistics, baseline: &ThresholdBaseline) -> Self {
        let mut tuned = Self::baseline(baseline);
        let mut min_sample = baseline.min_sample_size as f64;

        if stats.key_column_count > 0 && stats.naming_consistency >= 0.8 {
            min_sample = min_sample * 4.0 / 5.0;
            tuned.adjustments.push(format!(
                "consistent key naming ({:.0}%): sample gate lowered",
                stats.naming_consistency * 100.0
            ));
        } else if stats.key_column_count >= 4 && stats.naming_consistency < 0.5 {
            min_sample = min_sample * 3.0 / 2.0;
            tuned.uniqueness_ratio += 0.02;
            tuned.adjustments.push(format!(
                "inconsistent key naming ({:.0}%): sample gate raised",
                stats.naming_consistency * 100.0
            ));
        }

        if stats.table_count > 25 {
            tuned.uniqueness_ratio += 0.01;
            tuned
                .adjustments
                .push(format!("{} tables: uniqueness ratio tightened", stats.table_count));
        }

        if stats.sampled_key_columns >= 4 && stats.bimodal_share >= 0.8 {
            tuned.uniqueness_ratio -= 0.02;
            tuned
                .adjustments
                .push("bimodal uniqueness distribution: ratio relaxed".to_string());
        }

        let floor = sampling::MIN_SAMPLE_FLOOR.min(baseline.min_sample_size);
        tuned.min_sample_size =
            (min_sample.round() as usize).clamp(floor, sampling::MIN_SAMPLE_CEILING);
        tuned.uniqueness_ratio = tuned
            .uniqueness_ratio
            .clamp(sampling::UNIQUENESS_FLOOR, sampling::UNIQUENESS_CEILING);
        tuned
    }
}

/// Distinct and total counts over the non-null sampled tuples of a column set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleTally {
    pub count: usize,
    pub distinct: usize,
    /// At least one column in the set carried samples.
    pub present: bool,
}

impl SampleTally {
    /// Zip the sampled values of `columns` into tuples, skipping any tuple
    /// that contains a null-like value.
    pub fn of(table: &TableDescriptor, columns: &[usize]) -> Self {
        let samples: Vec<_> = columns
            .iter()
            .map(|&c| table.columns[c].sample_values.as_deref())
            .collect();
        if samples.iter().all(Option::is_none) {
            return Self::default();
        }
        let series: Vec<_> = samples.iter().map(|s| s.unwrap_or(&[])).collect();
        let rows = series.iter().map(|s| s.len()).min().unwrap_or(0);

        let mut seen = HashSet::new();
        let mut count = 0;
        for row in 0..rows {
            let key: Option<Vec<String>> = series.iter().map(|s| s[row].distinct_key()).collect();
            if let Some(key) = key {
                count += 1;
                seen.insert(key);
            }
        }
        Self {
            count,
            distinct: seen.len(),
            present: true,
        }
    }

    pub fn ratio(&self) -> f64 {
        share(self.distinct, self.count)
    }
}

/// Why a side ended up `one` or `many`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideEvidence {
    /// The columns are exactly the table's declared primary key.
    DeclaredKey,
    /// The columns are part of a declared composite key.
    DeclaredPartial,
    SampledUnique { ratio: f64, sample_size: usize },
    SampledRepeated { ratio: f64, sample_size: usize },
    /// Samples exist but are fewer than the adaptive minimum.
    Undersampled { ratio: f64, sample_size: usize },
    NoEvidence,
}

impl SideEvidence {
    /// Evidence is too thin to contradict a key by naming.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::NoEvidence | Self::Undersampled { .. })
    }
}

impl fmt::Display for SideEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclaredKey => f.write_str("declared primary key"),
            Self::DeclaredPartial => f.write_str("part of declared composite key"),
            Self::SampledUnique { ratio, sample_size } => {
                write!(f, "{:.0}% unique over {} samples", ratio * 100.0, sample_size)
            }
            Self::SampledRepeated { ratio, sample_size } => write!(
                f,
                "{:.0}% unique over {} samples (repeated)",
                ratio * 100.0,
                sample_size
            ),
            Self::Undersampled { sample_size, .. } => {
                write!(f, "only {} samples, uniqueness not trusted", sample_size)
            }
            Self::NoEvidence => f.write_str("no uniqueness evidence"),
        }
    }
}

/// Resolved multiplicity of one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideDecision {
    pub side: Side,
    pub evidence: SideEvidence,
}

/// Cardinality of a candidate group, oriented so the `many` side is left.
#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityDecision {
    pub cardinality: Cardinality,
    /// Sides were swapped: the input's right side turned out to be `many`.
    pub flipped: bool,
    /// `one` on the right was assumed from key naming rather than proven.
    pub assumed: bool,
    pub left: SideDecision,
    pub right: SideDecision,
}

/// Resolves side multiplicity under the run's thresholds.
pub struct CardinalityAnalyzer<'a> {
    thresholds: &'a AdaptiveThresholds,
}

impl<'a> CardinalityAnalyzer<'a> {
    pub fn new(thresholds: &'a AdaptiveThresholds) -> Self {
        Self { thresholds }
    }

    /// Resolve `(left, right)` for `left_cols -> right_cols`.
    ///
    /// Returns `None` when the right side is `many` and nothing suggests it
    /// is a key; such a pair would be a many-to-many edge.
    pub fn resolve(
        &self,
        left: &TableDescriptor,
        left_cols: &[usize],
        right: &TableDescriptor,
        right_cols: &[usize],
    ) -> Option<CardinalityDecision> {
        let left_side = self.side(left, left_cols, has_declared_key(right, right_cols));
        let right_side = self.side(right, right_cols, has_declared_key(left, left_cols));

        match (left_side.side, right_side.side) {
            (Side::Many, Side::One) | (Side::One, Side::One) => Some(CardinalityDecision {
                cardinality: Cardinality::new(left_side.side, right_side.side),
                flipped: false,
                assumed: false,
                left: left_side,
                right: right_side,
            }),
            (Side::One, Side::Many) if proves_reversed(&left_side, &right_side) => {
                Some(CardinalityDecision {
                    cardinality: Cardinality::MANY_TO_ONE,
                    flipped: true,
                    assumed: false,
                    left: right_side,
                    right: left_side,
                })
            }
            (_, Side::Many) => {
                let right_is_key = right_cols.iter().all(|&c| right.key_roles[c].is_primary());
                if right_is_key && right_side.evidence.is_inconclusive() {
                    Some(CardinalityDecision {
                        cardinality: Cardinality::MANY_TO_ONE,
                        flipped: false,
                        assumed: true,
                        left: left_side,
                        right: right_side,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Multiplicity of one side. `other_declared` is true when the opposite
    /// side holds a declared primary-key column.
    pub fn side(
        &self,
        table: &TableDescriptor,
        columns: &[usize],
        other_declared: bool,
    ) -> SideDecision {
        let declared = table.declared_key_columns();
        if !declared.is_empty() {
            let mut sorted = columns.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted == declared {
                return SideDecision {
                    side: Side::One,
                    evidence: SideEvidence::DeclaredKey,
                };
            }
            let partial = declared.len() > 1 && columns.iter().all(|c| declared.contains(c));
            if partial && !other_declared {
                return SideDecision {
                    side: Side::One,
                    evidence: SideEvidence::DeclaredPartial,
                };
            }
        }

        let tally = SampleTally::of(table, columns);
        let ratio = tally.ratio();
        let sample_size = tally.count;
        if tally.count == 0 {
            return SideDecision {
                side: Side::Many,
                evidence: SideEvidence::NoEvidence,
            };
        }
        if tally.count < self.thresholds.min_sample_size {
            return SideDecision {
                side: Side::Many,
                evidence: SideEvidence::Undersampled { ratio, sample_size },
            };
        }
        if ratio >= self.thresholds.uniqueness_ratio {
            SideDecision {
                side: Side::One,
                evidence: SideEvidence::SampledUnique { ratio, sample_size },
            }
        } else {
            SideDecision {
                side: Side::Many,
                evidence: SideEvidence::SampledRepeated { ratio, sample_size },
            }
        }
    }
}

fn has_declared_key(table: &TableDescriptor, columns: &[usize]) -> bool {
    columns
        .iter()
        .any(|&c| table.columns[c].is_declared_primary_key())
}

/// A `one -> many` pair is only turned around when the right side is shown
/// to repeat, or the left side is the declared key and the right is not.
/// Thin samples on the right never overrule key naming.
fn proves_reversed(left: &SideDecision, right: &SideDecision) -> bool {
    matches!(right.evidence, SideEvidence::SampledRepeated { .. })
        || left.evidence == SideEvidence::DeclaredKey
}

/// How a bridge table affects an oriented candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeVerdict {
    Keep,
    /// Re-orient so the bridge is the referencing side.
    Flip,
    /// Both sides only reference a third entity; no direct edge.
    Drop,
}

/// Check an oriented `fk -> pk` candidate against bridge rules.
///
/// A bridge's foreign-shaped columns never act as the referenced key: a
/// dimension pointing at a bridge is turned around, and two tables that
/// merely share a reference through a bridge get no edge at all.
pub fn bridge_verdict(
    fk: &TableDescriptor,
    fk_col: usize,
    pk: &TableDescriptor,
    pk_col: usize,
) -> BridgeVerdict {
    if pk.inferred_role != TableRole::Bridge || pk.columns[pk_col].is_declared_primary_key() {
        return BridgeVerdict::Keep;
    }
    let pk_foreign = pk.key_shapes[pk_col]
        .as_ref()
        .is_some_and(|s| s.is_foreign_shaped());
    if !pk_foreign {
        return BridgeVerdict::Keep;
    }
    let fk_foreign = fk.key_roles[fk_col] == KeyRole::ForeignKey;
    if fk_foreign || matches!(fk.inferred_role, TableRole::Fact | TableRole::Bridge) {
        BridgeVerdict::Drop
    } else {
        BridgeVerdict::Flip
    }
}
