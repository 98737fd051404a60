//! Discovery run configuration.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::discovery::thresholds;
use crate::error::ConfigError;

/// Tunable constants for matching and cardinality.
///
/// These were settled empirically against reference schemas; adaptive
/// tuning moves them per run, see [`crate::discovery::AdaptiveThresholds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdBaseline {
    /// Sampled rows required before uniqueness counts as evidence.
    pub min_sample_size: usize,
    /// Distinct/count ratio at or above which a side is `one`.
    pub uniqueness_ratio: f64,
    /// Normalized edit-distance similarity a fuzzy match must reach.
    pub fuzzy_similarity: f64,
    /// Raw score of a token-suffix match (`ORDER_DATE_ID` vs `DATE_ID`).
    pub suffix_score: f64,
    /// Raw score of an FK-shape match (`customer_id` vs `CUSTOMERS.id`).
    pub fk_pattern_score: f64,
    /// Multiplier applied to fuzzy similarity to get its raw score.
    pub fuzzy_weight: f64,
}

impl Default for ThresholdBaseline {
    fn default() -> Self {
        Self {
            min_sample_size: 50,
            uniqueness_ratio: 0.95,
            fuzzy_similarity: 0.82,
            suffix_score: 0.85,
            fk_pattern_score: 0.75,
            fuzzy_weight: 0.80,
        }
    }
}

impl ThresholdBaseline {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_sample_size == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "min_sample_size",
            });
        }
        let unit = [
            ("uniqueness_ratio", self.uniqueness_ratio),
            ("fuzzy_similarity", self.fuzzy_similarity),
            ("suffix_score", self.suffix_score),
            ("fk_pattern_score", self.fk_pattern_score),
            ("fuzzy_weight", self.fuzzy_weight),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Threshold { field, value });
            }
        }
        Ok(())
    }
}

/// Configuration for a discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Relationships scoring below this are dropped.
    pub min_confidence: f64,
    /// Cap on returned relationships.
    pub max_relationships: Option<usize>,
    /// Wall-clock bound for the run, in seconds.
    pub timeout_secs: Option<f64>,
    /// Only the first `max_tables` input tables are analyzed.
    pub max_tables: Option<usize>,
    /// Consult the injected NULL probe when deciding join types.
    pub strict_join_inference: bool,
    /// Samples requested per column from the catalog collaborator.
    pub sample_values_per_column: usize,
    /// Concurrency for sample fetches and NULL probes.
    pub max_workers: usize,
    /// Bound on a single NULL probe, in seconds.
    pub probe_timeout_secs: f64,
    pub thresholds: ThresholdBaseline,
    /// Extra regexes matched against canonical column names; matches are
    /// excluded from matching.
    pub extra_exclusions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_confidence: thresholds::confidence::BALANCED_MIN,
            max_relationships: None,
            timeout_secs: Some(30.0),
            max_tables: None,
            strict_join_inference: false,
            sample_values_per_column: 10,
            max_workers: 4,
            probe_timeout_secs: 5.0,
            thresholds: ThresholdBaseline::default(),
            extra_exclusions: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Defaults for ad-hoc table definitions: shorter timeout.
    pub fn for_definitions() -> Self {
        Self {
            timeout_secs: Some(15.0),
            ..Default::default()
        }
    }

    /// Defaults for whole-schema discovery against a live catalog.
    pub fn for_schema() -> Self {
        Self {
            max_tables: Some(60),
            ..Default::default()
        }
    }

    /// Fewer, surer relationships.
    pub fn high_precision() -> Self {
        Self {
            min_confidence: thresholds::confidence::HIGH_PRECISION_MIN,
            ..Default::default()
        }
    }

    /// More relationships, lower bar.
    pub fn high_recall() -> Self {
        Self {
            min_confidence: thresholds::confidence::HIGH_RECALL_MIN,
            ..Default::default()
        }
    }

    /// Builder: set minimum confidence.
    pub fn with_min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = threshold;
        self
    }

    /// Builder: cap returned relationships.
    pub fn with_max_relationships(mut self, max: Option<usize>) -> Self {
        self.max_relationships = max;
        self
    }

    /// Builder: set the wall-clock bound in seconds.
    pub fn with_timeout_secs(mut self, timeout: Option<f64>) -> Self {
        self.timeout_secs = timeout;
        self
    }

    /// Builder: cap analyzed tables.
    pub fn with_max_tables(mut self, max: Option<usize>) -> Self {
        self.max_tables = max;
        self
    }

    /// Builder: enable strict join inference.
    pub fn with_strict_join_inference(mut self, strict: bool) -> Self {
        self.strict_join_inference = strict;
        self
    }

    /// Builder: samples requested per column.
    pub fn with_sample_values_per_column(mut self, n: usize) -> Self {
        self.sample_values_per_column = n;
        self
    }

    /// Builder: worker count for collaborator calls.
    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    /// Builder: bound on a single NULL probe, in seconds.
    pub fn with_probe_timeout_secs(mut self, secs: f64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    /// Builder: replace the threshold baseline.
    pub fn with_thresholds(mut self, thresholds: ThresholdBaseline) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Builder: add an exclusion regex.
    pub fn with_exclusion(mut self, pattern: impl Into<String>) -> Self {
        self.extra_exclusions.push(pattern.into());
        self
    }

    /// Wall-clock bound as a duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.probe_timeout_secs)
    }

    /// Reject values that make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        if let Some(timeout) = self.timeout_secs {
            if !timeout.is_finite() || timeout < 0.0 {
                return Err(ConfigError::Timeout(timeout));
            }
        }
        if !self.probe_timeout_secs.is_finite() || self.probe_timeout_secs <= 0.0 {
            return Err(ConfigError::ProbeTimeout(self.probe_timeout_secs));
        }
        let limits = [
            ("max_relationships", self.max_relationships),
            ("max_tables", self.max_tables),
            ("sample_values_per_column", Some(self.sample_values_per_column)),
            ("max_workers", Some(self.max_workers)),
        ];
        for (field, value) in limits {
            if value == Some(0) {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        self.thresholds.validate()?;
        self.compiled_exclusions().map(|_| ())
    }

    /// Compile `extra_exclusions`, case-insensitively.
    pub fn compiled_exclusions(&self) -> Result<Vec<Regex>, ConfigError> {
        self.extra_exclusions
            .iter()
            .map(|pattern| {
                Regex::new(&format!("(?i){}", pattern)).map_err(|e| ConfigError::ExclusionPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
