//! Core data model for relationship discovery.
//!
//! Descriptors are built once per run from caller input and never mutated
//! afterwards. Relationships and the summary are the only output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::discovery::normalize::NormalizedName;
use crate::discovery::roles::KeyShape;

/// A sampled column value.
///
/// Warehouse drivers hand back heterogeneous values; everything is folded
/// into one of three shapes before the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Null,
    Number(f64),
    Text(String),
}

/// Textual stand-ins that drivers use for a missing value.
const NULL_LIKE_TEXT: &[&str] = &["NULL", "NONE", "NAN", "NA", "N/A", ""];

impl SampleValue {
    /// Create a text sample.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// True for the null sentinel, NaN, and textual null stand-ins.
    pub fn is_null_like(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(s) => {
                let folded = s.trim().to_uppercase();
                NULL_LIKE_TEXT.contains(&folded.as_str())
            }
        }
    }

    /// Canonical text used for distinct counting, `None` for null-like values.
    ///
    /// Numbers use shortest round-trip formatting so `1` and `1.0` collapse;
    /// integral values drop the fractional part so they compare equal to
    /// the same digits sampled as text.
    pub fn distinct_key(&self) -> Option<String> {
        if self.is_null_like() {
            return None;
        }
        match self {
            Self::Null => None,
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    let mut buffer = ryu::Buffer::new();
                    Some(buffer.format(*n).to_string())
                }
            }
            Self::Text(s) => Some(s.trim().to_string()),
        }
    }
}

impl From<&str> for SampleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for SampleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for SampleValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<SampleValue>> From<Option<T>> for SampleValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Database / schema / table triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl QualifiedName {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// An ingested column.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    /// Table name (upper-cased) that owns this column.
    pub owning_table: String,
    /// Name as supplied by the caller; used verbatim in output.
    pub raw_name: String,
    /// Derived canonical form used for every comparison.
    pub normalized: NormalizedName,
    /// Upper-cased base type with length/precision stripped.
    pub base_type: String,
    /// `None` when the catalog carried no primary-key information.
    pub is_primary_key: Option<bool>,
    /// Sampled values, if the collaborator provided any.
    pub sample_values: Option<Vec<SampleValue>>,
}

impl ColumnDescriptor {
    /// True only when metadata explicitly marks this column as a key.
    pub fn is_declared_primary_key(&self) -> bool {
        self.is_primary_key == Some(true)
    }

    pub fn samples(&self) -> &[SampleValue] {
        self.sample_values.as_deref().unwrap_or(&[])
    }
}

/// Likely role of a table in a warehouse schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Fact,
    Dimension,
    Bridge,
    Staging,
    #[default]
    Unknown,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fact => "fact",
            Self::Dimension => "dimension",
            Self::Bridge => "bridge",
            Self::Staging => "staging",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Key role of a column within its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Believed to identify rows of its own table.
    PrimaryKey { declared: bool },
    /// Shaped like a reference to another table.
    ForeignKey,
    Neither,
}

impl KeyRole {
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::PrimaryKey { .. })
    }

    pub fn is_key(&self) -> bool {
        !matches!(self, Self::Neither)
    }
}

/// An ingested table with its role and per-column key roles.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub qualified_name: QualifiedName,
    /// Canonical form of the table name with warehouse prefixes removed.
    pub normalized: NormalizedName,
    pub columns: Vec<ColumnDescriptor>,
    pub inferred_role: TableRole,
    /// Parallel to `columns`.
    pub key_roles: Vec<KeyRole>,
    /// Parallel to `columns`.
    pub eligible: Vec<bool>,
    /// Parallel to `columns`; `None` for columns not shaped like a key.
    pub key_shapes: Vec<Option<KeyShape>>,
    /// Entity names this table answers to (`CUSTOMERS` -> `CUSTOMER`, `CUST`).
    pub name_variants: Vec<String>,
}

impl TableDescriptor {
    /// Upper-cased table name as emitted in relationships.
    pub fn name(&self) -> &str {
        &self.qualified_name.table
    }

    /// Number of columns explicitly declared as primary key.
    pub fn declared_key_width(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.is_declared_primary_key())
            .count()
    }

    /// Indices of explicitly declared primary key columns, in column order.
    pub fn declared_key_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_declared_primary_key())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Strategy that produced a candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Direct,
    Suffix,
    Fuzzy,
    FkPattern,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Direct => "direct",
            Self::Suffix => "suffix",
            Self::Fuzzy => "fuzzy",
            Self::FkPattern => "fk_pattern",
        };
        f.write_str(s)
    }
}

/// A scored column match between two tables, before orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    /// Index of the left table in the run's table list.
    pub left_table: usize,
    pub left_column: usize,
    pub right_table: usize,
    pub right_column: usize,
    pub match_strategy: MatchStrategy,
    pub raw_score: f64,
}

/// Multiplicity of one side of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    One,
    Many,
}

/// `(left, right)` multiplicity. `(many, many)` is never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub left: Side,
    pub right: Side,
}

impl Cardinality {
    pub const MANY_TO_ONE: Self = Self {
        left: Side::Many,
        right: Side::One,
    };
    pub const ONE_TO_ONE: Self = Self {
        left: Side::One,
        right: Side::One,
    };
    pub const ONE_TO_MANY: Self = Self {
        left: Side::One,
        right: Side::Many,
    };

    pub fn new(left: Side, right: Side) -> Self {
        Self { left, right }
    }

    pub fn is_many_to_many(&self) -> bool {
        self.left == Side::Many && self.right == Side::Many
    }

    /// Swap sides, used when orientation flips.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |s: Side| match s {
            Side::One => "one",
            Side::Many => "many",
        };
        write!(f, "{}_to_{}", side(self.left), side(self.right))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    LeftOuter,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => f.write_str("inner"),
            Self::LeftOuter => f.write_str("left_outer"),
        }
    }
}

/// Discrete bucket for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Map a 0-1 score to its level.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::VeryHigh
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else if score >= 0.2 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        };
        f.write_str(s)
    }
}

/// One `(left_column, right_column)` join condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnPair {
    pub left_column: String,
    pub right_column: String,
}

/// A discovered relationship. The left table holds the foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub left_table: String,
    pub right_table: String,
    pub column_pairs: Vec<ColumnPair>,
    pub cardinality: Cardinality,
    pub join_type: JoinType,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub evidence: Vec<String>,
}

impl Relationship {
    /// Left-side column names in join order.
    pub fn left_columns(&self) -> Vec<&str> {
        self.column_pairs
            .iter()
            .map(|p| p.left_column.as_str())
            .collect()
    }

    /// Right-side column names in join order.
    pub fn right_columns(&self) -> Vec<&str> {
        self.column_pairs
            .iter()
            .map(|p| p.right_column.as_str())
            .collect()
    }

    /// True when this relationship joins `left` to `right` in that direction.
    pub fn connects(&self, left: &str, right: &str) -> bool {
        self.left_table.eq_ignore_ascii_case(left) && self.right_table.eq_ignore_ascii_case(right)
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.left_table == other.left_table
            && self.right_table == other.right_table
            && self.column_pairs == other.column_pairs
            && self.cardinality == other.cardinality
            && self.join_type == other.join_type
            && (self.confidence_score - other.confidence_score).abs() < 0.001
            && self.confidence_level == other.confidence_level
    }
}

/// Per-run counters and guardrail flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    pub total_tables: usize,
    pub total_columns: usize,
    pub total_relationships_found: usize,
    pub processing_time_ms: u64,
    pub limited_by_timeout: bool,
    pub limited_by_max_relationships: bool,
    pub limited_by_table_cap: bool,
    pub notes: Option<String>,
}

/// Output of one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub relationships: Vec<Relationship>,
    pub summary: DiscoverySummary,
}

impl DiscoveryResult {
    /// A result with no relationships and zero counters.
    pub fn empty() -> Self {
        Self {
            relationships: Vec::new(),
            summary: DiscoverySummary::default(),
        }
    }

    /// Find the first relationship going from `left` to `right`.
    pub fn find(&self, left: &str, right: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.connects(left, right))
    }

    /// True when any relationship joins the two tables, in either direction.
    pub fn links(&self, a: &str, b: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.connects(a, b) || r.connects(b, a))
    }
}
