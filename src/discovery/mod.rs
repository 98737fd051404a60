//! Relationship discovery engine.
//!
//! Infers which columns reference which tables, at what cardinality, with
//! what join semantics and with what confidence, using naming heuristics,
//! type compatibility and light statistics over sampled values.
//!
//! # Architecture
//!
//! Per run:
//!
//! 1. **Ingestion** - names are normalized, columns filtered for
//!    eligibility, and each table classified (role, key roles).
//! 2. **Matching** - every ordered table pair is scanned for candidate
//!    column pairs; ties for a column's best score are all kept.
//! 3. **Orientation** - candidates are turned FK -> PK, composite keys are
//!    grouped, and duplicates collapsed.
//! 4. **Evidence** - cardinality, confidence and join type are resolved
//!    for each surviving group.
//! 5. **Guardrails** - ordering, `max_relationships` and the summary.
//!
//! # Example
//!
//! ```ignore
//! use relmap::catalog::{ColumnDefinition, TableDefinition};
//! use relmap::config::DiscoveryConfig;
//! use relmap::discovery::DiscoveryEngine;
//!
//! let engine = DiscoveryEngine::new(DiscoveryConfig::default())?;
//! let result = engine.discover(vec![
//!     TableDefinition::new("ORDERS")
//!         .with_column(ColumnDefinition::new("order_id").primary_key(true))
//!         .with_column(ColumnDefinition::new("customer_id")),
//!     TableDefinition::new("CUSTOMERS")
//!         .with_column(ColumnDefinition::new("customer_id").primary_key(true)),
//! ]).await;
//! ```

pub mod cardinality;
pub mod eligibility;
mod engine;
pub mod inflection;
pub mod join_type;
pub mod keywords;
pub mod matcher;
pub mod normalize;
pub mod orientation;
pub mod roles;
pub mod scoring;
pub mod types;

pub use cardinality::{AdaptiveThresholds, SchemaStatistics};
pub use engine::DiscoveryEngine;
pub use join_type::{NullProbe, ProbeCache};
pub use keywords::KeywordTables;
pub use normalize::{normalize_column, normalize_table, NormalizedName};

/// Named constants for the scoring and matching model.
pub mod thresholds {
    /// Maximum contribution of each confidence signal.
    pub mod weight {
        /// Declared primary key on the referenced side.
        pub const PRIMARY_KEY: f64 = 0.40;
        /// Name similarity, scaled by strategy and raw score.
        pub const NAME: f64 = 0.30;
        /// Sampled uniqueness of the referenced side.
        pub const UNIQUENESS: f64 = 0.25;
        /// Type compatibility.
        pub const TYPE: f64 = 0.15;
        /// Fact -> dimension style role pattern.
        pub const ROLE: f64 = 0.20;
        /// Strength of a multi-column key group.
        pub const COMPOSITE: f64 = 0.10;
        /// Cap on the sum of domain-family boosts.
        pub const DOMAIN_BOOST_CAP: f64 = 0.25;
    }

    /// Raw scores produced by the matcher.
    pub mod matching {
        /// Canonical names are identical.
        pub const DIRECT: f64 = 1.0;
        /// Canonical names are identical once short table aliases are removed.
        pub const DIRECT_ALIAS: f64 = 0.95;
        /// Shortest compact name length the fuzzy strategy will consider.
        pub const FUZZY_MIN_LEN: usize = 5;
        /// Scores closer than this are treated as a tie.
        pub const TIE_EPSILON: f64 = 1e-9;
    }

    /// Sampling rules.
    pub mod sampling {
        /// Sampled values examined for null-like entries.
        pub const NULL_SCAN_LIMIT: usize = 25;
        /// Lowest minimum sample size adaptive tuning may reach.
        pub const MIN_SAMPLE_FLOOR: usize = 30;
        /// Highest minimum sample size adaptive tuning may reach.
        pub const MIN_SAMPLE_CEILING: usize = 500;
        /// Uniqueness threshold bounds after adaptive tuning.
        pub const UNIQUENESS_FLOOR: f64 = 0.90;
        pub const UNIQUENESS_CEILING: f64 = 0.99;
    }

    /// Default minimum confidence presets.
    pub mod confidence {
        pub const BALANCED_MIN: f64 = 0.50;
        pub const HIGH_PRECISION_MIN: f64 = 0.70;
        pub const HIGH_RECALL_MIN: f64 = 0.30;
    }
}
