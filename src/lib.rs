//! # relmap
//!
//! Relationship discovery for warehouse catalogs.
//!
//! ## Architecture
//!
//! Given table and column metadata, plus optional sampled values, relmap
//! infers which columns reference which tables:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │     Input (JSON definitions or a CatalogProvider)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ingestion]
//! ┌─────────────────────────────────────────────────────────┐
//! │   TableDescriptors (normalized names, roles, key roles)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [matching + orientation]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Candidate groups (FK columns -> PK columns)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [cardinality, scoring, join type]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Relationships + DiscoverySummary                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never talks to a database. Live catalogs and NULL checks go
//! through the [`catalog::CatalogProvider`] and
//! [`discovery::NullProbe`] traits.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod model;

pub use catalog::{discover_from_catalog, CatalogProvider, ColumnDefinition, TableDefinition};
pub use config::{DiscoveryConfig, Settings};
pub use discovery::{DiscoveryEngine, NullProbe};
pub use error::{ConfigError, RelmapResult};
pub use model::{
    Cardinality, ConfidenceLevel, DiscoveryResult, DiscoverySummary, JoinType, Relationship,
    SampleValue,
};

/// Common imports for callers.
pub mod prelude {
    pub use crate::catalog::{
        discover_from_catalog, CatalogColumn, CatalogProvider, ColumnDefinition, TableDefinition,
    };
    pub use crate::config::{DiscoveryConfig, ThresholdBaseline};
    pub use crate::discovery::{DiscoveryEngine, NullProbe};
    pub use crate::model::{
        Cardinality, ColumnPair, ConfidenceLevel, DiscoveryResult, DiscoverySummary, JoinType,
        QualifiedName, Relationship, SampleValue,
    };
}
