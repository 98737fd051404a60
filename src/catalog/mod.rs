//! Input boundary: table definitions and the live-catalog collaborator.

mod definitions;
mod provider;

pub use definitions::{
    parse_table_definitions, split_table_identifier, ColumnDefinition, TableDefinition,
    DEFAULT_DATABASE, DEFAULT_SCHEMA,
};
pub use provider::{discover_from_catalog, CatalogColumn, CatalogProvider, CatalogResult};
