//! CatalogProvider trait and live-catalog discovery.
//!
//! The provider abstracts over whatever connector talks to the warehouse.
//! The engine only needs column metadata and a handful of sampled values
//! per column; everything else stays on the caller's side.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::definitions::{ColumnDefinition, TableDefinition};
use crate::discovery::DiscoveryEngine;
use crate::error::CatalogError;
use crate::model::{DiscoveryResult, SampleValue};

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// One column row from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub table: String,
    pub column: String,
    pub data_type: String,
    /// `None` when the catalog query carries no key information
    /// (`DESCRIBE`-style fallbacks).
    pub is_primary_key: Option<bool>,
}

/// Fetches metadata and samples from a live warehouse.
///
/// # Example
///
/// ```ignore
/// use relmap::catalog::{discover_from_catalog, CatalogProvider};
///
/// async fn example(provider: &impl CatalogProvider, engine: &DiscoveryEngine) {
///     let tables = vec!["ORDERS".to_string(), "CUSTOMERS".to_string()];
///     let result = discover_from_catalog(provider, "WH", "SALES", &tables, engine).await;
///     println!("{} relationships", result.relationships.len());
/// }
/// ```
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Column metadata for `tables`, in catalog order.
    async fn list_columns(
        &self,
        database: &str,
        schema: &str,
        tables: &[String],
    ) -> CatalogResult<Vec<CatalogColumn>>;

    /// Up to `limit` sampled values of one column.
    async fn sample_values(
        &self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> CatalogResult<Vec<SampleValue>>;
}

/// Run discovery over tables pulled from a live catalog.
///
/// Samples are fetched concurrently, `max_workers` at a time. A failed
/// column listing yields an empty result with a note; a failed sample
/// fetch leaves that column without samples. Neither is an error.
pub async fn discover_from_catalog<P>(
    provider: &P,
    database: &str,
    schema: &str,
    tables: &[String],
    engine: &DiscoveryEngine,
) -> DiscoveryResult
where
    P: CatalogProvider + ?Sized,
{
    let rows = match provider.list_columns(database, schema, tables).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "catalog listing failed");
            let mut result = DiscoveryResult::empty();
            result.summary.notes = Some(e.to_string());
            return result;
        }
    };
    if rows.is_empty() {
        return DiscoveryResult::empty();
    }

    let config = engine.config();
    let limit = config.sample_values_per_column;
    let samples: Vec<(usize, Option<Vec<SampleValue>>)> = stream::iter(rows.iter().enumerate())
        .map(|(idx, row)| async move {
            match provider.sample_values(&row.table, &row.column, limit).await {
                Ok(values) => (idx, Some(values)),
                Err(e) => {
                    warn!(table = %row.table, column = %row.column, error = %e, "sample fetch failed");
                    (idx, None)
                }
            }
        })
        .buffer_unordered(config.max_workers.max(1))
        .collect()
        .await;

    let mut by_row: Vec<Option<Vec<SampleValue>>> = vec![None; rows.len()];
    for (idx, values) in samples {
        by_row[idx] = values;
    }

    let definitions = group_by_table(database, schema, &rows, by_row);
    engine.discover(definitions).await
}

/// Group catalog rows by table in first-seen order, keeping column order.
fn group_by_table(
    database: &str,
    schema: &str,
    rows: &[CatalogColumn],
    samples: Vec<Option<Vec<SampleValue>>>,
) -> Vec<TableDefinition> {
    let mut definitions: Vec<TableDefinition> = Vec::new();
    for (row, sample_values) in rows.iter().zip(samples) {
        let position = definitions
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(&row.table));
        let idx = match position {
            Some(idx) => idx,
            None => {
                definitions.push(TableDefinition::new(row.table.clone()).in_schema(database, schema));
                definitions.len() - 1
            }
        };
        definitions[idx].columns.push(ColumnDefinition {
            name: row.column.clone(),
            data_type: Some(row.data_type.clone()),
            is_primary_key: row.is_primary_key,
            sample_values,
        });
    }
    definitions
}
