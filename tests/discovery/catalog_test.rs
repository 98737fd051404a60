use std::sync::Mutex;

use async_trait::async_trait;
use relmap::catalog::{discover_from_catalog, CatalogColumn, CatalogProvider, CatalogResult};
use relmap::config::DiscoveryConfig;
use relmap::discovery::DiscoveryEngine;
use relmap::error::CatalogError;
use relmap::{Cardinality, JoinType, SampleValue};

/// In-memory catalog with optional failures.
struct FakeCatalog {
    rows: Vec<CatalogColumn>,
    fail_listing: bool,
    fail_samples_for: Option<(&'static str, &'static str)>,
    requests: Mutex<Vec<(String, String, usize)>>,
}

impl FakeCatalog {
    fn new() -> Self {
        let row = |table: &str, column: &str, data_type: &str, pk: Option<bool>| CatalogColumn {
            table: table.to_string(),
            column: column.to_string(),
            data_type: data_type.to_string(),
            is_primary_key: pk,
        };
        Self {
            rows: vec![
                row("ORDERS", "ORDER_ID", "NUMBER(38,0)", Some(true)),
                row("ORDERS", "CUSTOMER_ID", "NUMBER(38,0)", Some(false)),
                row("ORDERS", "ORDER_TOTAL", "NUMBER(12,2)", Some(false)),
                row("CUSTOMERS", "CUSTOMER_ID", "NUMBER(38,0)", Some(true)),
                row("CUSTOMERS", "CUSTOMER_NAME", "VARCHAR(200)", Some(false)),
            ],
            fail_listing: false,
            fail_samples_for: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn list_columns(
        &self,
        _database: &str,
        _schema: &str,
        tables: &[String],
    ) -> CatalogResult<Vec<CatalogColumn>> {
        if self.fail_listing {
            return Err(CatalogError::Query("warehouse suspended".to_string()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| tables.iter().any(|t| t.eq_ignore_ascii_case(&r.table)))
            .cloned()
            .collect())
    }

    async fn sample_values(
        &self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> CatalogResult<Vec<SampleValue>> {
        self.requests
            .lock()
            .unwrap()
            .push((table.to_string(), column.to_string(), limit));
        if self.fail_samples_for == Some((table, column)) {
            return Err(CatalogError::Sample {
                table: table.to_string(),
                column: column.to_string(),
                message: "permission denied".to_string(),
            });
        }
        Ok((1..=limit).map(|n| SampleValue::Number(n as f64)).collect())
    }
}

fn tables() -> Vec<String> {
    vec!["ORDERS".to_string(), "CUSTOMERS".to_string()]
}

#[tokio::test]
async fn test_discover_from_catalog() {
    let catalog = FakeCatalog::new();
    let engine = DiscoveryEngine::new(DiscoveryConfig::for_schema()).unwrap();
    let result = discover_from_catalog(&catalog, "WH", "SALES", &tables(), &engine).await;

    let rel = result.find("ORDERS", "CUSTOMERS").expect("ORDERS -> CUSTOMERS");
    assert_eq!(rel.left_columns(), vec!["CUSTOMER_ID"]);
    assert_eq!(rel.cardinality, Cardinality::MANY_TO_ONE);
    assert_eq!(rel.join_type, JoinType::Inner);
    assert_eq!(result.summary.total_tables, 2);
    assert_eq!(result.summary.total_columns, 5);

    let requests = catalog.requests.lock().unwrap();
    assert_eq!(requests.len(), 5, "one sample fetch per column");
    assert!(requests.iter().all(|(_, _, limit)| *limit == 10));
}

#[tokio::test]
async fn test_failed_sample_fetch_is_not_fatal() {
    let mut catalog = FakeCatalog::new();
    catalog.fail_samples_for = Some(("ORDERS", "CUSTOMER_ID"));
    let engine = DiscoveryEngine::new(DiscoveryConfig::default().with_max_workers(1)).unwrap();
    let result = discover_from_catalog(&catalog, "WH", "SALES", &tables(), &engine).await;

    let rel = result.find("ORDERS", "CUSTOMERS").expect("relationship survives a missing sample");
    assert_eq!(rel.join_type, JoinType::Inner);
    assert!(result.summary.notes.is_none());
}

#[tokio::test]
async fn test_failed_listing_yields_empty_result() {
    let mut catalog = FakeCatalog::new();
    catalog.fail_listing = true;
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result = discover_from_catalog(&catalog, "WH", "SALES", &tables(), &engine).await;

    assert!(result.relationships.is_empty());
    assert_eq!(result.summary.total_tables, 0);
    assert_eq!(
        result.summary.notes.as_deref(),
        Some("catalog query failed: warehouse suspended")
    );
    assert!(catalog.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_tables_yield_empty_result() {
    let catalog = FakeCatalog::new();
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result =
        discover_from_catalog(&catalog, "WH", "SALES", &["MISSING".to_string()], &engine).await;

    assert!(result.relationships.is_empty());
    assert_eq!(result.summary.total_tables, 0);
}
