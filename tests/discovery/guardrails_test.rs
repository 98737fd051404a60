use relmap::catalog::{ColumnDefinition, TableDefinition};
use relmap::config::DiscoveryConfig;
use relmap::discovery::DiscoveryEngine;
use relmap::error::ConfigError;

fn table(name: &str, columns: &[(&str, &str)]) -> TableDefinition {
    columns.iter().fold(TableDefinition::new(name), |t, (col, ty)| {
        t.with_column(ColumnDefinition::new(*col).data_type(*ty))
    })
}

/// Four TPC-H tables plus ORDERS: four relationships by naming alone.
fn snowflake() -> Vec<TableDefinition> {
    vec![
        table(
            "REGION",
            &[("r_regionkey", "NUMBER"), ("r_name", "VARCHAR"), ("r_comment", "VARCHAR")],
        ),
        table(
            "NATION",
            &[
                ("n_nationkey", "NUMBER"),
                ("n_name", "VARCHAR"),
                ("n_regionkey", "NUMBER"),
                ("n_comment", "VARCHAR"),
            ],
        ),
        table(
            "CUSTOMER",
            &[
                ("c_custkey", "NUMBER"),
                ("c_name", "VARCHAR"),
                ("c_nationkey", "NUMBER"),
                ("c_acctbal", "NUMBER(12,2)"),
                ("c_comment", "VARCHAR"),
            ],
        ),
        table(
            "SUPPLIER",
            &[
                ("s_suppkey", "NUMBER"),
                ("s_name", "VARCHAR"),
                ("s_nationkey", "NUMBER"),
            ],
        ),
        table(
            "ORDERS",
            &[
                ("o_orderkey", "NUMBER"),
                ("o_custkey", "NUMBER"),
                ("o_orderdate", "DATE"),
                ("o_comment", "VARCHAR"),
            ],
        ),
    ]
}

#[tokio::test]
async fn test_table_cap() {
    let config = DiscoveryConfig::default().with_max_tables(Some(3));
    let engine = DiscoveryEngine::new(config).unwrap();
    let result = engine.discover(snowflake()).await;

    assert!(result.summary.limited_by_table_cap);
    assert_eq!(result.summary.total_tables, 3);
    let notes = result.summary.notes.clone().unwrap_or_default();
    assert!(
        notes.contains("Input contained 5 tables; analysis limited to first 3."),
        "notes: {}",
        notes
    );
    for rel in &result.relationships {
        for name in [&rel.left_table, &rel.right_table] {
            assert!(
                ["REGION", "NATION", "CUSTOMER"].contains(&name.as_str()),
                "{} is beyond the cap",
                name
            );
        }
    }
    assert!(result.find("CUSTOMER", "NATION").is_some());
}

#[tokio::test]
async fn test_zero_timeout_returns_partial_result() {
    let config = DiscoveryConfig::default().with_timeout_secs(Some(0.0));
    let engine = DiscoveryEngine::new(config).unwrap();
    let result = engine.discover(snowflake()).await;

    assert!(result.summary.limited_by_timeout);
    assert!(result.relationships.is_empty());
    assert_eq!(result.summary.total_tables, 5, "ingestion still reports the input");
}

#[tokio::test]
async fn test_no_timeout() {
    let config = DiscoveryConfig::default().with_timeout_secs(None);
    let engine = DiscoveryEngine::new(config).unwrap();
    let result = engine.discover(snowflake()).await;

    assert!(!result.summary.limited_by_timeout);
    assert_eq!(result.relationships.len(), 4);
}

#[tokio::test]
async fn test_max_relationships_keeps_best() {
    let full = DiscoveryEngine::new(DiscoveryConfig::default())
        .unwrap()
        .discover(snowflake())
        .await;
    assert!(!full.summary.limited_by_max_relationships);

    let config = DiscoveryConfig::default().with_max_relationships(Some(2));
    let capped = DiscoveryEngine::new(config)
        .unwrap()
        .discover(snowflake())
        .await;

    assert!(capped.summary.limited_by_max_relationships);
    assert_eq!(capped.relationships.len(), 2);
    assert_eq!(capped.summary.total_relationships_found, 2);
    assert_eq!(capped.relationships[..], full.relationships[..2]);
}

#[tokio::test]
async fn test_min_confidence_filters() {
    let config = DiscoveryConfig::default().with_min_confidence(1.0);
    let engine = DiscoveryEngine::new(config).unwrap();
    let result = engine.discover(snowflake()).await;

    assert!(result.relationships.iter().all(|r| r.confidence_score >= 1.0));
}

#[tokio::test]
async fn test_empty_input() {
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result = engine.discover(Vec::new()).await;

    assert!(result.relationships.is_empty());
    assert_eq!(result.summary.total_tables, 0);
    assert_eq!(result.summary.total_relationships_found, 0);
}

#[test]
fn test_invalid_config_rejected() {
    let negative = DiscoveryConfig::default().with_timeout_secs(Some(-1.0));
    assert_eq!(
        DiscoveryEngine::new(negative).unwrap_err(),
        ConfigError::Timeout(-1.0)
    );

    let too_confident = DiscoveryConfig::default().with_min_confidence(1.5);
    assert_eq!(
        DiscoveryEngine::new(too_confident).unwrap_err(),
        ConfigError::MinConfidence(1.5)
    );

    let zero = DiscoveryConfig::default().with_max_relationships(Some(0));
    assert_eq!(
        DiscoveryEngine::new(zero).unwrap_err(),
        ConfigError::ZeroLimit {
            field: "max_relationships"
        }
    );
}
