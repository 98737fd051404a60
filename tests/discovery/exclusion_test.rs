use relmap::catalog::{ColumnDefinition, TableDefinition};
use relmap::config::DiscoveryConfig;
use relmap::discovery::eligibility::{Eligibility, EligibilityFilter};
use relmap::discovery::{normalize_column, DiscoveryEngine, KeywordTables};

const EXCLUDED: [&str; 4] = ["CREATED_AT", "CUSTOMER_NAME", "TOTAL_AMOUNT", "_VERSION"];

fn engine(config: DiscoveryConfig) -> DiscoveryEngine {
    DiscoveryEngine::new(config).unwrap()
}

fn with_noise(table: TableDefinition) -> TableDefinition {
    table
        .with_column(ColumnDefinition::new("created_at").data_type("TIMESTAMP_NTZ"))
        .with_column(ColumnDefinition::new("customer_name").data_type("VARCHAR"))
        .with_column(ColumnDefinition::new("total_amount").data_type("NUMBER(12,2)"))
        .with_column(ColumnDefinition::new("_version").data_type("NUMBER"))
}

#[test]
fn test_eligibility_rules() {
    let filter = EligibilityFilter::new(KeywordTables::standard());
    for name in EXCLUDED {
        let verdict = filter.check(&normalize_column(name), "NUMBER");
        assert!(!verdict.is_eligible(), "{} should be excluded, got {:?}", name, verdict);
    }
    for name in ["NAME_ID", "_ID", "ORDER_DATE_KEY", "_key"] {
        let verdict = filter.check(&normalize_column(name), "NUMBER");
        assert!(verdict.is_eligible(), "{} should stay eligible, got {:?}", name, verdict);
    }
    assert_eq!(
        filter.check(&normalize_column("updated_by"), "VARCHAR"),
        Eligibility::Excluded("audit")
    );
}

#[tokio::test]
async fn test_excluded_columns_never_join() {
    let tables = vec![
        with_noise(
            TableDefinition::new("ORDERS")
                .with_column(ColumnDefinition::new("order_id").primary_key(true))
                .with_column(ColumnDefinition::new("customer_id")),
        ),
        with_noise(
            TableDefinition::new("CUSTOMERS")
                .with_column(ColumnDefinition::new("customer_id").primary_key(true)),
        ),
    ];
    let result = engine(DiscoveryConfig::default()).discover(tables).await;

    assert_eq!(result.relationships.len(), 1, "{:?}", result.relationships);
    for rel in &result.relationships {
        for pair in &rel.column_pairs {
            for column in [&pair.left_column, &pair.right_column] {
                assert!(
                    !EXCLUDED.contains(&column.to_uppercase().as_str()),
                    "{} joined on excluded column {}",
                    rel.name,
                    column
                );
            }
        }
    }
}

#[tokio::test]
async fn test_role_qualified_date_key() {
    let tables = vec![
        TableDefinition::new("FACT_SALES")
            .with_column(ColumnDefinition::new("sale_id").primary_key(true))
            .with_column(ColumnDefinition::new("order_date_key").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("amount").data_type("NUMBER")),
        TableDefinition::new("DIM_DATE")
            .with_column(ColumnDefinition::new("date_key").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("calendar_month").data_type("NUMBER")),
    ];
    let result = engine(DiscoveryConfig::default()).discover(tables).await;

    let rel = result.find("FACT_SALES", "DIM_DATE").expect("fact references date dimension");
    assert_eq!(rel.name, "FACT_SALES_TO_DIM_DATE");
    assert_eq!(rel.left_columns(), vec!["order_date_key"]);
    assert_eq!(rel.right_columns(), vec!["date_key"]);
    assert!(rel.evidence.iter().any(|e| e.contains("time dimension")));
}

#[tokio::test]
async fn test_custom_exclusion_pattern() {
    let tables = vec![
        TableDefinition::new("ORDERS")
            .with_column(ColumnDefinition::new("order_id").primary_key(true))
            .with_column(ColumnDefinition::new("legacy_customer_id")),
        TableDefinition::new("CUSTOMERS")
            .with_column(ColumnDefinition::new("customer_id").primary_key(true)),
    ];

    let baseline = engine(DiscoveryConfig::default()).discover(tables.clone()).await;
    assert!(baseline.links("ORDERS", "CUSTOMERS"), "role-qualified key is found by default");

    let config = DiscoveryConfig::default().with_exclusion("^legacy_");
    let excluded = engine(config).discover(tables).await;
    assert!(excluded.relationships.is_empty(), "{:?}", excluded.relationships);
}

#[test]
fn test_invalid_exclusion_rejected() {
    let config = DiscoveryConfig::default().with_exclusion("([unclosed");
    assert!(DiscoveryEngine::new(config).is_err());
}
