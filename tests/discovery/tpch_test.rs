use relmap::catalog::{ColumnDefinition, TableDefinition};
use relmap::config::DiscoveryConfig;
use relmap::discovery::DiscoveryEngine;
use relmap::{Cardinality, JoinType};

fn engine() -> DiscoveryEngine {
    DiscoveryEngine::new(DiscoveryConfig::default()).unwrap()
}

fn table(name: &str, columns: &[(&str, &str)]) -> TableDefinition {
    columns.iter().fold(TableDefinition::new(name), |t, (col, ty)| {
        t.with_column(ColumnDefinition::new(*col).data_type(*ty))
    })
}

/// TPC-H without key metadata: every key comes from naming alone.
fn tpch_heuristic() -> Vec<TableDefinition> {
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
        table("PART", &[("p_partkey", "NUMBER"), ("p_name", "VARCHAR")]),
        table(
            "ORDERS",
            &[
                ("o_orderkey", "NUMBER"),
                ("o_custkey", "NUMBER"),
                ("o_orderdate", "DATE"),
                ("o_comment", "VARCHAR"),
            ],
        ),
        table(
            "LINEITEM",
            &[
                ("l_orderkey", "NUMBER"),
                ("l_partkey", "NUMBER"),
                ("l_suppkey", "NUMBER"),
                ("l_linenumber", "NUMBER"),
                ("l_quantity", "NUMBER(12,2)"),
                ("l_comment", "VARCHAR"),
            ],
        ),
    ]
}

#[tokio::test]
async fn test_tpch_naming_heuristics() {
    let result = engine().discover(tpch_heuristic()).await;

    let expected = [
        ("ORDERS", "CUSTOMER", "o_custkey", "c_custkey"),
        ("CUSTOMER", "NATION", "c_nationkey", "n_nationkey"),
        ("SUPPLIER", "NATION", "s_nationkey", "n_nationkey"),
        ("NATION", "REGION", "n_regionkey", "r_regionkey"),
        ("LINEITEM", "ORDERS", "l_orderkey", "o_orderkey"),
        ("LINEITEM", "PART", "l_partkey", "p_partkey"),
        ("LINEITEM", "SUPPLIER", "l_suppkey", "s_suppkey"),
    ];
    for (left, right, fk, pk) in expected {
        let rel = result
            .find(left, right)
            .unwrap_or_else(|| panic!("missing {} -> {}", left, right));
        assert_eq!(rel.left_columns(), vec![fk]);
        assert_eq!(rel.right_columns(), vec![pk]);
        assert_eq!(rel.cardinality, Cardinality::MANY_TO_ONE, "{}", rel.name);
        assert_eq!(rel.join_type, JoinType::Inner, "{}", rel.name);
    }
    assert_eq!(result.relationships.len(), expected.len());
}

#[tokio::test]
async fn test_tpch_scores_are_explained() {
    let result = engine().discover(tpch_heuristic()).await;

    let orders = result.find("ORDERS", "CUSTOMER").unwrap();
    // key by naming + direct alias match + exact type + dimension role + customer family
    assert!((orders.confidence_score - 0.835).abs() < 1e-9, "got {}", orders.confidence_score);
    assert!(orders
        .evidence
        .iter()
        .any(|e| e.starts_with("primary key: primary key by naming on CUSTOMER.c_custkey")));
    assert!(orders
        .evidence
        .iter()
        .any(|e| e == "cardinality assumed from key naming"));
}

#[tokio::test]
async fn test_tpch_ordered_by_confidence() {
    let result = engine().discover(tpch_heuristic()).await;

    let scores: Vec<f64> = result.relationships.iter().map(|r| r.confidence_score).collect();
    for window in scores.windows(2) {
        assert!(window[0] >= window[1], "not sorted: {:?}", scores);
    }
}

#[tokio::test]
async fn test_name_collision_guard() {
    let tables = vec![
        TableDefinition::new("CUSTOMER")
            .with_column(ColumnDefinition::new("c_custkey").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("C_NAME").data_type("VARCHAR")),
        TableDefinition::new("PART")
            .with_column(ColumnDefinition::new("p_partkey").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("P_NAME").data_type("VARCHAR")),
    ];
    let result = engine().discover(tables).await;

    assert!(
        !result.links("CUSTOMER", "PART"),
        "shared NAME columns are not a relationship: {:?}",
        result.relationships
    );
}

#[tokio::test]
async fn test_tie_keeps_both_referenced_tables() {
    let tables = vec![
        TableDefinition::new("LINEITEM")
            .with_column(ColumnDefinition::new("part_key").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("line_number").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("quantity").data_type("NUMBER"))
            .with_column(ColumnDefinition::new("comment").data_type("VARCHAR")),
        TableDefinition::new("PART")
            .with_column(ColumnDefinition::new("part_key").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("p_name").data_type("VARCHAR")),
        TableDefinition::new("PARTSUPP")
            .with_column(ColumnDefinition::new("part_key").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("supp_key").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("supply_cost").data_type("NUMBER")),
    ];
    let result = engine().discover(tables).await;

    let to_part = result.find("LINEITEM", "PART").expect("LINEITEM -> PART");
    let to_partsupp = result.find("LINEITEM", "PARTSUPP").expect("LINEITEM -> PARTSUPP");
    assert_eq!(to_part.left_columns(), vec!["part_key"]);
    assert_eq!(to_partsupp.left_columns(), vec!["part_key"]);
    assert_eq!(to_partsupp.cardinality, Cardinality::MANY_TO_ONE);
    assert!(result.find("PARTSUPP", "PART").is_some(), "composite member references PART");
}

#[tokio::test]
async fn test_composite_key_grouped() {
    let tables = vec![
        table(
            "LINEITEM",
            &[
                ("l_orderkey", "NUMBER"),
                ("l_partkey", "NUMBER"),
                ("l_suppkey", "NUMBER"),
                ("l_quantity", "NUMBER"),
                ("l_comment", "VARCHAR"),
            ],
        ),
        TableDefinition::new("PART")
            .with_column(ColumnDefinition::new("p_partkey").data_type("NUMBER").primary_key(true)),
        TableDefinition::new("SUPPLIER")
            .with_column(ColumnDefinition::new("s_suppkey").data_type("NUMBER").primary_key(true)),
        TableDefinition::new("PARTSUPP")
            .with_column(ColumnDefinition::new("ps_partkey").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("ps_suppkey").data_type("NUMBER").primary_key(true))
            .with_column(ColumnDefinition::new("ps_comment").data_type("VARCHAR")),
    ];
    let result = engine().discover(tables).await;

    let composite = result.find("LINEITEM", "PARTSUPP").expect("LINEITEM -> PARTSUPP");
    assert_eq!(composite.left_columns(), vec!["l_partkey", "l_suppkey"]);
    assert_eq!(composite.right_columns(), vec!["ps_partkey", "ps_suppkey"]);
    assert_eq!(composite.cardinality, Cardinality::MANY_TO_ONE);

    assert!(result.find("LINEITEM", "PART").is_some());
    assert!(result.find("LINEITEM", "SUPPLIER").is_some());
    assert!(result.find("PARTSUPP", "PART").is_some());
    assert!(result.find("PARTSUPP", "SUPPLIER").is_some());
    assert!(result
        .relationships
        .iter()
        .all(|r| !r.cardinality.is_many_to_many()));
}

#[tokio::test]
async fn test_tpch_rendered_names() {
    let result = engine().discover(tpch_heuristic()).await;

    let mut lines: Vec<String> = result
        .relationships
        .iter()
        .map(|r| format!("{} {} {}", r.name, r.cardinality, r.join_type))
        .collect();
    lines.sort();
    insta::assert_snapshot!(lines.join("\n"), @r"
    CUSTOMER_TO_NATION many_to_one inner
    LINEITEM_TO_ORDERS many_to_one inner
    LINEITEM_TO_PART many_to_one inner
    LINEITEM_TO_SUPPLIER many_to_one inner
    NATION_TO_REGION many_to_one inner
    ORDERS_TO_CUSTOMER many_to_one inner
    SUPPLIER_TO_NATION many_to_one inner
    ");
}
