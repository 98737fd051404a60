use relmap::catalog::{ColumnDefinition, TableDefinition};
use relmap::config::DiscoveryConfig;
use relmap::discovery::DiscoveryEngine;
use relmap::Cardinality;

fn engine() -> DiscoveryEngine {
    DiscoveryEngine::new(DiscoveryConfig::default()).unwrap()
}

fn assert_bridge_shape(result: &relmap::DiscoveryResult) {
    assert_eq!(result.relationships.len(), 2, "{:?}", result.relationships);
    for rel in &result.relationships {
        assert_eq!(rel.left_table, "ENROLLMENTS", "bridge is always the referencing side");
        assert_eq!(rel.cardinality, Cardinality::MANY_TO_ONE);
        assert!(!rel.cardinality.is_many_to_many());
    }
    assert!(result.find("ENROLLMENTS", "STUDENTS").is_some());
    assert!(result.find("ENROLLMENTS", "COURSES").is_some());
    assert!(
        !result.links("STUDENTS", "COURSES"),
        "no direct edge between the dimensions"
    );
}

#[tokio::test]
async fn test_bridge_with_declared_keys() {
    let tables = vec![
        TableDefinition::new("STUDENTS")
            .with_column(ColumnDefinition::new("student_id").primary_key(true))
            .with_column(ColumnDefinition::new("student_name")),
        TableDefinition::new("COURSES")
            .with_column(ColumnDefinition::new("course_id").primary_key(true))
            .with_column(ColumnDefinition::new("title")),
        TableDefinition::new("ENROLLMENTS")
            .with_column(ColumnDefinition::new("student_id"))
            .with_column(ColumnDefinition::new("course_id")),
    ];
    let result = engine().discover(tables).await;
    assert_bridge_shape(&result);
}

#[tokio::test]
async fn test_bridge_with_bare_ids() {
    let tables = vec![
        TableDefinition::new("STUDENTS")
            .with_column(ColumnDefinition::new("id"))
            .with_column(ColumnDefinition::new("full_name")),
        TableDefinition::new("COURSES")
            .with_column(ColumnDefinition::new("id"))
            .with_column(ColumnDefinition::new("title")),
        TableDefinition::new("ENROLLMENTS")
            .with_column(ColumnDefinition::new("student_id"))
            .with_column(ColumnDefinition::new("course_id")),
    ];
    let result = engine().discover(tables).await;
    assert_bridge_shape(&result);

    let rel = result.find("ENROLLMENTS", "STUDENTS").unwrap();
    assert_eq!(rel.right_columns(), vec!["id"]);
    assert!(rel.evidence.iter().any(|e| e.starts_with("name: fk_pattern student_id = id")));
}

#[tokio::test]
async fn test_bridge_listed_first() {
    let tables = vec![
        TableDefinition::new("ENROLLMENTS")
            .with_column(ColumnDefinition::new("student_id"))
            .with_column(ColumnDefinition::new("course_id")),
        TableDefinition::new("COURSES")
            .with_column(ColumnDefinition::new("course_id").primary_key(true)),
        TableDefinition::new("STUDENTS")
            .with_column(ColumnDefinition::new("student_id").primary_key(true)),
    ];
    let result = engine().discover(tables).await;
    assert_bridge_shape(&result);
}
