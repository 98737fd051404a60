use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relmap::catalog::{ColumnDefinition, TableDefinition};
use relmap::config::DiscoveryConfig;
use relmap::discovery::{DiscoveryEngine, NullProbe};
use relmap::error::ProbeError;
use relmap::model::QualifiedName;
use relmap::{JoinType, SampleValue};

/// Probe that reports NULLs for a fixed set of columns and counts calls.
struct FakeProbe {
    nullable: Vec<&'static str>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String)>>,
    delay: Duration,
    fail: bool,
}

impl FakeProbe {
    fn new(nullable: Vec<&'static str>) -> Self {
        Self {
            nullable,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NullProbe for FakeProbe {
    async fn has_nulls(&self, table: &QualifiedName, column: &str) -> Result<bool, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((table.table.clone(), column.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProbeError::Failed("warehouse unavailable".to_string()));
        }
        Ok(self.nullable.contains(&column))
    }
}

fn strict() -> DiscoveryConfig {
    DiscoveryConfig::default().with_strict_join_inference(true)
}

fn orders_and_customers() -> Vec<TableDefinition> {
    vec![
        TableDefinition::new("ORDERS")
            .with_column(ColumnDefinition::new("order_id").primary_key(true))
            .with_column(ColumnDefinition::new("customer_id"))
            .with_column(ColumnDefinition::new("store_id")),
        TableDefinition::new("CUSTOMERS")
            .with_column(ColumnDefinition::new("customer_id").primary_key(true)),
        TableDefinition::new("STORES")
            .with_column(ColumnDefinition::new("store_id").primary_key(true)),
    ]
}

#[tokio::test]
async fn test_sampled_nulls_make_left_outer() {
    let tables = vec![
        TableDefinition::new("ORDERS")
            .with_column(ColumnDefinition::new("order_id").primary_key(true))
            .with_column(ColumnDefinition::new("promo_code").samples([
                SampleValue::text("SPRING"),
                SampleValue::Null,
                SampleValue::text(" n/a "),
            ])),
        TableDefinition::new("PROMOTIONS")
            .with_column(ColumnDefinition::new("code").primary_key(true))
            .with_column(ColumnDefinition::new("description")),
    ];
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result = engine.discover(tables).await;

    let rel = result.find("ORDERS", "PROMOTIONS").expect("ORDERS -> PROMOTIONS");
    assert_eq!(rel.left_columns(), vec!["promo_code"]);
    assert_eq!(rel.right_columns(), vec!["code"]);
    assert_eq!(rel.join_type, JoinType::LeftOuter);
    assert!(rel.evidence.iter().any(|e| e.contains("sampled NULLs in ORDERS.promo_code")));
}

#[tokio::test]
async fn test_optional_table_name_makes_left_outer() {
    let tables = vec![
        TableDefinition::new("SALES")
            .with_column(ColumnDefinition::new("sale_id").primary_key(true))
            .with_column(ColumnDefinition::new("coupon_id").samples(["C1", "C2"])),
        TableDefinition::new("COUPONS")
            .with_column(ColumnDefinition::new("coupon_id").primary_key(true)),
    ];
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result = engine.discover(tables).await;

    let rel = result.find("SALES", "COUPONS").expect("SALES -> COUPONS");
    assert_eq!(rel.join_type, JoinType::LeftOuter);
}

#[tokio::test]
async fn test_default_is_inner() {
    let engine = DiscoveryEngine::new(DiscoveryConfig::default()).unwrap();
    let result = engine.discover(orders_and_customers()).await;

    assert_eq!(result.relationships.len(), 2);
    assert!(result.relationships.iter().all(|r| r.join_type == JoinType::Inner));
}

#[tokio::test]
async fn test_probe_ignored_without_strict_mode() {
    let probe = Arc::new(FakeProbe::new(vec!["customer_id"]));
    let engine = DiscoveryEngine::new(DiscoveryConfig::default())
        .unwrap()
        .with_probe(probe.clone());
    let result = engine.discover(orders_and_customers()).await;

    assert_eq!(probe.calls(), 0);
    assert!(result.relationships.iter().all(|r| r.join_type == JoinType::Inner));
}

#[tokio::test]
async fn test_strict_probe_forces_left_outer() {
    let probe = Arc::new(FakeProbe::new(vec!["customer_id"]));
    let engine = DiscoveryEngine::new(strict()).unwrap().with_probe(probe.clone());
    let result = engine.discover(orders_and_customers()).await;

    let customers = result.find("ORDERS", "CUSTOMERS").unwrap();
    let stores = result.find("ORDERS", "STORES").unwrap();
    assert_eq!(customers.join_type, JoinType::LeftOuter);
    assert!(customers.evidence.iter().any(|e| e.contains("NULLs found by probe")));
    assert_eq!(stores.join_type, JoinType::Inner);
    assert_eq!(probe.calls(), 2);
}

#[tokio::test]
async fn test_probe_memoized_per_run() {
    let tables = vec![
        TableDefinition::new("LINEITEM")
            .with_column(ColumnDefinition::new("part_key"))
            .with_column(ColumnDefinition::new("comment")),
        TableDefinition::new("PART")
            .with_column(ColumnDefinition::new("part_key").primary_key(true)),
        TableDefinition::new("PARTSUPP")
            .with_column(ColumnDefinition::new("part_key").primary_key(true))
            .with_column(ColumnDefinition::new("supp_key").primary_key(true)),
    ];
    let probe = Arc::new(FakeProbe::new(vec![]));
    let engine = DiscoveryEngine::new(strict()).unwrap().with_probe(probe.clone());

    let result = engine.discover(tables.clone()).await;
    assert!(result.find("LINEITEM", "PART").is_some());
    assert!(result.find("LINEITEM", "PARTSUPP").is_some());

    let seen = probe.seen.lock().unwrap().clone();
    let lineitem_probes = seen
        .iter()
        .filter(|(t, c)| t == "LINEITEM" && c == "part_key")
        .count();
    assert_eq!(lineitem_probes, 1, "one probe for a column shared by two relationships");

    let first_run = probe.calls();
    engine.discover(tables).await;
    assert_eq!(probe.calls(), first_run * 2, "the cache does not outlive a run");
}

#[tokio::test]
async fn test_sampled_null_skips_probe() {
    let tables = vec![
        TableDefinition::new("ORDERS")
            .with_column(ColumnDefinition::new("order_id").primary_key(true))
            .with_column(ColumnDefinition::new("customer_id").samples(["7", "NULL"])),
        TableDefinition::new("CUSTOMERS")
            .with_column(ColumnDefinition::new("customer_id").primary_key(true)),
    ];
    let probe = Arc::new(FakeProbe::new(vec![]));
    let engine = DiscoveryEngine::new(strict()).unwrap().with_probe(probe.clone());
    let result = engine.discover(tables).await;

    assert_eq!(result.relationships[0].join_type, JoinType::LeftOuter);
    assert_eq!(probe.calls(), 0, "samples already decided the join");
}

#[tokio::test]
async fn test_failed_probe_falls_back() {
    let mut failing = FakeProbe::new(vec!["customer_id"]);
    failing.fail = true;
    let engine = DiscoveryEngine::new(strict())
        .unwrap()
        .with_probe(Arc::new(failing));
    let result = engine.discover(orders_and_customers()).await;

    assert_eq!(result.relationships.len(), 2);
    assert!(result.relationships.iter().all(|r| r.join_type == JoinType::Inner));
}

#[tokio::test]
async fn test_slow_probe_times_out() {
    let mut slow = FakeProbe::new(vec!["customer_id"]);
    slow.delay = Duration::from_secs(10);
    let config = strict().with_probe_timeout_secs(0.05);
    let engine = DiscoveryEngine::new(config).unwrap().with_probe(Arc::new(slow));
    let result = engine.discover(orders_and_customers()).await;

    assert_eq!(result.relationships.len(), 2);
    assert!(result.relationships.iter().all(|r| r.join_type == JoinType::Inner));
    assert!(!result.summary.limited_by_timeout);
}
