//! Join-type resolution.
//!
//! Decision order, first match wins:
//!
//! 1. the referencing side is `many` and one of its first sampled values
//!    is null-like -> `left_outer`
//! 2. strict mode only: the injected [`NullProbe`] reports a NULL ->
//!    `left_outer`
//! 3. the referenced table's name carries an optional-relationship keyword
//!    (`PROMO`, `COUPON`, ...) -> `left_outer`
//! 4. otherwise `inner`
//!
//! Steps 1 and 3 are synchronous. The probe runs only for relationships
//! still `inner` after them, once per `(table, column)` per run, with
//! every call bounded by a timeout. A probe that fails or times out counts
//! as no evidence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::keywords::KeywordTables;
use super::orientation::CandidateGroup;
use super::thresholds::sampling;
use crate::error::ProbeError;
use crate::model::{JoinType, QualifiedName, Side, TableDescriptor};

/// Reports whether a column holds any NULL.
///
/// Implemented by the caller, typically with a targeted existence query.
/// The engine never issues queries itself.
#[async_trait]
pub trait NullProbe: Send + Sync {
    async fn has_nulls(&self, table: &QualifiedName, column: &str) -> Result<bool, ProbeError>;
}

/// Identifies a probed column.
pub type ProbeKey = (QualifiedName, String);

/// Per-run memo of probe results.
///
/// `None` records a probe that failed or timed out; it is not retried.
pub struct ProbeCache {
    probe: Arc<dyn NullProbe>,
    timeout: Duration,
    workers: usize,
    results: HashMap<ProbeKey, Option<bool>>,
}

impl ProbeCache {
    pub fn new(probe: Arc<dyn NullProbe>, timeout: Duration, workers: usize) -> Self {
        Self {
            probe,
            timeout,
            workers: workers.max(1),
            results: HashMap::new(),
        }
    }

    /// Probe every key not seen yet, at most `workers` at a time.
    pub async fn prefetch(&mut self, keys: impl IntoIterator<Item = ProbeKey>) {
        let mut pending: Vec<ProbeKey> = keys
            .into_iter()
            .filter(|k| !self.results.contains_key(k))
            .collect();
        pending.sort();
        pending.dedup();
        if pending.is_empty() {
            return;
        }

        let probe = Arc::clone(&self.probe);
        let timeout = self.timeout;
        let outcomes: Vec<(ProbeKey, Option<bool>)> = stream::iter(pending)
            .map(|key| {
                let probe = Arc::clone(&probe);
                async move {
                    let outcome = run_probe(probe.as_ref(), &key, timeout).await;
                    (key, outcome)
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        self.results.extend(outcomes);
    }

    /// Memoized result: `Some(true)` when the column has NULLs.
    pub fn lookup(&self, key: &ProbeKey) -> Option<bool> {
        self.results.get(key).copied().flatten()
    }

    /// Number of distinct columns probed so far.
    pub fn probed(&self) -> usize {
        self.results.len()
    }
}

async fn run_probe(probe: &dyn NullProbe, key: &ProbeKey, timeout: Duration) -> Option<bool> {
    let (table, column) = key;
    let result = match tokio::time::timeout(timeout, probe.has_nulls(table, column)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout.as_millis() as u64)),
    };
    match result {
        Ok(has_nulls) => {
            debug!(table = %table, column = %column, has_nulls, "null probe");
            Some(has_nulls)
        }
        Err(e) => {
            warn!(table = %table, column = %column, error = %e, "null probe unavailable, using heuristics");
            None
        }
    }
}

/// Outcome of join-type resolution with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDecision {
    pub join_type: JoinType,
    pub reason: String,
}

impl JoinDecision {
    fn inner() -> Self {
        Self {
            join_type: JoinType::Inner,
            reason: "no evidence of missing references".to_string(),
        }
    }

    fn left_outer(reason: String) -> Self {
        Self {
            join_type: JoinType::LeftOuter,
            reason,
        }
    }
}

/// The synchronous steps (sampled nulls, optional-table naming).
pub fn resolve_sync(
    keywords: &KeywordTables,
    tables: &[TableDescriptor],
    group: &CandidateGroup,
    fk_side: Side,
) -> JoinDecision {
    let fk = &tables[group.fk_table];
    let pk = &tables[group.pk_table];

    if fk_side == Side::Many {
        for col in group.fk_columns() {
            let column = &fk.columns[col];
            let has_null = column.sample_values.as_deref().is_some_and(|samples| {
                samples
                    .iter()
                    .take(sampling::NULL_SCAN_LIMIT)
                    .any(|v| v.is_null_like())
            });
            if has_null {
                return JoinDecision::left_outer(format!(
                    "sampled NULLs in {}.{}",
                    fk.name(),
                    column.raw_name
                ));
            }
        }
    }

    if let Some(keyword) = optional_keyword(keywords, pk) {
        return JoinDecision::left_outer(format!(
            "{} looks optional ({})",
            pk.name(),
            keyword
        ));
    }

    JoinDecision::inner()
}

fn optional_keyword(keywords: &KeywordTables, table: &TableDescriptor) -> Option<&'static str> {
    let tokens = crate::discovery::normalize::tokenize(table.name());
    keywords
        .optional_relationship
        .iter()
        .copied()
        .find(|kw| tokens.iter().any(|t| t.starts_with(kw)))
}

/// Probe keys for the referencing columns of a group.
pub fn probe_keys(tables: &[TableDescriptor], group: &CandidateGroup) -> Vec<ProbeKey> {
    let fk = &tables[group.fk_table];
    group
        .fk_columns()
        .into_iter()
        .map(|c| (fk.qualified_name.clone(), fk.columns[c].raw_name.clone()))
        .collect()
}

/// Apply memoized probe results to a synchronous `inner` decision.
pub fn apply_probe(
    cache: &ProbeCache,
    tables: &[TableDescriptor],
    group: &CandidateGroup,
    decision: JoinDecision,
) -> JoinDecision {
    if decision.join_type != JoinType::Inner {
        return decision;
    }
    for key in probe_keys(tables, group) {
        if cache.lookup(&key) == Some(true) {
            return JoinDecision::left_outer(format!("NULLs found by probe in {}.{}", key.0.table, key.1));
        }
    }
    decision
}
