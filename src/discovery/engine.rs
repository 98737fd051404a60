//! Discovery run driver.
//!
//! Ingests definitions, runs matching, orientation and evidence passes in
//! order, and applies the guardrails. The wall-clock deadline is checked
//! before every ordered table pair and every candidate group, so a run that
//! hits it still returns everything resolved so far.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use super::cardinality::{AdaptiveThresholds, CardinalityAnalyzer, CardinalityDecision, SchemaStatistics};
use super::eligibility::EligibilityFilter;
use super::join_type::{apply_probe, probe_keys, resolve_sync, JoinDecision, NullProbe, ProbeCache};
use super::keywords::KeywordTables;
use super::matcher::{keep_ties, PairMatcher};
use super::normalize::{normalize_column, normalize_table};
use super::orientation::{dedup_groups, dedup_relationships, group_composites, orient, CandidateGroup};
use super::roles::TableClassifier;
use super::scoring::{ConfidenceScore, ConfidenceScorer};
use super::types::base_type;
use crate::catalog::{parse_table_definitions, TableDefinition};
use crate::config::DiscoveryConfig;
use crate::error::{DefinitionError, RelmapResult};
use crate::model::{
    ColumnDescriptor, ColumnPair, DiscoveryResult, DiscoverySummary, JoinType, QualifiedName,
    Relationship, TableDescriptor,
};

/// Infers relationships between tables.
///
/// Holds only configuration; every call to [`discover`](Self::discover)
/// starts from scratch, so repeated calls with the same input agree.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    keywords: &'static KeywordTables,
    exclusions: Vec<Regex>,
    probe: Option<Arc<dyn NullProbe>>,
}

impl std::fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("config", &self.config)
            .field("has_probe", &self.probe.is_some())
            .finish()
    }
}

/// A group that survived evidence checks, waiting for its join type.
struct Resolved {
    group: CandidateGroup,
    cardinality: CardinalityDecision,
    confidence: ConfidenceScore,
    join: JoinDecision,
}

/// Guardrail flags and notes collected during a run.
#[derive(Default)]
struct RunLog {
    notes: Vec<String>,
    limited_by_timeout: bool,
    limited_by_table_cap: bool,
}

impl DiscoveryEngine {
    /// Create an engine, rejecting invalid configuration.
    pub fn new(config: DiscoveryConfig) -> RelmapResult<Self> {
        config.validate()?;
        let exclusions = config.compiled_exclusions()?;
        Ok(Self {
            config,
            keywords: KeywordTables::standard(),
            exclusions,
            probe: None,
        })
    }

    /// Inject the NULL probe used in strict join inference.
    pub fn with_probe(mut self, probe: Arc<dyn NullProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover relationships among pre-assembled table definitions.
    pub async fn discover(&self, definitions: Vec<TableDefinition>) -> DiscoveryResult {
        self.run(definitions, Vec::new()).await
    }

    /// Parse a loose JSON payload and discover relationships. Rejected
    /// entries appear in the summary notes.
    pub async fn discover_definitions(&self, payload: &Value) -> DiscoveryResult {
        let (definitions, notes) = parse_table_definitions(payload);
        self.run(definitions, notes).await
    }

    async fn run(&self, definitions: Vec<TableDefinition>, notes: Vec<String>) -> DiscoveryResult {
        let span = info_span!("discovery", tables = definitions.len());
        self.run_inner(definitions, notes).instrument(span).await
    }

    async fn run_inner(&self, mut definitions: Vec<TableDefinition>, notes: Vec<String>) -> DiscoveryResult {
        let started = Instant::now();
        let deadline = self.config.timeout().map(|t| started + t);
        let mut log = RunLog {
            notes,
            ..Default::default()
        };

        if let Some(max) = self.config.max_tables {
            if definitions.len() > max {
                log.notes.push(format!(
                    "Input contained {} tables; analysis limited to first {}.",
                    definitions.len(),
                    max
                ));
                definitions.truncate(max);
                log.limited_by_table_cap = true;
                debug!(max_tables = max, "table cap reached");
            }
        }

        let tables = self.ingest(definitions, &mut log.notes);
        let total_columns = tables.iter().map(|t| t.columns.len()).sum();

        let relationships = if expired(deadline) {
            debug!("timeout before analysis");
            log.limited_by_timeout = true;
            Vec::new()
        } else {
            self.analyze(&tables, deadline, &mut log).await
        };

        let (relationships, limited_by_max) = self.finish(relationships);

        let summary = DiscoverySummary {
            total_tables: tables.len(),
            total_columns,
            total_relationships_found: relationships.len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            limited_by_timeout: log.limited_by_timeout,
            limited_by_max_relationships: limited_by_max,
            limited_by_table_cap: log.limited_by_table_cap,
            notes: (!log.notes.is_empty()).then(|| log.notes.join("; ")),
        };
        info!(
            tables = summary.total_tables,
            columns = summary.total_columns,
            relationships = summary.total_relationships_found,
            elapsed_ms = summary.processing_time_ms,
            limited_by_timeout = summary.limited_by_timeout,
            "discovery complete"
        );
        DiscoveryResult {
            relationships,
            summary,
        }
    }

    /// Turn definitions into classified descriptors, rejecting malformed
    /// tables and columns one at a time.
    fn ingest(&self, definitions: Vec<TableDefinition>, notes: &mut Vec<String>) -> Vec<TableDescriptor> {
        let filter = EligibilityFilter::new(self.keywords).with_exclusions(self.exclusions.clone());
        let classifier = TableClassifier::new(self.keywords, &filter);
        let mut seen: HashSet<QualifiedName> = HashSet::new();
        let mut tables = Vec::new();

        for (index, definition) in definitions.into_iter().enumerate() {
            let (qualified_name, columns) = match ingest_table(index, definition, notes) {
                Ok(ingested) => ingested,
                Err(e) => {
                    warn!(index, error = %e, "rejected table");
                    notes.push(e.to_string());
                    continue;
                }
            };
            if !seen.insert(qualified_name.clone()) {
                notes.push(DefinitionError::DuplicateTable(qualified_name.to_string()).to_string());
                continue;
            }
            let normalized = normalize_table(&qualified_name.table, self.keywords);
            tables.push(classifier.classify(qualified_name, normalized, columns));
        }
        tables
    }

    async fn analyze(
        &self,
        tables: &[TableDescriptor],
        deadline: Option<Instant>,
        log: &mut RunLog,
    ) -> Vec<Relationship> {
        let baseline = &self.config.thresholds;
        let stats = SchemaStatistics::collect(tables);
        let thresholds = AdaptiveThresholds::compute(&stats, baseline);
        for adjustment in &thresholds.adjustments {
            debug!(%adjustment, "adaptive threshold");
        }

        let matcher = PairMatcher::new(self.keywords, baseline, &thresholds);
        let mut candidates = Vec::new();
        'scan: for left in 0..tables.len() {
            for right in 0..tables.len() {
                if left == right || tables[left].name() == tables[right].name() {
                    continue;
                }
                if expired(deadline) {
                    debug!("timeout during matching");
                    log.limited_by_timeout = true;
                    break 'scan;
                }
                candidates.extend(matcher.scan(tables, left, right));
            }
        }
        let candidates = keep_ties(candidates);

        let oriented: Vec<_> = candidates.iter().filter_map(|c| orient(tables, c)).collect();
        let groups = dedup_groups(tables, group_composites(tables, oriented));
        trace!(groups = groups.len(), "candidate groups");

        let analyzer = CardinalityAnalyzer::new(&thresholds);
        let scorer = ConfidenceScorer::new(self.keywords, baseline, &thresholds);
        let mut resolved = Vec::new();
        for group in groups {
            if expired(deadline) {
                debug!("timeout during evidence resolution");
                log.limited_by_timeout = true;
                break;
            }
            if let Some(r) = self.resolve(tables, group, &analyzer, &scorer) {
                resolved.push(r);
            }
        }

        if self.config.strict_join_inference {
            self.probe_joins(tables, &mut resolved, deadline, log).await;
        }

        resolved
            .into_iter()
            .map(|r| build_relationship(tables, r, &thresholds))
            .collect()
    }

    fn resolve(
        &self,
        tables: &[TableDescriptor],
        group: CandidateGroup,
        analyzer: &CardinalityAnalyzer<'_>,
        scorer: &ConfidenceScorer<'_>,
    ) -> Option<Resolved> {
        let (fk, pk) = (&tables[group.fk_table], &tables[group.pk_table]);
        let Some(cardinality) =
            analyzer.resolve(fk, &group.fk_columns(), pk, &group.pk_columns())
        else {
            trace!(fk = %fk.name(), pk = %pk.name(), "no side provably one, dropped");
            return None;
        };
        let group = if cardinality.flipped { group.reversed() } else { group };

        let confidence = scorer.score(tables, &group, &cardinality);
        if confidence.score < self.config.min_confidence {
            trace!(
                fk = %tables[group.fk_table].name(),
                pk = %tables[group.pk_table].name(),
                score = confidence.score,
                "below min_confidence"
            );
            return None;
        }

        let join = resolve_sync(self.keywords, tables, &group, cardinality.cardinality.left);
        Some(Resolved {
            group,
            cardinality,
            confidence,
            join,
        })
    }

    /// Consult the NULL probe for relationships still `inner`.
    async fn probe_joins(
        &self,
        tables: &[TableDescriptor],
        resolved: &mut [Resolved],
        deadline: Option<Instant>,
        log: &mut RunLog,
    ) {
        let Some(probe) = &self.probe else {
            return;
        };
        let keys: Vec<_> = resolved
            .iter()
            .filter(|r| r.join.join_type == JoinType::Inner)
            .flat_map(|r| probe_keys(tables, &r.group))
            .collect();
        if keys.is_empty() {
            return;
        }

        let mut cache = ProbeCache::new(
            Arc::clone(probe),
            self.config.probe_timeout(),
            self.config.max_workers,
        );
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        match remaining {
            Some(remaining) if remaining == Duration::ZERO => {
                log.limited_by_timeout = true;
                return;
            }
            Some(remaining) => {
                if tokio::time::timeout(remaining, cache.prefetch(keys)).await.is_err() {
                    debug!("timeout during null probing");
                    log.limited_by_timeout = true;
                }
            }
            None => cache.prefetch(keys).await,
        }
        debug!(probed = cache.probed(), "null probes complete");

        for r in resolved.iter_mut() {
            let decision = std::mem::replace(
                &mut r.join,
                JoinDecision {
                    join_type: JoinType::Inner,
                    reason: String::new(),
                },
            );
            r.join = apply_probe(&cache, tables, &r.group, decision);
        }
    }

    /// Deduplicate, order, name and cap the output.
    fn finish(&self, relationships: Vec<Relationship>) -> (Vec<Relationship>, bool) {
        let mut relationships = dedup_relationships(relationships);
        relationships.sort_by(|a, b| {
            b.confidence_score
                .total_cmp(&a.confidence_score)
                .then_with(|| a.left_table.cmp(&b.left_table))
                .then_with(|| a.right_table.cmp(&b.right_table))
                .then_with(|| a.column_pairs.cmp(&b.column_pairs))
        });

        let mut per_pair: HashMap<(String, String), usize> = HashMap::new();
        for rel in &mut relationships {
            let seen = per_pair
                .entry((rel.left_table.clone(), rel.right_table.clone()))
                .or_default();
            rel.name = if *seen == 0 {
                format!("{}_TO_{}", rel.left_table, rel.right_table)
            } else {
                let columns: Vec<String> = rel.left_columns().iter().map(|c| c.to_uppercase()).collect();
                format!("{}_TO_{}_{}", rel.left_table, rel.right_table, columns.join("_"))
            };
            *seen += 1;
        }

        let mut limited = false;
        if let Some(max) = self.config.max_relationships {
            if relationships.len() > max {
                relationships.truncate(max);
                limited = true;
                debug!(max_relationships = max, "relationship cap reached");
            }
        }
        (relationships, limited)
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn ingest_table(
    index: usize,
    definition: TableDefinition,
    notes: &mut Vec<String>,
) -> Result<(QualifiedName, Vec<ColumnDescriptor>), DefinitionError> {
    if definition.name.trim().is_empty() {
        return Err(DefinitionError::MissingTableName { index });
    }
    let qualified_name = definition.qualified_name()?;
    let table = qualified_name.table.clone();

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(definition.columns.len());
    for (col_index, column) in definition.columns.into_iter().enumerate() {
        let raw_name = column.name.trim().to_string();
        if raw_name.is_empty() {
            notes.push(
                DefinitionError::MissingColumnName {
                    table: table.clone(),
                    index: col_index,
                }
                .to_string(),
            );
            continue;
        }
        if !seen.insert(raw_name.to_uppercase()) {
            notes.push(
                DefinitionError::DuplicateColumn {
                    table: table.clone(),
                    column: raw_name,
                }
                .to_string(),
            );
            continue;
        }
        columns.push(ColumnDescriptor {
            owning_table: table.clone(),
            normalized: normalize_column(&raw_name),
            raw_name,
            base_type: base_type(column.data_type.as_deref().unwrap_or_default()),
            is_primary_key: column.is_primary_key,
            sample_values: column.sample_values,
        });
    }

    if columns.is_empty() {
        return Err(DefinitionError::NoColumns(table));
    }
    Ok((qualified_name, columns))
}

fn build_relationship(
    tables: &[TableDescriptor],
    resolved: Resolved,
    thresholds: &AdaptiveThresholds,
) -> Relationship {
    let Resolved {
        group,
        cardinality,
        confidence,
        join,
    } = resolved;
    let (fk, pk) = (&tables[group.fk_table], &tables[group.pk_table]);

    let column_pairs = group
        .pairs
        .iter()
        .map(|p| ColumnPair {
            left_column: fk.columns[p.left_column].raw_name.clone(),
            right_column: pk.columns[p.right_column].raw_name.clone(),
        })
        .collect();

    let mut evidence = confidence.evidence();
    evidence.push(format!(
        "cardinality: {} ({} / {})",
        cardinality.cardinality, cardinality.left.evidence, cardinality.right.evidence
    ));
    if cardinality.assumed {
        evidence.push("cardinality assumed from key naming".to_string());
    }
    if !thresholds.adjustments.is_empty() {
        evidence.push(format!(
            "thresholds: min sample {}, uniqueness {:.2}",
            thresholds.min_sample_size, thresholds.uniqueness_ratio
        ));
    }
    evidence.push(format!("join: {} ({})", join.join_type, join.reason));

    Relationship {
        name: String::new(),
        left_table: fk.name().to_string(),
        right_table: pk.name().to_string(),
        column_pairs,
        cardinality: cardinality.cardinality,
        join_type: join.join_type,
        confidence_score: confidence.score,
        confidence_level: confidence.level,
        evidence,
    }
}
