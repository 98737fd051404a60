//! Orientation and deduplication.
//!
//! Bidirectional scanning finds most pairs twice, once from each side.
//! This pass turns every candidate so the foreign-key side is on the left,
//! merges pairs that together cover a declared composite key, and keeps
//! one group per column set between an ordered table pair.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use super::cardinality::{bridge_verdict, BridgeVerdict};
use crate::model::{CandidatePair, KeyRole, Relationship, TableDescriptor};

/// One or more oriented candidate pairs between the same two tables.
///
/// `pairs` all have `left_table == fk_table` and `right_table == pk_table`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGroup {
    pub fk_table: usize,
    pub pk_table: usize,
    pub pairs: Vec<CandidatePair>,
}

impl CandidateGroup {
    fn single(pair: CandidatePair) -> Self {
        Self {
            fk_table: pair.left_table,
            pk_table: pair.right_table,
            pairs: vec![pair],
        }
    }

    pub fn fk_columns(&self) -> Vec<usize> {
        self.pairs.iter().map(|p| p.left_column).collect()
    }

    pub fn pk_columns(&self) -> Vec<usize> {
        self.pairs.iter().map(|p| p.right_column).collect()
    }

    /// Mean raw score over the group's pairs.
    pub fn raw_score(&self) -> f64 {
        if self.pairs.is_empty() {
            return 0.0;
        }
        self.pairs.iter().map(|p| p.raw_score).sum::<f64>() / self.pairs.len() as f64
    }

    pub fn is_composite(&self) -> bool {
        self.pairs.len() > 1
    }

    /// Swap sides: the right table becomes the referencing side.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            fk_table: self.pk_table,
            pk_table: self.fk_table,
            pairs: self.pairs.iter().map(reverse_pair).collect(),
        }
    }

    fn column_set(&self) -> Vec<usize> {
        let mut cols = self.fk_columns();
        cols.sort_unstable();
        cols
    }
}

fn reverse_pair(pair: &CandidatePair) -> CandidatePair {
    CandidatePair {
        left_table: pair.right_table,
        left_column: pair.right_column,
        right_table: pair.left_table,
        right_column: pair.left_column,
        match_strategy: pair.match_strategy,
        raw_score: pair.raw_score,
    }
}

/// How strongly a column claims to be its table's key. Higher is the
/// referenced side.
///
/// A declared composite-key member that is named after another table
/// (`PARTSUPP.ps_partkey`) ranks below a heuristic key of the table it
/// names, so `PART` stays the referenced side.
pub fn key_rank(table: &TableDescriptor, column: usize) -> u8 {
    let foreign_shaped = table.key_shapes[column]
        .as_ref()
        .is_some_and(|s| s.is_foreign_shaped());
    match table.key_roles[column] {
        KeyRole::PrimaryKey { declared: true } if table.declared_key_width() == 1 => 8,
        KeyRole::PrimaryKey { declared: true } if !foreign_shaped => 6,
        KeyRole::PrimaryKey { declared: false } => 4,
        KeyRole::PrimaryKey { declared: true } => 3,
        KeyRole::ForeignKey => 2,
        KeyRole::Neither => 0,
    }
}

/// Orient a candidate so the foreign-key side is left.
///
/// Higher [`key_rank`] wins the referenced side. On equal rank, a column
/// whose name points at the other table is the referencing side; failing
/// that, the earlier input table references the later one. Returns `None`
/// when bridge rules forbid a direct edge.
pub fn orient(tables: &[TableDescriptor], pair: &CandidatePair) -> Option<CandidatePair> {
    let (lt, rt) = (&tables[pair.left_table], &tables[pair.right_table]);
    let left_rank = key_rank(lt, pair.left_column);
    let right_rank = key_rank(rt, pair.right_column);

    let keep = match left_rank.cmp(&right_rank) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => {
            let names = |t: &TableDescriptor, c: usize, other: &TableDescriptor| {
                t.key_shapes[c]
                    .as_ref()
                    .is_some_and(|s| s.names_table(&other.name_variants, true))
            };
            let left_points = names(lt, pair.left_column, rt);
            let right_points = names(rt, pair.right_column, lt);
            match (left_points, right_points) {
                (true, false) => true,
                (false, true) => false,
                _ => pair.left_table < pair.right_table,
            }
        }
    };
    let oriented = if keep { pair.clone() } else { reverse_pair(pair) };

    let (fk, pk) = (&tables[oriented.left_table], &tables[oriented.right_table]);
    match bridge_verdict(fk, oriented.left_column, pk, oriented.right_column) {
        BridgeVerdict::Keep => Some(oriented),
        BridgeVerdict::Flip => Some(reverse_pair(&oriented)),
        BridgeVerdict::Drop => {
            trace!(
                fk = %fk.name(),
                pk = %pk.name(),
                "no direct edge through bridge"
            );
            None
        }
    }
}

/// Merge oriented pairs into groups.
///
/// Pairs between the same tables whose referenced columns are distinct
/// members of the referenced table's declared composite key become one
/// multi-column group. A merge that would use a column twice is
/// contradictory and is dropped. Everything else stays single.
pub fn group_composites(tables: &[TableDescriptor], pairs: Vec<CandidatePair>) -> Vec<CandidateGroup> {
    let mut by_tables: BTreeMap<(usize, usize), Vec<CandidatePair>> = BTreeMap::new();
    for pair in pairs {
        by_tables
            .entry((pair.left_table, pair.right_table))
            .or_default()
            .push(pair);
    }

    let mut groups = Vec::new();
    for ((fk, pk), pairs) in by_tables {
        let pairs = dedup_pairs(pairs);
        let key_columns = tables[pk].declared_key_columns();
        if key_columns.len() < 2 {
            groups.extend(pairs.into_iter().map(CandidateGroup::single));
            continue;
        }

        let (members, others): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .partition(|p| key_columns.contains(&p.right_column));
        groups.extend(others.into_iter().map(CandidateGroup::single));

        let mut distinct_pk: Vec<usize> = members.iter().map(|p| p.right_column).collect();
        distinct_pk.sort_unstable();
        distinct_pk.dedup();
        if distinct_pk.len() < 2 {
            groups.extend(members.into_iter().map(CandidateGroup::single));
            continue;
        }

        let mut fk_cols: Vec<usize> = members.iter().map(|p| p.left_column).collect();
        fk_cols.sort_unstable();
        fk_cols.dedup();
        if fk_cols.len() != members.len() || distinct_pk.len() != members.len() {
            trace!(
                fk = %tables[fk].name(),
                pk = %tables[pk].name(),
                "contradictory composite key mapping dropped"
            );
            continue;
        }

        let mut members = members;
        members.sort_by_key(|p| {
            key_columns
                .iter()
                .position(|&c| c == p.right_column)
                .unwrap_or(usize::MAX)
        });
        groups.push(CandidateGroup {
            fk_table: fk,
            pk_table: pk,
            pairs: members,
        });
    }
    groups
}

/// Collapse pairs joining the same two columns, which bidirectional
/// scanning produces. The first of equal scores is kept.
fn dedup_pairs(pairs: Vec<CandidatePair>) -> Vec<CandidatePair> {
    let mut kept: Vec<CandidatePair> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let same = kept
            .iter_mut()
            .find(|k| k.left_column == pair.left_column && k.right_column == pair.right_column);
        match same {
            Some(existing) if pair.raw_score > existing.raw_score => *existing = pair,
            Some(_) => {}
            None => kept.push(pair),
        }
    }
    kept
}

/// Keep one group per `(fk table, pk table, fk column set)`, and one
/// direction per unordered table pair and column set.
///
/// Within a direction the higher raw score wins. Across directions the
/// group whose referencing columns are foreign-key-shaped wins, then the
/// higher raw score.
pub fn dedup_groups(tables: &[TableDescriptor], groups: Vec<CandidateGroup>) -> Vec<CandidateGroup> {
    let mut directed: BTreeMap<(usize, usize, Vec<usize>), CandidateGroup> = BTreeMap::new();
    for group in groups {
        let key = (group.fk_table, group.pk_table, group.column_set());
        match directed.get(&key) {
            Some(existing) if existing.raw_score() >= group.raw_score() => {}
            _ => {
                directed.insert(key, group);
            }
        }
    }

    let mut undirected: BTreeMap<(usize, usize, Vec<(usize, usize)>), CandidateGroup> = BTreeMap::new();
    for group in directed.into_values() {
        let key = undirected_key(&group);
        match undirected.get(&key) {
            Some(existing) if !prefer(tables, &group, existing) => {}
            _ => {
                undirected.insert(key, group);
            }
        }
    }
    undirected.into_values().collect()
}

fn undirected_key(group: &CandidateGroup) -> (usize, usize, Vec<(usize, usize)>) {
    let forward = group.fk_table <= group.pk_table;
    let mut cols: Vec<(usize, usize)> = group
        .pairs
        .iter()
        .map(|p| {
            if forward {
                (p.left_column, p.right_column)
            } else {
                (p.right_column, p.left_column)
            }
        })
        .collect();
    cols.sort_unstable();
    let (a, b) = if forward {
        (group.fk_table, group.pk_table)
    } else {
        (group.pk_table, group.fk_table)
    };
    (a, b, cols)
}

/// True when `candidate` should replace `existing` for the same column set.
fn prefer(tables: &[TableDescriptor], candidate: &CandidateGroup, existing: &CandidateGroup) -> bool {
    let fk_rank = |g: &CandidateGroup| -> u32 {
        g.pairs
            .iter()
            .map(|p| u32::from(key_rank(&tables[g.fk_table], p.left_column)))
            .sum()
    };
    match fk_rank(candidate).cmp(&fk_rank(existing)) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => candidate.raw_score() > existing.raw_score(),
    }
}

/// Final guard over emitted relationships: one per unordered table pair and
/// column set, keeping the higher confidence. Input order is kept.
pub fn dedup_relationships(relationships: Vec<Relationship>) -> Vec<Relationship> {
    let mut best: HashMap<(String, String, Vec<(String, String)>), usize> = HashMap::new();
    let mut kept: Vec<Option<Relationship>> = Vec::with_capacity(relationships.len());

    for rel in relationships {
        let forward = rel.left_table <= rel.right_table;
        let mut cols: Vec<(String, String)> = rel
            .column_pairs
            .iter()
            .map(|p| {
                let (l, r) = (p.left_column.to_uppercase(), p.right_column.to_uppercase());
                if forward {
                    (l, r)
                } else {
                    (r, l)
                }
            })
            .collect();
        cols.sort();
        let key = if forward {
            (rel.left_table.clone(), rel.right_table.clone(), cols)
        } else {
            (rel.right_table.clone(), rel.left_table.clone(), cols)
        };

        match best.get(&key).copied() {
            Some(idx) => {
                let replace = kept[idx]
                    .as_ref()
                    .is_some_and(|existing| rel.confidence_score > existing.confidence_score);
                if replace {
                    kept[idx] = Some(rel);
                }
            }
            None => {
                best.insert(key, kept.len());
                kept.push(Some(rel));
            }
        }
    }
    kept.into_iter().flatten().collect()
}
