//! Role and key classification.
//!
//! Runs once per table during ingestion. Produces the table's likely role,
//! the names the table answers to, and a key role for every column.
//!
//! Primary-key candidacy uses explicit metadata when present. Without it, a
//! key-shaped column is a PK candidate only when its entity core names its
//! own table: `O_ORDERKEY` in `ORDERS` (core `ORDER`) qualifies, `O_CUSTKEY`
//! (core `CUST`) does not. That table-context test keeps every `*_KEY`
//! column from being promoted to a primary key.

use tracing::debug;

use super::eligibility::{Eligibility, EligibilityFilter};
use super::inflection::{pluralize, singularize};
use super::keywords::KeywordTables;
use super::normalize::NormalizedName;
use crate::model::{ColumnDescriptor, KeyRole, QualifiedName, TableDescriptor, TableRole};

/// Decomposition of a key-shaped column name.
///
/// `O_CUSTKEY` -> alias `O`, core `CUST`, key token `KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyShape {
    pub key_token: &'static str,
    /// Short table alias in front of the core (`O`, `PS`), if any.
    pub alias: Option<String>,
    /// Entity tokens between the alias and the key token.
    pub core_tokens: Vec<String>,
    /// The core names the column's own table.
    pub references_own_table: bool,
}

impl KeyShape {
    /// Parse a normalized column name. `None` when the name does not end in
    /// an identifier/key token.
    pub fn parse(name: &NormalizedName, keywords: &KeywordTables) -> Option<Self> {
        let (last, head) = name.tokens.split_last()?;
        if head.is_empty() {
            if let Some((key_token, initial)) = keywords.split_initial_key(last) {
                return Some(Self {
                    key_token,
                    alias: None,
                    core_tokens: vec![initial.to_string()],
                    references_own_table: false,
                });
            }
        }
        let (key_token, stem) = keywords.split_key_suffix(last)?;

        let mut tokens: Vec<String> = head.to_vec();
        if !stem.is_empty() {
            tokens.push(stem.to_string());
        }

        let alias = match tokens.first() {
            Some(first) if first.len() <= 2 => Some(tokens.remove(0)),
            _ => None,
        };

        Some(Self {
            key_token,
            alias,
            core_tokens: tokens,
            references_own_table: false,
        })
    }

    /// Core tokens joined without separators (`ORDER_DATE` -> `ORDERDATE`).
    pub fn core(&self) -> String {
        self.core_tokens.concat()
    }

    /// A bare key such as `ID`, `_KEY` or `C_ID`.
    pub fn is_bare(&self) -> bool {
        self.core_tokens.is_empty()
    }

    /// A single-letter core fused onto its key (`UID`, `SKEY`).
    pub fn is_initial(&self) -> bool {
        self.alias.is_none() && self.core_tokens.len() == 1 && self.core_tokens[0].len() == 1
    }

    /// True when the core names a table with the given variants.
    ///
    /// With `role_qualified`, a multi-token core also matches on its last
    /// token, so `SHIP_CUSTOMER_ID` references `CUSTOMERS`. An initial
    /// matches any table whose name starts with it.
    pub fn names_table(&self, variants: &[String], role_qualified: bool) -> bool {
        if self.is_bare() {
            return false;
        }
        let core = self.core();
        if self.is_initial() {
            return variants.iter().any(|v| v.starts_with(core.as_str()));
        }
        let singular = singularize(&core);
        if variants.iter().any(|v| *v == core || *v == singular) {
            return true;
        }
        if role_qualified && self.core_tokens.len() > 1 {
            if let Some(last) = self.core_tokens.last() {
                let last = singularize(last);
                return variants.iter().any(|v| *v == last);
            }
        }
        false
    }

    /// Named after another table rather than its own.
    pub fn is_foreign_shaped(&self) -> bool {
        !self.is_bare() && !self.references_own_table
    }
}

/// Entity names a table answers to.
///
/// Built from the prefix-stripped name: the compact form, its singular and
/// plural, and any recorded abbreviations (`CUSTOMERS` -> `CUSTOMER`,
/// `CUSTOMERS`, `CUST`). A trailing qualifier such as `DATA` or `PROFILE`
/// adds the same set for the leading tokens, so `ORDER_DATA` also answers
/// to `ORDER`. One- and two-letter aliases are left out; they are too
/// ambiguous to identify a table.
pub fn name_variants(table: &NormalizedName, keywords: &KeywordTables) -> Vec<String> {
    let mut variants = Vec::new();
    push_entity(&mut variants, table.compact(), keywords);

    if let Some((last, head)) = table.tokens.split_last() {
        let qualified = keywords.entity_qualifiers.contains(&last.as_str())
            || keywords.entity_qualifiers.contains(&singularize(last).as_str());
        if qualified && !head.is_empty() {
            push_entity(&mut variants, head.concat(), keywords);
        }
    }

    variants.sort();
    variants.dedup();
    variants
}

fn push_entity(variants: &mut Vec<String>, compact: String, keywords: &KeywordTables) {
    let singular = singularize(&compact);
    for entity in [&compact, &singular] {
        for alias in keywords.variants_of(entity) {
            if alias.len() > 2 {
                variants.push((*alias).to_string());
            }
        }
    }
    variants.push(pluralize(&singular));
    variants.push(singular);
    variants.push(compact);
}

/// Builds [`TableDescriptor`]s: eligibility, key roles, and table role.
pub struct TableClassifier<'a> {
    keywords: &'a KeywordTables,
    filter: &'a EligibilityFilter<'a>,
}

impl<'a> TableClassifier<'a> {
    pub fn new(keywords: &'a KeywordTables, filter: &'a EligibilityFilter<'a>) -> Self {
        Self { keywords, filter }
    }

    /// Classify one table's columns and role.
    pub fn classify(
        &self,
        qualified_name: QualifiedName,
        normalized: NormalizedName,
        columns: Vec<ColumnDescriptor>,
    ) -> TableDescriptor {
        let variants = name_variants(&normalized, self.keywords);

        let mut eligibility = Vec::with_capacity(columns.len());
        let mut key_shapes = Vec::with_capacity(columns.len());
        let mut key_roles = Vec::with_capacity(columns.len());

        for column in &columns {
            let verdict = self.filter.check(&column.normalized, &column.base_type);
            let shape = KeyShape::parse(&column.normalized, self.keywords).map(|mut shape| {
                shape.references_own_table = shape.names_table(&variants, false);
                shape
            });
            let role = key_role(column, verdict.is_eligible(), shape.as_ref());

            eligibility.push(verdict);
            key_shapes.push(shape);
            key_roles.push(role);
        }

        let inferred_role = self.table_role(&normalized, &eligibility, &key_shapes);
        debug!(
            table = %qualified_name.table,
            role = %inferred_role,
            "classified table"
        );

        TableDescriptor {
            qualified_name,
            normalized,
            columns,
            inferred_role,
            key_roles,
            eligible: eligibility.iter().map(Eligibility::is_eligible).collect(),
            key_shapes,
            name_variants: variants,
        }
    }

    fn table_role(
        &self,
        name: &NormalizedName,
        eligibility: &[Eligibility],
        shapes: &[Option<KeyShape>],
    ) -> TableRole {
        if let Some(role) = self.role_from_name(name) {
            return role;
        }

        let foreign_shaped = shapes
            .iter()
            .zip(eligibility)
            .filter(|(shape, verdict)| {
                verdict.is_eligible() && shape.as_ref().is_some_and(KeyShape::is_foreign_shaped)
            })
            .count();
        let own_keys = shapes
            .iter()
            .filter(|shape| {
                shape
                    .as_ref()
                    .is_some_and(|s| s.references_own_table || s.is_bare())
            })
            .count();
        let descriptive = eligibility
            .iter()
            .filter(|v| **v == Eligibility::Excluded("descriptive"))
            .count();
        let attributes = shapes
            .iter()
            .zip(eligibility)
            .filter(|(shape, verdict)| shape.is_none() && **verdict != Eligibility::Excluded("audit"))
            .count();

        if foreign_shaped >= 2 && descriptive == 0 && attributes <= 1 {
            TableRole::Bridge
        } else if foreign_shaped >= 2 {
            TableRole::Fact
        } else if own_keys >= 1 {
            TableRole::Dimension
        } else {
            TableRole::Unknown
        }
    }

    fn role_from_name(&self, name: &NormalizedName) -> Option<TableRole> {
        let kw = self.keywords;
        let mut markers: Vec<&str> = Vec::new();
        if let Some(prefix) = name.stripped_prefix.as_deref() {
            markers.push(prefix);
        }
        if let Some(last) = name.last_token() {
            markers.push(last);
        }

        for marker in markers {
            if kw.bridge_markers.contains(&marker) {
                return Some(TableRole::Bridge);
            }
            if kw.fact_markers.contains(&marker) {
                return Some(TableRole::Fact);
            }
            if kw.dimension_markers.contains(&marker) {
                return Some(TableRole::Dimension);
            }
            if kw.staging_markers.contains(&marker) {
                return Some(TableRole::Staging);
            }
        }
        None
    }
}

/// Key role of a single column. Ineligible columns never act as keys.
fn key_role(column: &ColumnDescriptor, eligible: bool, shape: Option<&KeyShape>) -> KeyRole {
    if !eligible {
        return KeyRole::Neither;
    }
    match column.is_primary_key {
        Some(true) => KeyRole::PrimaryKey { declared: true },
        Some(false) => match shape {
            Some(s) if s.is_foreign_shaped() => KeyRole::ForeignKey,
            _ => KeyRole::Neither,
        },
        None => match shape {
            Some(s) if s.is_bare() || s.references_own_table => KeyRole::PrimaryKey { declared: false },
            Some(_) => KeyRole::ForeignKey,
            None => KeyRole::Neither,
        },
    }
}
