//! Table-definition payloads.
//!
//! Callers that already know their tables pass [`TableDefinition`]s
//! directly, or hand over loose JSON through [`parse_table_definitions`].
//! Loose JSON accepts several spellings for each field; a malformed entry
//! is rejected on its own with a note and the rest are kept.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::DefinitionError;
use crate::model::{QualifiedName, SampleValue};

/// Database used when a definition names none.
pub const DEFAULT_DATABASE: &str = "OFFLINE";
/// Schema used when a definition names none.
pub const DEFAULT_SCHEMA: &str = "PUBLIC";

/// A column as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    #[serde(alias = "column_name", alias = "field")]
    pub name: String,
    #[serde(default, alias = "type")]
    pub data_type: Option<String>,
    /// `None` means unknown, never `false`.
    #[serde(default, alias = "primary_key", alias = "is_primary")]
    pub is_primary_key: Option<bool>,
    #[serde(default, alias = "values")]
    pub sample_values: Option<Vec<SampleValue>>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: declared type, e.g. `NUMBER(38,0)`.
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Builder: explicit primary-key flag.
    pub fn primary_key(mut self, is_primary_key: bool) -> Self {
        self.is_primary_key = Some(is_primary_key);
        self
    }

    /// Builder: sampled values.
    pub fn samples<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SampleValue>,
    {
        self.sample_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A table as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table identifier, optionally qualified as `db.schema.table`.
    #[serde(alias = "table_name", alias = "table")]
    pub name: String,
    #[serde(default, alias = "workspace")]
    pub database: Option<String>,
    #[serde(default, alias = "schema_name")]
    pub schema: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: add a column.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder: set database and schema.
    pub fn in_schema(mut self, database: impl Into<String>, schema: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.schema = Some(schema.into());
        self
    }

    /// Resolve the database/schema/table triple.
    ///
    /// Explicit `database`/`schema` fields win over an identifier prefix,
    /// which wins over the defaults. The table part is upper-cased.
    pub fn qualified_name(&self) -> Result<QualifiedName, DefinitionError> {
        let (db_prefix, schema_prefix, table) = split_table_identifier(&self.name)
            .ok_or_else(|| DefinitionError::UnparseableName(self.name.clone()))?;

        let pick = |explicit: &Option<String>, prefix: Option<String>, default: &str| {
            explicit
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or(prefix)
                .unwrap_or_else(|| default.to_string())
        };
        Ok(QualifiedName::new(
            pick(&self.database, db_prefix, DEFAULT_DATABASE),
            pick(&self.schema, schema_prefix, DEFAULT_SCHEMA),
            table.to_uppercase(),
        ))
    }
}

/// Split `db.schema.table`, `schema.table` or `table`, stripping quotes and
/// backticks. `None` when no table part remains.
pub fn split_table_identifier(identifier: &str) -> Option<(Option<String>, Option<String>, String)> {
    let parts: Vec<String> = identifier
        .split('.')
        .map(|p| p.trim().trim_matches(|c| c == '"' || c == '`' || c == '\'').to_string())
        .collect();
    let nonempty = |s: &String| (!s.is_empty()).then(|| s.clone());

    match parts.as_slice() {
        [table] => nonempty(table).map(|t| (None, None, t)),
        [schema, table] => nonempty(table).map(|t| (None, nonempty(schema), t)),
        [.., db, schema, table] => nonempty(table).map(|t| (nonempty(db), nonempty(schema), t)),
        [] => None,
    }
}

/// Parse a loose JSON payload: an array of tables, or an object with a
/// `tables` array.
///
/// Returns the accepted definitions plus one note per rejected entry.
pub fn parse_table_definitions(payload: &Value) -> (Vec<TableDefinition>, Vec<String>) {
    let entries = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("tables") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return (Vec::new(), vec![DefinitionError::NotAList.to_string()]),
        },
        _ => return (Vec::new(), vec![DefinitionError::NotAList.to_string()]),
    };

    let mut tables = Vec::new();
    let mut notes = Vec::new();
    let mut seen = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        match parse_table(index, entry, &mut notes) {
            Ok(table) => {
                let key = table
                    .qualified_name()
                    .map(|q| q.to_string())
                    .unwrap_or_else(|_| table.name.to_uppercase());
                if seen.insert(key.clone()) {
                    tables.push(table);
                } else {
                    notes.push(DefinitionError::DuplicateTable(key).to_string());
                }
            }
            Err(e) => {
                warn!(index, error = %e, "rejected table definition");
                notes.push(e.to_string());
            }
        }
    }
    (tables, notes)
}

fn first_str<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn parse_table(
    index: usize,
    entry: &Value,
    notes: &mut Vec<String>,
) -> Result<TableDefinition, DefinitionError> {
    let object = entry
        .as_object()
        .ok_or(DefinitionError::NotAnObject { index })?;
    let name = first_str(object, &["table_name", "name", "table"])
        .ok_or(DefinitionError::MissingTableName { index })?
        .to_string();
    let table_label = name.to_uppercase();

    let raw_columns = object
        .get("columns")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DefinitionError::NoColumns(table_label.clone()))?;

    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    for (col_index, raw) in raw_columns.iter().enumerate() {
        match parse_column(&table_label, col_index, raw) {
            Ok(column) => {
                if seen.insert(column.name.to_uppercase()) {
                    columns.push(column);
                } else {
                    notes.push(
                        DefinitionError::DuplicateColumn {
                            table: table_label.clone(),
                            column: column.name,
                        }
                        .to_string(),
                    );
                }
            }
            Err(e) => notes.push(e.to_string()),
        }
    }
    if columns.is_empty() {
        return Err(DefinitionError::NoColumns(table_label));
    }

    Ok(TableDefinition {
        name,
        database: first_str(object, &["workspace", "database"]).map(str::to_string),
        schema: first_str(object, &["schema", "schema_name"]).map(str::to_string),
        columns,
    })
}

fn parse_column(table: &str, index: usize, raw: &Value) -> Result<ColumnDefinition, DefinitionError> {
    let object = raw.as_object().ok_or_else(|| DefinitionError::ColumnNotAnObject {
        table: table.to_string(),
        index,
    })?;
    let name = first_str(object, &["name", "column_name", "field"]).ok_or_else(|| {
        DefinitionError::MissingColumnName {
            table: table.to_string(),
            index,
        }
    })?;

    let is_primary_key = ["is_primary_key", "primary_key", "is_primary"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_bool));
    let sample_values = ["sample_values", "values"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_array))
        .map(|values| values.iter().map(sample_from_json).collect());

    Ok(ColumnDefinition {
        name: name.to_string(),
        data_type: first_str(object, &["type", "data_type"]).map(str::to_string),
        is_primary_key,
        sample_values,
    })
}

/// JSON null -> Null, numbers -> Number, strings -> Text, anything else
/// -> its JSON text.
fn sample_from_json(value: &Value) -> SampleValue {
    match value {
        Value::Null => SampleValue::Null,
        Value::Number(n) => n.as_f64().map_or_else(|| SampleValue::text(n.to_string()), SampleValue::Number),
        Value::String(s) => SampleValue::Text(s.clone()),
        other => SampleValue::Text(other.to_string()),
    }
}
