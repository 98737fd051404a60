//! Column type compatibility.
//!
//! Catalog types arrive as free text (`VARCHAR(255)`, `NUMBER(38,0) NOT NULL`).
//! They are reduced to a base type and grouped into classes; the score says
//! how safe a join between two classes is.

/// Broad class of a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Integer,
    Decimal,
    Float,
    Text,
    Temporal,
    Boolean,
    Other,
}

impl TypeClass {
    /// Classify an upper-case base type.
    pub fn of(base_type: &str) -> Self {
        match base_type {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" | "INT64" | "LONG" => {
                Self::Integer
            }
            "NUMBER" | "NUMERIC" | "DECIMAL" => Self::Decimal,
            "FLOAT" | "FLOAT64" | "DOUBLE" | "REAL" => Self::Float,
            "STRING" | "VARCHAR" | "TEXT" | "CHAR" | "NVARCHAR" | "NCHAR" | "CHARACTER" => {
                Self::Text
            }
            "DATE" | "DATETIME" | "TIME" | "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ"
            | "TIMESTAMP_TZ" => Self::Temporal,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            _ => Self::Other,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Float)
    }
}

/// Reduce a declared type to its upper-case base name.
///
/// Strips length/precision, nullability and surrounding whitespace:
/// `varchar(255) not null` -> `VARCHAR`. An empty type becomes `STRING`,
/// the catalog default.
pub fn base_type(declared: &str) -> String {
    let upper = declared.trim().to_uppercase();
    let without_args = match upper.find('(') {
        Some(idx) => &upper[..idx],
        None => upper.as_str(),
    };
    let base = without_args
        .replace("NOT NULL", "")
        .replace("NULL", "")
        .trim()
        .to_string();
    if base.is_empty() {
        "STRING".to_string()
    } else {
        base
    }
}

/// Result of a type compatibility check.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCompatibility {
    /// Compatibility score (0.0 to 1.0).
    pub score: f64,
    pub is_exact: bool,
    /// Types can be joined at all.
    pub is_compatible: bool,
    pub explanation: String,
}

impl TypeCompatibility {
    /// Check compatibility between two base types.
    pub fn check(from: &str, to: &str) -> Self {
        if from == to {
            return Self {
                score: 1.0,
                is_exact: true,
                is_compatible: true,
                explanation: format!("{} matches {}", from, to),
            };
        }

        let score = Self::compatibility_score(TypeClass::of(from), TypeClass::of(to));
        Self {
            score,
            is_exact: false,
            is_compatible: score > 0.0,
            explanation: if score > 0.0 {
                format!("{} is coercible to {}", from, to)
            } else {
                format!("{} is not comparable with {}", from, to)
            },
        }
    }

    fn compatibility_score(from: TypeClass, to: TypeClass) -> f64 {
        use TypeClass::*;

        match (from, to) {
            // Same class, different spelling (INT vs BIGINT, VARCHAR vs STRING)
            (a, b) if a == b && a != Other => 0.9,
            // Numeric widening or narrowing
            (a, b) if a.is_numeric() && b.is_numeric() => 0.6,
            // Unrecognized declared types: neither confirm nor rule out
            (Other, _) | (_, Other) => 0.5,
            _ => 0.0,
        }
    }
}
