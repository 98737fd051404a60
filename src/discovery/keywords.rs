//! Static heuristic tables.
//!
//! Everything the filters and scorers look up by keyword lives here as
//! immutable data. Callers pass a `&KeywordTables` explicitly; nothing in
//! the engine reaches for these statics on its own.

/// A recognized entity family that earns a domain boost.
#[derive(Debug, Clone, Copy)]
pub struct DomainFamily {
    pub name: &'static str,
    /// Upper-case tokens that identify the family in table or column names.
    pub markers: &'static [&'static str],
    /// Confidence added when both sides of a relationship belong to the family.
    pub boost: f64,
}

/// Keyword sets used by normalization, eligibility, roles and scoring.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTables {
    /// Trailing tokens that mark an identifier or key column.
    pub key_tokens: &'static [&'static str],
    /// Descriptive free-text fields.
    pub descriptive: &'static [&'static str],
    /// Measurements and monetary fields.
    pub measurement: &'static [&'static str],
    /// Full canonical names of audit columns.
    pub audit_names: &'static [&'static str],
    /// Tokens that mark a system or audit column anywhere in the name.
    pub audit_tokens: &'static [&'static str],
    /// Trailing tokens that mark an audit column (`*_BY`, `*_AT`).
    pub audit_suffixes: &'static [&'static str],
    /// Base types that never carry a join key unless the name says so.
    pub non_key_types: &'static [&'static str],
    /// Table-name prefixes stripped during normalization.
    pub table_prefixes: &'static [&'static str],
    /// Table-name tokens (or stripped prefixes) that announce a role.
    pub fact_markers: &'static [&'static str],
    pub dimension_markers: &'static [&'static str],
    pub bridge_markers: &'static [&'static str],
    pub staging_markers: &'static [&'static str],
    /// Table-name keywords that make a relationship optional.
    pub optional_relationship: &'static [&'static str],
    /// Known abbreviations and aliases, keyed by singular entity name.
    pub entity_variants: &'static [(&'static str, &'static [&'static str])],
    /// Trailing table-name tokens that qualify an entity rather than name
    /// one (`USER_PROFILE`, `ORDER_DATA`).
    pub entity_qualifiers: &'static [&'static str],
    /// Table-name tokens that mark a time dimension.
    pub time_dimension: &'static [&'static str],
    pub domain_families: &'static [DomainFamily],
}

impl KeywordTables {
    /// The built-in tables.
    pub fn standard() -> &'static KeywordTables {
        &STANDARD
    }

    pub fn is_key_token(&self, token: &str) -> bool {
        self.key_tokens.contains(&token)
    }

    /// Key token a single name token ends with, including concatenated
    /// forms such as `CUSTKEY`. Returns the key token and the stem before it.
    pub fn split_key_suffix<'a>(&self, token: &'a str) -> Option<(&'static str, &'a str)> {
        if let Some(key) = self.key_tokens.iter().find(|k| **k == token) {
            return Some((key, ""));
        }
        // Only KEY and ID are safe to peel off a fused token; NO/NUM/CODE
        // appear inside too many ordinary words.
        for key in ["KEY", "ID"] {
            if token.len() > key.len() + 2 && token.ends_with(key) {
                return Some((key, &token[..token.len() - key.len()]));
            }
        }
        None
    }

    /// Three- and four-letter keys fused onto a single initial, such as
    /// `UID` or `SKEY`. Returns the key token and the initial.
    pub fn split_initial_key<'a>(&self, token: &'a str) -> Option<(&'static str, &'a str)> {
        ["KEY", "ID"].into_iter().find_map(|key| {
            let initial = token.strip_suffix(key)?;
            (initial.len() == 1 && initial.bytes().all(|b| b.is_ascii_alphabetic()))
                .then_some((key, initial))
        })
    }

    /// Aliases recorded for an entity, looked up by its singular name.
    pub fn variants_of(&self, entity: &str) -> &'static [&'static str] {
        self.entity_variants
            .iter()
            .find(|(name, _)| *name == entity)
            .map(|(_, v)| *v)
            .unwrap_or(&[])
    }
}

static STANDARD: KeywordTables = KeywordTables {
    key_tokens: &["ID", "KEY", "NUM", "CODE", "NO"],
    descriptive: &[
        "NAME",
        "TITLE",
        "LABEL",
        "DESCRIPTION",
        "DESC",
        "CONTENT",
        "COMMENT",
        "COMMENTS",
        "NOTE",
        "NOTES",
        "TEXT",
        "BODY",
    ],
    measurement: &[
        "AMOUNT", "AMT", "PRICE", "COST", "QUANTITY", "QTY", "BALANCE",
    ],
    audit_names: &[
        "CREATED_AT",
        "UPDATED_AT",
        "DELETED_AT",
        "MODIFIED_AT",
        "INSERTED_AT",
    ],
    audit_tokens: &["VERSION", "REVISION", "ETAG", "TIMESTAMP"],
    audit_suffixes: &["BY", "AT"],
    non_key_types: &[
        "TIMESTAMP",
        "TIMESTAMP_NTZ",
        "TIMESTAMP_LTZ",
        "TIMESTAMP_TZ",
        "DATETIME",
        "TIME",
        "BOOLEAN",
        "BOOL",
    ],
    table_prefixes: &[
        "DIM", "DIMENSION", "FACT", "FCT", "STG", "STAGING", "RAW", "TMP", "BRIDGE", "BRG",
    ],
    fact_markers: &["FACT", "FCT"],
    dimension_markers: &["DIM", "DIMENSION"],
    bridge_markers: &["BRIDGE", "BRG", "XREF", "MAP", "LINK", "ASSOC"],
    staging_markers: &["STG", "STAGING", "RAW", "TMP"],
    optional_relationship: &[
        "PROMO",
        "PROMOTION",
        "DISCOUNT",
        "COUPON",
        "ALTERNATE",
        "SECONDARY",
        "BACKUP",
        "FALLBACK",
        "OPTIONAL",
    ],
    entity_variants: &[
        // TPC-H
        ("CUSTOMER", &["CUST", "C"]),
        ("SUPPLIER", &["SUPP", "S"]),
        ("PART", &["P"]),
        ("ORDER", &["ORDERS", "O"]),
        ("LINEITEM", &["LINE", "L"]),
        ("PARTSUPP", &["PS"]),
        ("NATION", &["N"]),
        ("REGION", &["R"]),
        // Common warehouse abbreviations
        ("PRODUCT", &["PROD"]),
        ("EMPLOYEE", &["EMP"]),
        ("PROMOTION", &["PROMO"]),
        ("DEPARTMENT", &["DEPT"]),
        ("ACCOUNT", &["ACCT"]),
        ("TRANSACTION", &["TXN", "TRANS"]),
        ("CATEGORY", &["CAT"]),
        ("WAREHOUSE", &["WH"]),
        ("LOCATION", &["LOC"]),
        ("PAYMENT", &["PAY", "PMT"]),
        ("USER", &["USR"]),
    ],
    entity_qualifiers: &[
        "DATA", "INFO", "INFORMATION", "PROFILE", "DETAIL", "RECORD", "MASTER", "MAIN", "TABLE",
    ],
    time_dimension: &["DATE", "TIME", "CALENDAR", "DAY", "MONTH", "PERIOD"],
    domain_families: &[
        DomainFamily {
            name: "customer",
            markers: &["CUSTOMER", "CUST", "CLIENT"],
            boost: 0.10,
        },
        DomainFamily {
            name: "product",
            markers: &["PRODUCT", "PROD", "ITEM", "PART", "SKU"],
            boost: 0.10,
        },
        DomainFamily {
            name: "order",
            markers: &["ORDER", "ORDERS"],
            boost: 0.08,
        },
        DomainFamily {
            name: "date",
            markers: &["DATE", "CALENDAR", "DAY"],
            boost: 0.08,
        },
        DomainFamily {
            name: "location",
            markers: &[
                "LOCATION", "LOC", "REGION", "NATION", "COUNTRY", "CITY", "ADDRESS", "STORE",
            ],
            boost: 0.06,
        },
        DomainFamily {
            name: "employee",
            markers: &["EMPLOYEE", "EMP", "STAFF", "SALESPERSON"],
            boost: 0.06,
        },
    ],
};
