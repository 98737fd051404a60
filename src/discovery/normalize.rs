//! Identifier normalization.
//!
//! Every name comparison in the pipeline goes through [`NormalizedName`].
//! Raw names are kept on the descriptors for output only.
//!
//! Tokenization splits on any non-alphanumeric character and on case
//! boundaries (`orderDate` -> `ORDER`, `DATE`; `HTTPServer` -> `HTTP`,
//! `SERVER`). Tokens are upper-cased and re-joined with single underscores.

use super::keywords::KeywordTables;

/// Canonical form of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedName {
    /// Upper-case, underscore-joined tokens.
    pub canonical: String,
    /// Component tokens, in order.
    pub tokens: Vec<String>,
    /// The raw identifier started with an underscore (`_id`, `_version`).
    pub leading_underscore: bool,
    /// Warehouse prefix removed from a table name, e.g. `DIM`.
    pub stripped_prefix: Option<String>,
}

impl NormalizedName {
    /// Last token, if any.
    pub fn last_token(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// First token, if any.
    pub fn first_token(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Canonical form with underscores removed (`ORDER_DATE` -> `ORDERDATE`).
    pub fn compact(&self) -> String {
        self.tokens.concat()
    }

    /// True when `other`'s tokens are a strict trailing subsequence of ours.
    pub fn ends_with_tokens(&self, other: &NormalizedName) -> bool {
        other.tokens.len() < self.tokens.len() && self.tokens.ends_with(&other.tokens)
    }

    /// Canonical form without a leading alias of at most two characters
    /// (`O_CUSTKEY` -> `CUSTKEY`). Single-token names are returned as is.
    pub fn without_alias(&self) -> String {
        match self.tokens.split_first() {
            Some((first, rest)) if !rest.is_empty() && first.len() <= 2 => rest.join("_"),
            _ => self.canonical.clone(),
        }
    }
}

/// Normalize a column identifier.
pub fn normalize_column(raw: &str) -> NormalizedName {
    let tokens = tokenize(raw);
    build(raw, tokens, None)
}

/// Normalize a table identifier, stripping warehouse prefixes such as `DIM_`.
///
/// A prefix is only stripped when something remains after it, so a table
/// literally named `FACT` keeps its name.
pub fn normalize_table(raw: &str, keywords: &KeywordTables) -> NormalizedName {
    let mut tokens = tokenize(raw);
    let mut stripped_prefix = None;
    if tokens.len() > 1 && keywords.table_prefixes.contains(&tokens[0].as_str()) {
        stripped_prefix = Some(tokens.remove(0));
    }
    build(raw, tokens, stripped_prefix)
}

fn build(raw: &str, tokens: Vec<String>, stripped_prefix: Option<String>) -> NormalizedName {
    let leading_underscore = raw.trim_start().starts_with('_');
    if tokens.is_empty() {
        // Nothing alphanumeric to split on: the whole identifier is one token.
        let fallback = raw.trim().to_uppercase();
        return NormalizedName {
            canonical: fallback.clone(),
            tokens: vec![fallback],
            leading_underscore,
            stripped_prefix,
        };
    }
    NormalizedName {
        canonical: tokens.join("_"),
        tokens,
        leading_underscore,
        stripped_prefix,
    }
}

/// Split an identifier into upper-case tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in raw.split(|c: char| !c.is_alphanumeric()) {
        if chunk.is_empty() {
            continue;
        }
        split_case_boundaries(chunk, &mut tokens);
    }
    tokens
}

fn split_case_boundaries(chunk: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = chunk.chars().collect();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && !current.is_empty() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            // The last capital of an acronym starts the next word: HTTPServer.
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && next.is_some_and(|n| n.is_lowercase());
            if lower_to_upper || acronym_end {
                out.push(current.to_uppercase());
                current.clear();
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current.to_uppercase());
    }
}
