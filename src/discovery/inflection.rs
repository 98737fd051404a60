//! Singular/plural folding for table-name variants.
//!
//! Catalog names are upper-case; `inflector` works on lower-case words, so
//! everything is folded down, inflected, and folded back up.

use inflector::Inflector;

/// Irregular plurals that show up as warehouse table names.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("address", "addresses"),
    ("status", "statuses"),
    ("analysis", "analyses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("index", "indices"),
    ("matrix", "matrices"),
];

/// Singular form of an upper-case identifier token.
///
/// ```ignore
/// assert_eq!(singularize("CUSTOMERS"), "CUSTOMER");
/// assert_eq!(singularize("CATEGORIES"), "CATEGORY");
/// assert_eq!(singularize("PEOPLE"), "PERSON");
/// ```
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_uppercase();
        }
    }
    // Words like PROCESS or CLASS are already singular.
    if lower.ends_with("ss") || lower.ends_with("us") {
        return word.to_uppercase();
    }
    lower.to_singular().to_uppercase()
}

/// Plural form of an upper-case identifier token.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_uppercase();
        }
    }
    lower.to_plural().to_uppercase()
}
