//! Singular/plural forms for matching `{prefix}_id` columns to table names.

use inflector::Inflector;

/// Plurals the inflector gets wrong for common schema nouns.
static IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("address", "addresses"),
    ("status", "statuses"),
    ("category", "categories"),
    ("company", "companies"),
    ("index", "indices"),
    ("datum", "data"),
    ("criterion", "criteria"),
    ("analysis", "analyses"),
];

pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }
    word.to_plural()
}

pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }
    word.to_singular()
}

/// `word`, then its singular, then its plural, without repeats.
pub fn name_candidates(word: &str) -> Vec<String> {
    let mut out = vec![word.to_string()];
    for form in [singularize(word), pluralize(word)] {
        if !form.is_empty() && !out.contains(&form) {
            out.push(form);
        }
    }
    out
}
