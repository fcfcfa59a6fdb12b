//! Display-name normalization.
//!
//! # Responsibility
//! - Derive the canonical comparison key stored as `normalized_name`.
//! - Provide a looser key for fuzzy matching and free-name suggestions.
//!
//! # Invariants
//! - `normalize` is idempotent.
//! - `normalize` preserves `-` and `_`, so "payment-gateway" and
//!   "payment gateway" are different keys.
//! - `normalize_strict` is never used as the uniqueness key.

use crate::model::node::MAX_NAME_CHARS;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-]+").expect("valid punctuation regex"));

/// Canonical uniqueness key: lowercase, trimmed, whitespace runs collapsed.
pub fn normalize(name: &str) -> String {
    WHITESPACE_RE.replace_all(name.trim(), " ").to_lowercase()
}

/// Looser key that also drops punctuation other than `-` and `_`.
pub fn normalize_strict(name: &str) -> String {
    let lowered = normalize(name);
    normalize(&PUNCTUATION_RE.replace_all(&lowered, " "))
}

/// Returns whether two display names collide under `normalize`.
pub fn names_equivalent(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}

/// Widest `" {n}"` tail a suggestion can carry.
const MAX_SUFFIX_CHARS: usize = 21;

/// Returns `name` when its key is free, otherwise the first `"{name} {n}"`
/// (n = 2, 3, ...) whose key is not in `taken`.
///
/// Long names are cut so the suggestion stays within `MAX_NAME_CHARS`.
/// `taken` must hold normalized keys; every candidate key starts with
/// `suggestion_key_prefix(name)`.
pub fn suggest_available_name(name: &str, taken: &HashSet<String>) -> String {
    let base = WHITESPACE_RE.replace_all(name.trim(), " ").into_owned();
    if !taken.contains(&normalize(&base)) {
        return base;
    }

    let mut suffix: u64 = 2;
    loop {
        let tail = format!(" {suffix}");
        let room = MAX_NAME_CHARS.saturating_sub(tail.chars().count());
        let head = truncate_chars(&base, room);
        let candidate = format!("{}{tail}", head.trim_end());
        if !taken.contains(&normalize(&candidate)) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Normalized prefix shared by `name` and all of its suggestion candidates.
pub fn suggestion_key_prefix(name: &str) -> String {
    let base = WHITESPACE_RE.replace_all(name.trim(), " ");
    normalize(truncate_chars(&base, MAX_NAME_CHARS - MAX_SUFFIX_CHARS))
}

fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        names_equivalent, normalize, normalize_strict, suggest_available_name,
        suggestion_key_prefix,
    };
    use crate::model::node::MAX_NAME_CHARS;
    use std::collections::HashSet;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize("Customer   Management"), "customer management");
        assert_eq!(normalize("customer management"), "customer management");
        assert_eq!(
            normalize("\t Customer\n Management  "),
            "customer management"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "  Order   To Cash ",
            "payment-gateway",
            "ÜBER  Service",
            "",
            "snake_case_name",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn normalize_preserves_hyphens_and_underscores() {
        assert_eq!(normalize("Payment-Gateway"), "payment-gateway");
        assert_ne!(normalize("payment-gateway"), normalize("payment gateway"));
        assert_ne!(normalize("payment_gateway"), normalize("payment gateway"));
    }

    #[test]
    fn strict_variant_drops_punctuation() {
        assert_eq!(normalize_strict("CRM (Sales)!"), "crm sales");
        assert_eq!(normalize_strict("A.P.I. gateway"), "a p i gateway");
        assert_eq!(normalize_strict("payment-gateway"), "payment-gateway");
        let once = normalize_strict("Hello,   World?");
        assert_eq!(normalize_strict(&once), once);
    }

    #[test]
    fn equivalence_uses_canonical_key() {
        assert!(names_equivalent(
            "Customer Management",
            " customer   MANAGEMENT"
        ));
        assert!(!names_equivalent(
            "Customer-Management",
            "Customer Management"
        ));
    }

    #[test]
    fn suggestion_appends_first_free_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(suggest_available_name("  CRM  ", &taken), "CRM");

        taken.insert("crm".to_string());
        assert_eq!(suggest_available_name("CRM", &taken), "CRM 2");

        taken.insert("crm 2".to_string());
        taken.insert("crm 3".to_string());
        assert_eq!(suggest_available_name("CRM", &taken), "CRM 4");
    }

    #[test]
    fn suggestion_for_longest_name_stays_within_limit() {
        let name = "x".repeat(MAX_NAME_CHARS);
        let mut taken = HashSet::new();
        taken.insert(normalize(&name));

        let suggestion = suggest_available_name(&name, &taken);
        assert_eq!(suggestion.chars().count(), MAX_NAME_CHARS);
        assert_eq!(suggestion, format!("{} 2", "x".repeat(MAX_NAME_CHARS - 2)));

        taken.insert(normalize(&suggestion));
        let next = suggest_available_name(&name, &taken);
        assert_eq!(next, format!("{} 3", "x".repeat(MAX_NAME_CHARS - 2)));
    }

    #[test]
    fn truncated_suggestion_drops_dangling_space() {
        let name = format!("{} ab", "y".repeat(MAX_NAME_CHARS - 3));
        let mut taken = HashSet::new();
        taken.insert(normalize(&name));

        let suggestion = suggest_available_name(&name, &taken);
        assert_eq!(suggestion, format!("{} 2", "y".repeat(MAX_NAME_CHARS - 3)));
    }

    #[test]
    fn key_prefix_covers_every_candidate() {
        let long = "Z".repeat(MAX_NAME_CHARS);
        let prefix = suggestion_key_prefix(&long);
        let mut taken = HashSet::new();
        taken.insert(normalize(&long));
        for _ in 0..3 {
            let candidate = suggest_available_name(&long, &taken);
            assert!(normalize(&candidate).starts_with(&prefix));
            taken.insert(normalize(&candidate));
        }

        assert_eq!(suggestion_key_prefix("  CRM  Suite "), "crm suite");
    }
}
