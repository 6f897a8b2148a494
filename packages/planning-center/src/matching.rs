//! Name normalization and fuzzy similarity scoring.
//!
//! Names arrive from LLM extraction and free-text chat, so they are often
//! approximate ("Mike" vs "Michael Chen", "Smith, John" vs "John Smith").
//! The score feeds the three-tier confidence policy in the server's
//! volunteer matcher, so the boost rules here are deliberate and pinned
//! by tests.

use strsim::{jaro_winkler, normalized_levenshtein};

/// Normalize a name for comparison: strip punctuation, collapse
/// whitespace, lowercase.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Similarity between two names in [0, 1].
///
/// Exact normalized match scores 1.0. Otherwise the base edit-distance
/// ratio is boosted by: containment (one name inside the other, >= 0.85),
/// a matching last name (>= 0.7, more if the first names are close), and
/// a reversed-order check ("Last First" vs "First Last").
pub fn name_similarity(name1: &str, name2: &str) -> f64 {
    let n1 = normalize_name(name1);
    let n2 = normalize_name(name2);

    if n1.is_empty() || n2.is_empty() {
        return 0.0;
    }
    if n1 == n2 {
        return 1.0;
    }

    let mut score = normalized_levenshtein(&n1, &n2);

    if n1.contains(&n2) || n2.contains(&n1) {
        score = score.max(0.85);
    }

    let parts1: Vec<&str> = n1.split(' ').collect();
    let parts2: Vec<&str> = n2.split(' ').collect();

    if parts1.len() >= 2 && parts2.len() >= 2 {
        // Last names match: likely a first-name variation or nickname.
        if parts1.last() == parts2.last() {
            score = score.max(0.7);
            // Jaro-Winkler favors shared prefixes, which is what nickname
            // pairs like "Mike"/"Michael" look like.
            let first_similarity = jaro_winkler(parts1[0], parts2[0]);
            if first_similarity > 0.5 {
                score = score.max(0.75 + first_similarity * 0.2);
            }
        }

        // "Smith John" vs "John Smith"
        let reversed: Vec<&str> = parts1.iter().rev().copied().collect();
        score = score.max(normalized_levenshtein(&reversed.join(" "), &n2));
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_whitespace_and_punctuation() {
        assert_eq!(normalize_name("  John   Smith "), "john smith");
        assert_eq!(normalize_name("Sarah O'Brien"), "sarah o brien");
        assert_eq!(normalize_name("MIKE CHEN!"), "mike chen");
    }

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(name_similarity("John Smith", "john  smith"), 1.0);
    }

    #[test]
    fn empty_names_score_zero() {
        assert_eq!(name_similarity("", "John"), 0.0);
        assert_eq!(name_similarity("John", "   "), 0.0);
    }

    #[test]
    fn one_character_typo_is_high_but_not_exact() {
        let score = name_similarity("Alice Alpha", "Alise Alpha");
        assert!(score >= 0.75, "got {score}");
        assert!(score < 0.95, "got {score}");
    }

    #[test]
    fn partial_name_containment_boosts() {
        let score = name_similarity("Sarah", "Sarah Johnson");
        assert!(score >= 0.85, "got {score}");
    }

    #[test]
    fn matching_last_name_boosts() {
        let score = name_similarity("Mike Chen", "Michael Chen");
        assert!(score >= 0.75, "got {score}");
    }

    #[test]
    fn reversed_order_still_matches() {
        let score = name_similarity("Smith John", "John Smith");
        assert!(score >= 0.9, "got {score}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = name_similarity("John Smith", "Lisa Williams");
        assert!(score < 0.6, "got {score}");
    }
}
