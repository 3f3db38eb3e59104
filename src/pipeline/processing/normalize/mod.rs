//! Text normalization for city-name comparison.
//!
//! Everything here is a pure function; the reference index and the matcher
//! both go through these so that loading and querying agree on the keys.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::constants::{is_city_stopword, MIN_VARIANT_WORD_LEN};

/// Lowercase, strip diacritics and collapse whitespace.
///
/// "  Pozuelo  de Alarcón " → "pozuelo de alarcon"
pub fn normalize_for_comparison(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized lookup key for a city name.
///
/// Apostrophes and hyphens are kept: "L'Hospitalet" → "l'hospitalet",
/// "Vitoria-Gasteiz" → "vitoria-gasteiz".
pub fn normalize_city(city: &str) -> String {
    normalize_for_comparison(city)
}

/// Variant keys for a city name: the normalized name first, then each
/// meaningful word in order of appearance, without duplicates.
///
/// "Pozuelo de Alarcón" → ["pozuelo de alarcon", "pozuelo", "alarcon"]
pub fn extract_city_variants(city: &str) -> Vec<String> {
    let normalized = normalize_city(city);
    let mut variants = vec![normalized.clone()];

    let spaced = normalized.replace(['-', '\''], " ");
    for word in spaced.split_whitespace() {
        if word.chars().count() <= MIN_VARIANT_WORD_LEN || is_city_stopword(word) {
            continue;
        }
        if !variants.iter().any(|v| v == word) {
            variants.push(word.to_string());
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(normalize_for_comparison("Málaga"), "malaga");
        assert_eq!(normalize_for_comparison("MADRID"), "madrid");
        assert_eq!(normalize_for_comparison("A Coruña"), "a coruna");
        assert_eq!(normalize_for_comparison("Lleida"), "lleida");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_for_comparison("  Pozuelo \t de   Alarcón  "), "pozuelo de alarcon");
        assert_eq!(normalize_for_comparison(""), "");
        assert_eq!(normalize_for_comparison("   "), "");
    }

    #[test]
    fn test_normalize_city_keeps_hyphen_and_apostrophe() {
        assert_eq!(normalize_city("L'Hospitalet de Llobregat"), "l'hospitalet de llobregat");
        assert_eq!(normalize_city("Vitoria-Gasteiz"), "vitoria-gasteiz");
    }

    #[test]
    fn test_normalize_city_is_idempotent() {
        for input in [
            "Málaga",
            "  SAN   Sebastián ",
            "l'Hospitalet",
            "Vitoria-Gasteiz",
            "",
            "Àvila",
        ] {
            let once = normalize_city(input);
            assert_eq!(normalize_city(&once), once);
        }
    }

    #[test]
    fn test_variants_filter_stopwords_and_short_words() {
        assert_eq!(
            extract_city_variants("Pozuelo de Alarcón"),
            vec!["pozuelo de alarcon", "pozuelo", "alarcon"]
        );
        assert_eq!(
            extract_city_variants("l'Hospitalet de Llobregat"),
            vec!["l'hospitalet de llobregat", "hospitalet", "llobregat"]
        );
        assert_eq!(
            extract_city_variants("Vitoria-Gasteiz"),
            vec!["vitoria-gasteiz", "vitoria", "gasteiz"]
        );
    }

    #[test]
    fn test_variants_deduplicate() {
        // a single word is both the full name and its only meaningful word
        assert_eq!(extract_city_variants("Madrid"), vec!["madrid"]);
        assert_eq!(extract_city_variants("Sant Sant"), vec!["sant sant", "sant"]);
    }

    #[test]
    fn test_variants_of_empty_string() {
        assert_eq!(extract_city_variants(""), vec![""]);
    }
}
