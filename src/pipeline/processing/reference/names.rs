//! Splitting of multi-name reference entries.
//!
//! A single line of the reference table may carry more than one official
//! name for the same municipality. The rules below are tried in order and the
//! first one that applies decides the split.

/// One name-splitting rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// "Hospitalet de Llobregat,l'" → base + "l'" + base
    CatalanArticle,
    /// "Palmas de Gran Canaria,Las" → base + "Las " + base
    LasArticle,
    /// "Donostia - San Sebastián" → both sides
    SpacedBilingual,
    /// "Alacant-Alicante" → both sides, when the halves look like a short pair
    HyphenBilingual,
}

/// Rules in precedence order
pub const SPLIT_RULES: &[SplitRule] = &[
    SplitRule::CatalanArticle,
    SplitRule::LasArticle,
    SplitRule::SpacedBilingual,
    SplitRule::HyphenBilingual,
];

impl SplitRule {
    /// Returns the split names if this rule applies to `city`
    pub fn apply(self, city: &str) -> Option<Vec<String>> {
        match self {
            SplitRule::CatalanArticle => {
                let base = city.strip_suffix(",l'")?;
                Some(vec![base.to_string(), format!("l'{}", base)])
            }
            SplitRule::LasArticle => {
                let (base, _) = city.split_once(",Las")?;
                let base = base.trim();
                Some(vec![base.to_string(), format!("Las {}", base)])
            }
            SplitRule::SpacedBilingual => {
                if !city.contains(" - ") {
                    return None;
                }
                Some(city.split(" - ").map(|n| n.trim().to_string()).collect())
            }
            SplitRule::HyphenBilingual => split_short_hyphen_pair(city),
        }
    }
}

fn split_short_hyphen_pair(city: &str) -> Option<Vec<String>> {
    let (first, _) = city.split_once('-')?;
    if first.chars().any(char::is_whitespace) {
        return None;
    }

    let parts: Vec<&str> = city.split('-').collect();
    if parts.len() != 2 {
        return None;
    }
    let starts_upper = |s: &str| s.chars().next().map(char::is_uppercase).unwrap_or(false);
    if !starts_upper(parts[0]) || !starts_upper(parts[1]) {
        return None;
    }

    // Compound names such as "Rivas-Vaciamadrid" have uneven halves
    let first_len = parts[0].chars().count();
    let second_len = parts[1].chars().count();
    if first_len.abs_diff(second_len) < 5 && first_len < 12 {
        Some(parts.iter().map(|p| p.trim().to_string()).collect())
    } else {
        None
    }
}

/// Split a reference entry into its independent display names
pub fn split_city_names(city: &str) -> Vec<String> {
    SPLIT_RULES
        .iter()
        .find_map(|rule| rule.apply(city))
        .unwrap_or_else(|| vec![city.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalan_article() {
        assert_eq!(
            split_city_names("Hospitalet de Llobregat,l'"),
            vec!["Hospitalet de Llobregat", "l'Hospitalet de Llobregat"]
        );
    }

    #[test]
    fn test_las_article() {
        assert_eq!(
            split_city_names("Palmas de Gran Canaria,Las"),
            vec!["Palmas de Gran Canaria", "Las Palmas de Gran Canaria"]
        );
    }

    #[test]
    fn test_spaced_bilingual_pair() {
        assert_eq!(
            split_city_names("Donostia - San Sebastián"),
            vec!["Donostia", "San Sebastián"]
        );
    }

    #[test]
    fn test_short_hyphen_pair_is_split() {
        assert_eq!(split_city_names("Alacant-Alicante"), vec!["Alacant", "Alicante"]);
        assert_eq!(split_city_names("Elx-Elche"), vec!["Elx", "Elche"]);
    }

    #[test]
    fn test_uneven_compound_is_kept() {
        assert_eq!(split_city_names("Rivas-Vaciamadrid"), vec!["Rivas-Vaciamadrid"]);
    }

    #[test]
    fn test_hyphen_after_space_is_kept() {
        assert_eq!(split_city_names("San Martín-Vega"), vec!["San Martín-Vega"]);
    }

    #[test]
    fn test_lowercase_half_is_kept() {
        assert_eq!(split_city_names("Castell-platja"), vec!["Castell-platja"]);
    }

    #[test]
    fn test_three_part_hyphen_is_kept() {
        assert_eq!(split_city_names("Aa-Bb-Cc"), vec!["Aa-Bb-Cc"]);
    }

    #[test]
    fn test_plain_name() {
        assert_eq!(split_city_names("Madrid"), vec!["Madrid"]);
    }

    #[test]
    fn test_rule_precedence() {
        // the article rule wins over the hyphen rule
        assert_eq!(SplitRule::CatalanArticle.apply("Foo-Bar,l'").map(|v| v.len()), Some(2));
        assert_eq!(split_city_names("Foo-Bar,l'"), vec!["Foo-Bar", "l'Foo-Bar"]);
        assert!(SplitRule::SpacedBilingual.apply("Alacant-Alicante").is_none());
    }
}
