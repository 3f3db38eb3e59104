use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::is_postcode_shape;
use crate::pipeline::processing::normalize::{extract_city_variants, normalize_city};
use crate::pipeline::processing::reference::ReferenceIndex;

/// Outcome of matching a city against the province of a postal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// City belongs to the postal code's province
    Valid,
    /// City is known but lives in another province, or the province is unknown
    Invalid,
    /// City is not in the reference table
    UnknownCity,
    /// City or postal code is empty or malformed
    MissingData,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::UnknownCity => "unknown_city",
            ValidationStatus::MissingData => "missing_data",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityPostalResult {
    pub status: ValidationStatus,
    pub message: String,
    /// Province taken from the postal code
    pub province_code: Option<String>,
    /// Known cities of the postal code's province
    pub expected_cities: Option<Vec<String>>,
}

impl CityPostalResult {
    fn missing(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::MissingData,
            message: message.into(),
            province_code: None,
            expected_cities: None,
        }
    }
}

/// Validates city + postal code pairs against the reference index
#[derive(Clone)]
pub struct CityPostalMatcher {
    index: Arc<ReferenceIndex>,
}

impl CityPostalMatcher {
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn validate(&self, city: &str, postal_code: &str) -> CityPostalResult {
        if city.trim().is_empty() {
            return CityPostalResult::missing("City is empty");
        }

        let postal_code = postal_code.trim();
        if postal_code.is_empty() {
            return CityPostalResult::missing("Postal code is empty");
        }
        if !is_postcode_shape(postal_code) {
            return CityPostalResult::missing(format!(
                "Invalid postal code format: {}",
                postal_code
            ));
        }

        let province = &postal_code[..2];
        if !self.index.has_province(province) {
            return CityPostalResult {
                status: ValidationStatus::Invalid,
                message: format!("Unknown province code: {}", province),
                province_code: Some(province.to_string()),
                expected_cities: None,
            };
        }

        let result = self
            .match_exact(city, province)
            .or_else(|| self.match_variant(city, province))
            .unwrap_or_else(|| CityPostalResult {
                status: ValidationStatus::UnknownCity,
                message: format!("City '{}' not found in database (province {})", city, province),
                province_code: Some(province.to_string()),
                expected_cities: Some(self.expected_cities(province)),
            });

        debug!(city, postal_code, status = %result.status, "City/postal code matched");
        result
    }

    fn match_exact(&self, city: &str, province: &str) -> Option<CityPostalResult> {
        let expected = self.index.province_for_key(&normalize_city(city))?;

        if expected == province {
            Some(CityPostalResult {
                status: ValidationStatus::Valid,
                message: "City matches postal code province".to_string(),
                province_code: Some(province.to_string()),
                expected_cities: None,
            })
        } else {
            Some(CityPostalResult {
                status: ValidationStatus::Invalid,
                message: format!(
                    "City '{}' belongs to province {}, not {}",
                    city, expected, province
                ),
                province_code: Some(province.to_string()),
                expected_cities: Some(self.expected_cities(province)),
            })
        }
    }

    /// The first variant with any hit decides; later variants are not tried
    fn match_variant(&self, city: &str, province: &str) -> Option<CityPostalResult> {
        let candidates = extract_city_variants(city)
            .iter()
            .find_map(|variant| self.index.cities_for_variant(variant))?;

        let matched = candidates
            .iter()
            .find(|candidate| self.index.province_for_city(candidate) == Some(province));

        Some(match matched {
            Some(matched) => CityPostalResult {
                status: ValidationStatus::Valid,
                message: format!("City '{}' matches '{}' in province {}", city, matched, province),
                province_code: Some(province.to_string()),
                expected_cities: None,
            },
            None => CityPostalResult {
                status: ValidationStatus::Invalid,
                message: format!("City '{}' found but not in province {}", city, province),
                province_code: Some(province.to_string()),
                expected_cities: Some(self.expected_cities(province)),
            },
        })
    }

    fn expected_cities(&self, province: &str) -> Vec<String> {
        self.index.cities_for_province(province).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::reference::CollisionPolicy;

    fn matcher() -> CityPostalMatcher {
        let table = "\
280Madrid
286Pozuelo de Alarcón
080Barcelona
41xSevilla
41xDos Hermanas
";
        let index = ReferenceIndex::from_table(table, CollisionPolicy::FirstWins).unwrap();
        CityPostalMatcher::new(Arc::new(index))
    }

    #[test]
    fn test_exact_match() {
        let result = matcher().validate("Madrid", "28013");
        assert_eq!(result.status, ValidationStatus::Valid);
        assert_eq!(result.province_code.as_deref(), Some("28"));
        assert!(result.expected_cities.is_none());
    }

    #[test]
    fn test_exact_mismatch_lists_input_province_cities() {
        let result = matcher().validate("Madrid", "08001");
        assert_eq!(result.status, ValidationStatus::Invalid);
        assert_eq!(result.province_code.as_deref(), Some("08"));
        assert_eq!(result.expected_cities, Some(vec!["Barcelona".to_string()]));
    }

    #[test]
    fn test_variant_match_names_display_form() {
        let result = matcher().validate("pozuelo", "28224");
        assert_eq!(result.status, ValidationStatus::Valid);
        assert!(result.message.contains("Pozuelo de Alarcón"));
    }

    #[test]
    fn test_variant_in_wrong_province_stops_search() {
        let result = matcher().validate("Hermanas", "28001");
        assert_eq!(result.status, ValidationStatus::Invalid);
        assert_eq!(
            result.expected_cities,
            Some(vec!["Madrid".to_string(), "Pozuelo de Alarcón".to_string()])
        );
    }

    #[test]
    fn test_unknown_city() {
        let result = matcher().validate("Seville", "41001");
        assert_eq!(result.status, ValidationStatus::UnknownCity);
        assert_eq!(
            result.expected_cities,
            Some(vec!["Sevilla".to_string(), "Dos Hermanas".to_string()])
        );
    }

    #[test]
    fn test_unknown_province_is_invalid_not_missing() {
        let result = matcher().validate("Madrid", "99999");
        assert_eq!(result.status, ValidationStatus::Invalid);
        assert_eq!(result.province_code.as_deref(), Some("99"));
    }

    #[test]
    fn test_missing_data() {
        let m = matcher();
        assert_eq!(m.validate("", "28013").status, ValidationStatus::MissingData);
        assert_eq!(m.validate("   ", "28013").status, ValidationStatus::MissingData);
        assert_eq!(m.validate("Madrid", "").status, ValidationStatus::MissingData);
        assert_eq!(m.validate("Madrid", "2801").status, ValidationStatus::MissingData);
        assert_eq!(m.validate("Madrid", "ABCDE").status, ValidationStatus::MissingData);
    }

    #[test]
    fn test_postal_code_is_trimmed() {
        assert_eq!(matcher().validate("Madrid", " 28013 ").status, ValidationStatus::Valid);
    }
}
