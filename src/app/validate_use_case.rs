use std::sync::Arc;

use tracing::{debug, error};

use crate::app::ports::{
    AddressIntent, AddressParserPort, CityArbitrationPort, NonsenseClassifierPort,
};
use crate::constants::DEFAULT_MAX_KNOWN_CITIES;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::parser::{
    parse_or_use_existing, HeuristicAddressParser, ParsedAddress,
};
use crate::pipeline::processing::postal::{CityPostalMatcher, ValidationStatus};
use crate::pipeline::processing::quality_gate::{
    dominant_violation, HardRuleChecker, HardRuleConfig,
};
use crate::pipeline::processing::reference::ReferenceIndex;
use crate::types::{AddressStatus, ValidationResult};

/// Runs one address through every validation stage and settles on a
/// terminal status.
///
/// The classifier and arbitration handles are optional; leaving them out is
/// the offline mode in which uncertain cases go to review.
pub struct AddressValidator {
    parser: Arc<dyn AddressParserPort>,
    rules: HardRuleChecker,
    matcher: CityPostalMatcher,
    classifier: Option<Arc<dyn NonsenseClassifierPort>>,
    arbiter: Option<Arc<dyn CityArbitrationPort>>,
    max_known_cities: usize,
}

impl AddressValidator {
    pub fn new(index: Arc<ReferenceIndex>, parser: Arc<dyn AddressParserPort>) -> Self {
        Self {
            parser,
            rules: HardRuleChecker::new(),
            matcher: CityPostalMatcher::new(index),
            classifier: None,
            arbiter: None,
            max_known_cities: DEFAULT_MAX_KNOWN_CITIES,
        }
    }

    /// Validator with the built-in heuristic parser and no external services
    pub fn offline(index: Arc<ReferenceIndex>) -> Self {
        Self::new(index, Arc::new(HeuristicAddressParser::new()))
    }

    pub fn with_rules(mut self, config: HardRuleConfig) -> Self {
        self.rules = HardRuleChecker::with_config(config);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn NonsenseClassifierPort>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_arbiter(mut self, arbiter: Arc<dyn CityArbitrationPort>) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    pub fn with_max_known_cities(mut self, max: usize) -> Self {
        self.max_known_cities = max;
        self
    }

    pub fn matcher(&self) -> &CityPostalMatcher {
        &self.matcher
    }

    pub fn classification_enabled(&self) -> bool {
        self.classifier.is_some()
    }

    /// Validate a single address.
    ///
    /// `city` and `postcode` are optional structured fields; when non-empty
    /// they replace whatever the parser extracted. Errors only come from
    /// collaborators (parser, classifier, arbitration).
    pub fn validate(&self, address: &str, city: &str, postcode: &str) -> Result<ValidationResult> {
        let parsed = parse_or_use_existing(self.parser.as_ref(), address, city, postcode)?;
        let pending = ValidationResult::pending(address, city, postcode, parsed.clone());
        let result = self.decide(pending, &parsed, address)?;

        metrics::validation::status_recorded(result.status);
        debug!(status = %result.status, message = %result.message, "Address validated");
        Ok(result)
    }

    fn decide(
        &self,
        mut result: ValidationResult,
        parsed: &ParsedAddress,
        address: &str,
    ) -> Result<ValidationResult> {
        // Stage 1: hard rules
        let violations = self.rules.violations(parsed);
        result.rule_violations = violations.iter().map(|v| v.message.clone()).collect();
        if let Some(kind) = dominant_violation(&violations) {
            return Ok(result.finish(AddressStatus::InvalidFormat, kind.summary()));
        }

        // Stage 2: nonsense detection on the street text
        if let Some(classifier) = &self.classifier {
            let text = if parsed.has_road() {
                parsed.road.as_deref().unwrap_or(address)
            } else {
                address
            };
            let verdict = classifier.classify(text).map_err(|e| {
                metrics::collaborators::call_failed("classifier");
                error!(error = %e, "Nonsense classifier failed");
                e
            })?;
            metrics::collaborators::call_succeeded("classifier");

            result.intent = Some(verdict.intent);
            result.confidence = Some(verdict.confidence);

            match verdict.intent {
                AddressIntent::Gibberish | AddressIntent::TestData => {
                    let message =
                        format!("Street address is {}: {}", verdict.intent, verdict.explanation);
                    return Ok(result.finish(AddressStatus::Nonsense, message));
                }
                AddressIntent::Refusal => {
                    let message =
                        format!("User refused to provide address: {}", verdict.explanation);
                    return Ok(result.finish(AddressStatus::Nonsense, message));
                }
                AddressIntent::ValidAttempt => {}
            }
        }

        // Stage 3: city against postal code province
        if let (Some(city), Some(postcode)) = (
            parsed.city.as_deref().filter(|_| parsed.has_city()),
            parsed.postcode.as_deref().filter(|_| parsed.has_postcode()),
        ) {
            let matched = self.matcher.validate(city, postcode);
            result.city_postal_status = Some(matched.status);

            return match matched.status {
                ValidationStatus::Valid => {
                    result.normalized_city = Some(city.to_string());
                    result.normalized_postcode = Some(postcode.to_string());
                    Ok(result.finish(AddressStatus::Valid, "City matches postal code province"))
                }
                ValidationStatus::Invalid => {
                    Ok(result.finish(AddressStatus::InvalidMismatch, matched.message))
                }
                ValidationStatus::UnknownCity => self.arbitrate(result, city, postcode),
                ValidationStatus::MissingData => {
                    Ok(result.finish(AddressStatus::NeedsReview, matched.message))
                }
            };
        }

        // Stage 4: nothing to match against
        if self.classification_enabled() {
            if parsed.has_city() || parsed.has_postcode() {
                return Ok(
                    result.finish(AddressStatus::Valid, "Appears to be a valid address attempt")
                );
            }
            return Ok(result.finish(
                AddressStatus::NeedsReview,
                "Valid attempt but missing city/postcode",
            ));
        }

        Ok(result.finish(
            AddressStatus::NeedsReview,
            "Could not validate without external classification",
        ))
    }

    fn arbitrate(
        &self,
        mut result: ValidationResult,
        city: &str,
        postcode: &str,
    ) -> Result<ValidationResult> {
        let arbiter = match &self.arbiter {
            Some(arbiter) => arbiter,
            None => {
                return Ok(result.finish(AddressStatus::NeedsReview, "City not found in database"))
            }
        };

        let province = postcode.trim().get(..2).unwrap_or_default();
        let known_cities = self.matcher.index().cities_for_province(province);
        let known_cities = &known_cities[..known_cities.len().min(self.max_known_cities)];

        let verdict = arbiter.arbitrate(city, postcode, known_cities).map_err(|e| {
            metrics::collaborators::call_failed("arbitration");
            error!(error = %e, city, postcode, "City arbitration failed");
            e
        })?;
        metrics::collaborators::call_succeeded("arbitration");

        if verdict.is_valid {
            result.normalized_city =
                Some(verdict.normalized_city.unwrap_or_else(|| city.to_string()));
            result.normalized_postcode = Some(postcode.to_string());
            let message = format!("City validated by arbitration: {}", verdict.explanation);
            Ok(result.finish(AddressStatus::ValidNormalized, message))
        } else {
            let message = format!("City unknown: {}", verdict.explanation);
            Ok(result.finish(AddressStatus::NeedsReview, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{CityArbitration, Confidence, NonsenseVerdict};
    use crate::error::ValidatorError;
    use crate::pipeline::processing::reference::CollisionPolicy;
    use std::sync::Mutex;

    const TABLE: &str = "\
280Madrid
286Pozuelo de Alarcón
080Barcelona
41xSevilla
";

    fn index() -> Arc<ReferenceIndex> {
        Arc::new(ReferenceIndex::from_table(TABLE, CollisionPolicy::FirstWins).unwrap())
    }

    struct FixedClassifier {
        intent: AddressIntent,
        seen: Mutex<Vec<String>>,
    }

    impl FixedClassifier {
        fn new(intent: AddressIntent) -> Arc<Self> {
            Arc::new(Self {
                intent,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl NonsenseClassifierPort for FixedClassifier {
        fn classify(&self, text: &str) -> Result<NonsenseVerdict> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(NonsenseVerdict {
                intent: self.intent,
                confidence: Confidence::High,
                explanation: "fixed".to_string(),
            })
        }
    }

    struct FailingClassifier;

    impl NonsenseClassifierPort for FailingClassifier {
        fn classify(&self, _text: &str) -> Result<NonsenseVerdict> {
            Err(ValidatorError::Classifier("connection refused".to_string()))
        }
    }

    struct FailingArbiter;

    impl CityArbitrationPort for FailingArbiter {
        fn arbitrate(
            &self,
            _city: &str,
            _postcode: &str,
            _known_cities: &[String],
        ) -> Result<CityArbitration> {
            Err(ValidatorError::Arbitration("timed out".to_string()))
        }
    }

    struct FixedArbiter {
        verdict: CityArbitration,
        known: Mutex<Vec<String>>,
    }

    impl CityArbitrationPort for FixedArbiter {
        fn arbitrate(
            &self,
            _city: &str,
            _postcode: &str,
            known_cities: &[String],
        ) -> Result<CityArbitration> {
            *self.known.lock().unwrap() = known_cities.to_vec();
            Ok(self.verdict.clone())
        }
    }

    fn arbiter(is_valid: bool, normalized: Option<&str>) -> Arc<FixedArbiter> {
        Arc::new(FixedArbiter {
            verdict: CityArbitration {
                is_valid,
                normalized_city: normalized.map(str::to_string),
                explanation: "arbitrated".to_string(),
            },
            known: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_valid_offline() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("Calle Gran Vía 32, Madrid, 28013", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::Valid);
        assert_eq!(result.normalized_city.as_deref(), Some("Madrid"));
        assert_eq!(result.normalized_postcode.as_deref(), Some("28013"));
        assert_eq!(result.city_postal_status, Some(ValidationStatus::Valid));
    }

    #[test]
    fn test_empty_address_is_invalid_format() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::InvalidFormat);
        assert!(result.message.contains("empty"));
    }

    #[test]
    fn test_empty_wins_over_province_violation() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("", "", "99999").unwrap();
        assert_eq!(result.status, AddressStatus::InvalidFormat);
        assert_eq!(result.message, "Address is empty");
        assert!(result.rule_violations.len() >= 2);
    }

    #[test]
    fn test_bad_province_is_invalid_format() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("Calle Mayor 5", "Madrid", "99001").unwrap();
        assert_eq!(result.status, AddressStatus::InvalidFormat);
        assert!(result.message.contains("province"));
    }

    #[test]
    fn test_mismatch() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("Calle Mayor 5", "Madrid", "08001").unwrap();
        assert_eq!(result.status, AddressStatus::InvalidMismatch);
        assert_eq!(result.city_postal_status, Some(ValidationStatus::Invalid));
    }

    #[test]
    fn test_unknown_city_offline_needs_review() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("Calle Mayor 5", "Winterfell", "28001").unwrap();
        assert_eq!(result.status, AddressStatus::NeedsReview);
        assert_eq!(result.city_postal_status, Some(ValidationStatus::UnknownCity));
    }

    #[test]
    fn test_missing_city_offline_needs_review() {
        let validator = AddressValidator::offline(index());
        let result = validator.validate("Calle Mayor 5", "", "28001").unwrap();
        assert_eq!(result.status, AddressStatus::NeedsReview);
        assert!(result.city_postal_status.is_none());
    }

    #[test]
    fn test_test_data_is_nonsense() {
        let classifier = FixedClassifier::new(AddressIntent::TestData);
        let validator = AddressValidator::offline(index()).with_classifier(classifier.clone());
        let result = validator.validate("TEST TEST PRUEBA", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::Nonsense);
        assert_eq!(result.intent, Some(AddressIntent::TestData));
        assert_eq!(classifier.seen.lock().unwrap().as_slice(), ["TEST TEST PRUEBA"]);
    }

    #[test]
    fn test_refusal_has_its_own_message() {
        let validator = AddressValidator::offline(index())
            .with_classifier(FixedClassifier::new(AddressIntent::Refusal));
        let result = validator.validate("No quiero darla", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::Nonsense);
        assert!(result.message.starts_with("User refused"));
    }

    #[test]
    fn test_classifier_sees_road_when_present() {
        let classifier = FixedClassifier::new(AddressIntent::ValidAttempt);
        let validator = AddressValidator::offline(index()).with_classifier(classifier.clone());
        validator.validate("Calle Gran Vía 32, Madrid, 28013", "", "").unwrap();
        assert_eq!(classifier.seen.lock().unwrap().as_slice(), ["Calle Gran Vía"]);
    }

    #[test]
    fn test_classifier_not_called_after_rule_violation() {
        let classifier = FixedClassifier::new(AddressIntent::Gibberish);
        let validator = AddressValidator::offline(index()).with_classifier(classifier.clone());
        let result = validator.validate("AB", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::InvalidFormat);
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fallback_with_classifier() {
        let validator = AddressValidator::offline(index())
            .with_classifier(FixedClassifier::new(AddressIntent::ValidAttempt));

        let result = validator.validate("Calle Mayor 5", "Madrid", "").unwrap();
        assert_eq!(result.status, AddressStatus::Valid);
        assert!(result.normalized_city.is_none());

        let result = validator.validate("Calle Mayor 5", "", "").unwrap();
        assert_eq!(result.status, AddressStatus::NeedsReview);
    }

    #[test]
    fn test_classifier_failure_is_an_error() {
        let validator =
            AddressValidator::offline(index()).with_classifier(Arc::new(FailingClassifier));
        let err = validator.validate("Calle Gran Vía 32, Madrid, 28013", "", "").unwrap_err();
        assert!(matches!(err, ValidatorError::Classifier(_)));
    }

    #[test]
    fn test_arbiter_failure_is_an_error() {
        let validator = AddressValidator::offline(index()).with_arbiter(Arc::new(FailingArbiter));
        match validator.validate("Calle Mayor 5", "Winterfell", "28001") {
            Err(ValidatorError::Arbitration(reason)) => assert_eq!(reason, "timed out"),
            other => panic!("expected arbitration error, got {:?}", other.map(|r| r.status)),
        }

        // rows that never reach arbitration are unaffected
        let result = validator.validate("Calle Mayor 5", "Madrid", "28001").unwrap();
        assert_eq!(result.status, AddressStatus::Valid);
    }

    #[test]
    fn test_arbitration_normalizes_city() {
        let arbiter = arbiter(true, Some("Sevilla"));
        let validator = AddressValidator::offline(index()).with_arbiter(arbiter.clone());
        let result = validator.validate("Calle Sierpes 10", "Seville", "41001").unwrap();
        assert_eq!(result.status, AddressStatus::ValidNormalized);
        assert_eq!(result.normalized_city.as_deref(), Some("Sevilla"));
        assert_eq!(result.normalized_postcode.as_deref(), Some("41001"));
        assert_eq!(arbiter.known.lock().unwrap().as_slice(), ["Sevilla"]);
    }

    #[test]
    fn test_arbitration_keeps_original_without_suggestion() {
        let validator = AddressValidator::offline(index()).with_arbiter(arbiter(true, None));
        let result = validator.validate("Calle Sierpes 10", "Seville", "41001").unwrap();
        assert_eq!(result.normalized_city.as_deref(), Some("Seville"));
    }

    #[test]
    fn test_arbitration_rejection_needs_review() {
        let validator =
            AddressValidator::offline(index()).with_arbiter(arbiter(false, Some("Ignored")));
        let result = validator.validate("Calle Mayor 5", "Winterfell", "28001").unwrap();
        assert_eq!(result.status, AddressStatus::NeedsReview);
        assert!(result.normalized_city.is_none());
    }

    #[test]
    fn test_known_cities_are_capped() {
        let arbiter = arbiter(false, None);
        let validator = AddressValidator::offline(index())
            .with_arbiter(arbiter.clone())
            .with_max_known_cities(1);
        validator.validate("Calle Mayor 5", "Winterfell", "28001").unwrap();
        assert_eq!(arbiter.known.lock().unwrap().as_slice(), ["Madrid"]);
    }
}
