//! Hard validation rules.
//!
//! Deterministic structural checks that need neither reference data nor an
//! external service. Every rule runs; the orchestrator picks the winner.

use serde::{Deserialize, Serialize};

use crate::constants::{is_valid_province_code, DEFAULT_MIN_ALPHANUMERIC_CHARS, POSTCODE_LEN};
use crate::pipeline::processing::parser::ParsedAddress;

/// Kind of structural problem a rule found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleViolation {
    None,
    EmptyAddress,
    TooShort,
    OnlyNumbers,
    InvalidPostcodeFormat,
    InvalidPostcodeProvince,
}

impl RuleViolation {
    /// Violations in the order the orchestrator reports them
    pub const PRIORITY: [RuleViolation; 5] = [
        RuleViolation::EmptyAddress,
        RuleViolation::TooShort,
        RuleViolation::OnlyNumbers,
        RuleViolation::InvalidPostcodeFormat,
        RuleViolation::InvalidPostcodeProvince,
    ];

    /// Short status message used when this violation decides the outcome
    pub fn summary(&self) -> &'static str {
        match self {
            RuleViolation::None => "No violation",
            RuleViolation::EmptyAddress => "Address is empty",
            RuleViolation::TooShort => "Address too short",
            RuleViolation::OnlyNumbers => "Address contains only numbers",
            RuleViolation::InvalidPostcodeFormat => "Invalid postal code format",
            RuleViolation::InvalidPostcodeProvince => {
                "Invalid postal code province (must be 01-52)"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub is_valid: bool,
    pub violation: RuleViolation,
    pub message: String,
}

impl RuleResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            violation: RuleViolation::None,
            message: message.into(),
        }
    }

    fn fail(violation: RuleViolation, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            violation,
            message: message.into(),
        }
    }
}

/// Configuration for the hard rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardRuleConfig {
    /// Minimum number of alphanumeric characters in the raw address
    pub min_alphanumeric_chars: usize,
}

impl Default for HardRuleConfig {
    fn default() -> Self {
        Self {
            min_alphanumeric_chars: DEFAULT_MIN_ALPHANUMERIC_CHARS,
        }
    }
}

/// Postcode must be five digits; a missing one is incomplete, not invalid
pub fn check_postcode_format(postcode: Option<&str>) -> RuleResult {
    let postcode = match postcode.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return RuleResult::pass("No postcode provided"),
    };

    if !postcode.bytes().all(|b| b.is_ascii_digit()) {
        return RuleResult::fail(
            RuleViolation::InvalidPostcodeFormat,
            format!("Postcode '{}' contains non-numeric characters", postcode),
        );
    }

    if postcode.len() != POSTCODE_LEN {
        return RuleResult::fail(
            RuleViolation::InvalidPostcodeFormat,
            format!("Postcode '{}' must be exactly {} digits", postcode, POSTCODE_LEN),
        );
    }

    RuleResult::pass("Valid postcode format")
}

/// First two digits of the postcode must be a province (01-52)
pub fn check_postcode_province(postcode: Option<&str>) -> RuleResult {
    let postcode = match postcode {
        Some(p) if p.chars().count() >= 2 => p,
        _ => return RuleResult::pass("No postcode to check"),
    };

    let province: String = postcode.chars().take(2).collect();
    if !is_valid_province_code(&province) {
        return RuleResult::fail(
            RuleViolation::InvalidPostcodeProvince,
            format!("Province code '{}' is not valid (must be 01-52)", province),
        );
    }

    RuleResult::pass(format!("Valid province code: {}", province))
}

pub fn check_not_empty(parsed: &ParsedAddress) -> RuleResult {
    if parsed.raw.trim().is_empty() {
        return RuleResult::fail(RuleViolation::EmptyAddress, "Address is empty");
    }
    RuleResult::pass("Address has content")
}

pub fn check_minimum_length(parsed: &ParsedAddress, min_chars: usize) -> RuleResult {
    let meaningful = parsed.raw.chars().filter(|c| c.is_alphanumeric()).count();

    if meaningful < min_chars {
        return RuleResult::fail(
            RuleViolation::TooShort,
            format!("Address too short ({} chars, minimum {})", meaningful, min_chars),
        );
    }
    RuleResult::pass(format!("Address length OK ({} chars)", meaningful))
}

/// The address minus its postcode and separators must contain a letter
pub fn check_not_only_numbers(parsed: &ParsedAddress) -> RuleResult {
    let mut text = parsed.raw.clone();
    if let Some(postcode) = parsed.postcode.as_deref().filter(|p| !p.is_empty()) {
        text = text.replace(postcode, "");
    }
    let text = text.replace([',', '.', '-'], "");

    if !text.chars().any(char::is_alphabetic) {
        return RuleResult::fail(RuleViolation::OnlyNumbers, "Address contains only numbers");
    }
    RuleResult::pass("Address contains letters")
}

/// Runs every hard rule against a parsed address
#[derive(Debug, Clone, Default)]
pub struct HardRuleChecker {
    pub config: HardRuleConfig,
}

impl HardRuleChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HardRuleConfig) -> Self {
        Self { config }
    }

    /// All rule results, passed and failed
    pub fn validate_hard_rules(&self, parsed: &ParsedAddress) -> Vec<RuleResult> {
        vec![
            check_not_empty(parsed),
            check_minimum_length(parsed, self.config.min_alphanumeric_chars),
            check_not_only_numbers(parsed),
            check_postcode_format(parsed.postcode.as_deref()),
            check_postcode_province(parsed.postcode.as_deref()),
        ]
    }

    /// Only the failed rules
    pub fn violations(&self, parsed: &ParsedAddress) -> Vec<RuleResult> {
        self.validate_hard_rules(parsed)
            .into_iter()
            .filter(|r| !r.is_valid)
            .collect()
    }
}

/// The violation that decides the outcome, by fixed priority
pub fn dominant_violation(violations: &[RuleResult]) -> Option<RuleViolation> {
    RuleViolation::PRIORITY
        .into_iter()
        .find(|kind| violations.iter().any(|v| v.violation == *kind))
}
