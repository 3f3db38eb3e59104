use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::ports::{AddressIntent, Confidence};
use crate::pipeline::processing::parser::ParsedAddress;
use crate::pipeline::processing::postal::ValidationStatus;

/// Final status after all validation stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    /// Passed all checks
    Valid,
    /// Valid once the city name was normalized by arbitration
    ValidNormalized,
    /// Failed a hard rule (empty, bad postcode format, ...)
    InvalidFormat,
    /// City does not belong to the postal code's province
    InvalidMismatch,
    /// Gibberish, refusal or test data
    Nonsense,
    /// Could not be decided automatically
    NeedsReview,
    /// Initial state, never returned
    Unknown,
}

impl AddressStatus {
    pub const ALL: [AddressStatus; 7] = [
        AddressStatus::Valid,
        AddressStatus::ValidNormalized,
        AddressStatus::InvalidFormat,
        AddressStatus::InvalidMismatch,
        AddressStatus::Nonsense,
        AddressStatus::NeedsReview,
        AddressStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Valid => "valid",
            AddressStatus::ValidNormalized => "valid_normalized",
            AddressStatus::InvalidFormat => "invalid_format",
            AddressStatus::InvalidMismatch => "invalid_mismatch",
            AddressStatus::Nonsense => "nonsense",
            AddressStatus::NeedsReview => "needs_review",
            AddressStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete validation result for one address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    // Original input
    pub raw_address: String,
    pub raw_city: String,
    pub raw_postcode: String,

    /// Parsed components, after caller overrides
    pub parsed: ParsedAddress,

    pub status: AddressStatus,
    pub message: String,

    pub normalized_city: Option<String>,
    pub normalized_postcode: Option<String>,

    // Details from each stage
    pub rule_violations: Vec<String>,
    pub city_postal_status: Option<ValidationStatus>,
    pub intent: Option<AddressIntent>,
    pub confidence: Option<Confidence>,

    /// When the decision was taken
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub(crate) fn pending(
        address: &str,
        city: &str,
        postcode: &str,
        parsed: ParsedAddress,
    ) -> Self {
        Self {
            raw_address: address.to_string(),
            raw_city: city.to_string(),
            raw_postcode: postcode.to_string(),
            parsed,
            status: AddressStatus::Unknown,
            message: String::new(),
            normalized_city: None,
            normalized_postcode: None,
            rule_violations: Vec::new(),
            city_postal_status: None,
            intent: None,
            confidence: None,
            validated_at: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self, status: AddressStatus, message: impl Into<String>) -> Self {
        self.status = status;
        self.message = message.into();
        self
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.status, AddressStatus::Valid | AddressStatus::ValidNormalized)
    }
}
