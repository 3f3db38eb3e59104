use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::processing::parser::ParsedAddress;
use crate::types::ValidationResult;

/// Splits free-form address text into components
pub trait AddressParserPort: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedAddress>;
}

/// Classifies whether a piece of address text is a genuine attempt
pub trait NonsenseClassifierPort: Send + Sync {
    fn classify(&self, text: &str) -> Result<NonsenseVerdict>;
}

/// Decides whether an unknown city name belongs to a postal code's area
pub trait CityArbitrationPort: Send + Sync {
    fn arbitrate(
        &self,
        city: &str,
        postcode: &str,
        known_cities: &[String],
    ) -> Result<CityArbitration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressIntent {
    /// Real attempt at an address, typos and gaps included
    ValidAttempt,
    /// Keyboard mashing, random characters
    Gibberish,
    /// "No quiero", "No tengo"
    Refusal,
    /// "TEST", "PRUEBA", placeholders
    TestData,
}

impl AddressIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressIntent::ValidAttempt => "valid_attempt",
            AddressIntent::Gibberish => "gibberish",
            AddressIntent::Refusal => "refusal",
            AddressIntent::TestData => "test_data",
        }
    }
}

impl fmt::Display for AddressIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NonsenseVerdict {
    pub intent: AddressIntent,
    pub confidence: Confidence,
    pub explanation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CityArbitration {
    pub is_valid: bool,
    /// Only meaningful when `is_valid` is true
    pub normalized_city: Option<String>,
    pub explanation: String,
}

/// Raw input row of a batch run
#[derive(Clone, Debug, Default)]
pub struct BatchRow {
    /// Every column of the input, in header order
    pub fields: Vec<(String, String)>,
    pub address: String,
    pub city: String,
    pub postcode: String,
}

// Batch-side ports
#[async_trait]
pub trait ValidationOutputPort: Send + Sync {
    async fn write_result(&self, row: &BatchRow, result: &ValidationResult) -> anyhow::Result<()>;
    async fn finish(&self) -> anyhow::Result<()>;
}
