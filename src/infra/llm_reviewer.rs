//! LLM reviewer
//!
//! Classifier and arbitration ports backed by an OpenAI-compatible
//! `/chat/completions` endpoint. Calls are blocking; run them off the async
//! runtime (`spawn_blocking`).

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{
    AddressIntent, CityArbitration, CityArbitrationPort, Confidence, NonsenseClassifierPort,
    NonsenseVerdict,
};
use crate::config::LlmConfig;
use crate::error::{Result, ValidatorError};

const CLASSIFY_MAX_TOKENS: u32 = 80;
const ARBITRATE_MAX_TOKENS: u32 = 120;

pub struct LlmReviewer {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl LlmReviewer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// First choice of the completion, `None` when the endpoint returned no choices
    fn chat(&self, prompt: &str, max_tokens: u32) -> Result<Option<String>> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.1,
            "max_tokens": max_tokens
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?.error_for_status()?;

        #[derive(Deserialize)]
        struct Message {
            content: String,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json()?;
        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string());

        debug!(model = %self.model, response = ?content, "LLM response");
        Ok(content)
    }
}

impl NonsenseClassifierPort for LlmReviewer {
    fn classify(&self, text: &str) -> Result<NonsenseVerdict> {
        let response = self
            .chat(&classification_prompt(text), CLASSIFY_MAX_TOKENS)?
            .ok_or_else(|| ValidatorError::Classifier("response has no choices".to_string()))?;
        parse_classification(&response)
    }
}

impl CityArbitrationPort for LlmReviewer {
    fn arbitrate(
        &self,
        city: &str,
        postcode: &str,
        known_cities: &[String],
    ) -> Result<CityArbitration> {
        let prompt = arbitration_prompt(city, postcode, known_cities);
        let response = self
            .chat(&prompt, ARBITRATE_MAX_TOKENS)?
            .ok_or_else(|| ValidatorError::Arbitration("response has no choices".to_string()))?;
        parse_arbitration(&response)
    }
}

pub fn classification_prompt(address: &str) -> String {
    format!(
        r#"Analyze this Spanish address input and classify the user's intent.

Address: "{address}"

Classify as ONE of:
- VALID_ATTEMPT: A genuine attempt to provide an address (may have typos or be incomplete, that's OK)
- GIBBERISH: Random characters, keyboard mashing, meaningless text
- REFUSAL: User explicitly refused to provide address (e.g., "No quiero", "No tengo")
- TEST_DATA: Obvious test/placeholder data (e.g., "TEST", "PRUEBA", "asdfgh")

Respond in this exact format:
CLASSIFICATION: [one of the above]
CONFIDENCE: [high/medium/low]
REASON: [brief explanation]"#
    )
}

pub fn arbitration_prompt(city: &str, postcode: &str, known_cities: &[String]) -> String {
    format!(
        r#"Does "{city}" refer to a city in Spanish postal code {postcode}?

Known cities in this area: {cities}

Answer YES if:
- Exact match (Lleida = Lleida)
- Language variant (Lérida = Lleida, Donostia = San Sebastián)
- Typo (Madird = Madrid)
- Missing accent (Malaga = Málaga)

Answer NO only if fictional or wrong province.

Format:
VALID: yes or no
NORMALIZED: correct city name, or none
REASON: one sentence"#,
        cities = known_cities.join(", ")
    )
}

/// Value of the first `KEY: value` line, key matched case-insensitively
fn field<'a>(response: &'a str, key: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let line = line.trim().trim_start_matches(['*', '-', ' ']);
        let (name, value) = line.split_once(':')?;
        let name = name.trim_matches('*').trim();
        name.eq_ignore_ascii_case(key)
            .then(|| value.trim().trim_matches('*').trim())
    })
}

fn reason_or_full_text(response: &str) -> String {
    field(response, "REASON")
        .filter(|r| !r.is_empty())
        .unwrap_or(response.trim())
        .to_string()
}

pub fn parse_classification(response: &str) -> Result<NonsenseVerdict> {
    let label = field(response, "CLASSIFICATION")
        .ok_or_else(|| {
            ValidatorError::Classifier(format!("no CLASSIFICATION line in '{}'", response.trim()))
        })?
        .to_ascii_uppercase();

    // TEST_DATA before the others so "VALID_ATTEMPT" never shadows it
    let intent = if label.contains("TEST_DATA") {
        AddressIntent::TestData
    } else if label.contains("GIBBERISH") {
        AddressIntent::Gibberish
    } else if label.contains("REFUSAL") {
        AddressIntent::Refusal
    } else if label.contains("VALID_ATTEMPT") {
        AddressIntent::ValidAttempt
    } else {
        return Err(ValidatorError::Classifier(format!(
            "unrecognised classification '{}'",
            label
        )));
    };

    let confidence = match field(response, "CONFIDENCE").map(str::to_ascii_lowercase) {
        Some(c) if c.contains("high") => Confidence::High,
        Some(c) if c.contains("medium") => Confidence::Medium,
        _ => Confidence::Low,
    };

    Ok(NonsenseVerdict {
        intent,
        confidence,
        explanation: reason_or_full_text(response),
    })
}

pub fn parse_arbitration(response: &str) -> Result<CityArbitration> {
    let verdict = field(response, "VALID").ok_or_else(|| {
        ValidatorError::Arbitration(format!("no VALID line in '{}'", response.trim()))
    })?;
    let is_valid = verdict.to_ascii_lowercase().starts_with("yes");

    let normalized_city = field(response, "NORMALIZED")
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("none"))
        .map(str::to_string);

    Ok(CityArbitration {
        is_valid,
        normalized_city,
        explanation: reason_or_full_text(response),
    })
}
