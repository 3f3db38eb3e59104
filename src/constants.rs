/// Shared constants for address validation
/// These values are referenced by the normalizer, the rule checks and the CLI

/// Articles and prepositions that never count as a meaningful city word
pub const CITY_STOPWORDS: &[&str] = &["de", "del", "la", "el", "los", "las", "l", "d", "en", "a"];

/// Words of this length or shorter are never used as variant keys
pub const MIN_VARIANT_WORD_LEN: usize = 2;

/// Lowest and highest Spanish province codes (Álava .. Melilla)
pub const MIN_PROVINCE_CODE: u8 = 1;
pub const MAX_PROVINCE_CODE: u8 = 52;

/// Spanish postal codes are always five digits
pub const POSTCODE_LEN: usize = 5;

/// Default threshold for the minimum-length rule
pub const DEFAULT_MIN_ALPHANUMERIC_CHARS: usize = 5;

/// Upper bound on the city list sent to the arbitration service
pub const DEFAULT_MAX_KNOWN_CITIES: usize = 10;

// Default file locations (relative to the working directory)
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_REFERENCE_PATH: &str = "data/reference/postal-codes/codciu.txt";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Returns true if `word` is one of the city stopwords
pub fn is_city_stopword(word: &str) -> bool {
    CITY_STOPWORDS.contains(&word)
}

/// Returns true if `code` is a two-digit string in the 01..=52 range
pub fn is_valid_province_code(code: &str) -> bool {
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    code.parse::<u8>()
        .map(|n| (MIN_PROVINCE_CODE..=MAX_PROVINCE_CODE).contains(&n))
        .unwrap_or(false)
}

/// Returns true if `code` is exactly five ASCII digits
pub fn is_postcode_shape(code: &str) -> bool {
    code.len() == POSTCODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}
