use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::ports::AddressParserPort;
use crate::error::Result;
use crate::pipeline::processing::normalize::normalize_for_comparison;

/// Structured address components extracted from raw text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddress {
    /// Original input, trimmed
    pub raw: String,
    pub road: Option<String>,
    pub house_number: Option<String>,
    /// Floor, door, staircase
    pub unit: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    /// Province or region
    pub state_district: Option<String>,
    pub country: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl ParsedAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }

    pub fn has_postcode(&self) -> bool {
        present(&self.postcode)
    }

    pub fn has_city(&self) -> bool {
        present(&self.city)
    }

    pub fn has_road(&self) -> bool {
        present(&self.road)
    }

    /// Road, house number and unit joined with spaces
    pub fn street_address(&self) -> String {
        [&self.road, &self.house_number, &self.unit]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Prefer caller-supplied structured fields over parsed ones when non-empty
    pub fn with_overrides(mut self, city: &str, postcode: &str) -> Self {
        if !city.trim().is_empty() {
            self.city = Some(city.trim().to_string());
        }
        if !postcode.trim().is_empty() {
            self.postcode = Some(postcode.trim().to_string());
        }
        self
    }
}

/// Parse `raw` and apply the caller's structured city/postcode on top
pub fn parse_or_use_existing(
    parser: &dyn AddressParserPort,
    raw: &str,
    city: &str,
    postcode: &str,
) -> Result<ParsedAddress> {
    Ok(parser.parse(raw)?.with_overrides(city, postcode))
}

static POSTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("valid postcode regex"));

static STREET_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:c/|(?:calle|c|cl|avda|avd|av|avenida|plaza|pl|pza|plza|paseo|pº|po|camino|cno|carretera|ctra|ronda|rda|traves[ií]a|trv|glorieta|gta|urbanizaci[oó]n|urb|pasaje|psje|callej[oó]n|rambla|v[ií]a|pol[ií]gono|barrio|carrer|r[uú]a|kalea|avinguda|pla[cç]a)(?:\.|\s))",
    )
    .expect("valid street type regex")
});

static ROAD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<road>.*?\D)\s+(?:(?i:n[º°o]\.?|num\.?|n[uú]mero)\s*)?(?P<number>\d+[A-Za-z]?(?:-\d+)?)$",
    )
    .expect("valid road number regex")
});

static HOUSE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[A-Za-z]?(?:-\d+)?$").expect("valid house number regex"));

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:bajo|bj|planta|piso|puerta|pta|escalera|esc|entresuelo|entlo|[aá]tico|local|dcha|izq|izqda|izda)\b|\d+\s*[ºª°])",
    )
    .expect("valid unit regex")
});

static CITY_PROVINCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<city>.+?)\s*\((?P<province>[^)]+)\)$").expect("valid city province regex")
});

const COUNTRY_NAMES: &[&str] = &["espana", "spain", "reino de espana"];

fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

fn looks_like_street(segment: &str) -> bool {
    STREET_TYPE_RE.is_match(segment) || ROAD_NUMBER_RE.is_match(segment)
}

/// Comma-segment heuristic parser for Spanish addresses.
///
/// Expects the usual "street number, unit, city, postcode" shape in any
/// order; it never fails, it just leaves components it cannot place empty.
#[derive(Debug, Default, Clone)]
pub struct HeuristicAddressParser;

impl HeuristicAddressParser {
    pub fn new() -> Self {
        Self
    }

    fn set_road(parsed: &mut ParsedAddress, segment: &str) {
        match ROAD_NUMBER_RE.captures(segment) {
            Some(caps) => {
                parsed.road = Some(caps["road"].trim().to_string());
                parsed.house_number = Some(caps["number"].to_string());
            }
            None => parsed.road = Some(segment.to_string()),
        }
    }

    fn set_city(parsed: &mut ParsedAddress, segment: &str) {
        match CITY_PROVINCE_RE.captures(segment) {
            Some(caps) => {
                parsed.city = Some(caps["city"].trim().to_string());
                parsed.state_district = Some(caps["province"].trim().to_string());
            }
            None => parsed.city = Some(segment.to_string()),
        }
    }

    fn parse_segments(&self, raw: &str) -> ParsedAddress {
        let mut parsed = ParsedAddress::new(raw);
        let mut segments: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        segments.retain(|segment| {
            if COUNTRY_NAMES.contains(&normalize_for_comparison(segment).as_str()) {
                parsed.country.get_or_insert_with(|| segment.clone());
                false
            } else {
                true
            }
        });

        // The last five-digit token is the postcode; what surrounds it in the
        // same segment is usually the city ("28013 Madrid", "Barcelona 08006")
        let mut postcode_city: Option<String> = None;
        let located = segments.iter().enumerate().rev().find_map(|(i, segment)| {
            POSTCODE_RE
                .find_iter(segment)
                .last()
                .map(|m| (i, m.start(), m.end()))
        });
        if let Some((idx, start, end)) = located {
            let segment = segments.remove(idx);
            parsed.postcode = Some(segment[start..end].to_string());
            let before = segment[..start].trim();
            let after = segment[end..].trim();

            if has_letters(after) {
                postcode_city = Some(after.to_string());
                if !before.is_empty() {
                    segments.insert(idx, before.to_string());
                }
            } else if has_letters(before) && !looks_like_street(before) {
                postcode_city = Some(before.to_string());
            } else if !before.is_empty() {
                segments.insert(idx, before.to_string());
            }
        }

        let mut units = Vec::new();
        let mut others = Vec::new();
        for segment in segments {
            if parsed.road.is_none() && looks_like_street(&segment) {
                Self::set_road(&mut parsed, &segment);
            } else if UNIT_RE.is_match(&segment) {
                units.push(segment);
            } else if has_letters(&segment) {
                others.push(segment);
            } else if parsed.house_number.is_none() && HOUSE_NUMBER_RE.is_match(&segment) {
                parsed.house_number = Some(segment);
            }
        }

        if !units.is_empty() {
            parsed.unit = Some(units.join(", "));
        }

        let mut others = others.into_iter();
        match postcode_city {
            Some(city) => {
                if parsed.road.is_none() {
                    if let Some(road) = others.next() {
                        Self::set_road(&mut parsed, &road);
                    }
                }
                Self::set_city(&mut parsed, &city);
                if parsed.state_district.is_none() {
                    parsed.state_district = others.next();
                }
            }
            None => {
                // A lone lettered segment is more likely a city than a street
                if parsed.road.is_none() && others.len() >= 2 {
                    if let Some(road) = others.next() {
                        Self::set_road(&mut parsed, &road);
                    }
                }
                if let Some(city) = others.next() {
                    Self::set_city(&mut parsed, &city);
                }
                if parsed.state_district.is_none() {
                    parsed.state_district = others.next();
                }
            }
        }

        parsed
    }
}

impl AddressParserPort for HeuristicAddressParser {
    fn parse(&self, raw: &str) -> Result<ParsedAddress> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(ParsedAddress::default());
        }

        let parsed = self.parse_segments(raw);
        debug!(
            raw,
            road = ?parsed.road,
            city = ?parsed.city,
            postcode = ?parsed.postcode,
            "Parsed address"
        );
        Ok(parsed)
    }
}
