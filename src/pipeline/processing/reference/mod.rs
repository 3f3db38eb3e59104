//! Reference index of Spanish municipalities by province.
//!
//! Built once from the `codciu` table (one line per municipality: a
//! three-character code whose first two digits are the province, followed
//! directly by the name) and shared read-only afterwards.

pub mod names;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::is_valid_province_code;
use crate::error::{Result, ValidatorError};
use crate::observability::metrics;
use crate::pipeline::processing::normalize::{extract_city_variants, normalize_city};

pub use names::{split_city_names, SplitRule, SPLIT_RULES};

/// What to do when two reference lines normalize to the same city key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep the province of the first line seen
    #[default]
    FirstWins,
    /// Later lines overwrite earlier ones
    LastWins,
}

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    /// Province code → display names, in file order
    province_to_cities: HashMap<String, Vec<String>>,
    /// Normalized city key → province code
    city_to_province: HashMap<String, String>,
    /// Variant key → display names containing it
    variant_to_cities: HashMap<String, Vec<String>>,
    policy: CollisionPolicy,
    collisions: usize,
}

static SHARED_INDEX: OnceCell<Arc<ReferenceIndex>> = OnceCell::new();

impl ReferenceIndex {
    /// Load the index from a reference file on disk
    pub fn load(path: &Path, policy: CollisionPolicy) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            ValidatorError::Config(format!(
                "Failed to open reference table '{}': {}",
                path.display(),
                e
            ))
        })?;
        let index = Self::from_reader(BufReader::new(file), policy)?;
        info!(
            path = %path.display(),
            provinces = index.province_count(),
            cities = index.city_count(),
            collisions = index.collisions,
            "Loaded reference index"
        );
        Ok(index)
    }

    /// Process-wide index, loaded on first use.
    ///
    /// Later calls return the index built by the first successful call,
    /// whatever path they pass.
    pub fn shared(path: &Path, policy: CollisionPolicy) -> Result<Arc<Self>> {
        SHARED_INDEX
            .get_or_try_init(|| Self::load(path, policy).map(Arc::new))
            .cloned()
    }

    /// Build the index from any line-oriented source
    pub fn from_reader<R: BufRead>(reader: R, policy: CollisionPolicy) -> Result<Self> {
        let mut index = ReferenceIndex {
            policy,
            ..Default::default()
        };

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            index.load_line(line_no + 1, &line)?;
        }

        if index.city_to_province.is_empty() {
            return Err(ValidatorError::ReferenceData {
                line: 0,
                reason: "reference table contains no city entries".to_string(),
            });
        }

        Ok(index)
    }

    /// Convenience for tests and embedded tables
    pub fn from_table(table: &str, policy: CollisionPolicy) -> Result<Self> {
        Self::from_reader(table.as_bytes(), policy)
    }

    fn load_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let line = line.trim();
        if line.chars().count() < 4 {
            return Ok(());
        }

        // Split after the third character, not the third byte
        let split_at = line.char_indices().nth(3).map(|(i, _)| i).unwrap_or(line.len());
        let (code, city) = line.split_at(split_at);
        let city = city.trim();
        if city.is_empty() {
            return Ok(());
        }

        let province: String = code.chars().take(2).collect();
        if !is_valid_province_code(&province) {
            return Err(ValidatorError::ReferenceData {
                line: line_no,
                reason: format!("invalid province code '{}' in code '{}'", province, code),
            });
        }

        for name in split_city_names(city) {
            if name.is_empty() {
                continue;
            }
            self.insert(&province, name);
        }

        Ok(())
    }

    fn insert(&mut self, province: &str, name: String) {
        let key = normalize_city(&name);

        match self.city_to_province.get(&key) {
            Some(existing) if existing != province => {
                let (kept, dropped) = match self.policy {
                    CollisionPolicy::FirstWins => (existing.clone(), province.to_string()),
                    CollisionPolicy::LastWins => (province.to_string(), existing.clone()),
                };
                self.collisions += 1;
                metrics::reference::collision_detected();
                warn!(city = %name, %kept, %dropped, "City name appears in more than one province");
                if self.policy == CollisionPolicy::LastWins {
                    self.city_to_province.insert(key, province.to_string());
                }
            }
            Some(_) => {
                debug!(city = %name, province, "Duplicate reference entry");
            }
            None => {
                self.city_to_province.insert(key, province.to_string());
            }
        }

        for variant in extract_city_variants(&name) {
            let cities = self.variant_to_cities.entry(variant).or_default();
            if !cities.contains(&name) {
                cities.push(name.clone());
            }
        }

        self.province_to_cities
            .entry(province.to_string())
            .or_default()
            .push(name);
    }

    /// Known display names for a province, in reference order
    pub fn cities_for_province(&self, province: &str) -> &[String] {
        self.province_to_cities
            .get(province)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Province of a city via exact normalized lookup
    pub fn province_for_city(&self, city: &str) -> Option<&str> {
        self.province_for_key(&normalize_city(city))
    }

    /// Province for an already-normalized key
    pub fn province_for_key(&self, key: &str) -> Option<&str> {
        self.city_to_province.get(key).map(|p| p.as_str())
    }

    /// Display names sharing a variant key
    pub fn cities_for_variant(&self, variant: &str) -> Option<&[String]> {
        self.variant_to_cities.get(variant).map(|v| v.as_slice())
    }

    pub fn has_province(&self, province: &str) -> bool {
        self.province_to_cities.contains_key(province)
    }

    pub fn province_count(&self) -> usize {
        self.province_to_cities.len()
    }

    /// Number of distinct normalized city keys
    pub fn city_count(&self) -> usize {
        self.city_to_province.len()
    }

    pub fn collision_count(&self) -> usize {
        self.collisions
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }
}
