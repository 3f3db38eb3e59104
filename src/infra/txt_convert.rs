//! Raw address dumps to batch CSV.
//!
//! The dumps are comma-separated `address,city,zip,notes` lines where the
//! address and notes may themselves contain commas. The first five-digit
//! field is taken as the postcode and anchors the split.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::constants::is_postcode_shape;
use crate::error::Result;

pub const CONVERTED_COLUMNS: [&str; 4] = ["address", "city", "zip", "notes"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawAddressLine {
    pub address: String,
    pub city: String,
    pub zip: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub converted: usize,
    pub skipped: usize,
}

/// Split one dump line; `None` when no postcode field follows an address and a city
pub fn split_raw_line(line: &str) -> Option<RawAddressLine> {
    let parts: Vec<&str> = line.trim().split(',').collect();
    if parts.len() < 3 {
        return None;
    }

    let zip_idx = parts.iter().position(|p| is_postcode_shape(p.trim()))?;
    if zip_idx < 2 {
        return None;
    }

    Some(RawAddressLine {
        address: parts[..zip_idx - 1].join(",").trim().to_string(),
        city: parts[zip_idx - 1].trim().to_string(),
        zip: parts[zip_idx].trim().to_string(),
        notes: parts[zip_idx + 1..].join(",").trim().to_string(),
    })
}

/// Convert a dump file (first line is a header) into a batch CSV
pub fn convert_txt_to_csv(input: &Path, output: &Path) -> Result<ConvertStats> {
    let content = fs::read_to_string(input)?;
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(output)?;
    writer.write_record(CONVERTED_COLUMNS)?;

    let mut stats = ConvertStats::default();
    for (line_no, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match split_raw_line(line) {
            Some(record) => {
                writer.serialize(&record)?;
                stats.converted += 1;
            }
            None => {
                debug!(line = line_no + 1, "No postcode field, line skipped");
                stats.skipped += 1;
            }
        }
    }
    writer.flush()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        converted = stats.converted,
        skipped = stats.skipped,
        "Converted raw addresses"
    );
    Ok(stats)
}
