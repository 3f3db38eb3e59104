use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::anyhow;
use tracing::info;

use crate::app::ports::{BatchRow, ValidationOutputPort};
use crate::types::ValidationResult;

/// Columns appended after the input columns
pub const RESULT_COLUMNS: [&str; 7] = [
    "validation_status",
    "validation_message",
    "normalized_city",
    "normalized_postcode",
    "parsed_road",
    "parsed_city",
    "parsed_postcode",
];

/// CSV implementation of ValidationOutputPort.
/// Writes each input row back with the validation columns appended.
pub struct CsvValidationOutput {
    writer: Mutex<csv::Writer<File>>,
    file_path: String,
}

impl CsvValidationOutput {
    pub fn create(path: &Path, input_headers: &[String]) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        info!("Creating validation output file: {}", path.display());

        let mut writer = csv::Writer::from_path(path)?;
        let header = input_headers
            .iter()
            .map(String::as_str)
            .chain(RESULT_COLUMNS);
        writer.write_record(header)?;

        Ok(Self {
            writer: Mutex::new(writer),
            file_path: path.display().to_string(),
        })
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }
}

fn result_cells(result: &ValidationResult) -> [String; 7] {
    [
        result.status.as_str().to_string(),
        result.message.clone(),
        result.normalized_city.clone().unwrap_or_default(),
        result.normalized_postcode.clone().unwrap_or_default(),
        result.parsed.road.clone().unwrap_or_default(),
        result.parsed.city.clone().unwrap_or_default(),
        result.parsed.postcode.clone().unwrap_or_default(),
    ]
}

#[async_trait::async_trait]
impl ValidationOutputPort for CsvValidationOutput {
    async fn write_result(&self, row: &BatchRow, result: &ValidationResult) -> anyhow::Result<()> {
        let cells = result_cells(result);
        let record = row
            .fields
            .iter()
            .map(|(_, value)| value.as_str())
            .chain(cells.iter().map(String::as_str));

        let mut writer = self.writer.lock().map_err(|_| anyhow!("CSV writer lock poisoned"))?;
        writer.write_record(record)?;
        Ok(())
    }

    async fn finish(&self) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow!("CSV writer lock poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::parser::ParsedAddress;
    use crate::types::AddressStatus;
    use chrono::Utc;

    fn result(status: AddressStatus) -> ValidationResult {
        let mut parsed = ParsedAddress::new("Calle Gran Vía 32, Madrid, 28013");
        parsed.road = Some("Calle Gran Vía".to_string());
        parsed.city = Some("Madrid".to_string());
        parsed.postcode = Some("28013".to_string());

        ValidationResult {
            raw_address: parsed.raw.clone(),
            raw_city: String::new(),
            raw_postcode: String::new(),
            parsed,
            status,
            message: "City matches postal code province".to_string(),
            normalized_city: Some("Madrid".to_string()),
            normalized_postcode: Some("28013".to_string()),
            rule_violations: Vec::new(),
            city_postal_status: None,
            intent: None,
            confidence: None,
            validated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_writes_input_columns_then_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("validated.csv");
        let headers = vec!["id".to_string(), "address".to_string()];

        let output = CsvValidationOutput::create(&path, &headers).unwrap();
        let row = BatchRow {
            fields: vec![
                ("id".to_string(), "7".to_string()),
                ("address".to_string(), "Calle Gran Vía 32, Madrid, 28013".to_string()),
            ],
            address: "Calle Gran Vía 32, Madrid, 28013".to_string(),
            ..Default::default()
        };
        output.write_result(&row, &result(AddressStatus::Valid)).await.unwrap();
        output.finish().await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(header[..2], ["id", "address"]);
        assert_eq!(header[2], "validation_status");
        assert_eq!(header.len(), 2 + RESULT_COLUMNS.len());

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "7");
        assert_eq!(&record[1], "Calle Gran Vía 32, Madrid, 28013");
        assert_eq!(&record[2], "valid");
        assert_eq!(&record[4], "Madrid");
        assert_eq!(&record[6], "Calle Gran Vía");
        assert_eq!(&record[8], "28013");
    }
}
