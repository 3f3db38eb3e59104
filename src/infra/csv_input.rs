use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::app::ports::BatchRow;
use crate::config::BatchConfig;
use crate::error::{Result, ValidatorError};

/// Rows of an address CSV plus its header, in file order
#[derive(Debug, Clone, Default)]
pub struct BatchInput {
    pub headers: Vec<String>,
    pub rows: Vec<BatchRow>,
}

/// Read an address CSV from disk.
///
/// The address column is required; city and postcode columns are used when
/// present and left empty otherwise.
pub fn read_batch_csv(
    path: &Path,
    columns: &BatchConfig,
    limit: Option<usize>,
) -> Result<BatchInput> {
    let file = std::fs::File::open(path)?;
    let input = read_batch(file, columns, limit)?;
    info!(path = %path.display(), rows = input.rows.len(), "Loaded batch input");
    Ok(input)
}

pub fn read_batch<R: Read>(
    reader: R,
    columns: &BatchConfig,
    limit: Option<usize>,
) -> Result<BatchInput> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let address_idx = position(&columns.address_column).ok_or_else(|| {
        ValidatorError::MissingField(format!("column '{}'", columns.address_column))
    })?;
    let city_idx = position(&columns.city_column);
    let postcode_idx = position(&columns.postcode_column);

    let mut rows = Vec::new();
    for record in reader.records() {
        if limit.is_some_and(|max| rows.len() >= max) {
            break;
        }
        let record = record?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        rows.push(BatchRow {
            fields: headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default().to_string()))
                .collect(),
            address: cell(Some(address_idx)),
            city: cell(city_idx),
            postcode: cell(postcode_idx),
        });
    }

    Ok(BatchInput { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "id,address,city,zip\n\
        1,\"Calle Gran Vía 32, Madrid\",Madrid,28013\n\
        2,Carrer de Balmes 10,Barcelona,08008\n\
        3,asdfgh,,\n";

    #[test]
    fn test_reads_configured_columns() {
        let input = read_batch(SAMPLE.as_bytes(), &BatchConfig::default(), None).unwrap();
        assert_eq!(input.headers, vec!["id", "address", "city", "zip"]);
        assert_eq!(input.rows.len(), 3);

        let first = &input.rows[0];
        assert_eq!(first.address, "Calle Gran Vía 32, Madrid");
        assert_eq!(first.city, "Madrid");
        assert_eq!(first.postcode, "28013");
        assert_eq!(first.fields[0], ("id".to_string(), "1".to_string()));

        // leading zero survives
        assert_eq!(input.rows[1].postcode, "08008");
        assert_eq!(input.rows[2].city, "");
    }

    #[test]
    fn test_limit() {
        let input = read_batch(SAMPLE.as_bytes(), &BatchConfig::default(), Some(2)).unwrap();
        assert_eq!(input.rows.len(), 2);
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let input =
            read_batch("address\nCalle Mayor 5\n".as_bytes(), &BatchConfig::default(), None)
                .unwrap();
        assert_eq!(input.rows[0].address, "Calle Mayor 5");
        assert_eq!(input.rows[0].city, "");
        assert_eq!(input.rows[0].postcode, "");
    }

    #[test]
    fn test_missing_address_column_is_an_error() {
        let result = read_batch("street,city\nx,y\n".as_bytes(), &BatchConfig::default(), None);
        assert!(matches!(result, Err(ValidatorError::MissingField(_))));
    }
}
