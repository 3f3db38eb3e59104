use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, info_span};

use crate::app::ports::{BatchRow, ValidationOutputPort};
use crate::app::validate_use_case::AddressValidator;
use crate::types::{AddressStatus, ValidationResult};

/// Per-status counts of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub by_status: HashMap<AddressStatus, usize>,
}

impl BatchStats {
    pub fn record(&mut self, status: AddressStatus) {
        self.total += 1;
        *self.by_status.entry(status).or_insert(0) += 1;
    }

    pub fn count(&self, status: AddressStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn valid(&self) -> usize {
        self.count(AddressStatus::Valid) + self.count(AddressStatus::ValidNormalized)
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} addresses", self.total)?;
        for status in AddressStatus::ALL {
            let count = self.count(status);
            if count == 0 {
                continue;
            }
            let pct = count as f64 * 100.0 / self.total as f64;
            writeln!(f, "  {:<18} {:>7} ({:5.1}%)", status.as_str(), count, pct)?;
        }
        Ok(())
    }
}

/// Use case for validating many addresses and writing them out in input order
pub struct BatchValidationUseCase {
    validator: Arc<AddressValidator>,
    output: Box<dyn ValidationOutputPort>,
    concurrency: usize,
    progress_every: usize,
}

impl BatchValidationUseCase {
    pub fn new(validator: Arc<AddressValidator>, output: Box<dyn ValidationOutputPort>) -> Self {
        Self {
            validator,
            output,
            concurrency: 4,
            progress_every: 100,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress_every(mut self, rows: usize) -> Self {
        self.progress_every = rows;
        self
    }

    /// Validate every row and write the results.
    ///
    /// At most `concurrency` rows are in flight on the blocking pool. They
    /// are drained in input order, so results are written in input order and
    /// the first collaborator error stops the run before more rows start.
    pub async fn run(&self, rows: Vec<BatchRow>) -> Result<BatchStats> {
        let total = rows.len();
        info!(rows = total, concurrency = self.concurrency, "Starting batch validation");

        let mut in_flight: VecDeque<JoinHandle<RowOutcome>> =
            VecDeque::with_capacity(self.concurrency);
        let mut stats = BatchStats::default();

        for (position, row) in rows.into_iter().enumerate() {
            if in_flight.len() >= self.concurrency {
                if let Some(handle) = in_flight.pop_front() {
                    self.complete(handle, &mut stats, total).await?;
                }
            }

            let validator = self.validator.clone();
            in_flight.push_back(tokio::task::spawn_blocking(move || {
                let _span =
                    info_span!("validate_row", row = position + 1, address = %row.address)
                        .entered();
                let result = validator.validate(&row.address, &row.city, &row.postcode);
                RowOutcome { position, row, result }
            }));
        }

        while let Some(handle) = in_flight.pop_front() {
            self.complete(handle, &mut stats, total).await?;
        }

        self.output.finish().await?;
        crate::observability::metrics::validation::batch_processed(stats.total);
        info!(total = stats.total, valid = stats.valid(), "Batch validation finished");

        Ok(stats)
    }

    async fn complete(
        &self,
        handle: JoinHandle<RowOutcome>,
        stats: &mut BatchStats,
        total: usize,
    ) -> Result<()> {
        let RowOutcome { position, row, result } = handle.await?;
        let result: ValidationResult =
            result.with_context(|| format!("validation failed at row {}", position + 1))?;

        self.output.write_result(&row, &result).await?;
        stats.record(result.status);

        let done = position + 1;
        if self.progress_every > 0 && done % self.progress_every == 0 {
            info!(done, total, "Batch progress");
        }
        Ok(())
    }
}

struct RowOutcome {
    position: usize,
    row: BatchRow,
    result: crate::error::Result<ValidationResult>,
}
