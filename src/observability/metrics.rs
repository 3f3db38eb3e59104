//! Metrics for the address validator
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use std::fmt;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    ValidationTotal,
    ValidationBatchesProcessed,
    ValidationBatchSize,
    ReferenceCollisions,
    CollaboratorCalls,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ValidationTotal => "address_validation_total",
            MetricName::ValidationBatchesProcessed => "address_validation_batches_total",
            MetricName::ValidationBatchSize => "address_validation_batch_size",
            MetricName::ReferenceCollisions => "reference_collisions_total",
            MetricName::CollaboratorCalls => "collaborator_calls_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod validation {
    use super::MetricName;
    use crate::types::AddressStatus;

    /// Record the terminal status of one validated address
    pub fn status_recorded(status: AddressStatus) {
        ::metrics::counter!(
            MetricName::ValidationTotal.as_str(),
            "status" => status.as_str()
        )
        .increment(1);
    }

    /// Record a finished batch run
    pub fn batch_processed(size: usize) {
        ::metrics::counter!(MetricName::ValidationBatchesProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::ValidationBatchSize.as_str()).record(size as f64);
    }
}

pub mod reference {
    use super::MetricName;

    /// Record a city name found under two provinces
    pub fn collision_detected() {
        ::metrics::counter!(MetricName::ReferenceCollisions.as_str()).increment(1);
    }
}

pub mod collaborators {
    use super::MetricName;

    pub fn call_succeeded(kind: &'static str) {
        ::metrics::counter!(
            MetricName::CollaboratorCalls.as_str(),
            "kind" => kind,
            "outcome" => "success"
        )
        .increment(1);
    }

    pub fn call_failed(kind: &'static str) {
        ::metrics::counter!(
            MetricName::CollaboratorCalls.as_str(),
            "kind" => kind,
            "outcome" => "error"
        )
        .increment(1);
    }
}
