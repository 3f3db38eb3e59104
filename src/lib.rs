pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub mod observability;

pub use app::validate_use_case::AddressValidator;
pub use error::{Result, ValidatorError};
pub use pipeline::processing::reference::{CollisionPolicy, ReferenceIndex};
pub use types::{AddressStatus, ValidationResult};
