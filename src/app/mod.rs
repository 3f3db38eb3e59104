pub mod ports;
pub mod validate_use_case;
pub mod batch_use_case;
