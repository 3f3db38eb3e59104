// Validation stages, leaf modules first

pub mod normalize;
pub mod reference;
pub mod parser;
pub mod quality_gate;
pub mod postal;
