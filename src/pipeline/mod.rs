// Address processing: parsing, rules, reference data and matching

pub mod processing;

pub use processing::parser;
