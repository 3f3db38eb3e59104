pub mod csv_input;
pub mod csv_output_adapter;
pub mod llm_reviewer;
pub mod txt_convert;
