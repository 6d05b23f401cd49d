pub mod input_metrics;
pub mod render;
pub mod transcript;
