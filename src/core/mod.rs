pub mod types;
pub mod pipeline;
pub mod config;
pub mod error;
