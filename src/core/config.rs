use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::types::MAX_TEXT_LEN;

/// How the reduction workers are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Threads,
    Processes,
}

/// A column addressed by position or by header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Index(usize),
    Name(String),
}

impl From<usize> for FieldRef {
    fn from(index: usize) -> Self {
        FieldRef::Index(index)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub page_size: usize,
    pub records_per_worker: usize,

    // Record layout
    pub field_separator: u8,
    pub record_separator: u8,
    pub has_header: bool,
    pub text_field: FieldRef,
    pub numeric_field: FieldRef,
    pub max_text_len: usize,
    pub min_field_count: usize,
    pub max_record_len: usize,

    pub initial_boundary_capacity: usize,
    pub execution: ExecutionMode,
    pub max_workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_size: 4096,
            records_per_worker: 1000,

            // Trending-videos export: title is column 2, views column 7
            field_separator: b',',
            record_separator: b'\n',
            has_header: true,
            text_field: FieldRef::Index(2),
            numeric_field: FieldRef::Index(7),
            max_text_len: MAX_TEXT_LEN,
            min_field_count: 8,
            max_record_len: 14000,

            initial_boundary_capacity: 1000,
            execution: ExecutionMode::Threads,
            max_workers: None,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(Error::invalid_argument(format!(
                "page_size must be a power of two, got {}",
                self.page_size
            )));
        }
        if self.records_per_worker == 0 {
            return Err(Error::invalid_argument("records_per_worker must be at least 1"));
        }
        if self.field_separator == self.record_separator {
            return Err(Error::invalid_argument("field and record separators must differ"));
        }
        if self.max_text_len > MAX_TEXT_LEN {
            return Err(Error::invalid_argument(format!(
                "max_text_len {} exceeds the record capacity of {}",
                self.max_text_len, MAX_TEXT_LEN
            )));
        }
        if self.max_record_len == 0 {
            return Err(Error::invalid_argument("max_record_len must be at least 1"));
        }
        if self.max_workers == Some(0) {
            return Err(Error::invalid_argument("max_workers must be at least 1"));
        }
        Ok(())
    }
}
