use tracing::{debug, warn};
use crate::core::config::{Config, FieldRef};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{BoundedText, ParsedRecord, MAX_TEXT_LEN};
use crate::scan::locator::BoundaryList;
use crate::storage::page::PageSequence;

/// Record layout used while extracting
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub field_separator: u8,
    pub record_separator: u8,
    pub has_header: bool,
    pub text_field: FieldRef,
    pub numeric_field: FieldRef,
    pub max_text_len: usize,
    pub min_field_count: usize,
    pub max_record_len: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig::from(&Config::default())
    }
}

impl From<&Config> for ExtractConfig {
    fn from(config: &Config) -> Self {
        ExtractConfig {
            field_separator: config.field_separator,
            record_separator: config.record_separator,
            has_header: config.has_header,
            text_field: config.text_field.clone(),
            numeric_field: config.numeric_field.clone(),
            max_text_len: config.max_text_len,
            min_field_count: config.min_field_count,
            max_record_len: config.max_record_len,
        }
    }
}

/// Output of extraction
#[derive(Debug, Clone)]
pub struct Extracted {
    pub records: Vec<ParsedRecord>,
    /// Every record in the file, header included
    pub record_count: usize,
    pub malformed: usize,
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse every data record delimited by `boundaries`
pub fn extract(
    pages: &PageSequence,
    boundaries: &BoundaryList,
    config: &ExtractConfig,
) -> Result<Extracted> {
    RecordExtractor::new(pages, config)?.extract_all(boundaries)
}

/// Rebuilds records that may straddle pages and pulls out two fields
pub struct RecordExtractor<'a> {
    pages: &'a PageSequence,
    config: &'a ExtractConfig,
    scratch: Vec<u8>,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(pages: &'a PageSequence, config: &'a ExtractConfig) -> Result<Self> {
        let mut scratch = Vec::new();
        scratch.try_reserve(config.max_record_len.min(pages.page_size()))?;

        Ok(RecordExtractor {
            pages,
            config,
            scratch,
        })
    }

    pub fn extract_all(&mut self, boundaries: &BoundaryList) -> Result<Extracted> {
        let record_count = boundaries.record_count();
        let first = if self.config.has_header { 1 } else { 0 };

        let (text_index, numeric_index) = self.resolve_fields(boundaries)?;

        let data_records = record_count.saturating_sub(first);
        let mut records = Vec::new();
        records.try_reserve_exact(data_records).map_err(|e| {
            Error::allocation(format!("record array for {} records: {}", data_records, e))
        })?;

        let mut malformed = 0;
        for index in first..record_count {
            // Only an empty file has a zero-length record
            if boundaries.record_range(index).is_some_and(|r| r.is_empty()) {
                continue;
            }
            let parsed = match self.parse_record(boundaries, index, text_index, numeric_index) {
                Ok(record) => record,
                Err(e) if e.kind == ErrorKind::MalformedRecord => {
                    warn!(record = index, reason = %e.context, "malformed record");
                    malformed += 1;
                    ParsedRecord::default()
                }
                Err(e) => return Err(e),
            };
            records.push(parsed);
        }

        debug!(records = records.len(), malformed, "records extracted");

        Ok(Extracted {
            records,
            record_count,
            malformed,
        })
    }

    /// Copy record `index` into the scratch buffer without its line ending
    pub fn record_bytes(&mut self, boundaries: &BoundaryList, index: usize) -> Result<&[u8]> {
        let range = boundaries.record_range(index).ok_or_else(|| {
            Error::invalid_argument(format!("record {} out of range", index))
        })?;

        if range.len() > self.config.max_record_len {
            return Err(Error::new(
                ErrorKind::MalformedRecord,
                format!("{} bytes exceeds limit of {}", range.len(), self.config.max_record_len),
            ));
        }

        self.scratch.clear();
        self.pages.copy_range(range, &mut self.scratch)?;

        let mut line: &[u8] = &self.scratch;
        if let Some((&last, rest)) = line.split_last() {
            if last == self.config.record_separator {
                line = rest;
            }
        }
        if let Some((&b'\r', rest)) = line.split_last() {
            line = rest;
        }
        Ok(line)
    }

    fn parse_record(
        &mut self,
        boundaries: &BoundaryList,
        index: usize,
        text_index: usize,
        numeric_index: usize,
    ) -> Result<ParsedRecord> {
        let separator = self.config.field_separator;
        let min_fields = self.config.min_field_count;
        let max_text_len = self.config.max_text_len.min(MAX_TEXT_LEN);

        let line = self.record_bytes(boundaries, index)?;

        let mut text: Option<&[u8]> = None;
        let mut numeric: Option<&[u8]> = None;
        let mut fields = 0;
        for (i, field) in line.split(|&b| b == separator).enumerate() {
            if i == text_index {
                text = Some(field);
            }
            if i == numeric_index {
                numeric = Some(field);
            }
            fields += 1;
        }

        if fields < min_fields {
            return Err(Error::new(
                ErrorKind::MalformedRecord,
                format!("{} fields, expected at least {}", fields, min_fields),
            ));
        }

        Ok(ParsedRecord {
            text: text.map(|t| BoundedText::new(t, max_text_len)).unwrap_or_default(),
            value: numeric.map(parse_lenient).unwrap_or(0),
        })
    }

    fn resolve_fields(&mut self, boundaries: &BoundaryList) -> Result<(usize, usize)> {
        let needs_header = matches!(self.config.text_field, FieldRef::Name(_))
            || matches!(self.config.numeric_field, FieldRef::Name(_));
        if !needs_header {
            return Ok((
                field_index(&self.config.text_field, &[])?,
                field_index(&self.config.numeric_field, &[])?,
            ));
        }
        if !self.config.has_header || boundaries.record_count() == 0 {
            return Err(Error::invalid_argument("column names require a header row"));
        }

        let separator = self.config.field_separator;
        let header: Vec<Vec<u8>> = self
            .record_bytes(boundaries, 0)
            .map_err(|e| Error::invalid_argument(format!("unreadable header: {}", e.context)))?
            .split(|&b| b == separator)
            .map(|name| name.trim_ascii().to_vec())
            .collect();

        Ok((
            field_index(&self.config.text_field, &header)?,
            field_index(&self.config.numeric_field, &header)?,
        ))
    }
}

fn field_index(field: &FieldRef, header: &[Vec<u8>]) -> Result<usize> {
    match field {
        FieldRef::Index(index) => Ok(*index),
        FieldRef::Name(name) => header
            .iter()
            .position(|column| column.as_slice() == name.as_bytes())
            .ok_or_else(|| Error::invalid_argument(format!("no column named {:?}", name))),
    }
}

/// `atol`-style parse: leading whitespace, optional `+`, then the leading digits.
/// Anything without digits, or negative, is 0.
pub fn parse_lenient(field: &[u8]) -> u64 {
    let digits = field.trim_ascii_start();
    let digits = digits.strip_prefix(b"+").unwrap_or(digits);

    let mut value: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as u64);
    }
    value
}
