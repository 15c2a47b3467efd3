pub mod locator;
pub mod extractor;

pub use extractor::{extract, ExtractConfig, Extracted, RecordExtractor};
pub use locator::{locate_records, BoundaryList};
