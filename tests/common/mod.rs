use std::io::Write;
use pagescan::{Config, FieldRef};
use tempfile::NamedTempFile;

/// Config for the small `id,title,views` files used across the tests
pub fn small_config() -> Config {
    Config {
        text_field: FieldRef::Index(1),
        numeric_field: FieldRef::Index(2),
        min_field_count: 3,
        ..Config::default()
    }
}

/// Write `contents` to a temp file that lives as long as the handle
pub fn csv_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents).expect("failed to write temp file");
    file.flush().expect("failed to flush temp file");
    file
}

/// `rows` data rows after an `id,title,views` header; views follow a fixed scramble
pub fn generated_csv(rows: usize) -> (Vec<u8>, u64) {
    let mut out = b"id,title,views\n".to_vec();
    let mut max = 0;
    for i in 0..rows {
        let views = (i as u64 * 2_654_435_761) % 1_000_003;
        max = max.max(views);
        out.extend_from_slice(format!("{},video number {},{}\n", i, i, views).as_bytes());
    }
    (out, max)
}
