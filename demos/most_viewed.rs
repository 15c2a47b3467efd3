//! Most-viewed record of each CSV given on the command line.
//!
//! ```bash
//! $ RUST_LOG=pagescan=debug cargo run --release --example most_viewed -- data/USvideos.csv data/GBvideos.csv
//! ```
//!
//! Set `PAGESCAN_CONFIG` to a JSON file to override the defaults, e.g.
//! `{ "execution": "processes", "text_field": "title", "numeric_field": "views" }`.

use std::env;
use std::process;
use pagescan::{Config, Pipeline};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: most_viewed <file.csv>...");
        process::exit(2);
    }

    let config = match env::var("PAGESCAN_CONFIG") {
        Ok(path) => Config::from_json_file(&path).unwrap_or_else(|e| {
            eprintln!("{}: {}", path, e);
            process::exit(2);
        }),
        Err(_) => Config::default(),
    };

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    println!("{:<30} {:>8} {:>10} {:>10} {:>12}  {}", "File", "Pages", "Records", "Time (ms)", "Views", "Most viewed");
    let mut failed = false;
    for (path, outcome) in pipeline.analyze_files(&paths) {
        match outcome {
            Ok(report) => println!(
                "{:<30} {:>8} {:>10} {:>10.3} {:>12}  {}",
                path.display(),
                report.page_count,
                report.data_records,
                report.elapsed.as_secs_f64() * 1000.0,
                report.result().value,
                report.result().text.as_deref().unwrap_or("-"),
            ),
            Err(e) => {
                failed = true;
                eprintln!("{:<30} failed: {}", path.display(), e);
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
