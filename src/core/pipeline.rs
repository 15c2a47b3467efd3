use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use rayon::prelude::*;
use tracing::{info, warn};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{Reduction, ReductionResult};
use crate::parallel::reducer::MaxReducer;
use crate::scan::extractor::{extract, ExtractConfig};
use crate::scan::locator::locate_records;
use crate::storage::page::PageSequence;

/// Everything learned about one file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: Option<PathBuf>,
    pub page_count: usize,
    pub bytes: usize,
    /// Records in the file, header included
    pub record_count: usize,
    pub data_records: usize,
    pub malformed: usize,
    pub reduction: Reduction,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn result(&self) -> &ReductionResult {
        &self.reduction.result
    }
}

/// Pages → boundaries → records → maximum, for one file at a time
pub struct Pipeline {
    config: Config,
    extract: ExtractConfig,
    reducer: MaxReducer,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let reducer = MaxReducer::from_config(&config)?;

        Ok(Pipeline {
            extract: ExtractConfig::from(&config),
            reducer,
            config,
        })
    }

    /// Replace the reducer, e.g. to run on a dedicated pool
    pub fn with_reducer(mut self, reducer: MaxReducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<FileReport> {
        let path = path.as_ref();
        let started = Instant::now();

        let pages = PageSequence::open(path, self.config.page_size)?;
        let mut report = self.analyze_pages(pages, started)?;
        report.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            pages = report.page_count,
            records = report.data_records,
            malformed = report.malformed,
            value = report.result().value,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "file analyzed"
        );
        Ok(report)
    }

    pub fn analyze_reader<R: Read + Seek>(&self, reader: R) -> Result<FileReport> {
        let started = Instant::now();
        let pages = PageSequence::load(reader, self.config.page_size)?;
        self.analyze_pages(pages, started)
    }

    /// Analyze every path on rayon's pool. A failed file never stops the others.
    pub fn analyze_files<P>(&self, paths: &[P]) -> Vec<(PathBuf, Result<FileReport>)>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                let outcome = self.analyze_file(path);
                if let Err(e) = &outcome {
                    warn!(path = %path.display(), error = %e, "file skipped");
                }
                (path.to_path_buf(), outcome)
            })
            .collect()
    }

    fn analyze_pages(&self, pages: PageSequence, started: Instant) -> Result<FileReport> {
        let page_count = pages.page_count();
        let bytes = pages.len();

        // Pages and boundaries are released once the records are out
        let extracted = {
            let boundaries = locate_records(
                &pages,
                self.config.record_separator,
                self.config.initial_boundary_capacity,
            )?;
            extract(&pages, &boundaries, &self.extract)?
        };
        drop(pages);

        let reduction = self.reducer.reduce(&extracted.records)?;

        Ok(FileReport {
            path: None,
            page_count,
            bytes,
            record_count: extracted.record_count,
            data_records: extracted.records.len(),
            malformed: extracted.malformed,
            reduction,
            elapsed: started.elapsed(),
        })
    }
}

/// One-shot helper around `Pipeline::analyze_file`
pub fn analyze_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<FileReport> {
    Pipeline::new(config.clone())?.analyze_file(path)
}

/// One-shot helper around `Pipeline::analyze_files`
pub fn analyze_files<P>(paths: &[P], config: &Config) -> Result<Vec<(PathBuf, Result<FileReport>)>>
where
    P: AsRef<Path> + Sync,
{
    Ok(Pipeline::new(config.clone())?.analyze_files(paths))
}
