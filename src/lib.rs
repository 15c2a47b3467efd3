pub mod core;
pub mod storage;
pub mod scan;
pub mod parallel;

pub use crate::core::config::{Config, ExecutionMode, FieldRef};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::pipeline::{analyze_file, analyze_files, FileReport, Pipeline};
pub use crate::core::types::{ParsedRecord, Reduction, ReductionResult};
pub use crate::parallel::reduce_max;
pub use crate::scan::{extract, locate_records};
pub use crate::storage::PageSequence;

/*
┌──────────────────────────────── PAGESCAN PIPELINE ────────────────────────────────┐
│                                                                                    │
│   file ──► PageSequence::load ──► locate_records ──► extract ──► MaxReducer        │
│            (storage::page)        (scan::locator)    (scan::     (parallel)        │
│                                                       extractor)                   │
│                                                                                    │
│   Page { data, valid }      BoundaryList            ParsedRecord   ChunkPlan       │
│   [p0][p1][p2]..[pn]        [0, b1, .., len+1]      { text, value }    │           │
│                                                                        ▼           │
│                                              ┌─────────── Executor ───────────┐    │
│                                              │ ThreadExecutor  rayon scope,   │    │
│                                              │                 Mutex merge    │    │
│                                              │ ProcessExecutor fork + pipe,   │    │
│                                              │                 ordered merge  │    │
│                                              └──────────────┬─────────────────┘    │
│                                                             ▼                      │
│                                                   ReductionResult { value, text }  │
└────────────────────────────────────────────────────────────────────────────────────┘
*/
