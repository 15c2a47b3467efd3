mod common;

use std::io::Cursor;
use common::{csv_file, generated_csv, small_config};
use pagescan::parallel::{ChunkPlan, MaxReducer, ThreadExecutor};
use pagescan::scan::ExtractConfig;
use pagescan::{extract, locate_records, reduce_max, ErrorKind, PageSequence, Pipeline};

#[test]
fn test_most_viewed_example() {
    let file = csv_file(b"id,title,views\n1,A,10\n2,B,50\n3,C,30");
    let report = Pipeline::new(small_config()).unwrap().analyze_file(file.path()).unwrap();

    assert_eq!(report.result().text.as_deref(), Some("B"));
    assert_eq!(report.result().value, 50);
    assert_eq!(report.data_records, 3);
    assert_eq!(report.record_count, 4);
    assert_eq!(report.path.as_deref(), Some(file.path()));
}

#[test]
fn test_header_only_has_no_winner() {
    let file = csv_file(b"id,title,views\n");
    let report = Pipeline::new(small_config()).unwrap().analyze_file(file.path()).unwrap();

    assert!(!report.result().has_winner());
    assert_eq!(report.result().value, 0);
    assert_eq!(report.data_records, 0);
    assert_eq!(report.reduction.worker_count(), 0);
}

#[test]
fn test_empty_file_has_no_winner() {
    let file = csv_file(b"");
    let report = Pipeline::new(small_config()).unwrap().analyze_file(file.path()).unwrap();
    assert!(!report.result().has_winner());
}

#[test]
fn test_short_record_does_not_override() {
    let file = csv_file(b"id,title,views\n1,A,10\n4,D\n2,B,5\n");
    let report = Pipeline::new(small_config()).unwrap().analyze_file(file.path()).unwrap();

    assert_eq!(report.result().value, 10);
    assert_eq!(report.result().text.as_deref(), Some("A"));
    assert_eq!(report.malformed, 1);
}

#[test]
fn test_boundary_and_record_counts() {
    // 5 separators, none trailing
    let data = b"h1,h2,h3\na,x,1\nb,y,2\nc,z,3\nd,w,4\ne,v,5";
    let pages = PageSequence::load(Cursor::new(data.to_vec()), 16).unwrap();
    let boundaries = locate_records(&pages, b'\n', 2).unwrap();
    assert_eq!(boundaries.len(), 5 + 2);

    let config = ExtractConfig::from(&small_config());
    let extracted = extract(&pages, &boundaries, &config).unwrap();
    assert_eq!(extracted.records.len(), 5);
}

#[test]
fn test_records_reassemble_file() {
    let (data, _) = generated_csv(500);
    for page_size in [16, 64, 4096] {
        let pages = PageSequence::load(Cursor::new(data.clone()), page_size).unwrap();
        let boundaries = locate_records(&pages, b'\n', 8).unwrap();

        let mut rebuilt = Vec::new();
        for range in boundaries.ranges() {
            pages.copy_range(range, &mut rebuilt).unwrap();
        }
        assert_eq!(rebuilt, data, "page size {}", page_size);
    }
}

#[test]
fn test_page_straddling_record_matches_aligned_one() {
    let page_size = 64;
    let target = b"7,straddler,4242\n";

    // header (15) + filler + target; filler sized so the target's separator
    // is the last byte of page 0, or pushed 8 bytes across into page 1
    let build = |filler_len: usize| {
        let mut data = b"id,title,views\n".to_vec();
        data.extend_from_slice(format!("1,{},1\n", "a".repeat(filler_len)).as_bytes());
        data.extend_from_slice(target);
        data
    };
    let aligned = build(27);
    let straddling = build(35);
    assert_eq!(aligned.len(), page_size);
    assert_eq!(aligned[page_size - 1], b'\n');

    let config = ExtractConfig::from(&small_config());
    let parse = |data: &[u8]| {
        let pages = PageSequence::load(Cursor::new(data.to_vec()), page_size).unwrap();
        let boundaries = locate_records(&pages, b'\n', 4).unwrap();
        extract(&pages, &boundaries, &config).unwrap().records
    };

    let a = parse(&aligned);
    let b = parse(&straddling);
    assert_eq!(a.last(), b.last());
    assert_eq!(a.last().unwrap().text.as_str(), "straddler");
    assert_eq!(a.last().unwrap().value, 4242);
}

#[test]
fn test_sequential_and_parallel_agree() {
    let (data, max) = generated_csv(20_000);
    let pages = PageSequence::load(Cursor::new(data), 4096).unwrap();
    let boundaries = locate_records(&pages, b'\n', 1000).unwrap();
    let records = extract(&pages, &boundaries, &ExtractConfig::from(&small_config()))
        .unwrap()
        .records;

    let sequential = reduce_max(&records, 1);
    assert_eq!(sequential.value, max);
    for workers in [2, 5, 16, 100] {
        assert_eq!(reduce_max(&records, workers).value, sequential.value);
    }
}

#[test]
fn test_pipeline_is_idempotent() {
    let (data, _) = generated_csv(3000);
    let file = csv_file(&data);
    let pipeline = Pipeline::new(small_config()).unwrap();

    let first = pipeline.analyze_file(file.path()).unwrap();
    let second = pipeline.analyze_file(file.path()).unwrap();
    assert_eq!(first.result(), second.result());
    assert_eq!(first.page_count, second.page_count);
}

#[test]
fn test_dedicated_pool_reducer() {
    let (data, max) = generated_csv(5000);
    let reducer = MaxReducer::new(Box::new(ThreadExecutor::with_threads(4).unwrap()), 250);
    let pipeline = Pipeline::new(small_config()).unwrap().with_reducer(reducer);

    let report = pipeline.analyze_reader(Cursor::new(data)).unwrap();
    assert_eq!(report.result().value, max);
    assert_eq!(report.reduction.worker_count(), ChunkPlan::by_records_per_worker(5000, 250).workers());
}

#[test]
fn test_batch_reports_each_file() {
    let good = csv_file(b"id,title,views\n1,A,3\n");
    let missing = good.path().with_extension("does-not-exist");
    let paths = vec![good.path().to_path_buf(), missing.clone()];

    let outcomes = Pipeline::new(small_config()).unwrap().analyze_files(&paths);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].1.as_ref().unwrap().result().value, 3);

    let err = outcomes[1].1.as_ref().unwrap_err();
    assert_eq!(outcomes[1].0, missing);
    assert_eq!(err.kind, ErrorKind::Io);
}

#[test]
fn test_columns_by_header_name() {
    let mut config = small_config();
    config.text_field = "title".into();
    config.numeric_field = "views".into();

    let file = csv_file(b"views,title,id\n5,low,1\n900,high,2\n");
    let report = Pipeline::new(config).unwrap().analyze_file(file.path()).unwrap();
    assert_eq!(report.result().text.as_deref(), Some("high"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = small_config();
    config.page_size = 3000;
    let err = Pipeline::new(config).err().unwrap();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}
