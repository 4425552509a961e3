//! End-to-end comparison over on-disk trace files.

use std::io::Write;

use cabac_diff::{
    DiffConfig, Differencer, Error, libde265_map, parse_trace_file, render_report,
    rust_decoder_map,
};

fn write_trace(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn compare_traces_end_to_end() {
    let dir = tempfile::tempdir().unwrap();

    // Reference decoder log with interleaved non-trace lines. Context bins
    // walk SIG_COEFF_FLAG sub-indices 0..4 in libde265 numbering (65..).
    let ref_path = write_trace(
        &dir,
        "ref.txt",
        "decoder starting\n\
         BYP#0 r=510 v=3 bn=-8 bin=1\n\
         BIN#1 ctx r=350 v=117 bn=-3 bin=1 s=14 m=0 ci=65\n\
         slice qp=30 some unrelated log line\n\
         BIN#2 ctx r=340 v=110 bn=-2 bin=0 s=15 m=0 ci=66\n\
         BIN#3 ctx r=330 v=100 bn=-1 bin=1 s=15 m=1 ci=67\n\
         TRM#4 r=320 v=90 bn=0 bin=0\n",
    );

    // Test decoder in its own numbering (82..): positions 0 and 1 agree
    // semantically, position 2 decodes CBF_LUMA instead.
    let test_path = write_trace(
        &dir,
        "test.txt",
        "BYP#0 r=510 v=3 bn=-8 bin=1\n\
         BIN#1 ctx r=350 v=117 bn=-3 bin=1 s=14 m=0 ci=82\n\
         BIN#2 ctx r=340 v=110 bn=-2 bin=0 s=15 m=0 ci=83\n\
         BIN#3 ctx r=330 v=100 bn=-1 bin=1 s=15 m=1 ci=33\n\
         TRM#4 r=320 v=90 bn=0 bin=0\n",
    );

    let reference = parse_trace_file(&ref_path).unwrap();
    let test = parse_trace_file(&test_path).unwrap();
    assert_eq!(reference.len(), 5);
    assert_eq!(test.len(), 5);

    let (ref_map, test_map) = (libde265_map(), rust_decoder_map());
    let differ = Differencer::new(&ref_map, &test_map, DiffConfig::default());

    let (ref_ctx, test_ctx) = (reference.context_coded(), test.context_coded());
    let report = differ.run(&ref_ctx, &test_ctx);

    assert_eq!(report.compared, 3);
    assert_eq!(report.category_mismatch.first_index(), Some(2));
    assert_eq!(report.sub_index_mismatch.total, 0);
    assert_eq!(report.state_mismatch.total, 0);
    assert_eq!(report.counter_drift.total, 0);

    let rendered = render_report(&report, &ref_ctx, &test_ctx, &ref_map, &test_map, 3);
    assert!(rendered.contains("FIRST CATEGORY MISMATCH at #2"));
    assert!(rendered.contains("SIG_COEFF_FLAG[2]"));
    assert!(rendered.contains("CBF_LUMA[0]"));
}

#[test]
fn identical_files_report_clean() {
    let dir = tempfile::tempdir().unwrap();
    let content = "BIN#0 ctx r=350 v=117 bn=-3 bin=1 s=14 m=0 ci=0\n\
                   BIN#1 ctx r=340 v=110 bn=-2 bin=0 s=15 m=0 ci=1\n";
    let ref_path = write_trace(&dir, "ref.txt", content);
    let test_path = write_trace(&dir, "test.txt", content);

    let reference = parse_trace_file(&ref_path).unwrap();
    let test = parse_trace_file(&test_path).unwrap();

    // SAO contexts share numbering across both schemes.
    let (ref_map, test_map) = (libde265_map(), rust_decoder_map());
    let report = Differencer::new(&ref_map, &test_map, DiffConfig::default())
        .run(&reference.context_coded(), &test.context_coded());

    assert!(report.is_clean());
    assert_eq!(report.matched, 2);
}

#[test]
fn empty_file_is_a_vacuous_result() {
    let dir = tempfile::tempdir().unwrap();
    let ref_path = write_trace(&dir, "ref.txt", "nothing but logs here\n");
    let test_path = write_trace(&dir, "test.txt", "");

    let reference = parse_trace_file(&ref_path).unwrap();
    let test = parse_trace_file(&test_path).unwrap();
    assert!(reference.is_empty());
    assert!(test.is_empty());

    let (ref_map, test_map) = (libde265_map(), rust_decoder_map());
    let report = Differencer::new(&ref_map, &test_map, DiffConfig::default())
        .run(&reference, &test);
    assert!(report.is_clean());
    assert_eq!(report.compared, 0);
}

#[test]
fn missing_file_is_input_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no_such_trace.txt");
    let err = parse_trace_file(&missing).unwrap_err();
    assert!(matches!(err, Error::InputNotFound { .. }));
    assert!(err.to_string().contains("no_such_trace.txt"));
}

#[test]
fn parsing_a_file_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_trace(
        &dir,
        "trace.txt",
        "BYP#0 r=510 v=3 bn=-8 bin=1 BIN#1 ctx r=350 v=117 bn=-3 bin=1 s=14 m=0 ci=65\n",
    );
    let first = parse_trace_file(&path).unwrap();
    let second = parse_trace_file(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
