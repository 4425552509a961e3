//! Human-readable rendering of divergence findings.
//!
//! Pure read-only projection over an already-computed [`DiffReport`] and the
//! two sequences it was computed from; no comparison logic lives here. The
//! report stays a structured value, so a machine-readable output mode can be
//! added without touching the differencer.

use std::fmt::Write;

use crate::diff::{DiffReport, MismatchTrack};
use crate::semantic::SemanticMap;
use crate::trace::{TraceEvent, TraceSequence};

/// Rows rendered on each side of a divergence index.
pub const DEFAULT_WINDOW: usize = 5;

/// Semantic annotation for one event, or an explicit unresolved marker.
pub fn semantic_label(event: &TraceEvent, map: &SemanticMap) -> String {
    match event.context_index() {
        Some(ci) if ci >= 0 => map.resolve(ci).to_string(),
        Some(_) => "ci=-1".to_string(),
        None => event.kind.to_string(),
    }
}

/// Row-level semantic flag: `=` exact, `~` same element different sub-index,
/// `X` different element, `.` not comparable at this row.
fn semantic_flag(
    r: &TraceEvent,
    t: &TraceEvent,
    ref_map: &SemanticMap,
    test_map: &SemanticMap,
) -> char {
    match (r.context_index(), t.context_index()) {
        (Some(ref_ci), Some(test_ci)) if ref_ci >= 0 && test_ci >= 0 => {
            let ref_sem = ref_map.resolve(ref_ci);
            let test_sem = test_map.resolve(test_ci);
            if ref_sem == test_sem {
                '='
            } else if ref_sem.same_element(&test_sem) {
                '~'
            } else {
                'X'
            }
        }
        _ => '.',
    }
}

/// Render rows `[center-window, center+window]` from both sequences side by
/// side, with the center row marked.
pub fn render_window(
    reference: &TraceSequence,
    test: &TraceSequence,
    ref_map: &SemanticMap,
    test_map: &SemanticMap,
    center: usize,
    window: usize,
) -> String {
    let mut out = String::new();
    let limit = reference.len().min(test.len());
    let start = center.saturating_sub(window);
    let end = (center + window + 1).min(limit);

    for i in start..end {
        let (Some(r), Some(t)) = (reference.get(i), test.get(i)) else {
            break;
        };
        let marker = if i == center { ">>>" } else { "   " };
        let ref_label = semantic_label(r, ref_map);
        let test_label = semantic_label(t, test_map);
        let flag = semantic_flag(r, t, ref_map, test_map);
        let state = if r.state_matches(t) { "OK" } else { "DIFF" };
        let drift = if r.counter == t.counter {
            String::new()
        } else {
            format!(" drift({}/{})", r.counter, t.counter)
        };
        writeln!(
            out,
            "{marker} #{i:5} BIN#{:5}: ref={ref_label:32} test={test_label:32} {flag} state={state}{drift}",
            r.counter
        )
        .expect("string write");
    }
    out
}

fn write_class_line(out: &mut String, label: &str, track: &MismatchTrack) {
    match track.first_index() {
        Some(index) => writeln!(
            out,
            "  {label:<22} first at #{index}, {} total",
            track.total
        ),
        None => writeln!(out, "  {label:<22} none"),
    }
    .expect("string write");
}

fn write_first_detail(
    out: &mut String,
    headline: &str,
    track: &MismatchTrack,
    ref_map: &SemanticMap,
    test_map: &SemanticMap,
) {
    let Some(first) = &track.first else {
        return;
    };
    writeln!(
        out,
        "\n{headline} at #{} (ref BIN#{}, test BIN#{}):",
        first.index, first.ref_event.counter, first.test_event.counter
    )
    .expect("string write");
    writeln!(
        out,
        "  ref:  {} r={} v={} bn={} bin={}",
        semantic_label(&first.ref_event, ref_map),
        first.ref_event.range,
        first.ref_event.value,
        first.ref_event.bits_needed,
        first.ref_event.bin
    )
    .expect("string write");
    writeln!(
        out,
        "  test: {} r={} v={} bn={} bin={}",
        semantic_label(&first.test_event, test_map),
        first.test_event.range,
        first.test_event.value,
        first.test_event.bits_needed,
        first.test_event.bin
    )
    .expect("string write");
}

/// Render the full comparison report over the sequences it was computed from.
pub fn render_report(
    report: &DiffReport,
    reference: &TraceSequence,
    test: &TraceSequence,
    ref_map: &SemanticMap,
    test_map: &SemanticMap,
    window: usize,
) -> String {
    let mut out = String::new();

    writeln!(
        out,
        "Compared {} positions ({} matched cleanly)",
        report.compared, report.matched
    )
    .expect("string write");
    writeln!(
        out,
        "Semantically comparable positions (both ci >= 0): {}",
        report.semantic_comparable
    )
    .expect("string write");
    if report.ref_len != report.test_len {
        writeln!(
            out,
            "Note: sequence lengths differ (ref {}, test {}); trailing events not compared",
            report.ref_len, report.test_len
        )
        .expect("string write");
    }

    writeln!(out, "\nMismatch classes:").expect("string write");
    write_class_line(&mut out, "event type", &report.type_mismatch);
    write_class_line(&mut out, "engine state", &report.state_mismatch);
    write_class_line(&mut out, "semantic category", &report.category_mismatch);
    write_class_line(&mut out, "semantic sub-index", &report.sub_index_mismatch);
    write_class_line(&mut out, "counter drift", &report.counter_drift);

    if report.is_clean() {
        writeln!(out, "\nAll {} compared positions match.", report.compared)
            .expect("string write");
        return out;
    }

    write_first_detail(
        &mut out,
        "FIRST TYPE MISMATCH",
        &report.type_mismatch,
        ref_map,
        test_map,
    );
    write_first_detail(
        &mut out,
        "FIRST STATE MISMATCH",
        &report.state_mismatch,
        ref_map,
        test_map,
    );
    write_first_detail(
        &mut out,
        "FIRST CATEGORY MISMATCH",
        &report.category_mismatch,
        ref_map,
        test_map,
    );
    write_first_detail(
        &mut out,
        "FIRST SUB-INDEX MISMATCH",
        &report.sub_index_mismatch,
        ref_map,
        test_map,
    );
    write_first_detail(
        &mut out,
        "FIRST COUNTER DRIFT",
        &report.counter_drift,
        ref_map,
        test_map,
    );

    // One context window per distinct first-occurrence index, earliest first.
    let mut centers: Vec<usize> = [
        &report.type_mismatch,
        &report.state_mismatch,
        &report.category_mismatch,
        &report.sub_index_mismatch,
        &report.counter_drift,
    ]
    .iter()
    .filter_map(|t| t.first_index())
    .collect();
    centers.sort_unstable();
    centers.dedup();

    for center in centers {
        writeln!(out, "\n--- Context around #{center} ---").expect("string write");
        out.push_str(&render_window(
            reference, test, ref_map, test_map, center, window,
        ));
    }

    out
}
