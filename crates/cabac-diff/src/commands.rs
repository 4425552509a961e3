//! Command implementation: load both traces, compare, render, exit code.

use console::style;

use cabac_diff::{
    BinKind, Differencer, TraceSequence, parse_trace_file, render_report,
};

use crate::cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS};

fn print_counts(label: &str, path: &std::path::Path, sequence: &TraceSequence) {
    println!(
        "{label} {} - {} events ({} ctx, {} bypass, {} terminate)",
        path.display(),
        sequence.len(),
        sequence.count_kind(BinKind::ContextCoded),
        sequence.count_kind(BinKind::Bypass),
        sequence.count_kind(BinKind::Terminate),
    );
}

/// Run the comparison described by the CLI arguments.
pub fn cmd_compare(cli: &Cli) -> i32 {
    // The two parses are independent; do them in parallel.
    let (ref_result, test_result) = rayon::join(
        || parse_trace_file(&cli.reference),
        || parse_trace_file(&cli.test),
    );

    let (reference, test) = match (ref_result, test_result) {
        (Ok(r), Ok(t)) => (r, t),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{} {e}", style("✗").red().bold());
            return EXIT_FAILURE;
        }
    };

    if !cli.silent {
        print_counts("Reference:", &cli.reference, &reference);
        print_counts("Test:     ", &cli.test, &test);
        println!();
    }

    let ref_map = cli.ref_scheme.build_map();
    let test_map = cli.test_scheme.build_map();

    let (ref_view, test_view) = if cli.all_events {
        (reference.clone(), test.clone())
    } else {
        (reference.context_coded(), test.context_coded())
    };

    let differ = Differencer::new(&ref_map, &test_map, cli.diff_config());
    let report = differ.run(&ref_view, &test_view);

    if !cli.silent {
        print!(
            "{}",
            render_report(&report, &ref_view, &test_view, &ref_map, &test_map, cli.window)
        );
    }

    if report.is_clean() {
        eprintln!(
            "{} no divergence in {} compared positions",
            style("✓").green().bold(),
            report.compared
        );
    } else {
        eprintln!(
            "{} first divergence at position {}",
            style("✗").red().bold(),
            report
                .first_divergence()
                .map_or_else(|| "?".to_string(), |i| i.to_string())
        );
    }

    // Divergence is a finding, not a process failure.
    EXIT_SUCCESS
}
