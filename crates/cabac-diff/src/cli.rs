//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use cabac_diff::{DEFAULT_WINDOW, DiffConfig, SemanticMap, libde265_map, rust_decoder_map};

/// Exit code for success (divergence is a finding, not a failure).
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure (I/O error, bad arguments).
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "cabac-diff")]
#[command(about = "Locates where two CABAC decoder traces diverge")]
#[command(version)]
pub struct Cli {
    /// Reference trace file
    #[arg(value_name = "REF", default_value = "libde265_trace.txt")]
    pub reference: PathBuf,

    /// Test trace file
    #[arg(value_name = "TEST", default_value = "rust_trace.txt")]
    pub test: PathBuf,

    /// Context numbering scheme of the reference trace
    #[arg(long, value_enum, default_value = "libde265")]
    pub ref_scheme: SchemeArg,

    /// Context numbering scheme of the test trace
    #[arg(long, value_enum, default_value = "rust")]
    pub test_scheme: SchemeArg,

    /// Rows shown on each side of a divergence
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Compare all events in lockstep instead of context-coded bins only
    /// (bypass batching makes full lockstep unreliable across decoders)
    #[arg(long)]
    pub all_events: bool,

    /// Compare event kinds (use --check-type=false to disable)
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub check_type: bool,

    /// Compare engine state fields
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub check_state: bool,

    /// Compare resolved semantic identities
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub check_semantic: bool,

    /// Compare source-local counters
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub check_drift: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,
}

impl Cli {
    pub fn diff_config(&self) -> DiffConfig {
        DiffConfig {
            check_type: self.check_type,
            check_state: self.check_state,
            check_semantic: self.check_semantic,
            check_drift: self.check_drift,
        }
    }
}

/// Builtin context numbering schemes.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SchemeArg {
    /// libde265 context model layout
    Libde265,
    /// Rust HEVC decoder context model layout
    Rust,
}

impl SchemeArg {
    pub fn build_map(self) -> SemanticMap {
        match self {
            SchemeArg::Libde265 => libde265_map(),
            SchemeArg::Rust => rust_decoder_map(),
        }
    }
}
