//! cabac-diff - differential CABAC trace analyzer.
//!
//! Compares two independently produced execution traces of a CABAC decoder
//! (a reference implementation and an implementation under test) to locate
//! the earliest point where their decoding diverges, even though each
//! implementation numbers its internal probability contexts differently.
//!
//! Raw context indices are normalized through per-implementation
//! [`SemanticMap`]s into canonical `(syntax element, sub-index)` identities
//! before comparison, and disagreements are classified into independent
//! root-cause classes: structural desync, context-derivation error,
//! arithmetic-engine error, and counter drift.
//!
//! # Example
//!
//! ```ignore
//! use cabac_diff::{DiffConfig, Differencer, libde265_map, rust_decoder_map, parse_trace_file};
//!
//! let reference = parse_trace_file("libde265_trace.txt".as_ref())?;
//! let test = parse_trace_file("rust_trace.txt".as_ref())?;
//! let (ref_map, test_map) = (libde265_map(), rust_decoder_map());
//!
//! let differ = Differencer::new(&ref_map, &test_map, DiffConfig::default());
//! let report = differ.run(&reference.context_coded(), &test.context_coded());
//! println!("first divergence: {:?}", report.first_divergence());
//! ```

mod diff;
mod error;
mod report;
mod semantic;
mod trace;

pub use diff::{DiffConfig, DiffReport, Differencer, DivergenceRecord, MismatchKind, MismatchTrack};
pub use error::{Error, Result};
pub use report::{DEFAULT_WINDOW, render_report, render_window, semantic_label};
pub use semantic::{ContextRange, Resolution, SemanticMap, libde265_map, rust_decoder_map};
pub use trace::{
    BinKind, CtxInfo, TraceEvent, TraceSequence, parse_trace_file, parse_trace_str,
};
