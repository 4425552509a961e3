//! Trace parsing and the event data model.
//!
//! Traces are line-oriented text emitted by decoder instrumentation. Three
//! record shapes are recognized by their leading tag:
//!
//! - `BIN#<n> ctx r=<r> v=<v> bn=<bn> bin=<b> s=<s> m=<m> [ci=<ci>]`
//! - `BYP#<n> r=<r> v=<v> bn=<bn> bin=<b>`
//! - `TRM#<n> r=<r> v=<v> bn=<bn> bin=<b>`
//!
//! Anything else on a line is ignored; instrumentation output is routinely
//! interleaved with unrelated log lines, and several records can share one
//! physical line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Kind of binary decision recorded in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinKind {
    /// Coded against an adaptive probability context.
    ContextCoded,
    /// Coded without context adaptation.
    Bypass,
    /// End-of-unit marker, structurally like a bypass bin.
    Terminate,
}

impl std::fmt::Display for BinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinKind::ContextCoded => write!(f, "ctx"),
            BinKind::Bypass => write!(f, "bypass"),
            BinKind::Terminate => write!(f, "terminate"),
        }
    }
}

/// Context-model fields present only on context-coded bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtxInfo {
    /// Adaptive probability state.
    pub state: u8,
    /// Most probable symbol.
    pub mps: u8,
    /// Raw implementation-local context index; `-1` when the tracer did not
    /// report one.
    pub context_index: i32,
}

/// A single decoded-bin trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Source-local monotonic counter assigned by the instrumentation.
    pub counter: u64,
    pub kind: BinKind,
    /// Arithmetic-coding interval width.
    pub range: u32,
    /// Arithmetic-coding interval offset.
    pub value: u32,
    /// Bits pending from the bitstream; may be negative.
    pub bits_needed: i32,
    /// Decoded bin value.
    pub bin: u8,
    /// Present iff `kind == BinKind::ContextCoded`.
    pub ctx: Option<CtxInfo>,
}

impl TraceEvent {
    pub fn is_context_coded(&self) -> bool {
        self.kind == BinKind::ContextCoded
    }

    /// Raw context index, if this is a context-coded bin that reported one.
    pub fn context_index(&self) -> Option<i32> {
        self.ctx.map(|c| c.context_index)
    }

    /// Whether all engine-state fields agree with `other`.
    ///
    /// Covers range, value, bits_needed, bin, and (for context-coded bins)
    /// probability state and MPS. The context index is deliberately excluded:
    /// raw indices are not comparable across implementations.
    pub fn state_matches(&self, other: &TraceEvent) -> bool {
        self.range == other.range
            && self.value == other.value
            && self.bits_needed == other.bits_needed
            && self.bin == other.bin
            && match (self.ctx, other.ctx) {
                (Some(a), Some(b)) => a.state == b.state && a.mps == b.mps,
                (None, None) => true,
                _ => false,
            }
    }

    /// Find every trace record on one physical line, ordered by the column
    /// at which it starts.
    ///
    /// Instrumentation from different layers can end up interleaved on a
    /// single line; offset order preserves true emission order where a
    /// tag-by-tag scan would not.
    fn scan_line(line: &str) -> Vec<(usize, TraceEvent)> {
        let mut found = Vec::new();

        let ctx_pattern = CTX_PATTERN.get_or_init(|| {
            Regex::new(
                r"BIN#(\d+)\s+ctx\s+r=(\d+)\s+v=(\d+)\s+bn=(-?\d+)\s+bin=(\d+)\s+s=(\d+)\s+m=(\d+)(\s+ci=(-?\d+))?",
            )
            .unwrap()
        });
        for caps in ctx_pattern.captures_iter(line) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let event = (|| {
                Some(TraceEvent {
                    counter: caps.get(1)?.as_str().parse().ok()?,
                    kind: BinKind::ContextCoded,
                    range: caps.get(2)?.as_str().parse().ok()?,
                    value: caps.get(3)?.as_str().parse().ok()?,
                    bits_needed: caps.get(4)?.as_str().parse().ok()?,
                    bin: caps.get(5)?.as_str().parse().ok()?,
                    ctx: Some(CtxInfo {
                        state: caps.get(6)?.as_str().parse().ok()?,
                        mps: caps.get(7)?.as_str().parse().ok()?,
                        context_index: match caps.get(9) {
                            Some(ci) => ci.as_str().parse().ok()?,
                            None => -1,
                        },
                    }),
                })
            })();
            if let Some(event) = event {
                found.push((start, event));
            }
        }

        let raw_pattern = RAW_PATTERN.get_or_init(|| {
            Regex::new(r"(BYP|TRM)#(\d+)\s+r=(\d+)\s+v=(\d+)\s+bn=(-?\d+)\s+bin=(\d+)").unwrap()
        });
        for caps in raw_pattern.captures_iter(line) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let event = (|| {
                let kind = match caps.get(1)?.as_str() {
                    "BYP" => BinKind::Bypass,
                    _ => BinKind::Terminate,
                };
                Some(TraceEvent {
                    counter: caps.get(2)?.as_str().parse().ok()?,
                    kind,
                    range: caps.get(3)?.as_str().parse().ok()?,
                    value: caps.get(4)?.as_str().parse().ok()?,
                    bits_needed: caps.get(5)?.as_str().parse().ok()?,
                    bin: caps.get(6)?.as_str().parse().ok()?,
                    ctx: None,
                })
            })();
            if let Some(event) = event {
                found.push((start, event));
            }
        }

        found.sort_by_key(|(start, _)| *start);
        found
    }
}

static CTX_PATTERN: OnceLock<Regex> = OnceLock::new();
static RAW_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Ordered, immutable sequence of trace events from one decoder run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceSequence {
    events: Vec<TraceEvent>,
}

impl TraceSequence {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&TraceEvent> {
        self.events.get(index)
    }

    pub fn count_kind(&self, kind: BinKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Derived subsequence of context-coded events only.
    ///
    /// All comparisons that need probability state or context indices run
    /// over this view; bypass bins are batched by some decoders and do not
    /// line up one-to-one.
    pub fn context_coded(&self) -> TraceSequence {
        TraceSequence {
            events: self
                .events
                .iter()
                .filter(|e| e.is_context_coded())
                .cloned()
                .collect(),
        }
    }
}

/// Incremental line-by-line parser enforcing counter monotonicity.
struct LineParser {
    events: Vec<TraceEvent>,
    last_counter: Option<u64>,
}

impl LineParser {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            last_counter: None,
        }
    }

    fn feed(&mut self, line: &str) {
        for (_, event) in TraceEvent::scan_line(line) {
            // A counter that fails to advance means a torn or duplicated
            // instrumentation write; treat the record as malformed.
            if self.last_counter.is_some_and(|last| event.counter <= last) {
                tracing::debug!(counter = event.counter, "skipping non-monotonic trace record");
                continue;
            }
            self.last_counter = Some(event.counter);
            self.events.push(event);
        }
    }

    fn finish(self) -> TraceSequence {
        TraceSequence::new(self.events)
    }
}

/// Parse trace text into an ordered sequence.
///
/// Unparseable lines are skipped; zero events is a valid result.
pub fn parse_trace_str(input: &str) -> TraceSequence {
    let mut parser = LineParser::new();
    for line in input.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Parse a trace file into an ordered sequence.
pub fn parse_trace_file(path: &Path) -> Result<TraceSequence> {
    let file = File::open(path).map_err(|source| Error::InputNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut parser = LineParser::new();
    for line in reader.lines() {
        let line = line?;
        parser.feed(&line);
    }
    let sequence = parser.finish();
    tracing::debug!(
        path = %path.display(),
        events = sequence.len(),
        ctx = sequence.count_kind(BinKind::ContextCoded),
        "parsed trace file"
    );
    Ok(sequence)
}
