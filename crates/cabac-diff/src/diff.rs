//! Lockstep trace differencing.
//!
//! Walks two parsed sequences position by position and tracks four
//! independent mismatch classes in a single O(n) pass. Each class localizes a
//! different bug category, so finding one never stops tracking another, with
//! one exception: after the first kind mismatch the two runs are no longer
//! parsing the same syntax, so field-level (state/semantic) comparison at
//! later positions is meaningless and stops accumulating. Counter drift keeps
//! being tracked throughout.

use crate::semantic::SemanticMap;
use crate::trace::{TraceEvent, TraceSequence};

/// Mismatch classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// Event kinds differ: structural desync.
    Type,
    /// Engine state (range/value/bits_needed/bin/state/mps) differs:
    /// arithmetic-engine or probability-adaptation bug.
    State,
    /// Resolved syntax elements differ entirely: upstream structural desync.
    CategorySemantic,
    /// Same syntax element, different sub-index: context-derivation bug.
    SubIndexSemantic,
    /// Source-local counters differ at the same position: extra or missing
    /// events upstream.
    CounterDrift,
}

impl std::fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MismatchKind::Type => write!(f, "event type mismatch"),
            MismatchKind::State => write!(f, "engine state mismatch"),
            MismatchKind::CategorySemantic => write!(f, "semantic category mismatch"),
            MismatchKind::SubIndexSemantic => write!(f, "semantic sub-index mismatch"),
            MismatchKind::CounterDrift => write!(f, "counter drift"),
        }
    }
}

/// One located divergence between the two traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceRecord {
    pub kind: MismatchKind,
    /// Position in the lockstep walk.
    pub index: usize,
    pub ref_event: TraceEvent,
    pub test_event: TraceEvent,
}

/// First occurrence and running total for one mismatch class.
#[derive(Debug, Clone, Default)]
pub struct MismatchTrack {
    pub first: Option<DivergenceRecord>,
    pub total: usize,
}

impl MismatchTrack {
    fn record(&mut self, kind: MismatchKind, index: usize, r: &TraceEvent, t: &TraceEvent) {
        self.total += 1;
        if self.first.is_none() {
            self.first = Some(DivergenceRecord {
                kind,
                index,
                ref_event: r.clone(),
                test_event: t.clone(),
            });
        }
    }

    pub fn first_index(&self) -> Option<usize> {
        self.first.as_ref().map(|d| d.index)
    }
}

/// Independently toggleable comparison dimensions.
#[derive(Debug, Clone, Copy)]
pub struct DiffConfig {
    pub check_type: bool,
    pub check_state: bool,
    pub check_semantic: bool,
    pub check_drift: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            check_type: true,
            check_state: true,
            check_semantic: true,
            check_drift: true,
        }
    }
}

/// Result of one lockstep comparison.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub ref_len: usize,
    pub test_len: usize,
    /// Positions walked: `min(ref_len, test_len)`.
    pub compared: usize,
    /// Positions clean in every enabled class.
    pub matched: usize,
    /// Positions where both sides reported a usable (`>= 0`) context index.
    pub semantic_comparable: usize,
    pub type_mismatch: MismatchTrack,
    pub state_mismatch: MismatchTrack,
    pub category_mismatch: MismatchTrack,
    pub sub_index_mismatch: MismatchTrack,
    pub counter_drift: MismatchTrack,
    /// Every position with a category mismatch, in order.
    pub category_indices: Vec<usize>,
    /// Every position with a sub-index mismatch, in order.
    pub sub_index_indices: Vec<usize>,
}

impl DiffReport {
    /// Whether no mismatch of any class was found.
    pub fn is_clean(&self) -> bool {
        self.type_mismatch.total == 0
            && self.state_mismatch.total == 0
            && self.category_mismatch.total == 0
            && self.sub_index_mismatch.total == 0
            && self.counter_drift.total == 0
    }

    /// Earliest first-occurrence index across all classes.
    pub fn first_divergence(&self) -> Option<usize> {
        [
            &self.type_mismatch,
            &self.state_mismatch,
            &self.category_mismatch,
            &self.sub_index_mismatch,
            &self.counter_drift,
        ]
        .iter()
        .filter_map(|t| t.first_index())
        .min()
    }
}

/// Lockstep differencer over two trace sequences.
///
/// Owns nothing mutable beyond the report it is building; sequences and maps
/// are shared read-only.
pub struct Differencer<'a> {
    ref_map: &'a SemanticMap,
    test_map: &'a SemanticMap,
    config: DiffConfig,
}

impl<'a> Differencer<'a> {
    pub fn new(ref_map: &'a SemanticMap, test_map: &'a SemanticMap, config: DiffConfig) -> Self {
        Self {
            ref_map,
            test_map,
            config,
        }
    }

    /// Walk both sequences pairwise and classify every disagreement.
    pub fn run(&self, reference: &TraceSequence, test: &TraceSequence) -> DiffReport {
        let ref_events = reference.events();
        let test_events = test.events();
        let compared = ref_events.len().min(test_events.len());

        let mut report = DiffReport {
            ref_len: ref_events.len(),
            test_len: test_events.len(),
            compared,
            ..DiffReport::default()
        };

        let mut desynced = false;
        for (i, (r, t)) in ref_events.iter().zip(test_events).enumerate() {
            let mut clean = true;

            if self.config.check_drift && r.counter != t.counter {
                report
                    .counter_drift
                    .record(MismatchKind::CounterDrift, i, r, t);
                clean = false;
            }

            if self.config.check_type && r.kind != t.kind {
                report.type_mismatch.record(MismatchKind::Type, i, r, t);
                desynced = true;
                clean = false;
            }

            // Field-level comparison only while the walk is structurally in
            // sync and both events are context-coded.
            if !desynced && r.is_context_coded() && t.is_context_coded() {
                if self.config.check_state && !r.state_matches(t) {
                    report.state_mismatch.record(MismatchKind::State, i, r, t);
                    clean = false;
                }

                if self.config.check_semantic {
                    if let (Some(ref_ci), Some(test_ci)) = (r.context_index(), t.context_index()) {
                        if ref_ci >= 0 && test_ci >= 0 {
                            report.semantic_comparable += 1;
                            let ref_sem = self.ref_map.resolve(ref_ci);
                            let test_sem = self.test_map.resolve(test_ci);
                            if !ref_sem.same_element(&test_sem) {
                                report.category_mismatch.record(
                                    MismatchKind::CategorySemantic,
                                    i,
                                    r,
                                    t,
                                );
                                report.category_indices.push(i);
                                clean = false;
                            } else if ref_sem.sub_index() != test_sem.sub_index() {
                                report.sub_index_mismatch.record(
                                    MismatchKind::SubIndexSemantic,
                                    i,
                                    r,
                                    t,
                                );
                                report.sub_index_indices.push(i);
                                clean = false;
                            }
                        }
                    }
                }
            }

            if clean {
                report.matched += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{libde265_map, rust_decoder_map};
    use crate::trace::{BinKind, CtxInfo};

    fn ctx_event(counter: u64, ci: i32) -> TraceEvent {
        TraceEvent {
            counter,
            kind: BinKind::ContextCoded,
            range: 350,
            value: 117,
            bits_needed: -3,
            bin: 1,
            ctx: Some(CtxInfo {
                state: 14,
                mps: 0,
                context_index: ci,
            }),
        }
    }

    fn bypass_event(counter: u64) -> TraceEvent {
        TraceEvent {
            counter,
            kind: BinKind::Bypass,
            range: 510,
            value: 9,
            bits_needed: 0,
            bin: 0,
            ctx: None,
        }
    }

    fn diff(reference: &TraceSequence, test: &TraceSequence) -> DiffReport {
        let ref_map = libde265_map();
        let test_map = rust_decoder_map();
        Differencer::new(&ref_map, &test_map, DiffConfig::default()).run(reference, test)
    }

    #[test]
    fn test_perfect_match() {
        // Matching semantics across numbering schemes: libde265 65+k and
        // rust 82+k both resolve to SIG_COEFF_FLAG[k].
        let reference =
            TraceSequence::new((0..1000).map(|i| ctx_event(i, 65 + (i as i32 % 44))).collect());
        let test =
            TraceSequence::new((0..1000).map(|i| ctx_event(i, 82 + (i as i32 % 44))).collect());

        let report = diff(&reference, &test);
        assert!(report.is_clean());
        assert_eq!(report.compared, 1000);
        assert_eq!(report.matched, 1000);
        assert_eq!(report.semantic_comparable, 1000);
        assert_eq!(report.first_divergence(), None);
    }

    #[test]
    fn test_category_mismatch_not_sub_index() {
        // ref -> SIG_COEFF_FLAG[3], test -> CBF_LUMA[0].
        let reference = TraceSequence::new(vec![ctx_event(0, 65), ctx_event(1, 68)]);
        let test = TraceSequence::new(vec![ctx_event(0, 82), ctx_event(1, 33)]);

        let report = diff(&reference, &test);
        assert_eq!(report.category_mismatch.first_index(), Some(1));
        assert_eq!(report.category_mismatch.total, 1);
        assert_eq!(report.category_indices, vec![1]);
        assert_eq!(report.sub_index_mismatch.total, 0);
        let first = report.category_mismatch.first.as_ref().unwrap();
        assert_eq!(first.kind, MismatchKind::CategorySemantic);
        assert_eq!(first.ref_event.context_index(), Some(68));
        assert_eq!(first.test_event.context_index(), Some(33));
    }

    #[test]
    fn test_sub_index_mismatch_not_category() {
        // ref -> SIG_COEFF_FLAG[5], test -> SIG_COEFF_FLAG[7].
        let reference = TraceSequence::new(vec![ctx_event(0, 70)]);
        let test = TraceSequence::new(vec![ctx_event(0, 89)]);

        let report = diff(&reference, &test);
        assert_eq!(report.sub_index_mismatch.first_index(), Some(0));
        assert_eq!(report.sub_index_indices, vec![0]);
        assert_eq!(report.category_mismatch.total, 0);
    }

    #[test]
    fn test_state_mismatch_independent_of_semantic_agreement() {
        // ref 70 and test 87 both resolve to SIG_COEFF_FLAG[5].
        let reference = TraceSequence::new(vec![ctx_event(0, 70)]);
        let mut event = ctx_event(0, 87);
        event.range = 351;
        let test = TraceSequence::new(vec![event]);

        let report = diff(&reference, &test);
        assert_eq!(report.state_mismatch.total, 1);
        assert_eq!(report.category_mismatch.total, 0);
        assert_eq!(report.sub_index_mismatch.total, 0);
    }

    #[test]
    fn test_counter_drift_from_extra_bypass() {
        // Base run: bypass, ctx, bypass, ctx, ctx with one shared counter.
        let reference = TraceSequence::new(vec![
            bypass_event(0),
            ctx_event(1, 65),
            bypass_event(2),
            ctx_event(3, 66),
            ctx_event(4, 67),
        ]);
        // Test run emits one extra bypass at position 2; every later bin gets
        // a shifted counter.
        let test = TraceSequence::new(vec![
            bypass_event(0),
            ctx_event(1, 82),
            bypass_event(2),
            bypass_event(3),
            ctx_event(4, 83),
            ctx_event(5, 84),
        ]);

        // Context-coded projection is where drift becomes visible: the extra
        // bypass sat at full-sequence position 3, so drift must surface at a
        // ctx ordinal <= 3.
        let report = diff(&reference.context_coded(), &test.context_coded());
        let first = report.counter_drift.first_index().unwrap();
        assert!(first <= 3);
        assert_eq!(first, 1);
        assert_eq!(report.counter_drift.total, 2);
    }

    #[test]
    fn test_type_mismatch_freezes_state_and_semantic() {
        let reference = TraceSequence::new(vec![
            ctx_event(0, 65),
            ctx_event(1, 66),
            ctx_event(2, 67),
        ]);
        let mut drifted = ctx_event(2, 90); // wrong element AND wrong state
        drifted.range = 12;
        let test = TraceSequence::new(vec![ctx_event(0, 82), bypass_event(1), drifted]);

        let report = diff(&reference, &test);
        assert_eq!(report.type_mismatch.first_index(), Some(1));
        // Position 2 disagreements are not accumulated once desynced.
        assert_eq!(report.state_mismatch.total, 0);
        assert_eq!(report.category_mismatch.total, 0);
    }

    #[test]
    fn test_drift_tracked_after_type_mismatch() {
        let reference = TraceSequence::new(vec![ctx_event(0, 65), ctx_event(1, 66)]);
        let test = TraceSequence::new(vec![bypass_event(0), ctx_event(5, 83)]);

        let report = diff(&reference, &test);
        assert_eq!(report.type_mismatch.first_index(), Some(0));
        assert_eq!(report.counter_drift.first_index(), Some(1));
    }

    #[test]
    fn test_negative_ci_skips_semantic_only() {
        let reference = TraceSequence::new(vec![ctx_event(0, -1)]);
        let mut event = ctx_event(0, 83);
        event.value = 116;
        let test = TraceSequence::new(vec![event]);

        let report = diff(&reference, &test);
        assert_eq!(report.semantic_comparable, 0);
        assert_eq!(report.category_mismatch.total, 0);
        assert_eq!(report.state_mismatch.total, 1);
    }

    #[test]
    fn test_unknown_indices_compared_not_dropped() {
        // Both out of every band but equal raw value: same unknown, clean.
        let reference = TraceSequence::new(vec![ctx_event(0, 400), ctx_event(1, 400)]);
        // Different raw unknowns at position 1: category mismatch.
        let test = TraceSequence::new(vec![ctx_event(0, 400), ctx_event(1, 401)]);

        let report = diff(&reference, &test);
        assert_eq!(report.semantic_comparable, 2);
        assert_eq!(report.category_mismatch.first_index(), Some(1));
    }

    #[test]
    fn test_length_mismatch_informational() {
        let reference = TraceSequence::new((0..5).map(|i| ctx_event(i, 65)).collect());
        let test = TraceSequence::new((0..3).map(|i| ctx_event(i, 82)).collect());

        let report = diff(&reference, &test);
        assert!(report.is_clean());
        assert_eq!(report.compared, 3);
        assert_eq!(report.ref_len, 5);
        assert_eq!(report.test_len, 3);
    }

    #[test]
    fn test_disabled_dimensions_are_skipped() {
        let reference = TraceSequence::new(vec![ctx_event(0, 68)]);
        let test = TraceSequence::new(vec![ctx_event(5, 33)]);

        let ref_map = libde265_map();
        let test_map = rust_decoder_map();
        let config = DiffConfig {
            check_semantic: false,
            check_drift: false,
            ..DiffConfig::default()
        };
        let report = Differencer::new(&ref_map, &test_map, config).run(&reference, &test);
        assert_eq!(report.category_mismatch.total, 0);
        assert_eq!(report.counter_drift.total, 0);
        // Engine state still matches, so the position counts as matched.
        assert_eq!(report.matched, 1);
    }

    #[test]
    fn test_empty_traces_vacuous() {
        let report = diff(&TraceSequence::default(), &TraceSequence::default());
        assert!(report.is_clean());
        assert_eq!(report.compared, 0);
        assert_eq!(report.matched, 0);
    }
}
