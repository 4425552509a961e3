//! Semantic context mapping.
//!
//! CABAC implementations number their probability contexts however they like,
//! so a raw `ci` value from one decoder means nothing next to a raw `ci` from
//! another. Each implementation gets a [`SemanticMap`]: an ordered, disjoint
//! set of index bands, each naming the syntax element that band encodes. A
//! raw index resolves to a canonical `(name, sub_index)` pair that *is*
//! comparable across implementations.

use crate::error::{Error, Result};

/// One contiguous band of an implementation's context numbering, denoting a
/// single logical syntax element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRange {
    /// First raw index covered, inclusive.
    pub low: i32,
    /// Last raw index covered, inclusive.
    pub high: i32,
    /// Canonical syntax-element name.
    pub name: &'static str,
}

impl ContextRange {
    pub const fn new(low: i32, high: i32, name: &'static str) -> Self {
        Self { low, high, name }
    }

    fn contains(&self, index: i32) -> bool {
        index >= self.low && index <= self.high
    }
}

impl std::fmt::Display for ContextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..={}]", self.name, self.low, self.high)
    }
}

/// Result of resolving a raw context index.
///
/// Two `Unknown` values compare equal only for the same raw index, so an
/// unresolved index is never conflated with another unknown or with a
/// legitimate resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Known { name: &'static str, sub_index: i32 },
    Unknown(i32),
}

impl Resolution {
    /// Whether both resolutions denote the same logical syntax element.
    pub fn same_element(&self, other: &Resolution) -> bool {
        match (self, other) {
            (Resolution::Known { name: a, .. }, Resolution::Known { name: b, .. }) => a == b,
            (Resolution::Unknown(a), Resolution::Unknown(b)) => a == b,
            _ => false,
        }
    }

    pub fn sub_index(&self) -> i32 {
        match self {
            Resolution::Known { sub_index, .. } => *sub_index,
            Resolution::Unknown(_) => 0,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Known { name, sub_index } => write!(f, "{name}[{sub_index}]"),
            Resolution::Unknown(raw) => write!(f, "UNKNOWN({raw})"),
        }
    }
}

/// Per-implementation lookup from raw context index to canonical identity.
///
/// Static configuration: built once per implementation, read-only afterwards.
#[derive(Debug, Clone)]
pub struct SemanticMap {
    /// Sorted by `low`; pairwise disjoint.
    ranges: Vec<ContextRange>,
}

impl SemanticMap {
    /// Build a map from a list of ranges.
    ///
    /// Inverted or overlapping ranges are rejected here rather than silently
    /// resolved at lookup time.
    pub fn new(mut ranges: Vec<ContextRange>) -> Result<Self> {
        for range in &ranges {
            if range.low > range.high {
                return Err(Error::InvertedRange { range: *range });
            }
        }
        ranges.sort_by_key(|r| r.low);
        for pair in ranges.windows(2) {
            if pair[1].low <= pair[0].high {
                return Err(Error::OverlappingRanges {
                    first: pair[0],
                    second: pair[1],
                });
            }
        }
        Ok(Self { ranges })
    }

    /// Resolve a raw index to its canonical identity.
    ///
    /// Total over `i32`: negative or uncovered indices yield
    /// [`Resolution::Unknown`] instead of failing.
    pub fn resolve(&self, index: i32) -> Resolution {
        if index < 0 {
            return Resolution::Unknown(index);
        }
        // Last range whose low bound does not exceed the index.
        let pos = self.ranges.partition_point(|r| r.low <= index);
        if pos > 0 {
            let range = &self.ranges[pos - 1];
            if range.contains(index) {
                return Resolution::Known {
                    name: range.name,
                    sub_index: index - range.low,
                };
            }
        }
        Resolution::Unknown(index)
    }

    pub fn ranges(&self) -> &[ContextRange] {
        &self.ranges
    }
}

/// Context table for libde265's numbering (from its contextmodel layout).
pub fn libde265_map() -> SemanticMap {
    SemanticMap::new(vec![
        ContextRange::new(0, 0, "SAO_MERGE_FLAG"),
        ContextRange::new(1, 1, "SAO_TYPE_IDX"),
        ContextRange::new(2, 4, "SPLIT_CU_FLAG"),
        ContextRange::new(5, 7, "CU_SKIP_FLAG"),
        ContextRange::new(8, 11, "PART_MODE"),
        ContextRange::new(12, 12, "PREV_INTRA_LUMA_PRED_FLAG"),
        ContextRange::new(13, 13, "INTRA_CHROMA_PRED_MODE"),
        ContextRange::new(14, 15, "CBF_LUMA"),
        ContextRange::new(16, 19, "CBF_CHROMA"),
        ContextRange::new(20, 22, "SPLIT_TRANSFORM_FLAG"),
        ContextRange::new(23, 23, "CU_CHROMA_QP_OFFSET_FLAG"),
        ContextRange::new(24, 24, "CU_CHROMA_QP_OFFSET_IDX"),
        ContextRange::new(25, 42, "LAST_SIG_COEFF_X_PREFIX"),
        ContextRange::new(43, 60, "LAST_SIG_COEFF_Y_PREFIX"),
        ContextRange::new(61, 64, "CODED_SUB_BLOCK_FLAG"),
        ContextRange::new(65, 108, "SIG_COEFF_FLAG"),
        ContextRange::new(109, 132, "COEFF_ABS_LEVEL_GREATER1_FLAG"),
        ContextRange::new(133, 138, "COEFF_ABS_LEVEL_GREATER2_FLAG"),
        ContextRange::new(139, 140, "CU_QP_DELTA_ABS"),
        ContextRange::new(141, 142, "TRANSFORM_SKIP_FLAG"),
        ContextRange::new(143, 144, "RDPCM_FLAG"),
        ContextRange::new(145, 146, "RDPCM_DIR"),
        ContextRange::new(147, 147, "MERGE_FLAG"),
        ContextRange::new(148, 148, "MERGE_IDX"),
        ContextRange::new(149, 149, "PRED_MODE_FLAG"),
        ContextRange::new(150, 151, "ABS_MVD_GREATER01_FLAG"),
        ContextRange::new(152, 152, "MVP_LX_FLAG"),
        ContextRange::new(153, 153, "RQT_ROOT_CBF"),
        ContextRange::new(154, 155, "REF_IDX_LX"),
        ContextRange::new(156, 160, "INTER_PRED_IDC"),
        ContextRange::new(161, 161, "CU_TRANSQUANT_BYPASS_FLAG"),
        ContextRange::new(162, 169, "LOG2_RES_SCALE_ABS_PLUS1"),
        ContextRange::new(170, 171, "RES_SCALE_SIGN_FLAG"),
    ])
    .expect("libde265 context table is disjoint")
}

/// Context table for the Rust decoder's numbering.
///
/// Same canonical names as [`libde265_map`] but different bands; some
/// elements exist on only one side (PALETTE_MODE_FLAG, TRANSFORM_SKIP_FLAG_QP
/// here; RDPCM_FLAG, RDPCM_DIR, RQT_ROOT_CBF there). That asymmetry is the
/// whole reason raw-index comparison is insufficient.
pub fn rust_decoder_map() -> SemanticMap {
    SemanticMap::new(vec![
        ContextRange::new(0, 0, "SAO_MERGE_FLAG"),
        ContextRange::new(1, 1, "SAO_TYPE_IDX"),
        ContextRange::new(2, 4, "SPLIT_CU_FLAG"),
        ContextRange::new(5, 5, "CU_TRANSQUANT_BYPASS_FLAG"),
        ContextRange::new(6, 8, "CU_SKIP_FLAG"),
        ContextRange::new(9, 9, "PALETTE_MODE_FLAG"),
        ContextRange::new(10, 10, "PRED_MODE_FLAG"),
        ContextRange::new(11, 14, "PART_MODE"),
        ContextRange::new(15, 15, "PREV_INTRA_LUMA_PRED_FLAG"),
        ContextRange::new(16, 16, "INTRA_CHROMA_PRED_MODE"),
        ContextRange::new(17, 21, "INTER_PRED_IDC"),
        ContextRange::new(22, 22, "MERGE_FLAG"),
        ContextRange::new(23, 23, "MERGE_IDX"),
        ContextRange::new(24, 24, "MVP_LX_FLAG"),
        ContextRange::new(25, 26, "REF_IDX_LX"),
        ContextRange::new(27, 28, "ABS_MVD_GREATER01_FLAG"),
        ContextRange::new(29, 29, "ABS_MVD_GREATER1_FLAG"),
        ContextRange::new(30, 32, "SPLIT_TRANSFORM_FLAG"),
        ContextRange::new(33, 34, "CBF_LUMA"),
        ContextRange::new(35, 39, "CBF_CHROMA"),
        ContextRange::new(40, 41, "TRANSFORM_SKIP_FLAG"),
        ContextRange::new(42, 59, "LAST_SIG_COEFF_X_PREFIX"),
        ContextRange::new(60, 77, "LAST_SIG_COEFF_Y_PREFIX"),
        ContextRange::new(78, 81, "CODED_SUB_BLOCK_FLAG"),
        ContextRange::new(82, 125, "SIG_COEFF_FLAG"),
        ContextRange::new(126, 149, "COEFF_ABS_LEVEL_GREATER1_FLAG"),
        ContextRange::new(150, 155, "COEFF_ABS_LEVEL_GREATER2_FLAG"),
        ContextRange::new(156, 157, "CU_QP_DELTA_ABS"),
        ContextRange::new(158, 159, "TRANSFORM_SKIP_FLAG_QP"),
        ContextRange::new(160, 160, "CU_CHROMA_QP_OFFSET_FLAG"),
        ContextRange::new(161, 161, "CU_CHROMA_QP_OFFSET_IDX"),
        ContextRange::new(162, 169, "LOG2_RES_SCALE_ABS_PLUS1"),
        ContextRange::new(170, 171, "RES_SCALE_SIGN_FLAG"),
    ])
    .expect("rust decoder context table is disjoint")
}
