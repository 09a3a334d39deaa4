//src/depth.rs

use std::fmt;

use crate::genome_size::GenomeSize;

/// Running base count over ingested reads.
#[derive(Debug, Default, Clone)]
pub struct DepthEstimator {
    total_bases: u64,
    reads: u64,
}

impl DepthEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_read(&mut self, length: usize) {
        self.total_bases += length as u64;
        self.reads += 1;
    }

    pub fn total_bases(&self) -> u64 {
        self.total_bases
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// `total_bases / genome_size`, computed once ingestion is complete.
    pub fn finalize(&self, genome_size: GenomeSize) -> CoverageDepth {
        CoverageDepth(self.total_bases as f64 / genome_size.bases() as f64)
    }
}

/// Estimated depth of coverage for the whole read set.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CoverageDepth(f64);

impl CoverageDepth {
    pub fn value(self) -> f64 {
        self.0
    }

    /// `round(depth * multiplier)`, halves to even, used for coverage-style
/// thresholds.
    pub fn scaled_threshold(self, multiplier: f64) -> u64 {
        (self.0 * multiplier).round_ties_even().max(0.0) as u64
    }
}

impl fmt::Display for CoverageDepth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}
