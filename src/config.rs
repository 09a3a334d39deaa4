//src/config.rs

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::genome_size::GenomeSize;
use crate::options::StageOptions;
use crate::stage::Tool;

/// REPmask threshold = depth * this, unless overridden.
pub const DEFAULT_REPEAT_DEPTH: f64 = 3.0;
/// DBsplit block size (Mbp) unless the caller passes `-s`.
pub const DEFAULT_BLOCK_SIZE: u64 = 100;

/// Caller-supplied extra options, one entry per configurable tool.
#[derive(Debug, Clone)]
pub struct StageOptionSet {
    pub dbsplit: StageOptions,
    pub daligner: StageOptions,
    pub repmask: StageOptions,
    pub datander: StageOptions,
    pub tanmask: StageOptions,
    pub dascover: StageOptions,
    pub dasqv: StageOptions,
    pub dastrim: StageOptions,
    pub daspatch: StageOptions,
    pub dasedit: StageOptions,
}

/// Raw option strings as they come from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawStageOptions {
    pub dbsplit: Option<String>,
    pub daligner: Option<String>,
    pub repmask: Option<String>,
    pub datander: Option<String>,
    pub tanmask: Option<String>,
    pub dascover: Option<String>,
    pub dasqv: Option<String>,
    pub dastrim: Option<String>,
    pub daspatch: Option<String>,
    pub dasedit: Option<String>,
}

impl StageOptionSet {
    pub fn from_raw(raw: &RawStageOptions) -> Self {
        let parse = |tool: Tool, s: &Option<String>| StageOptions::parse(s.as_deref(), tool.derived_flags());
        Self {
            dbsplit: parse(Tool::DbSplit, &raw.dbsplit),
            daligner: parse(Tool::Daligner, &raw.daligner),
            repmask: parse(Tool::RepMask, &raw.repmask),
            datander: parse(Tool::Datander, &raw.datander),
            tanmask: parse(Tool::TanMask, &raw.tanmask),
            dascover: parse(Tool::DasCover, &raw.dascover),
            dasqv: parse(Tool::DasQv, &raw.dasqv),
            dastrim: parse(Tool::DasTrim, &raw.dastrim),
            daspatch: parse(Tool::DasPatch, &raw.daspatch),
            dasedit: parse(Tool::DasEdit, &raw.dasedit),
        }
    }
}

impl Default for StageOptionSet {
    fn default() -> Self {
        Self::from_raw(&RawStageOptions::default())
    }
}

#[derive(Debug, Clone)]
pub struct ScrubConfig {
    pub input_reads: PathBuf,
    pub genome_size: GenomeSize,
    /// Temporary directory; `None` means `dascrubber_temp_<PID>` here.
    pub temp_dir: Option<PathBuf>,
    pub keep: bool,
    pub repeat_depth: f64,
    pub stage_options: StageOptionSet,
}

impl ScrubConfig {
    pub fn new(input_reads: impl Into<PathBuf>, genome_size: GenomeSize) -> Self {
        Self {
            input_reads: input_reads.into(),
            genome_size,
            temp_dir: None,
            keep: false,
            repeat_depth: DEFAULT_REPEAT_DEPTH,
            stage_options: StageOptionSet::default(),
        }
    }

    /// Rejects settings that can never work and logs the genome-size advisory.
    pub fn validate(&self) -> Result<()> {
        if !(self.repeat_depth > 1.0) {
            return Err(Error::RepeatDepth(self.repeat_depth));
        }
        if let Some(advisory) = self.genome_size.advisory() {
            log::warn!("{advisory}");
        }
        Ok(())
    }

    /// Absolute path of the temporary directory this run will use.
    pub fn resolved_temp_dir(&self) -> Result<PathBuf> {
        let dir = match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(format!("dascrubber_temp_{}", std::process::id())),
        };
        absolute(&dir)
    }
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::io(path, e))
}
