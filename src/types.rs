//src/types.rs

use std::fmt;

use crate::errors::{Error, Result};

/// One read as it came out of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub original_id: String,
    pub comment: Option<String>,
    pub sequence: String,
}

/// The `reads/<index>/<range>` name the Dazzler tools require.
///
/// `index` never changes once assigned. `range` starts out as `0_<length>`;
/// DAStrim/DASedit may rewrite it when they trim or split a read, so it is
/// kept as an opaque payload and echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticName {
    pub index: usize,
    pub range: String,
}

impl SyntheticName {
    /// Name for a freshly ingested read covering the whole sequence.
    pub fn initial(index: usize, length: usize) -> Self {
        Self {
            index,
            range: format!("0_{length}"),
        }
    }

    /// Parses a header (without `>`) of the form `<prefix>/<index>/<range...>`.
    /// Everything after the second `/` is the range payload, slashes included.
    pub fn parse(header: &str) -> Result<Self> {
        let mut fields = header.splitn(3, '/');
        let _prefix = fields.next();
        let index = fields
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::MalformedSyntheticName(header.to_string()))?;
        let range = fields
            .next()
            .ok_or_else(|| Error::MalformedSyntheticName(header.to_string()))?;

        Ok(Self {
            index,
            range: range.to_string(),
        })
    }
}

impl fmt::Display for SyntheticName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "reads/{}/{}", self.index, self.range)
    }
}

/// Captured output of one external invocation.
#[derive(Debug, Clone, Default)]
pub struct StageResult {
    /// Stdout and stderr lines, interleaved as the child wrote them.
    pub output: Vec<String>,
    /// `None` when the child was killed by a signal.
    pub status: Option<i32>,
}

impl StageResult {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}
