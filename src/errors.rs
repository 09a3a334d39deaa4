//src/errors.rs

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error reading or writing \"{}\": {source}", .path.display())]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{format} format not supported: {}", .path.display())]
    UnsupportedCompression {
        path: PathBuf,
        format: &'static str,
    },

    #[error("{} is neither FASTA or FASTQ", .path.display())]
    UnknownFormat { path: PathBuf },

    #[error("Failed to parse read header on line {line}: \"{header}\"")]
    MalformedHeader { line: usize, header: String },

    #[error("Record \"{read}\" ends before its {missing} line")]
    TruncatedRecord { read: String, missing: &'static str },

    #[error("Duplicate read name: {0}")]
    DuplicateReadName(String),

    #[error("Could not parse genome size: \"{0}\"")]
    GenomeSize(String),

    #[error("Genome size must be a positive value")]
    NonPositiveGenomeSize,

    #[error("Repeat depth must be greater than 1 (got {0})")]
    RepeatDepth(f64),

    #[error("Could not find tool{}: {}", plural(.0.len()), .0.join(", "))]
    MissingTools(Vec<String>),

    #[error("Input read file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Temporary directory already exists: {}", .0.display())]
    WorkDirExists(PathBuf),

    #[error("Could not start \"{command}\": {source}")]
    StageSpawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Command failed ({}): {command}", describe_status(.status))]
    StageFailed { command: String, status: Option<i32> },

    #[error("{stage} output did not contain a recommended {target} command")]
    MissingRecommendation {
        stage: &'static str,
        target: &'static str,
    },

    #[error("Could not read the {flag} value from recommendation line: \"{line}\"")]
    MalformedRecommendation { line: String, flag: &'static str },

    #[error("Could not parse scrubbed read name: \"{0}\"")]
    MalformedSyntheticName(String),

    #[error("Sequence data before the first header in {}", .0.display())]
    OrphanSequence(PathBuf),

    #[error("Scrubbed read refers to unknown read index {0}")]
    UnknownReadIndex(usize),
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }
}
