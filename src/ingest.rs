//src/ingest.rs

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indicatif::HumanCount;

use crate::depth::{CoverageDepth, DepthEstimator};
use crate::errors::{Error, Result};
use crate::fastx::FastxReader;
use crate::genome_size::GenomeSize;
use crate::progress::ReadCounter;
use crate::registry::IdentityRegistry;
use crate::types::SyntheticName;

/// Everything later steps need from ingestion. Built once, read-only after.
#[derive(Debug)]
pub struct ScrubContext {
    pub registry: IdentityRegistry,
    pub depth: CoverageDepth,
    pub total_bases: u64,
}

impl ScrubContext {
    pub fn reads(&self) -> usize {
        self.registry.len()
    }
}

/// Streams `input` once, giving every read a `reads/<i>/0_<len>` name in
/// `renamed` (single-line FASTA) while filling the registry and base count.
pub fn rename_reads(input: &Path, renamed: &Path, genome_size: GenomeSize) -> Result<ScrubContext> {
    let reader = FastxReader::open(input)?;
    let file = File::create(renamed).map_err(|e| Error::io(renamed, e))?;
    let mut writer = BufWriter::new(file);

    let mut registry = IdentityRegistry::new();
    let mut estimator = DepthEstimator::new();
    let mut counter = ReadCounter::new();

    for record in reader {
        let record = record?;
        let index = registry.register(&record.original_id, record.comment.as_deref())?;
        let name = SyntheticName::initial(index, record.sequence.len());

        writeln!(writer, ">{name}\n{}", record.sequence).map_err(|e| Error::io(renamed, e))?;

        estimator.add_read(record.sequence.len());
        counter.inc();
    }
    writer.flush().map_err(|e| Error::io(renamed, e))?;
    counter.finish();

    let depth = estimator.finalize(genome_size);
    log::info!("Reads: {}", HumanCount(estimator.reads()));
    log::info!("Total bases: {}", HumanCount(estimator.total_bases()));
    log::info!("Depth of coverage: {depth}");

    Ok(ScrubContext {
        registry,
        depth,
        total_bases: estimator.total_bases(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_reads_and_counts_bases() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fastq");
        std::fs::write(
            &input,
            "@first some comment\nACGTA\n+\nIIIII\n@second\nGG\n+\nII\n",
        )
        .unwrap();
        let renamed = dir.path().join("renamed_reads.fasta");

        let ctx = rename_reads(&input, &renamed, GenomeSize::new(100).unwrap()).unwrap();
        assert_eq!(ctx.reads(), 2);
        assert_eq!(ctx.total_bases, 7);
        assert_eq!(ctx.depth.value(), 0.07);

        let written = std::fs::read_to_string(&renamed).unwrap();
        assert_eq!(written, ">reads/0/0_5\nACGTA\n>reads/1/0_2\nGG\n");

        let first = ctx.registry.resolve(0).unwrap();
        assert_eq!(first.id, "first");
        assert_eq!(first.comment.as_deref(), Some("some comment"));
    }

    #[test]
    fn duplicate_names_abort_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fasta");
        std::fs::write(&input, ">dup\nACGT\n>dup\nTTTT\n").unwrap();
        let renamed = dir.path().join("renamed_reads.fasta");

        let err = rename_reads(&input, &renamed, GenomeSize::new(1000).unwrap()).unwrap_err();
        assert!(matches!(err, Error::DuplicateReadName(ref n) if n == "dup"));
    }

    #[test]
    fn unsupported_input_never_creates_renamed_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "not a sequence file\n").unwrap();
        let renamed = dir.path().join("renamed_reads.fasta");

        assert!(matches!(
            rename_reads(&input, &renamed, GenomeSize::new(1000).unwrap()),
            Err(Error::UnknownFormat { .. })
        ));
        assert!(!renamed.exists());
    }
}
