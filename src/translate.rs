//src/translate.rs

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use indicatif::HumanCount;

use crate::errors::{Error, Result};
use crate::progress::ReadCounter;
use crate::registry::IdentityRegistry;
use crate::types::SyntheticName;

/// Totals for the reads written back out. These need not match ingestion:
/// trimming drops reads and chimera breaking splits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationSummary {
    pub reads: u64,
    pub total_bases: u64,
}

/// Rewrites `reads/<i>/<range>` headers back to `<original id>/<range>`,
/// followed by the original comment when there was one.
pub struct ReverseTranslator<'a> {
    registry: &'a IdentityRegistry,
}

impl<'a> ReverseTranslator<'a> {
    pub fn new(registry: &'a IdentityRegistry) -> Self {
        Self { registry }
    }

    /// Header line (without `>`) for a scrubbed read name.
    pub fn translate_header(&self, synthetic: &str) -> Result<String> {
        let name = SyntheticName::parse(synthetic)?;
        let original = self.registry.resolve(name.index)?;
        let mut header = format!("{}/{}", original.id, name.range);
        if let Some(comment) = &original.comment {
            header.push(' ');
            header.push_str(comment);
        }
        Ok(header)
    }

    pub fn translate_file<W: Write>(&self, scrubbed: &Path, out: W) -> Result<TranslationSummary> {
        let file = File::open(scrubbed).map_err(|e| Error::io(scrubbed, e))?;
        self.translate(BufReader::new(file), scrubbed, out)
    }

    /// Streams FASTA records from `reader` to `out`. Multi-line bodies are
    /// joined onto one line; blank lines are skipped.
    pub fn translate<R: BufRead, W: Write>(
        &self,
        reader: R,
        source: &Path,
        mut out: W,
    ) -> Result<TranslationSummary> {
        let mut summary = TranslationSummary::default();
        let mut counter = ReadCounter::new();
        let mut name: Option<String> = None;
        let mut sequence = String::new();

        for line in reader.lines() {
            let line = line.map_err(|e| Error::io(source, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('>') {
                if let Some(prev) = name.take() {
                    self.emit(&prev, &sequence, &mut out, &mut summary)?;
                    counter.inc();
                    sequence.clear();
                }
                name = Some(header.to_string());
            } else if name.is_some() {
                sequence.push_str(line);
            } else {
                return Err(Error::OrphanSequence(source.to_path_buf()));
            }
        }
        if let Some(prev) = name.take() {
            self.emit(&prev, &sequence, &mut out, &mut summary)?;
            counter.inc();
        }
        out.flush().map_err(|e| Error::io("<stdout>", e))?;
        counter.finish();

        log::info!("Reads: {}", HumanCount(summary.reads));
        log::info!("Total bases: {}", HumanCount(summary.total_bases));
        Ok(summary)
    }

    fn emit<W: Write>(
        &self,
        synthetic: &str,
        sequence: &str,
        out: &mut W,
        summary: &mut TranslationSummary,
    ) -> Result<()> {
        let header = self.translate_header(synthetic)?;
        writeln!(out, ">{header}\n{sequence}").map_err(|e| Error::io("<stdout>", e))?;
        summary.reads += 1;
        summary.total_bases += sequence.len() as u64;
        Ok(())
    }
}
