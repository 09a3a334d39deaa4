// src/lib.rs
pub mod types;
pub mod errors;
pub mod config;
pub mod genome_size;
pub mod fastx;
pub mod registry;
pub mod depth;
pub mod ingest;
pub mod options;
pub mod recommend;
pub mod stage;
pub mod pipeline;
pub mod translate;
pub mod workdir;
pub mod progress;

use std::io::Write;
use std::path::PathBuf;

use crate::config::{absolute, ScrubConfig};
use crate::depth::CoverageDepth;
use crate::errors::{Error, Result};
use crate::ingest::{rename_reads, ScrubContext};
use crate::pipeline::{Pipeline, RENAMED_READS, SCRUBBED_READS};
use crate::stage::{missing_tools, StageRunner};
use crate::translate::ReverseTranslator;
use crate::workdir::WorkDir;

/// What one complete run produced.
#[derive(Debug, Clone)]
pub struct ScrubSummary {
    pub input_reads: usize,
    pub input_bases: u64,
    pub depth: CoverageDepth,
    pub output_reads: u64,
    pub output_bases: u64,
    /// Still on disk only if the run was asked to keep it.
    pub temp_dir: PathBuf,
}

/// Scrubs `config.input_reads` and writes the result, under the original read
/// names, to `out`.
///
/// Checks run before anything touches the filesystem: configuration first,
/// then tool availability, then the input path and temp directory. After the
/// temp directory exists, any failure removes it again unless `keep` is set.
pub fn scrub_reads<W: Write>(
    config: &ScrubConfig,
    runner: &mut dyn StageRunner,
    out: W,
) -> Result<ScrubSummary> {
    config.validate()?;

    let missing = missing_tools(runner);
    if !missing.is_empty() {
        return Err(Error::MissingTools(missing));
    }

    let input = absolute(&config.input_reads)?;
    if !input.is_file() {
        return Err(Error::MissingInput(input));
    }
    let temp_dir = config.resolved_temp_dir()?;

    log::info!("== Creating temporary directory ==");
    let work = WorkDir::create(&temp_dir)?;
    let result = run_in(&work, &input, config, runner, out);

    if !config.keep {
        log::info!("== Deleting temporary directory ==");
        let removed = work.remove();
        // A failed run reports its own error, not the cleanup's.
        if result.is_ok() {
            removed?;
        } else if let Err(e) = removed {
            log::warn!("Could not remove {}: {e}", temp_dir.display());
        }
    }

    let (ctx, translated) = result?;
    Ok(ScrubSummary {
        input_reads: ctx.reads(),
        input_bases: ctx.total_bases,
        depth: ctx.depth,
        output_reads: translated.reads,
        output_bases: translated.total_bases,
        temp_dir,
    })
}

fn run_in<W: Write>(
    work: &WorkDir,
    input: &std::path::Path,
    config: &ScrubConfig,
    runner: &mut dyn StageRunner,
    out: W,
) -> Result<(ScrubContext, translate::TranslationSummary)> {
    log::info!("== Processing and renaming reads ==");
    let before = work.snapshot()?;
    let ctx = rename_reads(input, &work.join(RENAMED_READS), config.genome_size)?;
    work.report_new_files(&before)?;

    Pipeline::new(config, ctx.depth, work, runner).run()?;

    log::info!("== Outputting scrubbed reads to stdout ==");
    let translated =
        ReverseTranslator::new(&ctx.registry).translate_file(&work.join(SCRUBBED_READS), out)?;
    Ok((ctx, translated))
}
