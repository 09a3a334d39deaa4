use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Env;
use indicatif::HumanCount;

use dascrubber_rs::config::{RawStageOptions, ScrubConfig, StageOptionSet, DEFAULT_REPEAT_DEPTH};
use dascrubber_rs::errors::Result;
use dascrubber_rs::genome_size::GenomeSize;
use dascrubber_rs::scrub_reads;
use dascrubber_rs::stage::ProcessRunner;

/// A wrapper tool for the DASCRUBBER pipeline for scrubbing (trimming and
/// chimera removal) of long read sets (PacBio or ONT reads)
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(short = 'i', long = "input_reads", help = "Input set of long reads to be scrubbed")]
    input_reads: PathBuf,

    #[arg(
        short = 'g',
        long = "genome_size",
        help = "Approximate genome size (examples: 3G, 5.5M or 800k), used to determine depth of coverage"
    )]
    genome_size: String,

    #[arg(
        short = 'd',
        long = "tempdir",
        help = "Path of directory for temporary files (default: dascrubber_temp_PID in the current directory)"
    )]
    tempdir: Option<PathBuf>,

    #[arg(
        short = 'k',
        long = "keep",
        help = "Keep the temporary directory (default: delete it after scrubbing is complete)"
    )]
    keep: bool,

    #[arg(
        short = 'r',
        long = "repeat_depth",
        default_value_t = DEFAULT_REPEAT_DEPTH,
        help = "REPmask repeat threshold relative to the overall depth (e.g. 3 means regions with 3x the base depth are repeats)"
    )]
    repeat_depth: f64,

    #[arg(long = "dbsplit_options", allow_hyphen_values = true, help = "Extra options for DBsplit")]
    dbsplit_options: Option<String>,
    #[arg(long = "daligner_options", allow_hyphen_values = true, help = "Extra options for daligner")]
    daligner_options: Option<String>,
    #[arg(long = "repmask_options", allow_hyphen_values = true, help = "Extra options for REPmask")]
    repmask_options: Option<String>,
    #[arg(long = "datander_options", allow_hyphen_values = true, help = "Extra options for datander")]
    datander_options: Option<String>,
    #[arg(long = "tanmask_options", allow_hyphen_values = true, help = "Extra options for TANmask")]
    tanmask_options: Option<String>,
    #[arg(long = "dascover_options", allow_hyphen_values = true, help = "Extra options for DAScover")]
    dascover_options: Option<String>,
    #[arg(long = "dasqv_options", allow_hyphen_values = true, help = "Extra options for DASqv")]
    dasqv_options: Option<String>,
    #[arg(long = "dastrim_options", allow_hyphen_values = true, help = "Extra options for DAStrim")]
    dastrim_options: Option<String>,
    #[arg(long = "daspatch_options", allow_hyphen_values = true, help = "Extra options for DASpatch")]
    daspatch_options: Option<String>,
    #[arg(long = "dasedit_options", allow_hyphen_values = true, help = "Extra options for DASedit")]
    dasedit_options: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<ScrubConfig> {
        let genome_size: GenomeSize = self.genome_size.parse()?;
        let raw = RawStageOptions {
            dbsplit: self.dbsplit_options,
            daligner: self.daligner_options,
            repmask: self.repmask_options,
            datander: self.datander_options,
            tanmask: self.tanmask_options,
            dascover: self.dascover_options,
            dasqv: self.dasqv_options,
            dastrim: self.dastrim_options,
            daspatch: self.daspatch_options,
            dasedit: self.dasedit_options,
        };

        let mut config = ScrubConfig::new(self.input_reads, genome_size);
        config.temp_dir = self.tempdir;
        config.keep = self.keep;
        config.repeat_depth = self.repeat_depth;
        config.stage_options = StageOptionSet::from_raw(&raw);
        Ok(config)
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.into_config()?;
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    let summary = scrub_reads(&config, &mut ProcessRunner, out)?;
    log::info!(
        "Scrubbed {} reads ({} bases) into {} reads ({} bases)",
        HumanCount(summary.input_reads as u64),
        HumanCount(summary.input_bases),
        HumanCount(summary.output_reads),
        HumanCount(summary.output_bases),
    );
    if config.keep {
        log::info!("Intermediate files kept in {}", summary.temp_dir.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{e}");
        process::exit(1);
    }
}
