//src/pipeline.rs

use crate::config::{ScrubConfig, DEFAULT_BLOCK_SIZE};
use crate::depth::CoverageDepth;
use crate::errors::{Error, Result};
use crate::options::{DerivedParameter, Flag, StageOptions};
use crate::recommend::find_trim_recommendation;
use crate::stage::{Invocation, StageRunner, Tool};
use crate::types::StageResult;
use crate::workdir::WorkDir;

pub const RENAMED_READS: &str = "renamed_reads.fasta";
pub const SCRUBBED_READS: &str = "scrubbed_reads.fasta";
const DB: &str = "reads";
const DB_FILE: &str = "reads.db";
const LAS: &str = "reads.reads.las";
const PATCHED_DB: &str = "patched_reads";
const ALIGN_TEMP: &str = "align_temp";
const ALIGN_TEMP_ARG: &str = "-Palign_temp";
const PARKED_READS: &str = "temp.fasta";

/// Drives the fixed Dazzler stage sequence in one work directory.
///
/// Every stage runs to completion before the next starts. The first non-zero
/// exit status ends the run; nothing is retried or resumed.
pub struct Pipeline<'a> {
    config: &'a ScrubConfig,
    depth: CoverageDepth,
    work: &'a WorkDir,
    runner: &'a mut dyn StageRunner,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a ScrubConfig,
        depth: CoverageDepth,
        work: &'a WorkDir,
        runner: &'a mut dyn StageRunner,
    ) -> Self {
        Self {
            config,
            depth,
            work,
            runner,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.create_db()?;
        self.align_reads()?;
        self.mask_repeats()?;
        self.find_tandem_repeats()?;
        self.mask_tandem_repeats()?;
        self.align_reads_with_masking()?;
        self.estimate_coverage()?;
        let recommended = self.intrinsic_quality()?;
        self.trim(&recommended)?;
        self.patch()?;
        self.new_db()?;
        self.extract_reads()
    }

    // -----------------------------------------------------------------------
    //  Stages
    // -----------------------------------------------------------------------

    fn create_db(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.dbsplit;
        self.section("Creating Dazzler database", |p| {
            p.execute(Invocation::new(Tool::Fasta2Db).args([DB_FILE, RENAMED_READS]))?;
            let split = DerivedParameter::new(Flag::BlockSize, DEFAULT_BLOCK_SIZE);
            p.execute(Invocation::new(Tool::DbSplit).args(options.merged(&[split])).arg(DB))?;
            Ok(())
        })
    }

    fn align_reads(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.daligner;
        self.section("Read overlap alignment with daligner", |p| {
            p.execute_in_scratch(
                Invocation::new(Tool::Daligner)
                    .args(["-v", ALIGN_TEMP_ARG])
                    .args(options.merged(&[]))
                    .args([DB, DB]),
            )?;
            Ok(())
        })
    }

    fn mask_repeats(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.repmask;
        let threshold = repeat_threshold(self.depth, config.repeat_depth);
        self.section("Masking repeats with REPmask", |p| {
            p.execute(
                Invocation::new(Tool::RepMask)
                    .arg("-v")
                    .args(options.merged(&[threshold]))
                    .args([DB, LAS]),
            )?;
            Ok(())
        })
    }

    fn find_tandem_repeats(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.datander;
        self.section("Finding tandem repeats with datander", |p| {
            p.execute_in_scratch(
                Invocation::new(Tool::Datander)
                    .args(["-v", ALIGN_TEMP_ARG])
                    .args(options.merged(&[]))
                    .arg(DB),
            )?;
            Ok(())
        })
    }

    fn mask_tandem_repeats(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.tanmask;
        self.section("Masking tandem repeats with TANmask", |p| {
            p.execute(
                Invocation::new(Tool::TanMask)
                    .arg("-v")
                    .args(options.merged(&[]))
                    .args([DB, "TAN.reads"]),
            )?;
            Ok(())
        })
    }

    fn align_reads_with_masking(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.daligner;
        self.section("Read overlap alignment with daligner (with repeat masking)", |p| {
            p.execute_in_scratch(
                Invocation::new(Tool::Daligner)
                    .args(["-v", ALIGN_TEMP_ARG, "-mrep", "-mtan"])
                    .args(options.merged(&[]))
                    .args([DB, DB]),
            )?;
            Ok(())
        })
    }

    fn estimate_coverage(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.dascover;
        self.section("Computing estimated genome coverage with DAScover", |p| {
            p.execute(
                Invocation::new(Tool::DasCover)
                    .arg("-v")
                    .args(options.merged(&[]))
                    .args([DB, LAS]),
            )?;
            Ok(())
        })
    }

    /// Runs DASqv and returns the DAStrim thresholds to derive from its output.
    fn intrinsic_quality(&mut self) -> Result<Vec<DerivedParameter>> {
        let config = self.config;
        let options = &config.stage_options.dasqv;
        let trim_options = &config.stage_options.dastrim;
        let coverage = quality_coverage(self.depth);
        self.section("Finding intrinsic quality values with DASqv", |p| {
            let result = p.execute(
                Invocation::new(Tool::DasQv)
                    .arg("-v")
                    .args(options.merged(&[coverage]))
                    .args([DB, LAS]),
            )?;
            trim_thresholds(&result, trim_options)
        })
    }

    fn trim(&mut self, recommended: &[DerivedParameter]) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.dastrim;
        self.section("Trimming reads and breaking chimeras with DAStrim", |p| {
            p.execute(
                Invocation::new(Tool::DasTrim)
                    .arg("-v")
                    .args(options.merged(recommended))
                    .args([DB, LAS]),
            )?;
            Ok(())
        })
    }

    fn patch(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.daspatch;
        self.section("Patching low quality segments with DASpatch", |p| {
            p.execute(
                Invocation::new(Tool::DasPatch)
                    .arg("-v")
                    .args(options.merged(&[]))
                    .args([DB, LAS]),
            )?;
            Ok(())
        })
    }

    fn new_db(&mut self) -> Result<()> {
        let config = self.config;
        let options = &config.stage_options.dasedit;
        self.section("Building new database of scrubbed reads with DASedit", |p| {
            p.execute(
                Invocation::new(Tool::DasEdit)
                    .arg("-v")
                    .args(options.merged(&[]))
                    .args([DB, PATCHED_DB]),
            )?;
            Ok(())
        })
    }

    /// DB2fasta names its output after the FASTA the database was built from,
    /// so the renamed input is parked while it runs.
    fn extract_reads(&mut self) -> Result<()> {
        self.section("Extracting scrubbed reads", |p| {
            p.work.rename(RENAMED_READS, PARKED_READS)?;
            p.execute(Invocation::new(Tool::Db2Fasta).args(["-vU", PATCHED_DB]))?;
            p.work.rename(RENAMED_READS, SCRUBBED_READS)?;
            p.work.rename(PARKED_READS, RENAMED_READS)
        })
    }

    // -----------------------------------------------------------------------
    //  Plumbing
    // -----------------------------------------------------------------------

    fn section<T>(&mut self, title: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        log::info!("== {title} ==");
        let before = self.work.snapshot()?;
        let value = f(&mut *self)?;
        self.work.report_new_files(&before)?;
        Ok(value)
    }

    /// Runs one stage; a non-zero exit aborts the whole sequence.
    fn execute(&mut self, invocation: Invocation) -> Result<StageResult> {
        let result = self.runner.run(&invocation, self.work.path())?;
        if !result.success() {
            return Err(Error::StageFailed {
                command: invocation.command_line(),
                status: result.status,
            });
        }
        Ok(result)
    }

    fn execute_in_scratch(&mut self, invocation: Invocation) -> Result<StageResult> {
        let work = self.work;
        work.with_scratch_dir(ALIGN_TEMP, || self.execute(invocation))
    }
}

/// REPmask `-c`: `round(depth * repeat_depth)`.
pub fn repeat_threshold(depth: CoverageDepth, repeat_depth: f64) -> DerivedParameter {
    DerivedParameter::new(Flag::Coverage, depth.scaled_threshold(repeat_depth))
}

/// DASqv `-c`: `round(depth)`.
pub fn quality_coverage(depth: CoverageDepth) -> DerivedParameter {
    DerivedParameter::new(Flag::Coverage, depth.scaled_threshold(1.0))
}

/// DAStrim `-g`/`-b` from DASqv's recommendation. The output is only mined
/// when at least one of the two is left to derive.
pub fn trim_thresholds(dasqv: &StageResult, dastrim: &StageOptions) -> Result<Vec<DerivedParameter>> {
    let flags = [Flag::GoodQuality, Flag::BadQuality];
    if !dastrim.needs_any(&flags) {
        return Ok(Vec::new());
    }
    let rec = find_trim_recommendation(
        &dasqv.output,
        Tool::DasQv.program(),
        Tool::DasTrim.program(),
    )?;
    log::info!("Using DASqv recommendation: -g{} -b{}", rec.good, rec.bad);
    Ok(vec![
        DerivedParameter::new(Flag::GoodQuality, rec.good),
        DerivedParameter::new(Flag::BadQuality, rec.bad),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawStageOptions, StageOptionSet};
    use crate::depth::DepthEstimator;
    use crate::genome_size::GenomeSize;
    use std::path::Path;

    /// Records invocations and fakes the file effects the pipeline relies on.
    struct Recorder {
        calls: Vec<Invocation>,
        dasqv_output: Vec<String>,
        fail_on: Option<Tool>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                dasqv_output: vec!["  Recommend: 'DAStrim -g20 -b31'".to_string()],
                fail_on: None,
            }
        }

        fn call(&self, tool: Tool) -> &Invocation {
            self.calls.iter().find(|c| c.tool == tool).unwrap()
        }
    }

    impl StageRunner for Recorder {
        fn locate(&self, _: Tool) -> bool {
            true
        }

        fn run(&mut self, invocation: &Invocation, dir: &Path) -> Result<StageResult> {
            self.calls.push(invocation.clone());
            if self.fail_on == Some(invocation.tool) {
                return Ok(StageResult { output: vec![], status: Some(1) });
            }
            if invocation.args.iter().any(|a| a == ALIGN_TEMP_ARG) {
                assert!(dir.join(ALIGN_TEMP).is_dir());
            }
            let output = match invocation.tool {
                Tool::DasQv => self.dasqv_output.clone(),
                Tool::Db2Fasta => {
                    std::fs::copy(dir.join(PARKED_READS), dir.join(RENAMED_READS)).unwrap();
                    vec![]
                }
                _ => vec![],
            };
            Ok(StageResult { output, status: Some(0) })
        }
    }

    fn setup(raw: RawStageOptions) -> (tempfile::TempDir, WorkDir, ScrubConfig, CoverageDepth) {
        let dir = tempfile::tempdir().unwrap();
        let work = WorkDir::create(&dir.path().join("work")).unwrap();
        std::fs::write(work.join(RENAMED_READS), ">reads/0/0_4\nACGT\n").unwrap();

        let mut config = ScrubConfig::new("in.fasta", GenomeSize::new(1000).unwrap());
        config.stage_options = StageOptionSet::from_raw(&raw);

        let mut estimator = DepthEstimator::new();
        estimator.add_read(27_400);
        let depth = estimator.finalize(config.genome_size);
        (dir, work, config, depth)
    }

    #[test]
    fn runs_every_stage_in_order() {
        let (_dir, work, config, depth) = setup(RawStageOptions::default());
        let mut runner = Recorder::new();
        Pipeline::new(&config, depth, &work, &mut runner).run().unwrap();

        let order: Vec<Tool> = runner.calls.iter().map(|c| c.tool).collect();
        assert_eq!(
            order,
            [
                Tool::Fasta2Db,
                Tool::DbSplit,
                Tool::Daligner,
                Tool::RepMask,
                Tool::Datander,
                Tool::TanMask,
                Tool::Daligner,
                Tool::DasCover,
                Tool::DasQv,
                Tool::DasTrim,
                Tool::DasPatch,
                Tool::DasEdit,
                Tool::Db2Fasta,
            ]
        );
        assert!(work.join(SCRUBBED_READS).is_file());
        assert!(work.join(RENAMED_READS).is_file());
        assert!(!work.join(PARKED_READS).exists());
        assert!(!work.join(ALIGN_TEMP).exists());
    }

    #[test]
    fn derives_thresholds_when_caller_is_silent() {
        let (_dir, work, config, depth) = setup(RawStageOptions::default());
        let mut runner = Recorder::new();
        Pipeline::new(&config, depth, &work, &mut runner).run().unwrap();

        assert_eq!(runner.call(Tool::DbSplit).command_line(), "DBsplit -s100 reads");
        assert_eq!(
            runner.call(Tool::RepMask).command_line(),
            "REPmask -v -c82 reads reads.reads.las"
        );
        assert_eq!(
            runner.call(Tool::DasQv).command_line(),
            "DASqv -v -c27 reads reads.reads.las"
        );
        assert_eq!(
            runner.call(Tool::DasTrim).command_line(),
            "DAStrim -v -g20 -b31 reads reads.reads.las"
        );
        let masked = runner.calls.iter().filter(|c| c.tool == Tool::Daligner).nth(1).unwrap();
        assert_eq!(
            masked.command_line(),
            "daligner -v -Palign_temp -mrep -mtan reads reads"
        );
    }

    #[test]
    fn caller_options_win_over_derived_ones() {
        let raw = RawStageOptions {
            dbsplit: Some("-s200".to_string()),
            repmask: Some("-c10".to_string()),
            dasqv: Some("-c5".to_string()),
            dastrim: Some("-g15".to_string()),
            daligner: Some("-M80".to_string()),
            ..Default::default()
        };
        let (_dir, work, config, depth) = setup(raw);
        let mut runner = Recorder::new();
        Pipeline::new(&config, depth, &work, &mut runner).run().unwrap();

        assert_eq!(runner.call(Tool::DbSplit).command_line(), "DBsplit -s200 reads");
        assert_eq!(
            runner.call(Tool::RepMask).command_line(),
            "REPmask -v -c10 reads reads.reads.las"
        );
        assert_eq!(
            runner.call(Tool::DasQv).command_line(),
            "DASqv -v -c5 reads reads.reads.las"
        );
        assert_eq!(
            runner.call(Tool::DasTrim).command_line(),
            "DAStrim -v -g15 -b31 reads reads.reads.las"
        );
        assert_eq!(
            runner.call(Tool::Daligner).command_line(),
            "daligner -v -Palign_temp -M80 reads reads"
        );
    }

    #[test]
    fn missing_recommendation_aborts_before_trim() {
        let (_dir, work, config, depth) = setup(RawStageOptions::default());
        let mut runner = Recorder::new();
        runner.dasqv_output = vec!["  Input: 1 reads".to_string()];

        let err = Pipeline::new(&config, depth, &work, &mut runner).run().unwrap_err();
        assert!(matches!(err, Error::MissingRecommendation { .. }));
        assert_eq!(runner.calls.last().unwrap().tool, Tool::DasQv);
    }

    #[test]
    fn recommendation_not_needed_when_both_thresholds_given() {
        let raw = RawStageOptions {
            dastrim: Some("-g15 -b25".to_string()),
            ..Default::default()
        };
        let (_dir, work, config, depth) = setup(raw);
        let mut runner = Recorder::new();
        runner.dasqv_output = vec![];
        Pipeline::new(&config, depth, &work, &mut runner).run().unwrap();
        assert_eq!(
            runner.call(Tool::DasTrim).command_line(),
            "DAStrim -v -g15 -b25 reads reads.reads.las"
        );
    }

    #[test]
    fn failing_stage_stops_the_sequence() {
        let (_dir, work, config, depth) = setup(RawStageOptions::default());
        let mut runner = Recorder::new();
        runner.fail_on = Some(Tool::TanMask);

        let err = Pipeline::new(&config, depth, &work, &mut runner).run().unwrap_err();
        match err {
            Error::StageFailed { command, status } => {
                assert_eq!(command, "TANmask -v reads TAN.reads");
                assert_eq!(status, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.calls.len(), 6);
        assert!(!work.join(SCRUBBED_READS).exists());
    }

    #[test]
    fn failing_aligner_still_cleans_scratch_dir() {
        let (_dir, work, config, depth) = setup(RawStageOptions::default());
        let mut runner = Recorder::new();
        runner.fail_on = Some(Tool::Daligner);

        assert!(Pipeline::new(&config, depth, &work, &mut runner).run().is_err());
        assert!(!work.join(ALIGN_TEMP).exists());
    }

    #[test]
    fn derived_values_round_depth() {
        let mut estimator = DepthEstimator::new();
        estimator.add_read(450);
        let depth = estimator.finalize(GenomeSize::new(1000).unwrap());
        assert_eq!(repeat_threshold(depth, 3.0).to_arg(), "-c1");
        assert_eq!(quality_coverage(depth).to_arg(), "-c0");

        let mut estimator = DepthEstimator::new();
        estimator.add_read(2_500);
        let depth = estimator.finalize(GenomeSize::new(1000).unwrap());
        assert_eq!(quality_coverage(depth).to_arg(), "-c2");
    }
}
