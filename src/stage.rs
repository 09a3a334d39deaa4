//src/stage.rs

use std::env;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::{Error, Result};
use crate::options::Flag;
use crate::types::StageResult;

/// The Dazzler executables the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Fasta2Db,
    DbSplit,
    Daligner,
    RepMask,
    Datander,
    TanMask,
    DasCover,
    DasQv,
    DasTrim,
    DasPatch,
    DasEdit,
    Db2Fasta,
}

impl Tool {
    pub const ALL: [Tool; 12] = [
        Tool::Fasta2Db,
        Tool::DbSplit,
        Tool::Daligner,
        Tool::RepMask,
        Tool::Datander,
        Tool::TanMask,
        Tool::DasCover,
        Tool::DasQv,
        Tool::DasTrim,
        Tool::DasPatch,
        Tool::DasEdit,
        Tool::Db2Fasta,
    ];

    pub fn program(self) -> &'static str {
        match self {
            Tool::Fasta2Db => "fasta2DB",
            Tool::DbSplit => "DBsplit",
            Tool::Daligner => "daligner",
            Tool::RepMask => "REPmask",
            Tool::Datander => "datander",
            Tool::TanMask => "TANmask",
            Tool::DasCover => "DAScover",
            Tool::DasQv => "DASqv",
            Tool::DasTrim => "DAStrim",
            Tool::DasPatch => "DASpatch",
            Tool::DasEdit => "DASedit",
            Tool::Db2Fasta => "DB2fasta",
        }
    }

    /// Flags the pipeline may derive a value for on this tool.
    pub fn derived_flags(self) -> &'static [Flag] {
        match self {
            Tool::DbSplit => &[Flag::BlockSize],
            Tool::RepMask | Tool::DasQv => &[Flag::Coverage],
            Tool::DasTrim => &[Flag::GoodQuality, Flag::BadQuality],
            _ => &[],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// One fully assembled command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.tool.program())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs stages on behalf of the orchestrator. The orchestrator, not the
/// runner, decides what a non-zero status means.
pub trait StageRunner {
    /// Whether `tool` can be executed at all.
    fn locate(&self, tool: Tool) -> bool;

    /// Runs `invocation` with `dir` as working directory and waits for it.
    fn run(&mut self, invocation: &Invocation, dir: &Path) -> Result<StageResult>;
}

/// Spawns the real executables found on `PATH`.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl StageRunner for ProcessRunner {
    fn locate(&self, tool: Tool) -> bool {
        find_on_path(tool.program()).is_some()
    }

    fn run(&mut self, invocation: &Invocation, dir: &Path) -> Result<StageResult> {
        log::info!("{}", invocation.command_line());
        run_program(invocation.tool.program(), &invocation.args, dir)
    }
}

/// Looks `program` up on `PATH` the way a shell would.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Names of the tools `runner` cannot find, in pipeline order.
pub fn missing_tools(runner: &dyn StageRunner) -> Vec<String> {
    Tool::ALL
        .iter()
        .filter(|&&tool| !runner.locate(tool))
        .map(|tool| tool.program().to_string())
        .collect()
}

/// Spawns `program` with stdout and stderr sharing one pipe and drains it line
/// by line until the child exits. Every non-empty line is logged.
pub(crate) fn run_program(program: &str, args: &[String], dir: &Path) -> Result<StageResult> {
    let command_line = std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let spawn_err = |source| Error::StageSpawn {
        command: command_line.clone(),
        source,
    };

    let (reader, writer) = std::io::pipe().map_err(spawn_err)?;
    let mut child = {
        // The command owns the write ends; it has to be dropped before the
        // read end can see EOF.
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_err)?)
            .stderr(writer);
        command.spawn().map_err(spawn_err)?
    };

    let drained = drain_lines(BufReader::new(reader));
    if drained.is_err() {
        // Reap the child before reporting the read failure.
        let _ = child.kill();
    }
    let status = child.wait().map_err(|e| Error::io(dir, e))?;
    let output = drained.map_err(|e| Error::io(dir, e))?;
    Ok(StageResult {
        output,
        status: status.code(),
    })
}

/// Collects lines until EOF, logging each non-empty one as it arrives.
fn drain_lines<R: BufRead>(mut reader: R) -> std::io::Result<Vec<String>> {
    let mut output = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(output);
        }
        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
        if !line.is_empty() {
            log::info!("  {line}");
        }
        output.push(line);
    }
}
