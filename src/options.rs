//src/options.rs

use std::fmt;

/// Numeric flags this crate may fill in on a tool's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// DBsplit block size, `-s`
    BlockSize,
    /// REPmask/DASqv coverage threshold, `-c`
    Coverage,
    /// DAStrim good-quality threshold, `-g`
    GoodQuality,
    /// DAStrim bad-quality threshold, `-b`
    BadQuality,
}

impl Flag {
    pub fn prefix(self) -> &'static str {
        match self {
            Flag::BlockSize => "-s",
            Flag::Coverage => "-c",
            Flag::GoodQuality => "-g",
            Flag::BadQuality => "-b",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A value computed for a flag the caller may not have set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedParameter {
    pub flag: Flag,
    pub value: u64,
}

impl DerivedParameter {
    pub fn new(flag: Flag, value: u64) -> Self {
        Self { flag, value }
    }

    pub fn to_arg(self) -> String {
        format!("{}{}", self.flag.prefix(), self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlagOverride {
    flag: Flag,
    caller_supplied: bool,
}

/// Extra options for one tool, plus which of its derivable flags the caller
/// already set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOptions {
    extra: Vec<String>,
    overrides: Vec<FlagOverride>,
}

impl StageOptions {
    /// Splits `raw` on whitespace and records, for each flag in `recognized`,
    /// whether the caller supplied it. Tokens are passed through unvalidated.
    pub fn parse(raw: Option<&str>, recognized: &[Flag]) -> Self {
        let extra: Vec<String> = raw
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let overrides = recognized
            .iter()
            .map(|&flag| FlagOverride {
                flag,
                caller_supplied: extra.iter().any(|t| t.starts_with(flag.prefix())),
            })
            .collect();
        Self { extra, overrides }
    }

    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    pub fn caller_supplied(&self, flag: Flag) -> bool {
        self.overrides
            .iter()
            .any(|o| o.flag == flag && o.caller_supplied)
    }

    /// Whether any of `flags` still needs a derived value.
    pub fn needs_any(&self, flags: &[Flag]) -> bool {
        flags.iter().any(|&f| !self.caller_supplied(f))
    }

    /// Caller tokens followed by every derived value the caller did not
    /// override.
    pub fn merged(&self, derived: &[DerivedParameter]) -> Vec<String> {
        let mut args = self.extra.clone();
        for param in derived {
            debug_assert!(
                self.overrides.iter().any(|o| o.flag == param.flag),
                "{} is not a recognised flag for this stage",
                param.flag
            );
            if !self.caller_supplied(param.flag) {
                args.push(param.to_arg());
            }
        }
        args
    }
}
