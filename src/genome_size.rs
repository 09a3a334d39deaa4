//src/genome_size.rs

use std::fmt;
use std::str::FromStr;

use indicatif::HumanCount;

use crate::errors::{Error, Result};

/// Below this many bases the user probably forgot a suffix.
pub const SMALL_GENOME_WARNING: u64 = 100;
/// Above this many bases the value is probably a typo.
pub const LARGE_GENOME_WARNING: u64 = 100_000_000_000;

/// Estimated genome size in bases, always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GenomeSize(u64);

impl GenomeSize {
    pub fn new(bases: u64) -> Result<Self> {
        if bases < 1 {
            return Err(Error::NonPositiveGenomeSize);
        }
        Ok(Self(bases))
    }

    pub fn bases(self) -> u64 {
        self.0
    }

    /// A warning for values that are legal but very likely a unit mistake.
    pub fn advisory(self) -> Option<String> {
        if self.0 < SMALL_GENOME_WARNING {
            Some(format!(
                "genome size is very small ({} bases). Did you mean to use a suffix (G, M, k)?",
                HumanCount(self.0)
            ))
        } else if self.0 > LARGE_GENOME_WARNING {
            Some(format!(
                "genome size is very large ({} bases). Is that a mistake?",
                HumanCount(self.0)
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for GenomeSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", HumanCount(self.0))
    }
}

/// Parses magnitudes like `3G`, `5.5M`, `800k` or `50`.
///
/// The suffix is case-insensitive. Fractional coefficients are rounded to the
/// nearest base after scaling, halves to even.
impl FromStr for GenomeSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let parse_err = || Error::GenomeSize(s.to_string());

        let (value_str, multiplier): (&str, i64) = match lower.chars().last() {
            Some('g') => (&lower[..lower.len() - 1], 1_000_000_000),
            Some('m') => (&lower[..lower.len() - 1], 1_000_000),
            Some('k') => (&lower[..lower.len() - 1], 1_000),
            Some(_) => (lower.as_str(), 1),
            None => return Err(parse_err()),
        };
        let value_str = value_str.trim();

        let bases: i64 = if value_str.contains('.') {
            let value: f64 = value_str.parse().map_err(|_| parse_err())?;
            let scaled = (value * multiplier as f64).round_ties_even();
            if !scaled.is_finite() || scaled > i64::MAX as f64 {
                return Err(parse_err());
            }
            scaled as i64
        } else {
            let value: i64 = value_str.parse().map_err(|_| parse_err())?;
            value.checked_mul(multiplier).ok_or_else(parse_err)?
        };

        if bases < 1 {
            return Err(Error::NonPositiveGenomeSize);
        }
        GenomeSize::new(bases as u64)
    }
}
