//src/recommend.rs

//! Reads the trim thresholds DASqv suggests in its verbose output, e.g.
//!
//! ```text
//!   Recommend: 'DAStrim -g20 -b31'
//! ```

use crate::errors::{Error, Result};

/// DAStrim `-g`/`-b` values suggested by the quality stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRecommendation {
    pub good: u64,
    pub bad: u64,
}

/// Finds the first line mentioning both "recommend" and `target` and reads the
/// `-g` and `-b` values from it. No line, or an unreadable value, is an error.
pub fn find_trim_recommendation(
    lines: &[String],
    stage: &'static str,
    target: &'static str,
) -> Result<TrimRecommendation> {
    let line = lines
        .iter()
        .find(|l| is_recommendation_line(l, target))
        .ok_or(Error::MissingRecommendation { stage, target })?;
    parse_recommendation_line(line)
}

fn is_recommendation_line(line: &str, target: &str) -> bool {
    line.to_lowercase().contains("recommend") && line.contains(target)
}

pub fn parse_recommendation_line(line: &str) -> Result<TrimRecommendation> {
    let good = flag_value(line, "-g").ok_or_else(|| Error::MalformedRecommendation {
        line: line.trim().to_string(),
        flag: "-g",
    })?;
    let bad = flag_value(line, "-b").ok_or_else(|| Error::MalformedRecommendation {
        line: line.trim().to_string(),
        flag: "-b",
    })?;
    Ok(TrimRecommendation { good, bad })
}

/// The number right after `flag`, either attached (`-g20`) or as the next
/// token (`-g 20`). Surrounding quotes are ignored.
fn flag_value(line: &str, flag: &str) -> Option<u64> {
    let mut tokens = line
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == '\'' || c == '"' || c == '`'));
    while let Some(token) = tokens.next() {
        if let Some(rest) = token.strip_prefix(flag) {
            let value = if rest.is_empty() { tokens.next()? } else { rest };
            let digits = value.trim_end_matches(|c: char| !c.is_ascii_digit());
            return digits.parse().ok();
        }
    }
    None
}
