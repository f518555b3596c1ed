use crate::{error::CandelabraError, tier::TierConfig};
use chrono::TimeDelta;
use smol_str::SmolStr;
use std::str::FromStr;

/// Calendar unit of a granularity string.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GranularityUnit {
    Minute,
    Hour,
    Day,
}

impl GranularityUnit {
    fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            'm' => Some(Self::Minute),
            'h' => Some(Self::Hour),
            'd' => Some(Self::Day),
            _ => None,
        }
    }

    /// Number of units in the next larger natural cycle (minutes per hour, hours per day).
    pub fn cycle(&self) -> u32 {
        match self {
            Self::Minute => 60,
            Self::Hour => 24,
            Self::Day => 1,
        }
    }

    pub fn duration(&self, count: u32) -> TimeDelta {
        let count = i64::from(count);
        match self {
            Self::Minute => TimeDelta::minutes(count),
            Self::Hour => TimeDelta::hours(count),
            Self::Day => TimeDelta::days(count),
        }
    }
}

/// Parse a `<positive integer><m|h|d>` granularity string, eg/ `15m`, into a [`TierConfig`]
/// named after the input.
///
/// The integer must evenly divide its unit's cycle, so `7m` and `5h` are rejected.
pub fn parse(input: &str) -> Result<TierConfig, CandelabraError> {
    let invalid = || CandelabraError::InvalidGranularityFormat(input.to_string());

    let mut chars = input.chars();
    let unit = chars
        .next_back()
        .and_then(GranularityUnit::from_suffix)
        .ok_or_else(invalid)?;

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }

    let count = digits
        .parse::<u32>()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(invalid)?;

    if unit.cycle() % count != 0 {
        return Err(CandelabraError::NonDivisibleGranularity {
            granularity: SmolStr::new(input),
            cycle: unit.cycle(),
        });
    }

    Ok(TierConfig::new(SmolStr::new(input), unit.duration(count)))
}

impl FromStr for TierConfig {
    type Err = CandelabraError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse(input)
    }
}
