use crate::{candle::Candlestick, de::timedelta_ms};
use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Configuration of one aggregation resolution, eg/ `5m` spanning five minutes.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize, Constructor)]
pub struct TierConfig {
    pub name: SmolStr,
    #[serde(with = "timedelta_ms")]
    pub duration: TimeDelta,
}

/// One aggregation resolution: its [`TierConfig`], the open `current` bucket and the
/// chronological history of completed buckets.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, Constructor)]
pub struct Tier {
    pub config: TierConfig,
    pub history: Vec<Candlestick>,
    pub current: Candlestick,
}

impl Tier {
    /// Construct a [`Tier`] with empty history whose `current` bucket is `seed`.
    pub fn seeded(config: TierConfig, seed: Candlestick) -> Self {
        Self::new(config, Vec::new(), seed)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn duration(&self) -> TimeDelta {
        self.config.duration
    }

    /// Boundary the next overflow is measured from, if any bucket has been historized.
    pub fn last_close_time(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|candle| candle.close_time)
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} closed)", self.config.name, self.history.len())?;
        for candle in &self.history {
            writeln!(f, "    {candle}")?;
        }
        write!(f, "  * {}", self.current)
    }
}
