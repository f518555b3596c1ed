use crate::{collection::NonEmpty, sample::Sample};
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Normalised Candelabra OHLC + mean summary over the span `[open_time, close_time]`.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Candlestick {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub mean: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

impl Candlestick {
    /// Degenerate one-point [`Candlestick`] of a single [`Sample`].
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            open: sample.value,
            high: sample.value,
            low: sample.value,
            close: sample.value,
            mean: sample.value,
            open_time: sample.time,
            close_time: sample.time,
        }
    }

    /// Reduce an ordered collection of [`Candlestick`]s into one.
    ///
    /// Input is first (stably) sorted by `open_time`, so argument order does not matter. The
    /// resulting `mean` is the sum of every leading `mean` divided by the millisecond span those
    /// leading candlesticks cover (1 if zero), averaged with the final `mean`. This is not a
    /// time-weighted average, and the reduction is not associative in `mean`.
    pub fn merge(candles: &NonEmpty<Candlestick>) -> Self {
        let sorted = candles
            .iter()
            .copied()
            .sorted_by_key(|candle| candle.open_time)
            .collect::<Vec<_>>();

        let first = sorted[0];
        let (init, last) = sorted.split_at(sorted.len() - 1);
        let last = last[0];

        let mean = match (init.first(), init.last()) {
            (Some(init_first), Some(init_last)) => {
                let span_ms = match (init_last.close_time - init_first.open_time)
                    .num_milliseconds()
                {
                    0 => 1,
                    span_ms => span_ms,
                };
                let weighted_init = init.iter().map(|candle| candle.mean).sum::<f64>()
                    / span_ms as f64;
                (weighted_init + last.mean) / 2.0
            }
            _ => last.mean,
        };

        let (low, high) = sorted.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), candle| (low.min(candle.low), high.max(candle.high)),
        );

        Self {
            open: first.open,
            high,
            low,
            close: last.close,
            mean,
            open_time: first.open_time,
            close_time: last.close_time,
        }
    }

    /// Freeze the [`Candlestick`] to its nominal width, regardless of when the last sample
    /// inside it occurred.
    pub fn historize(&self, duration: TimeDelta) -> Self {
        Self {
            close_time: self.open_time + duration,
            ..*self
        }
    }

    /// Expand a frozen [`Candlestick`] into the contiguous history covering `distance`.
    ///
    /// With `n = floor(distance / duration)`, `n - 1` synthetic buckets flat at the frozen
    /// `close` follow `frozen`, each exactly `duration` wide and anchored sequentially from
    /// `frozen.open_time`.
    pub fn gap_fill(frozen: Self, duration: TimeDelta, distance: TimeDelta) -> NonEmpty<Self> {
        let periods = distance
            .num_milliseconds()
            .div_euclid(duration.num_milliseconds().max(1));

        // Buckets past the representable DateTime range are not generated
        let synthetic = (1..periods.max(1)).map_while(|period| {
            let open_time = period_open_time(frozen.open_time, duration, period)?;
            let close_time = open_time.checked_add_signed(duration)?;
            Some(Self::flat(frozen.close, open_time, close_time))
        });

        NonEmpty::new(frozen, synthetic)
    }

    /// Flatline [`Candlestick`] carrying a single value over `[open_time, close_time]`.
    pub fn flat(value: f64, open_time: DateTime<Utc>, close_time: DateTime<Utc>) -> Self {
        Self {
            open: value,
            high: value,
            low: value,
            close: value,
            mean: value,
            open_time,
            close_time,
        }
    }

    /// Span covered by this [`Candlestick`].
    pub fn span(&self) -> TimeDelta {
        self.close_time - self.open_time
    }
}

/// Open time of the `period`-th bucket of width `duration` anchored at `anchor`.
fn period_open_time(
    anchor: DateTime<Utc>,
    duration: TimeDelta,
    period: i64,
) -> Option<DateTime<Utc>> {
    duration
        .num_milliseconds()
        .checked_mul(period)
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|offset| anchor.checked_add_signed(offset))
}

impl Display for Candlestick {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} -> {}] O:{:.4} H:{:.4} L:{:.4} C:{:.4} mean:{:.4}",
            self.open_time.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.close_time.format("%H:%M:%S%.3f"),
            self.open,
            self.high,
            self.low,
            self.close,
            self.mean,
        )
    }
}
