#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Candelabra
//! Incremental, multi-resolution OHLC + mean candlestick aggregation over an irregular,
//! possibly out-of-order, possibly duplicated stream of timestamped numeric samples.
//!
//! A [`Candelabra`] keeps:
//! * A [`SampleBuffer`](buffer::SampleBuffer) of the samples still needed to rebuild the
//!   finest tier's open bucket.
//! * One [`Tier`] per configured resolution (finest to coarsest), each with an open `current`
//!   bucket and a chronological history of completed buckets.
//! * An all-time `eternal` [`Candlestick`].
//!
//! Every ingestion is a pure function from the previous [`Candelabra`] and a [`Sample`] to a new
//! [`Candelabra`]. Concurrency control is the caller's responsibility, see [`Feed`] for a
//! single-writer owner.
//!
//! ## Example
//! ```rust
//! use candelabra::{Candelabra, NonEmpty, Sample, TierConfig};
//!
//! let configs = NonEmpty::new(
//!     "1m".parse::<TierConfig>().unwrap(),
//!     ["5m".parse::<TierConfig>().unwrap()],
//! );
//!
//! let seed = Sample::from_epoch_ms(1_704_067_200_000, 2.0).unwrap();
//! let next = Sample::from_epoch_ms(1_704_067_230_000, 4.0).unwrap();
//!
//! let candelabra = Candelabra::new(seed, configs).ingest(next);
//!
//! assert_eq!(candelabra.finest().current.high, 4.0);
//! assert_eq!(candelabra.eternal().low, 2.0);
//! ```

/// Time-ascending, timestamp-deduplicated sample buffer.
pub mod buffer;

/// Aggregate root tying the sample buffer and tier cascade together.
pub mod candelabra;

/// [`Candlestick`] and its merge algebra.
pub mod candle;

/// Recursive tier cascade engine, evaluated iteratively.
pub mod cascade;

/// [`NonEmpty`] collection.
pub mod collection;

/// Declarative and environment driven configuration.
pub mod config;

/// Serde utilities.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Candelabra.
pub mod error;

/// Single-writer owner of the latest [`Candelabra`] snapshot.
pub mod feed;

/// `<positive integer><m|h|d>` granularity parsing.
pub mod granularity;

/// Timestamped numeric [`Sample`] input.
pub mod sample;

/// Aggregation resolutions.
pub mod tier;

pub use candelabra::{Candelabra, HistoryRetention};
pub use candle::Candlestick;
pub use collection::NonEmpty;
pub use config::CandelabraConfig;
pub use error::CandelabraError;
pub use feed::Feed;
pub use sample::Sample;
pub use tier::{Tier, TierConfig};

#[cfg(test)]
mod test_utils {
    use crate::{sample::Sample, tier::TierConfig};
    use chrono::{DateTime, TimeDelta, Utc};
    use smol_str::SmolStr;

    /// 2024-01-01T00:00:00Z
    pub fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_704_067_200_000).unwrap()
    }

    pub fn sample(value: f64, offset_ms: i64) -> Sample {
        Sample::new(t0() + TimeDelta::milliseconds(offset_ms), value)
    }

    pub fn tier_config(name: &str, duration: TimeDelta) -> TierConfig {
        TierConfig::new(SmolStr::new(name), duration)
    }
}

// Silence unused_crate_dependencies for dev-dependencies only used by integration tests and
// benches.
#[cfg(test)]
use criterion as _;
#[cfg(test)]
use tracing_subscriber as _;
