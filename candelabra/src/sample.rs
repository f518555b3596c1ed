use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Normalised Candelabra timestamped numeric observation.
///
/// Samples are ordered and deduplicated by `time` alone, see
/// [`SampleBuffer`](crate::buffer::SampleBuffer).
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize, Constructor)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    /// Construct a [`Sample`] from an epoch milliseconds timestamp.
    ///
    /// Returns `None` if `epoch_ms` is outside the range representable by [`DateTime<Utc>`].
    pub fn from_epoch_ms(epoch_ms: i64, value: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(epoch_ms).map(|time| Self::new(time, value))
    }

    /// Returns true if `other` carries the same timestamp and the bit-identical value.
    pub fn is_identical(&self, other: &Sample) -> bool {
        self.time == other.time && self.value.to_bits() == other.value.to_bits()
    }
}
