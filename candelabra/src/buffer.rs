use crate::{collection::NonEmpty, sample::Sample};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a [`SampleBuffer::upsert`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub enum Upsert {
    /// Identical sample already buffered, nothing changed.
    Unchanged,
    /// New sample is the newest in the buffer.
    Appended,
    /// New sample landed before the newest buffered sample.
    Inserted,
    /// Existing sample with the same timestamp had its value replaced.
    Replaced,
}

impl Upsert {
    /// Returns true if the upsert changed a sample other than by appending a new newest one.
    pub fn is_revision(&self) -> bool {
        matches!(self, Upsert::Inserted | Upsert::Replaced)
    }
}

/// Time-ascending, timestamp-deduplicated [`Sample`]s still needed to reconstruct the finest
/// tier's current bucket.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SampleBuffer(NonEmpty<Sample>);

impl SampleBuffer {
    pub fn new(seed: Sample) -> Self {
        Self(NonEmpty::one(seed))
    }

    pub fn newest(&self) -> &Sample {
        self.0.last()
    }

    pub fn oldest(&self) -> &Sample {
        self.0.first()
    }

    pub fn samples(&self) -> &NonEmpty<Sample> {
        &self.0
    }

    /// Earliest timestamp still accepted, given the finest tier duration.
    pub fn cutoff(&self, finest: TimeDelta) -> DateTime<Utc> {
        self.newest().time - finest
    }

    /// Insert the [`Sample`], replacing the value of any existing sample with the same
    /// timestamp. The buffer stays sorted ascending by timestamp.
    pub fn upsert(&mut self, sample: Sample) -> Upsert {
        if let Some(existing) = self.0.iter_mut().find(|existing| existing.time == sample.time) {
            if existing.is_identical(&sample) {
                return Upsert::Unchanged;
            }
            existing.value = sample.value;
            return Upsert::Replaced;
        }

        let outcome = if sample.time > self.newest().time {
            Upsert::Appended
        } else {
            Upsert::Inserted
        };

        self.0.push(sample);
        self.0.sort_by_key(|sample| sample.time);
        outcome
    }

    /// Drop every sample strictly older than `before`. The newest sample is always kept.
    pub fn prune(&mut self, before: DateTime<Utc>) {
        self.0.retain_or_last(|sample| sample.time >= before)
    }

    /// Buffered samples at or after `from`, in chronological order.
    pub fn window(&self, from: DateTime<Utc>) -> impl Iterator<Item = &Sample> {
        self.0.iter().filter(move |sample| sample.time >= from)
    }
}
