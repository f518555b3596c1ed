use crate::{
    buffer::{SampleBuffer, Upsert},
    candle::Candlestick,
    cascade::{Cascade, cascade},
    collection::NonEmpty,
    sample::Sample,
    tier::{Tier, TierConfig},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How completed buckets are retained across ingestions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRetention {
    /// Keep every historized bucket the cascade produces.
    #[default]
    Unbounded,
    /// After every ingestion, drop history the next coarser tier no longer needs. See
    /// [`Candelabra::prune_history`].
    Bounded,
}

/// Aggregate root: the retained [`SampleBuffer`], the configured [`Tier`]s (finest to coarsest)
/// and the all-time `eternal` [`Candlestick`].
///
/// Every operation returns a new [`Candelabra`], the receiver is never modified.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Candelabra {
    samples: SampleBuffer,
    tiers: NonEmpty<Tier>,
    eternal: Candlestick,
    #[serde(default)]
    retention: HistoryRetention,
}

impl Candelabra {
    /// Construct a [`Candelabra`] from a seed [`Sample`] and tier configurations supplied
    /// finest-duration-first. Order is not validated.
    pub fn new(seed: Sample, configs: NonEmpty<TierConfig>) -> Self {
        let candle = Candlestick::from_sample(&seed);

        Self {
            samples: SampleBuffer::new(seed),
            tiers: configs.map(|config| Tier::seeded(config, candle)),
            eternal: candle,
            retention: HistoryRetention::default(),
        }
    }

    pub fn with_retention(self, retention: HistoryRetention) -> Self {
        Self { retention, ..self }
    }

    /// Fresh [`Candelabra`] seeded from `sample`, keeping this one's tier configuration and
    /// retention.
    pub fn reseed(&self, sample: Sample) -> Self {
        Self::new(sample, self.configs()).with_retention(self.retention)
    }

    /// Ingest a single [`Sample`].
    ///
    /// Samples older than the newest buffered sample minus the finest tier duration are
    /// silently dropped. Repeating an already buffered sample is a no-op, while a new value for
    /// an existing timestamp replaces the old one.
    pub fn ingest(&self, sample: Sample) -> Self {
        let cutoff = self.samples.cutoff(self.finest().duration());
        if sample.time < cutoff {
            debug!(
                time = %sample.time,
                cutoff = %cutoff,
                "dropping sample older than the finest tier window"
            );
            return self.clone();
        }

        let mut samples = self.samples.clone();
        let upsert = samples.upsert(sample);
        if upsert == Upsert::Unchanged {
            return self.clone();
        }

        let Cascade { tiers, eternal } = cascade(
            &self.tiers,
            &self.eternal,
            &samples,
            upsert.is_revision(),
        );
        samples.prune(tiers.first().current.open_time);

        let next = Self {
            samples,
            tiers,
            eternal,
            retention: self.retention,
        };

        match self.retention {
            HistoryRetention::Unbounded => next,
            HistoryRetention::Bounded => next.prune_history(),
        }
    }

    /// Ingest [`Sample`]s one at a time in the given order.
    pub fn ingest_batch(&self, samples: &NonEmpty<Sample>) -> Self {
        samples
            .iter()
            .fold(self.clone(), |candelabra, sample| candelabra.ingest(*sample))
    }

    /// Drop every history entry of a non-coarsest tier that closes at or before the next
    /// coarser tier's `current.open_time`. The coarsest tier is untouched.
    ///
    /// The most recent entry of each tier is always kept, since the next overflow is measured
    /// from its `close_time`.
    pub fn prune_history(&self) -> Self {
        let coarser_open_times = self
            .tiers
            .iter()
            .skip(1)
            .map(|coarser| Some(coarser.current.open_time))
            .chain(std::iter::once(None))
            .collect::<Vec<_>>();

        let mut tiers = self.tiers.clone();
        for (tier, coarser_open_time) in tiers.iter_mut().zip(coarser_open_times) {
            let Some(coarser_open_time) = coarser_open_time else {
                continue;
            };
            let Some(anchor) = tier.history.pop() else {
                continue;
            };
            tier.history.retain(|candle| candle.close_time > coarser_open_time);
            tier.history.push(anchor);
        }

        Self {
            tiers,
            ..self.clone()
        }
    }

    pub fn samples(&self) -> &NonEmpty<Sample> {
        self.samples.samples()
    }

    pub fn tiers(&self) -> &NonEmpty<Tier> {
        &self.tiers
    }

    /// Find a [`Tier`] by its configured name.
    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.name() == name)
    }

    pub fn finest(&self) -> &Tier {
        self.tiers.first()
    }

    pub fn coarsest(&self) -> &Tier {
        self.tiers.last()
    }

    pub fn eternal(&self) -> &Candlestick {
        &self.eternal
    }

    pub fn retention(&self) -> HistoryRetention {
        self.retention
    }

    pub fn configs(&self) -> NonEmpty<TierConfig> {
        self.tiers.clone().map(|tier| tier.config)
    }
}
