use crate::{
    candelabra::{Candelabra, HistoryRetention},
    collection::NonEmpty,
    config::CandelabraConfig,
    error::CandelabraError,
    sample::Sample,
    tier::TierConfig,
};
use tracing::{debug, info};

/// Single-writer owner of the latest [`Candelabra`] snapshot.
///
/// The first [`Sample`] ever ingested seeds a fresh [`Candelabra`], every later one goes
/// through [`Candelabra::ingest`].
#[derive(Clone, PartialEq, Debug)]
pub struct Feed {
    configs: NonEmpty<TierConfig>,
    retention: HistoryRetention,
    state: Option<Candelabra>,
}

impl Feed {
    pub fn new(configs: NonEmpty<TierConfig>, retention: HistoryRetention) -> Self {
        Self {
            configs,
            retention,
            state: None,
        }
    }

    /// Construct a [`Feed`] from a [`CandelabraConfig`], validating its granularities.
    pub fn from_config(config: &CandelabraConfig) -> Result<Self, CandelabraError> {
        Ok(Self::new(config.tier_configs()?, config.retention))
    }

    /// Ingest a [`Sample`], returning the latest snapshot.
    pub fn ingest(&mut self, sample: Sample) -> &Candelabra {
        let next = match self.state.take() {
            None => {
                info!(
                    time = %sample.time,
                    value = sample.value,
                    tiers = self.configs.len(),
                    "seeding Candelabra"
                );
                Candelabra::new(sample, self.configs.clone()).with_retention(self.retention)
            }
            Some(previous) => {
                let next = previous.ingest(sample);
                log_closed(&previous, &next);
                next
            }
        };

        self.state.insert(next)
    }

    /// Ingest every [`Sample`] in order, returning the latest snapshot if any sample was seen.
    pub fn ingest_batch<Iter>(&mut self, samples: Iter) -> Option<&Candelabra>
    where
        Iter: IntoIterator<Item = Sample>,
    {
        for sample in samples {
            self.ingest(sample);
        }
        self.state.as_ref()
    }

    pub fn state(&self) -> Option<&Candelabra> {
        self.state.as_ref()
    }

    /// Discard the current snapshot. The next ingested [`Sample`] seeds a fresh one.
    pub fn reset(&mut self) -> Option<Candelabra> {
        self.state.take()
    }
}

fn log_closed(previous: &Candelabra, next: &Candelabra) {
    for (before, after) in previous.tiers().iter().zip(next.tiers().iter()) {
        if before.last_close_time() == after.last_close_time() {
            continue;
        }

        if let Some(closed) = after.history.last() {
            debug!(
                tier = after.name(),
                history = after.history.len(),
                %closed,
                "tier closed bucket"
            );
        }
    }
}
