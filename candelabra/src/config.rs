use crate::{
    candelabra::HistoryRetention, collection::NonEmpty, error::CandelabraError, granularity,
    tier::TierConfig,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Environment variable holding comma separated granularities, eg/ `1m,5m,1h`.
pub const ENV_GRANULARITIES: &str = "CANDELABRA_GRANULARITIES";

/// Environment variable holding the [`HistoryRetention`], `unbounded` or `bounded`.
pub const ENV_RETENTION: &str = "CANDELABRA_RETENTION";

/// Declarative [`Candelabra`](crate::Candelabra) configuration.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CandelabraConfig {
    pub granularities: Vec<SmolStr>,
    pub retention: HistoryRetention,
}

impl Default for CandelabraConfig {
    fn default() -> Self {
        Self {
            granularities: ["1m", "5m", "1h"].into_iter().map(SmolStr::new).collect(),
            retention: HistoryRetention::default(),
        }
    }
}

impl CandelabraConfig {
    /// Deserialise a [`CandelabraConfig`] from JSON, missing fields taking their defaults.
    pub fn from_json(input: &str) -> Result<Self, CandelabraError> {
        serde_json::from_str(input).map_err(CandelabraError::from)
    }

    /// Construct a [`CandelabraConfig`] from [`ENV_GRANULARITIES`] and [`ENV_RETENTION`],
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, CandelabraError> {
        Self::from_vars(
            std::env::var(ENV_GRANULARITIES).ok().as_deref(),
            std::env::var(ENV_RETENTION).ok().as_deref(),
        )
    }

    pub fn from_vars(
        granularities: Option<&str>,
        retention: Option<&str>,
    ) -> Result<Self, CandelabraError> {
        let defaults = Self::default();

        let granularities = match granularities {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|granularity| !granularity.is_empty())
                .map(SmolStr::new)
                .collect(),
            None => defaults.granularities,
        };

        let retention = match retention.map(str::trim) {
            None => defaults.retention,
            Some(raw) if raw.eq_ignore_ascii_case("unbounded") => HistoryRetention::Unbounded,
            Some(raw) if raw.eq_ignore_ascii_case("bounded") => HistoryRetention::Bounded,
            Some(raw) => {
                return Err(CandelabraError::Config(format!(
                    "{ENV_RETENTION} must be unbounded or bounded, got {raw}"
                )));
            }
        };

        Ok(Self {
            granularities,
            retention,
        })
    }

    /// Parse every granularity into a [`TierConfig`], checking durations strictly increase.
    pub fn tier_configs(&self) -> Result<NonEmpty<TierConfig>, CandelabraError> {
        let configs = self
            .granularities
            .iter()
            .map(|raw| granularity::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some((finer, coarser)) = configs
            .iter()
            .tuple_windows()
            .find(|(finer, coarser)| coarser.duration <= finer.duration)
        {
            return Err(CandelabraError::UnorderedTiers {
                finer: finer.name.clone(),
                coarser: coarser.name.clone(),
            });
        }

        NonEmpty::try_from(configs)
    }
}
