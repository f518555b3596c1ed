use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// All errors generated in `candelabra`.
///
/// Every variant is raised at construction or configuration time. The ingestion path is total
/// and never returns an error.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum CandelabraError {
    #[error("invalid granularity format: {0} (expected <positive integer><m|h|d>)")]
    InvalidGranularityFormat(String),

    #[error("granularity {granularity} does not evenly divide its unit cycle of {cycle}")]
    NonDivisibleGranularity { granularity: SmolStr, cycle: u32 },

    #[error("non-empty collection invariant violated: received empty input")]
    EmptyInput,

    #[error(
        "\
        tier durations must be strictly increasing: {coarser} is not coarser \
        than {finer}\
    "
    )]
    UnorderedTiers { finer: SmolStr, coarser: SmolStr },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CandelabraError {
    /// Determine if an error originates from parsing a granularity string.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_granularity(&self) -> bool {
        match self {
            CandelabraError::InvalidGranularityFormat(_)
            | CandelabraError::NonDivisibleGranularity { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CandelabraError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
