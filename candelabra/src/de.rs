/// Serialise and deserialise a [`TimeDelta`](chrono::TimeDelta) as an integer number of
/// milliseconds.
pub mod timedelta_ms {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        TimeDelta::try_milliseconds(millis)
            .filter(|duration| *duration > TimeDelta::zero())
            .ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "duration must be a strictly positive millisecond count, got {millis}"
                ))
            })
    }
}

/// Deserialise a `u64` epoch milliseconds value as a `DateTime<Utc>`.
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(
    deserializer: D,
) -> Result<chrono::DateTime<chrono::Utc>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    use serde::Deserialize;

    let epoch_ms = u64::deserialize(deserializer)?;
    i64::try_from(epoch_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .ok_or_else(|| serde::de::Error::custom(format!("epoch ms out of range: {epoch_ms}")))
}
