use candelabra::{Candelabra, CandelabraConfig, Feed, Sample, de::de_u64_epoch_ms_as_datetime_utc};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::Deserialize;
use std::io::BufRead;
use tracing::{info, warn};

/// Number of random walk samples generated when not reading from stdin.
const ENV_DEMO_SAMPLES: &str = "CANDELABRA_DEMO_SAMPLES";

/// Print a JSON snapshot of the final [`Candelabra`] when set.
const ENV_DEMO_JSON: &str = "CANDELABRA_DEMO_JSON";

const DEFAULT_SAMPLES: usize = 500;

/// Line delimited input record, eg/ `{"time": 1704067200000, "value": 42.5}`.
#[derive(Debug, Deserialize)]
struct Record {
    #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    time: DateTime<Utc>,
    value: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise INFO Tracing log subscriber
    init_logging();

    // Granularities & retention from CANDELABRA_GRANULARITIES & CANDELABRA_RETENTION
    let config = CandelabraConfig::from_env()?;
    info!(?config, "loaded CandelabraConfig");

    let mut feed = Feed::from_config(&config)?;

    let snapshot = if std::env::args().any(|arg| arg == "--stdin") {
        feed.ingest_batch(stdin_samples())
    } else {
        let count = std::env::var(ENV_DEMO_SAMPLES)
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SAMPLES);
        feed.ingest_batch(random_walk(Utc::now(), count))
    };

    let Some(candelabra) = snapshot else {
        warn!("no samples ingested, nothing to render");
        return Ok(());
    };

    render(candelabra);

    if std::env::var_os(ENV_DEMO_JSON).is_some() {
        println!("{}", serde_json::to_string_pretty(candelabra)?);
    }

    Ok(())
}

fn stdin_samples() -> impl Iterator<Item = Sample> {
    read_samples(std::io::stdin().lock())
}

/// Parse line delimited [`Record`]s, skipping malformed lines and stopping at the first I/O
/// error.
fn read_samples<R>(reader: R) -> impl Iterator<Item = Sample>
where
    R: BufRead,
{
    reader
        .lines()
        .map_while(|line| {
            line.inspect_err(|error| warn!(%error, "stopped reading samples"))
                .ok()
        })
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<Record>(&line) {
            Ok(record) => Some(Sample::new(record.time, record.value)),
            Err(error) => {
                warn!(%error, %line, "skipping malformed sample");
                None
            }
        })
}

/// Irregular random walk with occasional out-of-order, duplicated and gapped timestamps.
fn random_walk(start: DateTime<Utc>, count: usize) -> Vec<Sample> {
    let mut rng = rand::rng();
    let mut time = start;
    let mut value = 100.0_f64;

    (0..count)
        .map(|_| {
            let step_ms = match rng.random_range(0..20) {
                0 => -rng.random_range(0..45_000),
                1 => 0,
                2 => rng.random_range(60_000..900_000),
                _ => rng.random_range(250..15_000),
            };
            time += TimeDelta::milliseconds(step_ms);
            value = (value + rng.random_range(-0.5..0.5)).max(0.0);
            Sample::new(time, value)
        })
        .collect()
}

fn render(candelabra: &Candelabra) {
    for tier in candelabra.tiers() {
        println!("{tier}");
    }
    println!("eternal {}", candelabra.eternal());

    info!(
        samples = candelabra.samples().len(),
        tiers = candelabra.tiers().len(),
        retention = ?candelabra.retention(),
        "rendered Candelabra"
    );
}

// Initialise an INFO `Subscriber` for `Tracing` Json logs and install it as the global default.
fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO level
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // Use colored output in debug mode
        .with_ansi(cfg!(debug_assertions))
        // Log to stderr so stdout only carries rendered tiers
        .with_writer(std::io::stderr)
        // Enable Json formatting
        .json()
        // Install this Tracing subscriber as global default
        .init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    /// Reader failing every read.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("connection reset"))
        }
    }

    #[test]
    fn test_read_samples() {
        struct TestCase {
            input: &'static str,
            expected: Vec<Sample>,
        }

        let tests = vec![
            TestCase {
                // TC0: blank and malformed lines are skipped
                input: "{\"time\": 1704067200000, \"value\": 2.5}\n\nnot json\n{\"time\": 1704067230000, \"value\": 4.0}\n",
                expected: vec![
                    Sample::from_epoch_ms(1_704_067_200_000, 2.5).unwrap(),
                    Sample::from_epoch_ms(1_704_067_230_000, 4.0).unwrap(),
                ],
            },
            TestCase {
                // TC1: negative epoch is malformed
                input: "{\"time\": -1, \"value\": 2.5}\n",
                expected: vec![],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = read_samples(Cursor::new(test.input)).collect::<Vec<_>>();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_read_samples_stops_at_io_error() {
        let reader = BufReader::new(
            Cursor::new("{\"time\": 1704067200000, \"value\": 2.5}\n").chain(Broken),
        );

        let actual = read_samples(reader).collect::<Vec<_>>();

        assert_eq!(actual, vec![Sample::from_epoch_ms(1_704_067_200_000, 2.5).unwrap()]);
    }
}
