//! Tier cascade engine.
//!
//! Every [`Tier`] is evaluated in configured order (finest to coarsest) against the same
//! [`SampleBuffer`]. Each tier either absorbs the newest sample into its `current` bucket
//! (partial update), or historizes `current`, gap-fills any skipped periods and opens a new
//! bucket (overflow). The coarsest tier is the leaf: its history is replaced on overflow rather
//! than appended to. The all-time `eternal` aggregate absorbs every newest sample on top of its
//! previous value, so its envelope only narrows when a revision rebuilds it.

use crate::{
    buffer::SampleBuffer, candle::Candlestick, collection::NonEmpty, sample::Sample, tier::Tier,
};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Output of a [`cascade`] pass.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Cascade {
    pub tiers: NonEmpty<Tier>,
    pub eternal: Candlestick,
}

/// Run the tier cascade over `tiers` using the newest sample in `buffer`, extending the previous
/// `eternal` aggregate.
///
/// `revision` signals that the latest upsert replaced or inserted a sample behind the newest
/// one. Every bucket (tier `current` or `eternal`) opening at or after the finest tier's
/// `current.open_time` is then rebuilt from the buffer instead of absorbing the newest sample a
/// second time, since no sample inside it has been pruned yet.
pub fn cascade(
    tiers: &NonEmpty<Tier>,
    eternal: &Candlestick,
    buffer: &SampleBuffer,
    revision: bool,
) -> Cascade {
    let retained_from = revision.then(|| tiers.first().current.open_time);
    let rebuildable =
        |candle: &Candlestick| retained_from.is_some_and(|from| candle.open_time >= from);

    let (branches, leaf) = tiers.split_last();

    let branches = branches
        .iter()
        .map(|tier| step_branch(tier, buffer, rebuildable(&tier.current)))
        .collect::<Vec<_>>();

    let leaf = step_leaf(leaf, buffer, rebuildable(&leaf.current));

    let eternal = if rebuildable(eternal) {
        rebuild(eternal, buffer)
    } else {
        absorb(eternal, buffer.newest())
    };

    Cascade {
        tiers: NonEmpty::from_init_last(branches, leaf),
        eternal,
    }
}

/// Transition a [`Tier`] takes for the newest buffered sample.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Transition {
    Partial,
    Overflow(TimeDelta),
}

fn transition(tier: &Tier, buffer: &SampleBuffer) -> Transition {
    let anchor = tier
        .last_close_time()
        .unwrap_or_else(|| buffer.oldest().time);
    let distance = buffer.newest().time - anchor;

    if distance <= tier.duration() {
        Transition::Partial
    } else {
        Transition::Overflow(distance)
    }
}

fn step_branch(tier: &Tier, buffer: &SampleBuffer, rebuild_current: bool) -> Tier {
    let newest = buffer.newest();

    match transition(tier, buffer) {
        Transition::Partial => Tier {
            current: partial(tier, buffer, rebuild_current),
            ..tier.clone()
        },
        Transition::Overflow(distance) => {
            let generated = overflow(tier, distance);

            let mut history = tier.history.clone();
            history.extend(generated);

            Tier::new(tier.config.clone(), history, Candlestick::from_sample(newest))
        }
    }
}

fn step_leaf(tier: &Tier, buffer: &SampleBuffer, rebuild_current: bool) -> Tier {
    match transition(tier, buffer) {
        Transition::Partial => Tier {
            current: partial(tier, buffer, rebuild_current),
            ..tier.clone()
        },
        Transition::Overflow(distance) => {
            let generated = overflow(tier, distance);

            // Leaf history is replaced and the new bucket opens at the last generated close
            let current = Candlestick {
                open_time: generated.last().close_time,
                ..Candlestick::from_sample(buffer.newest())
            };

            Tier::new(tier.config.clone(), generated.into_vec(), current)
        }
    }
}

fn partial(tier: &Tier, buffer: &SampleBuffer, rebuild_current: bool) -> Candlestick {
    trace!(tier = tier.name(), "partial update");

    if rebuild_current {
        rebuild(&tier.current, buffer)
    } else {
        absorb(&tier.current, buffer.newest())
    }
}

fn overflow(tier: &Tier, distance: TimeDelta) -> NonEmpty<Candlestick> {
    let frozen = tier.current.historize(tier.duration());
    let generated = Candlestick::gap_fill(frozen, tier.duration(), distance);

    debug!(
        tier = tier.name(),
        distance_ms = distance.num_milliseconds(),
        closed = generated.len(),
        synthetic = generated.len() - 1,
        "tier overflow"
    );

    generated
}

/// Merge a single [`Sample`] into a [`Candlestick`].
fn absorb(candle: &Candlestick, sample: &Sample) -> Candlestick {
    Candlestick::merge(&NonEmpty::new(*candle, [Candlestick::from_sample(sample)]))
}

/// Rebuild a bucket from every buffered sample at or after its `open_time`, folding them in the
/// same order incremental partial updates would have.
fn rebuild(current: &Candlestick, buffer: &SampleBuffer) -> Candlestick {
    let mut window = buffer.window(current.open_time);

    match window.next() {
        Some(first) => {
            let seed = Candlestick {
                open_time: current.open_time,
                ..Candlestick::from_sample(first)
            };
            window.fold(seed, |candle, sample| absorb(&candle, sample))
        }
        None => absorb(current, buffer.newest()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{sample, t0, tier_config},
        tier::TierConfig,
    };

    fn seeded(configs: &[TierConfig], seed: &Sample) -> NonEmpty<Tier> {
        let tiers = configs
            .iter()
            .cloned()
            .map(|config| Tier::seeded(config, Candlestick::from_sample(seed)))
            .collect::<Vec<_>>();
        NonEmpty::try_from(tiers).unwrap()
    }

    fn buffer(samples: &[Sample]) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(samples[0]);
        for sample in &samples[1..] {
            buffer.upsert(*sample);
        }
        buffer
    }

    #[test]
    fn test_transition() {
        struct TestCase {
            buffer: SampleBuffer,
            history: Vec<Candlestick>,
            expected: Transition,
        }

        let config = tier_config("1m", TimeDelta::minutes(1));
        let seed = sample(2.0, 0);

        let tests = vec![
            TestCase {
                // TC0: distance from the oldest sample within duration
                buffer: buffer(&[seed, sample(4.0, 30_000)]),
                history: vec![],
                expected: Transition::Partial,
            },
            TestCase {
                // TC1: distance exactly equal to duration is still partial
                buffer: buffer(&[seed, sample(4.0, 60_000)]),
                history: vec![],
                expected: Transition::Partial,
            },
            TestCase {
                // TC2: distance beyond duration overflows
                buffer: buffer(&[seed, sample(4.0, 60_001)]),
                history: vec![],
                expected: Transition::Overflow(TimeDelta::milliseconds(60_001)),
            },
            TestCase {
                // TC3: distance is measured from the last historized close_time
                buffer: buffer(&[sample(4.0, 90_000), sample(5.0, 110_000)]),
                history: vec![Candlestick::from_sample(&seed).historize(TimeDelta::minutes(1))],
                expected: Transition::Partial,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let tier = Tier::new(config.clone(), test.history, Candlestick::from_sample(&seed));
            let actual = transition(&tier, &test.buffer);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_cascade_leaf_partial_sets_eternal_to_current() {
        let seed = sample(2.0, 0);
        let tiers = seeded(&[tier_config("1m", TimeDelta::minutes(1))], &seed);

        let eternal = Candlestick::from_sample(&seed);
        let actual = cascade(&tiers, &eternal, &buffer(&[seed, sample(4.0, 30_000)]), false);

        let current = actual.tiers.first().current;
        assert_eq!((current.open, current.close, current.high, current.low), (2.0, 4.0, 4.0, 2.0));
        assert_eq!(actual.eternal, current);
        assert!(actual.tiers.first().history.is_empty());
    }

    #[test]
    fn test_cascade_leaf_overflow_replaces_history_and_snaps_current() {
        let seed = sample(2.0, 0);
        let minute = TimeDelta::minutes(1);
        let mut tiers = seeded(&[tier_config("1m", minute)], &seed);

        // Stale history from an earlier overflow is replaced, not appended to
        tiers.last_mut().history = vec![Candlestick::flat(
            1.0,
            t0() - minute,
            t0(),
        )];

        let eternal = Candlestick::from_sample(&seed);
        let actual = cascade(&tiers, &eternal, &buffer(&[seed, sample(6.0, 150_000)]), false);
        let leaf = actual.tiers.first();

        assert_eq!(leaf.history.len(), 2);
        assert_eq!(leaf.history[0].open_time, t0());
        assert_eq!(leaf.history[1].close_time, t0() + minute * 2);
        assert_eq!(leaf.current.open_time, t0() + minute * 2);
        assert_eq!(leaf.current.close_time, t0() + TimeDelta::seconds(150));
        assert_eq!(leaf.current.close, 6.0);

        // Eternal merges the previous eternal with the raw newest sample
        assert_eq!(actual.eternal.open_time, t0());
        assert_eq!(actual.eternal.close_time, t0() + TimeDelta::seconds(150));
        assert_eq!((actual.eternal.low, actual.eternal.high), (2.0, 6.0));
    }

    #[test]
    fn test_cascade_branch_overflow_appends_history_without_snap() {
        let seed = sample(2.0, 0);
        let minute = TimeDelta::minutes(1);
        let tiers = seeded(
            &[tier_config("1m", minute), tier_config("1h", TimeDelta::hours(1))],
            &seed,
        );

        let eternal = Candlestick::from_sample(&seed);
        let actual = cascade(&tiers, &eternal, &buffer(&[seed, sample(4.0, 61_000)]), false);
        let branch = &actual.tiers[0];
        let leaf = &actual.tiers[1];

        assert_eq!(branch.history, vec![Candlestick::from_sample(&seed).historize(minute)]);
        assert_eq!(branch.current, Candlestick::from_sample(&sample(4.0, 61_000)));

        assert!(leaf.history.is_empty());
        assert_eq!((leaf.current.open, leaf.current.close), (2.0, 4.0));
        assert_eq!(actual.eternal, leaf.current);
    }

    #[test]
    fn test_cascade_revision_rebuilds_finest_current() {
        let seed = sample(2.0, 0);
        let tiers = seeded(&[tier_config("1m", TimeDelta::minutes(1))], &seed);

        let eternal = Candlestick::from_sample(&seed);
        let absorbed = cascade(&tiers, &eternal, &buffer(&[seed, sample(4.0, 30_000)]), false);
        let revised = cascade(
            &absorbed.tiers,
            &absorbed.eternal,
            &buffer(&[seed, sample(3.0, 30_000)]),
            true,
        );

        let current = revised.tiers.first().current;
        assert_eq!((current.open, current.close, current.high, current.low), (2.0, 3.0, 3.0, 2.0));
        assert_eq!(current.open_time, t0());
        assert_eq!(current.close_time, t0() + TimeDelta::seconds(30));
        assert_eq!(revised.eternal, current);
    }

    #[test]
    fn test_cascade_revision_rebuilds_every_covered_bucket() {
        let seed = sample(2.0, 0);
        let tiers = seeded(
            &[tier_config("1m", TimeDelta::minutes(1)), tier_config("5m", TimeDelta::minutes(5))],
            &seed,
        );
        let eternal = Candlestick::from_sample(&seed);

        let absorbed = cascade(&tiers, &eternal, &buffer(&[seed, sample(4.0, 30_000)]), false);
        let revised = cascade(
            &absorbed.tiers,
            &absorbed.eternal,
            &buffer(&[seed, sample(3.0, 30_000)]),
            true,
        );

        for tier in &revised.tiers {
            let current = tier.current;
            assert_eq!(
                (current.open, current.close, current.high, current.low),
                (2.0, 3.0, 3.0, 2.0),
                "tier {}",
                tier.name()
            );
        }
        assert_eq!(revised.eternal, revised.tiers.last().current);
    }

    #[test]
    fn test_cascade_revision_keeps_buckets_opened_before_retained_samples() {
        let seed = sample(2.0, 0);
        let minute = TimeDelta::minutes(1);

        // Finest bucket reopened at 61s, its earlier samples are no longer buffered
        let finest = Tier::new(
            tier_config("1m", minute),
            vec![Candlestick::from_sample(&seed).historize(minute)],
            Candlestick::from_sample(&sample(9.0, 61_000)),
        );
        let leaf = Tier::seeded(
            tier_config("1h", TimeDelta::hours(1)),
            Candlestick::merge(&NonEmpty::new(
                Candlestick::from_sample(&seed),
                [Candlestick::from_sample(&sample(9.0, 61_000))],
            )),
        );
        let eternal = leaf.current;
        let tiers = NonEmpty::new(finest, [leaf]);

        let actual = cascade(
            &tiers,
            &eternal,
            &buffer(&[sample(5.0, 61_000), sample(6.0, 70_000)]),
            true,
        );

        assert_eq!(actual.tiers[0].current.high, 6.0);
        assert_eq!(actual.tiers[1].current.high, 9.0);
        assert_eq!(actual.tiers[1].current.open_time, t0());
        assert_eq!((actual.eternal.high, actual.eternal.low), (9.0, 2.0));
    }

    #[test]
    fn test_cascade_eternal_never_narrows_after_leaf_overflow() {
        let seed = sample(100.0, 0);
        let tiers = seeded(&[tier_config("1m", TimeDelta::minutes(1))], &seed);
        let eternal = Candlestick::from_sample(&seed);

        let overflowed = cascade(&tiers, &eternal, &buffer(&[seed, sample(1.0, 90_000)]), false);
        let partial = cascade(
            &overflowed.tiers,
            &overflowed.eternal,
            &buffer(&[sample(1.0, 90_000), sample(50.0, 100_000)]),
            false,
        );

        for actual in [&overflowed.eternal, &partial.eternal] {
            assert_eq!((actual.high, actual.low), (100.0, 1.0));
            assert_eq!(actual.open_time, t0());
        }
        assert_eq!(partial.eternal.close, 50.0);
        assert_eq!(partial.eternal.close_time, t0() + TimeDelta::seconds(100));
        assert_eq!(partial.tiers.first().current.high, 50.0);
    }

    #[test]
    fn test_rebuild_matches_incremental_absorb() {
        let seed = sample(2.0, 0);
        let samples = [seed, sample(5.0, 10_000), sample(1.0, 20_000), sample(3.0, 40_000)];

        let incremental = samples[1..]
            .iter()
            .fold(Candlestick::from_sample(&seed), |candle, sample| absorb(&candle, sample));

        assert_eq!(rebuild(&Candlestick::from_sample(&seed), &buffer(&samples)), incremental);
    }
}
