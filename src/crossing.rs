use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{ArtistCrossings, ArtistId, MetricObservation, MetricSnapshot};

/// Where an artist's series sits relative to the threshold after the last
/// comparable observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    NoPrior,
    Below,
    AtOrAbove,
}

impl Level {
    fn of(value: i64, threshold: i64) -> Self {
        if value >= threshold {
            Level::AtOrAbove
        } else {
            Level::Below
        }
    }
}

/// Buckets observations per artist, keeping the incoming order inside each
/// bucket. Every roster artist gets a bucket, even an empty one.
pub fn group_by_artist<'a>(
    artists: &[ArtistId],
    observations: &'a [MetricObservation],
) -> BTreeMap<ArtistId, Vec<&'a MetricObservation>> {
    let mut grouped: BTreeMap<ArtistId, Vec<&MetricObservation>> =
        artists.iter().map(|id| (*id, Vec::new())).collect();

    for observation in observations {
        grouped
            .entry(observation.artist_id)
            .or_default()
            .push(observation);
    }

    grouped
}

/// Dates at which a date-ordered series moves from below `threshold` to at or
/// above it. Observations without a value are skipped entirely.
pub fn crossings_in<'a, I>(series: I, threshold: i64) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a MetricObservation>,
{
    let mut level = Level::NoPrior;
    let mut crossings = Vec::new();

    for observation in series {
        let Some(value) = observation.value else {
            continue;
        };

        let next = Level::of(value, threshold);
        if level == Level::Below && next == Level::AtOrAbove {
            crossings.push(observation.date);
        }
        level = next;
    }

    crossings
}

pub fn detect(
    grouped: &BTreeMap<ArtistId, Vec<&MetricObservation>>,
    threshold: i64,
) -> Vec<ArtistCrossings> {
    grouped
        .iter()
        .map(|(artist_id, series)| ArtistCrossings {
            artist_id: *artist_id,
            crossings: crossings_in(series.iter().copied(), threshold),
        })
        .collect()
}

pub fn detect_snapshot(snapshot: &MetricSnapshot, threshold: i64) -> Vec<ArtistCrossings> {
    let grouped = group_by_artist(&snapshot.artists, &snapshot.observations);
    detect(&grouped, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    fn obs(artist_id: ArtistId, d: u32, value: Option<i64>) -> MetricObservation {
        MetricObservation {
            artist_id,
            date: day(d),
            value,
        }
    }

    fn series(artist_id: ArtistId, values: &[i64]) -> Vec<MetricObservation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| obs(artist_id, i as u32 + 1, Some(*v)))
            .collect()
    }

    fn snapshot(artists: &[ArtistId], observations: Vec<MetricObservation>) -> MetricSnapshot {
        MetricSnapshot {
            artists: artists.to_vec(),
            observations,
        }
    }

    #[test]
    fn counts_only_transitions_into_range() {
        let observations = series(1, &[5, 12, 12, 11, 13]);
        assert_eq!(crossings_in(&observations, 12), vec![day(2), day(5)]);
    }

    #[test]
    fn threshold_is_inclusive_on_the_upper_side() {
        assert_eq!(crossings_in(&series(1, &[9, 10]), 10), vec![day(2)]);
        assert!(crossings_in(&series(1, &[10, 10]), 10).is_empty());
    }

    #[test]
    fn first_sample_never_crosses() {
        for value in [0, 5, 10, 1_000] {
            assert!(crossings_in(&series(1, &[value]), 10).is_empty());
        }
    }

    #[test]
    fn zero_threshold_never_crosses_non_negative_values() {
        assert!(crossings_in(&series(1, &[0, 3, 0, 7]), 0).is_empty());
    }

    #[test]
    fn null_values_do_not_reset_previous_level() {
        // 5 -> null -> 12 still counts, the null is invisible.
        let observations = vec![obs(1, 1, Some(5)), obs(1, 2, None), obs(1, 3, Some(12))];
        assert_eq!(crossings_in(&observations, 10), vec![day(3)]);

        // 12 -> null -> 13 is not a crossing.
        let observations = vec![obs(1, 1, Some(12)), obs(1, 2, None), obs(1, 3, Some(13))];
        assert!(crossings_in(&observations, 10).is_empty());

        // A leading null does not count as a prior observation.
        let observations = vec![obs(1, 1, None), obs(1, 2, Some(12))];
        assert!(crossings_in(&observations, 10).is_empty());
    }

    #[test]
    fn artists_without_observations_get_empty_entries() {
        let result = detect_snapshot(&snapshot(&[1, 2, 3], series(2, &[1, 20])), 10);
        assert_eq!(
            result,
            vec![
                ArtistCrossings { artist_id: 1, crossings: vec![] },
                ArtistCrossings { artist_id: 2, crossings: vec![day(2)] },
                ArtistCrossings { artist_id: 3, crossings: vec![] },
            ]
        );
    }

    #[test]
    fn empty_dataset_yields_empty_result() {
        assert!(detect_snapshot(&MetricSnapshot::default(), 10).is_empty());
    }

    #[test]
    fn interleaved_artists_are_isolated() {
        // A: 1, 20 (crosses on day 2). B: 20, 1, 20 (crosses on day 3).
        let observations = vec![
            obs(7, 1, Some(20)),
            obs(3, 1, Some(1)),
            obs(7, 2, Some(1)),
            obs(3, 2, Some(20)),
            obs(7, 3, Some(20)),
        ];
        let result = detect_snapshot(&snapshot(&[3, 7], observations), 10);
        assert_eq!(
            result,
            vec![
                ArtistCrossings { artist_id: 3, crossings: vec![day(2)] },
                ArtistCrossings { artist_id: 7, crossings: vec![day(3)] },
            ]
        );
    }

    #[test]
    fn observations_for_unlisted_artists_are_still_reported() {
        let result = detect_snapshot(&snapshot(&[], series(4, &[1, 11])), 10);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].artist_id, 4);
        assert_eq!(result[0].crossings, vec![day(2)]);
    }

    #[test]
    fn repeated_detection_is_stable() {
        let data = snapshot(&[1, 2], [series(1, &[1, 9, 3, 12]), series(2, &[15, 2, 8])].concat());
        let first = detect_snapshot(&data, 8);
        let second = detect_snapshot(&data, 8);
        assert_eq!(first, second);
        assert_eq!(first[0].crossings, vec![day(2), day(4)]);
        assert_eq!(first[1].crossings, vec![day(3)]);
    }
}
