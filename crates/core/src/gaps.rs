//! Gap analysis: which reference slots have no persisted coverage.
//!
//! Pure set difference, `reference − known`, computed independently for the
//! date axis (EOD) and the timestamp axis (intraday). "Known" is the union
//! of price-store coverage and no-data-ledger coverage; the caller builds
//! that union. Results are sorted for deterministic logs, but callers must
//! treat them as sets.

use chrono::NaiveDate;
use std::collections::HashSet;

/// Reference slots minus known slots, per axis.
///
/// An empty reference on one axis yields an empty result on that axis no
/// matter what the other axis holds: a ticker might need only EOD catch-up
/// while intraday is fully covered, or vice versa.
pub fn missing(
    reference_dates: &[NaiveDate],
    reference_timestamps: &[i64],
    known_dates: &[NaiveDate],
    known_timestamps: &[i64],
) -> (Vec<NaiveDate>, Vec<i64>) {
    (
        missing_axis(reference_dates, known_dates),
        missing_axis(reference_timestamps, known_timestamps),
    )
}

fn missing_axis<K: Copy + Ord + std::hash::Hash>(reference: &[K], known: &[K]) -> Vec<K> {
    let known: HashSet<K> = known.iter().copied().collect();
    let mut out: Vec<K> = reference
        .iter()
        .copied()
        .filter(|k| !known.contains(k))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_missing_is_set_difference() {
        let reference = vec![d("2023-01-03"), d("2023-01-04"), d("2023-01-05")];
        let known = vec![d("2023-01-04")];
        let (dates, timestamps) = missing(&reference, &[100, 200], &known, &[200]);
        assert_eq!(dates, vec![d("2023-01-03"), d("2023-01-05")]);
        assert_eq!(timestamps, vec![100]);
    }

    #[test]
    fn test_fully_known_reference_yields_empty() {
        let reference = vec![d("2023-01-03"), d("2023-01-04")];
        let (dates, timestamps) = missing(&reference, &[1, 2], &reference, &[2, 1]);
        assert!(dates.is_empty());
        assert!(timestamps.is_empty());
    }

    #[test]
    fn test_empty_reference_axis_is_independent() {
        // EOD fully covered, intraday empty reference: both results empty.
        let (dates, timestamps) = missing(&[], &[], &[d("2023-01-03")], &[42]);
        assert!(dates.is_empty());
        assert!(timestamps.is_empty());

        // One axis empty, the other still reports its gaps.
        let (dates, timestamps) = missing(&[d("2023-01-03")], &[], &[], &[42]);
        assert_eq!(dates.len(), 1);
        assert!(timestamps.is_empty());
    }

    #[test]
    fn test_extra_known_keys_are_ignored() {
        let reference = vec![d("2023-01-03")];
        let known = vec![d("2022-12-30"), d("2023-01-03"), d("2023-01-09")];
        let (dates, _) = missing(&reference, &[], &known, &[]);
        assert!(dates.is_empty());
    }

    #[test]
    fn test_duplicate_reference_entries_collapse() {
        let reference = vec![d("2023-01-03"), d("2023-01-03")];
        let (dates, _) = missing(&reference, &[], &[], &[]);
        assert_eq!(dates, vec![d("2023-01-03")]);
    }

    proptest! {
        #[test]
        fn prop_missing_equals_set_difference(
            reference in proptest::collection::btree_set(0i64..5_000, 0..200),
            known in proptest::collection::btree_set(0i64..5_000, 0..200),
        ) {
            let reference_vec: Vec<i64> = reference.iter().copied().collect();
            let known_vec: Vec<i64> = known.iter().copied().collect();
            let (_, got) = missing(&[], &reference_vec, &[], &known_vec);
            let expected: BTreeSet<i64> = reference.difference(&known).copied().collect();
            prop_assert_eq!(got.into_iter().collect::<BTreeSet<i64>>(), expected);
        }

        #[test]
        fn prop_missing_of_self_is_empty(
            reference in proptest::collection::vec(0i64..5_000, 0..200),
        ) {
            let (_, got) = missing(&[], &reference, &[], &reference);
            prop_assert!(got.is_empty());
        }
    }
}
