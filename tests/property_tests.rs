//! Property-based tests for the pipeline building blocks.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated records and series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dreamshift::aggregate::{aggregate, Observation, Reduction};
use dreamshift::align::{inner_join, pct_change, shift};
use dreamshift::core::{BucketWidth, Record, Series, TextColumn};
use dreamshift::filter::{preprocess, CategoryFilter, CategoryMode, RecordFilter, DREAM_FLAIRS};
use dreamshift::stats::{chi2_independence, spearman, ContingencyTable};
use dreamshift::temporal::{anchor_for_year, Period, Window};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 2, 3, 0, 0, 0).unwrap()
}

const FLAIRS: [Option<&str>; 5] = [
    Some("Short Dream"),
    Some("Medium Dream"),
    Some("Long Dream"),
    Some("Discussion"),
    None,
];

const TEXTS: [&str; 8] = [
    "flying", "falling", "teeth", "late", "exam", "[deleted]", "[removed]", "",
];

/// Records with colliding texts, sentinels and missing flairs.
fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((0usize..5, 0usize..8, 0i64..500, prop::option::of(0u8..4)), 0..60)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (flair, text, hours, wc))| {
                    let mut record = Record::new(format!("r{}", i), base() + Duration::hours(hours))
                        .with_selftext(TEXTS[text]);
                    record.flair = FLAIRS[flair].map(String::from);
                    record.word_count = wc.map(f64::from);
                    record
                })
                .collect()
        })
}

/// Daily series over a sparse set of days.
fn daily_series_strategy(name: &'static str) -> impl Strategy<Value = Series> {
    prop::collection::btree_map(0i64..60, 0.1..10.0_f64, 1..40).prop_map(move |points| {
        Series::from_points(
            name,
            BucketWidth::Daily,
            points
                .into_iter()
                .map(|(day, v)| (base() + Duration::days(day), v)),
        )
        .unwrap()
    })
}

fn observations_strategy() -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec((0usize..3, 0i64..2000, -5.0..5.0_f64), 1..80).prop_map(|rows| {
        rows.into_iter()
            .map(|(g, hours, v)| {
                Observation::new(base() + Duration::hours(hours), ["a", "b", "c"][g], v)
            })
            .collect()
    })
}

fn ids(records: &[Record]) -> BTreeSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

// =============================================================================
// Property: Include and Exclude partition the valid records
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn include_and_exclude_partition_valid_records(records in records_strategy()) {
        let include = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::new(DREAM_FLAIRS, CategoryMode::Include));
        let exclude = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::new(DREAM_FLAIRS, CategoryMode::Exclude));

        let kept = ids(&include.apply(&records));
        let dropped = ids(&exclude.apply(&records));
        let valid = ids(&preprocess(&records, TextColumn::Selftext));

        prop_assert!(kept.is_disjoint(&dropped));
        let union: BTreeSet<String> = kept.union(&dropped).cloned().collect();
        prop_assert_eq!(union, valid);
    }

    #[test]
    fn filtering_is_idempotent(records in records_strategy()) {
        let filter = RecordFilter::new(TextColumn::Selftext)
            .with_category(CategoryFilter::new(DREAM_FLAIRS, CategoryMode::Include));
        let once = filter.apply(&records);
        let twice = filter.apply(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filtered_records_have_unique_texts(records in records_strategy()) {
        let kept = preprocess(&records, TextColumn::Selftext);
        let texts: BTreeSet<&str> = kept.iter().filter_map(|r| r.selftext.as_deref()).collect();
        prop_assert_eq!(texts.len(), kept.len());
        prop_assert!(kept.iter().all(|r| r.word_count.map_or(true, |wc| wc >= 1.0)));
    }
}

// =============================================================================
// Property: Aggregation does not depend on input order
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn aggregation_is_order_invariant(
        (obs, shuffled) in observations_strategy()
            .prop_flat_map(|obs| (Just(obs.clone()), Just(obs).prop_shuffle()))
    ) {
        for width in [BucketWidth::Daily, BucketWidth::Weekly] {
            for reduction in [Reduction::Mean, Reduction::Count, Reduction::Proportion] {
                prop_assert_eq!(
                    aggregate(&obs, width, reduction),
                    aggregate(&shuffled, width, reduction)
                );
            }
        }
    }

    #[test]
    fn bucket_counts_sum_to_observations(obs in observations_strategy()) {
        let series = aggregate(&obs, BucketWidth::Weekly, Reduction::Count);
        let total: usize = series.values().flat_map(|s| s.buckets()).map(|b| b.count).sum();
        prop_assert_eq!(total, obs.len());
        for s in series.values() {
            prop_assert!(s.buckets().iter().all(|b| b.count > 0));
        }
    }
}

// =============================================================================
// Property: Alignment bounds
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn first_percent_change_is_missing(series in daily_series_strategy("news")) {
        let changes = pct_change(&series);
        prop_assert_eq!(changes.get(series.buckets()[0].start), None);
        prop_assert!(changes.len() < series.len());
    }

    #[test]
    fn join_never_exceeds_shorter_side(
        left in daily_series_strategy("news"),
        right in daily_series_strategy("Dreams"),
        lag in 0i64..5
    ) {
        let shifted = shift(&right, lag);
        let rows = inner_join(&left, &shifted).map_or(0, |j| j.len());
        let bound = left.len().min(right.len().saturating_sub(lag as usize));
        prop_assert!(rows <= bound);
    }

    #[test]
    fn shift_and_back_restores_inner_rows(series in daily_series_strategy("Dreams"), lag in 1i64..4) {
        let there_and_back = shift(&shift(&series, lag), -lag);
        for bucket in there_and_back.buckets() {
            prop_assert_eq!(series.get(bucket.start), Some(bucket.value));
        }
    }
}

// =============================================================================
// Worked examples
// =============================================================================

#[test]
fn daily_means_of_two_groups() {
    let day = Utc.with_ymd_and_hms(2020, 3, 11, 0, 0, 0).unwrap();
    let obs: Vec<Observation> = ["Dreams", "news"]
        .iter()
        .flat_map(|g| {
            [1.0, 2.0, 3.0]
                .iter()
                .enumerate()
                .map(move |(h, v)| Observation::new(day + Duration::hours(h as i64), *g, *v))
        })
        .collect();

    let series: BTreeMap<String, Series> = aggregate(&obs, BucketWidth::Daily, Reduction::Mean);
    assert_eq!(series["Dreams"].values(), vec![2.0]);
    assert_eq!(series["news"].values(), vec![2.0]);
}

#[test]
fn chi_square_detects_dependence() {
    let result = chi2_independence(&ContingencyTable::new([[40, 60], [10, 90]])).unwrap();
    assert!(result.pearson().chi2 > 0.0);
    assert!(result.pearson().p_value < 0.05);
}

#[test]
fn spearman_of_identical_increasing_sequences() {
    let x: Vec<f64> = (1..=10).map(f64::from).collect();
    let result = spearman(&x, &x).unwrap();
    assert!((result.r - 1.0).abs() < 1e-12);
}

#[test]
fn anchor_instant_is_post_and_just_before_is_pre() {
    let anchor = anchor_for_year(2020).unwrap();
    let window = Window::around(anchor, Duration::days(30), Duration::days(30)).unwrap();
    assert_eq!(window.classify(anchor), Period::Post);
    assert_eq!(window.classify(anchor - Duration::nanoseconds(1)), Period::Pre);
}
