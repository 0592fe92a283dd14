mod common;

use std::collections::BTreeSet;

use churn_segments::{
    aggregate::{
        Dimension, Flag, cross_tab, distribution, group_rate, high_risk_list, scalar_summary,
    },
    export::{PriceFormat, high_risk_csv_string, read_high_risk_csv},
    filter::{Facet, Segment, SegmentFilter},
    normalize::normalize,
    segments::{NormalizedTable, RawRecord},
};
use proptest::prelude::*;

fn raw_record() -> impl Strategy<Value = RawRecord> {
    (
        1i64..5_000,
        prop::sample::select(vec!["United Kingdom", "France", "Germany", "EIRE"]),
        prop::option::weighted(0.9, 0.0f64..50_000.0),
        prop::option::weighted(0.9, 1.0f64..5_000.0),
        prop::option::weighted(0.95, 0.0f64..400.0),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(customer_id, country, total_price, quantity, recency, churn, predicted_churn)| {
                RawRecord {
                    customer_id,
                    country: country.to_string(),
                    total_price,
                    unit_price: Some(1.0),
                    quantity,
                    recency,
                    churn,
                    predicted_churn,
                }
            },
        )
}

fn table_strategy() -> impl Strategy<Value = NormalizedTable> {
    prop::collection::vec(raw_record(), 0..60).prop_map(normalize)
}

const DIMENSIONS: [Dimension; 6] = [
    Dimension::Country,
    Dimension::Gender,
    Dimension::AgeGroup,
    Dimension::IncomeGroup,
    Dimension::CreditScore,
    Dimension::RiskCategory,
];

proptest! {
    #[test]
    fn cross_tab_counts_sum_to_row_count(table in table_strategy()) {
        let segment = Segment::all(&table);
        let crosstab = cross_tab(&segment, Dimension::AgeGroup, Dimension::Gender);
        prop_assert_eq!(crosstab.total(), table.len());
        let by_risk = cross_tab(&segment, Dimension::Country, Dimension::RiskCategory);
        prop_assert_eq!(by_risk.total(), table.len());
    }

    #[test]
    fn gender_partitions_the_segment(table in table_strategy()) {
        let summary = scalar_summary(&Segment::all(&table));
        prop_assert_eq!(summary.male_count + summary.female_count, summary.count);
        prop_assert!(summary.predicted_high_risk_count <= summary.count);
    }

    #[test]
    fn group_rates_stay_in_range_and_skip_empty_groups(table in table_strategy()) {
        let segment = Segment::all(&table);
        for dim in DIMENSIONS {
            for flag in [Flag::Churn, Flag::PredictedChurn] {
                for rate in group_rate(&segment, dim, flag) {
                    prop_assert!(rate.members > 0);
                    prop_assert!((0.0..=100.0).contains(&rate.rate_pct));
                }
            }
            for share in distribution(&segment, dim) {
                prop_assert!(share.count > 0);
            }
        }
    }

    #[test]
    fn observed_filter_matches_unfiltered(table in table_strategy()) {
        let filtered = SegmentFilter::observed(&table).apply(&table);
        prop_assert_eq!(scalar_summary(&filtered), scalar_summary(&Segment::all(&table)));
    }

    #[test]
    fn any_empty_facet_empties_the_segment(table in table_strategy(), facet in 0usize..3) {
        let mut filter = SegmentFilter::all();
        match facet {
            0 => filter.countries = Facet::nothing(),
            1 => filter.age_groups = Facet::nothing(),
            _ => filter.risk_categories = Facet::nothing(),
        }
        let summary = scalar_summary(&filter.apply(&table));
        prop_assert_eq!(summary.count, 0);
        prop_assert_eq!(summary.predicted_churn_rate_pct, 0.0);
        prop_assert_eq!(summary.avg_total_price, 0.0);
        prop_assert_eq!(summary.avg_recency, 0.0);
    }

    #[test]
    fn high_risk_export_round_trips_ids_and_categories(table in table_strategy(), currency in any::<bool>()) {
        let entries = high_risk_list(&Segment::all(&table));
        let format = if currency { PriceFormat::Currency } else { PriceFormat::Numeric };
        let csv = high_risk_csv_string(&entries, format).expect("export");
        let parsed = read_high_risk_csv(csv.as_bytes()).expect("parse");
        prop_assert_eq!(parsed.len(), entries.len());
        let ids = |items: &[churn_segments::aggregate::HighRiskEntry]| {
            items.iter().map(|e| e.customer_id).collect::<BTreeSet<_>>()
        };
        prop_assert_eq!(ids(&parsed), ids(&entries));
        for (left, right) in parsed.iter().zip(&entries) {
            prop_assert_eq!(left.risk_category, right.risk_category);
            prop_assert_eq!(left.recency, right.recency);
        }
    }
}
