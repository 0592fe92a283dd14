mod common;

use churn_segments::{
    aggregate::{Dimension, Flag, group_rate, high_risk_list, scalar_summary},
    config::SourceOptions,
    filter::{Facet, Segment, SegmentFilter},
    normalize::load_path,
    segments::{AgeGroup, IncomeGroup, NormalizedTable, RiskCategory},
};
use common::{FIXTURE, fixture_path};

fn fixture_table() -> NormalizedTable {
    load_path(&fixture_path(FIXTURE), &SourceOptions::default()).expect("load fixture")
}

#[test]
fn default_filter_selects_everything() {
    let table = fixture_table();
    let segment = SegmentFilter::all().apply(&table);
    assert_eq!(segment.len(), table.len());
}

#[test]
fn observed_values_reproduce_unfiltered_summary() {
    let table = fixture_table();
    let filtered = SegmentFilter::observed(&table).apply(&table);
    assert_eq!(
        scalar_summary(&filtered),
        scalar_summary(&Segment::all(&table))
    );
}

#[test]
fn facets_combine_with_and() {
    let table = fixture_table();
    let segment = SegmentFilter::all()
        .with_countries(["Norway", "Bahrain", "Spain"])
        .with_risk_categories([RiskCategory::High])
        .apply(&table);
    let ids = segment.iter().map(|r| r.customer_id).collect::<Vec<_>>();
    assert_eq!(ids, vec![12350, 12353, 12354]);

    let narrowed = SegmentFilter::all()
        .with_countries(["Norway", "Bahrain", "Spain"])
        .with_risk_categories([RiskCategory::High])
        .with_age_groups([AgeGroup::From51To60])
        .apply(&table);
    assert_eq!(narrowed.len(), 2);
}

#[test]
fn empty_facet_selects_nothing() {
    let table = fixture_table();
    let filters = [
        SegmentFilter {
            countries: Facet::nothing(),
            ..SegmentFilter::all()
        },
        SegmentFilter::all().with_age_groups([]),
        SegmentFilter::all().with_risk_categories([]),
    ];
    for filter in filters {
        let segment = filter.apply(&table);
        assert!(segment.is_empty());
        let summary = scalar_summary(&segment);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.predicted_churn_rate_pct, 0.0);
        assert_eq!(summary.avg_total_price, 0.0);
        assert_eq!(summary.avg_recency, 0.0);
        assert!(high_risk_list(&segment).is_empty());
    }
}

#[test]
fn filtering_never_refits_bins() {
    let table = fixture_table();
    let segment = SegmentFilter::all()
        .with_countries(["Bahrain"])
        .apply(&table);
    // Bahrain spans 89.0..459.4, which on its own would spread across all bins.
    let groups = segment
        .iter()
        .map(|r| r.income_group)
        .collect::<Vec<_>>();
    assert_eq!(groups, vec![Some(IncomeGroup::Low), Some(IncomeGroup::Low)]);
    let rates = group_rate(&segment, Dimension::IncomeGroup, Flag::PredictedChurn);
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].rate_pct, 50.0);
}

#[test]
fn unknown_country_matches_nothing_without_error() {
    let table = fixture_table();
    let segment = SegmentFilter::all().with_countries(["Atlantis"]).apply(&table);
    assert!(segment.is_empty());
}
