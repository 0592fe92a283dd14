//! Every aggregate the dashboard renders, computed once per filter change.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    aggregate::{
        self, CrossTab, Dimension, Flag, GroupRate, HighRiskEntry, ScalarSummary, Share,
    },
    filter::Segment,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub summary: ScalarSummary,
    pub age_by_gender: CrossTab,
    pub income_distribution: Vec<Share>,
    pub credit_distribution: Vec<Share>,
    pub risk_distribution: Vec<Share>,
    pub churn_by_age: Vec<GroupRate>,
    pub churn_by_income: Vec<GroupRate>,
    pub top_risk_age_group: Option<GroupRate>,
    pub high_risk: Vec<HighRiskEntry>,
}

impl Snapshot {
    pub fn compute(segment: &Segment<'_>) -> Self {
        let churn_by_age =
            aggregate::group_rate(segment, Dimension::AgeGroup, Flag::PredictedChurn);
        let top_risk_age_group = aggregate::top_risk_group(&churn_by_age).cloned();
        Self {
            summary: aggregate::scalar_summary(segment),
            age_by_gender: aggregate::cross_tab(segment, Dimension::AgeGroup, Dimension::Gender),
            income_distribution: aggregate::distribution(segment, Dimension::IncomeGroup),
            credit_distribution: aggregate::distribution(segment, Dimension::CreditScore),
            risk_distribution: aggregate::distribution(segment, Dimension::RiskCategory),
            churn_by_income: aggregate::group_rate(
                segment,
                Dimension::IncomeGroup,
                Flag::PredictedChurn,
            ),
            churn_by_age,
            top_risk_age_group,
            high_risk: aggregate::high_risk_list(segment),
        }
    }

    /// Plain-text highlights shown under the charts.
    pub fn insights(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Predicted churn rate: {} ({} high-risk customers)",
            format_pct(self.summary.predicted_churn_rate_pct),
            format_count(self.summary.predicted_high_risk_count)
        )];
        if let Some(top) = &self.top_risk_age_group {
            lines.push(format!(
                "Highest churn risk age group: {} ({} risk)",
                top.group,
                format_pct(top.rate_pct)
            ));
        }
        lines
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.1}%")
}

/// Thousands-separated integer, e.g. `12,345`.
pub fn format_count(value: usize) -> String {
    group_thousands(&value.to_string())
}

/// Dollar amount with thousands separators and two decimals, e.g. `$1,234.50`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rendered = format!("{:.2}", value.abs());
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let sign = if value < 0.0 && rendered != "0.00" { "-" } else { "" };
    format!("{sign}${}.{fraction}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let chars = digits.chars().collect::<Vec<_>>();
    chars
        .rchunks(3)
        .rev()
        .map(|chunk| chunk.iter().collect::<String>())
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-1234567.0), "-$1,234,567.00");
        assert_eq!(format_currency(f64::NAN), "");
    }

    #[test]
    fn counts_and_percentages() {
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(12), "12");
        assert_eq!(format_pct(50.0), "50.0%");
    }
}
