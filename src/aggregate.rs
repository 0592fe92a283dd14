//! Pure query functions over a [`Segment`].
//!
//! None of these fail. An empty segment yields zero counts, zero rates and
//! empty sequences; groups without members are omitted rather than reported
//! with a placeholder rate.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use clap::ValueEnum;
use serde::Serialize;

use crate::{
    filter::Segment,
    segments::{AgeGroup, Category, NormalizedRecord, RiskCategory},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Dimension {
    Country,
    Gender,
    AgeGroup,
    IncomeGroup,
    CreditScore,
    RiskCategory,
}

impl Dimension {
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Country => "Country",
            Dimension::Gender => "Gender",
            Dimension::AgeGroup => "Age_Group",
            Dimension::IncomeGroup => "Income_Group",
            Dimension::CreditScore => "Credit_Score",
            Dimension::RiskCategory => "Risk_Category",
        }
    }

    pub fn key(self, record: &NormalizedRecord) -> Option<GroupKey> {
        match self {
            Dimension::Country => Some(GroupKey::Text(record.country.clone())),
            Dimension::Gender => Some(GroupKey::of(record.gender)),
            Dimension::AgeGroup => Some(GroupKey::of(record.age_group)),
            Dimension::IncomeGroup => record.income_group.map(GroupKey::of),
            Dimension::CreditScore => record.credit_score.map(GroupKey::of),
            Dimension::RiskCategory => Some(GroupKey::of(record.risk_category)),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A dimension value carrying its natural sort position: declaration order
/// for categories, lexical order for free text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Category(usize, &'static str),
    Text(String),
}

impl GroupKey {
    pub fn of<C: Category>(category: C) -> Self {
        GroupKey::Category(category.index(), category.label())
    }

    pub fn label(&self) -> &str {
        match self {
            GroupKey::Category(_, label) => *label,
            GroupKey::Text(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Flag {
    Churn,
    #[value(alias = "predicted")]
    PredictedChurn,
}

impl Flag {
    pub fn value(self, record: &NormalizedRecord) -> bool {
        match self {
            Flag::Churn => record.churn,
            Flag::PredictedChurn => record.predicted_churn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarSummary {
    pub count: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub avg_total_price: f64,
    pub avg_recency: f64,
    pub predicted_high_risk_count: usize,
    pub predicted_churn_rate_pct: f64,
}

pub fn scalar_summary(segment: &Segment<'_>) -> ScalarSummary {
    let mut male_count = 0usize;
    let mut high_risk = 0usize;
    let mut price_sum = 0.0;
    let mut price_count = 0usize;
    let mut recency_sum = 0.0;
    for record in segment.iter() {
        if record.churn {
            male_count += 1;
        }
        if record.predicted_churn {
            high_risk += 1;
        }
        if let Some(price) = record.total_price {
            price_sum += price;
            price_count += 1;
        }
        recency_sum += record.recency;
    }
    let count = segment.len();
    ScalarSummary {
        count,
        male_count,
        female_count: count - male_count,
        avg_total_price: ratio(price_sum, price_count),
        avg_recency: ratio(recency_sum, count),
        predicted_high_risk_count: high_risk,
        predicted_churn_rate_pct: 100.0 * ratio(high_risk as f64, count),
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTabRow {
    pub value: String,
    /// Aligned with [`CrossTab::columns`].
    pub counts: Vec<usize>,
}

/// Contingency table limited to the values observed on each axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub columns: Vec<String>,
    pub rows: Vec<CrossTabRow>,
}

impl CrossTab {
    pub fn get(&self, row: &str, column: &str) -> Option<usize> {
        let col_idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.value == row)
            .and_then(|r| r.counts.get(col_idx).copied())
    }

    pub fn total(&self) -> usize {
        self.rows.iter().flat_map(|r| r.counts.iter()).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        self.rows
            .iter()
            .map(|row| {
                let cells = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.counts.iter().copied())
                    .collect();
                (row.value.clone(), cells)
            })
            .collect()
    }
}

pub fn cross_tab(segment: &Segment<'_>, row_dim: Dimension, col_dim: Dimension) -> CrossTab {
    let mut cells: BTreeMap<GroupKey, BTreeMap<GroupKey, usize>> = BTreeMap::new();
    let mut column_keys = BTreeSet::new();
    for record in segment.iter() {
        let (Some(row), Some(col)) = (row_dim.key(record), col_dim.key(record)) else {
            continue;
        };
        column_keys.insert(col.clone());
        *cells.entry(row).or_default().entry(col).or_insert(0) += 1;
    }
    let column_keys = column_keys.into_iter().collect::<Vec<_>>();
    let rows = cells
        .into_iter()
        .map(|(row, counts)| CrossTabRow {
            value: row.label().to_string(),
            counts: column_keys
                .iter()
                .map(|col| counts.get(col).copied().unwrap_or(0))
                .collect(),
        })
        .collect();
    CrossTab {
        row_dimension: row_dim,
        column_dimension: col_dim,
        columns: column_keys.iter().map(|k| k.label().to_string()).collect(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRate {
    pub group: String,
    pub members: usize,
    pub rate_pct: f64,
}

/// Percentage of members with `flag` set, per group in natural order.
pub fn group_rate(segment: &Segment<'_>, group_dim: Dimension, flag: Flag) -> Vec<GroupRate> {
    let mut groups: BTreeMap<GroupKey, (usize, usize)> = BTreeMap::new();
    for record in segment.iter() {
        let Some(key) = group_dim.key(record) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if flag.value(record) {
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(key, (members, flagged))| GroupRate {
            group: key.label().to_string(),
            members,
            rate_pct: 100.0 * flagged as f64 / members as f64,
        })
        .collect()
}

/// Highest-rate group; ties keep the earliest group in `rates` order.
pub fn top_risk_group(rates: &[GroupRate]) -> Option<&GroupRate> {
    rates.iter().fold(None, |best: Option<&GroupRate>, candidate| match best {
        Some(current) if current.rate_pct >= candidate.rate_pct => Some(current),
        _ => Some(candidate),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub value: String,
    pub count: usize,
    pub pct: f64,
}

/// Value counts for one dimension, skipping records where it is missing.
pub fn distribution(segment: &Segment<'_>, dim: Dimension) -> Vec<Share> {
    let mut counts: BTreeMap<GroupKey, usize> = BTreeMap::new();
    for key in segment.iter().filter_map(|record| dim.key(record)) {
        *counts.entry(key).or_insert(0) += 1;
    }
    let total = counts.values().sum::<usize>();
    counts
        .into_iter()
        .map(|(key, count)| Share {
            value: key.label().to_string(),
            count,
            pct: 100.0 * ratio(count as f64, total),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskEntry {
    #[serde(rename = "CustomerID")]
    pub customer_id: i64,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Age_Group")]
    pub age_group: AgeGroup,
    #[serde(rename = "TotalPrice")]
    pub total_price: Option<f64>,
    #[serde(rename = "Recency")]
    pub recency: f64,
    #[serde(rename = "Risk_Category")]
    pub risk_category: RiskCategory,
}

/// Records flagged by `Predicted_Churn`, in table order.
pub fn high_risk_list(segment: &Segment<'_>) -> Vec<HighRiskEntry> {
    segment
        .iter()
        .filter(|record| record.predicted_churn)
        .map(|record| HighRiskEntry {
            customer_id: record.customer_id,
            country: record.country.clone(),
            age_group: record.age_group,
            total_price: record.total_price,
            recency: record.recency,
            risk_category: record.risk_category,
        })
        .collect()
}
