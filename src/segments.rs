//! Record types and the categorical segment labels derived from them.
//!
//! Several labels are proxies rather than real attributes of the customer:
//!
//! - [`Gender`] is a relabelling of the `Churn` flag (`1` → Male, `0` → Female).
//! - [`AgeGroup`] buckets `Recency` (days since last purchase), not age.
//! - [`CreditScore`] buckets `Quantity`, not any credit data.
//! - [`RiskCategory`] relabels the externally computed `Predicted_Churn` flag.
//!
//! Downstream consumers must not read them as demographic or financial facts.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::binning::{AgeEdges, EqualWidthBins};

/// Fixed, ordered label set shared by every segment enum.
pub trait Category: Copy + Ord + Sized + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed))
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    pub category: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {} '{}'", self.category, self.value)
    }
}

impl std::error::Error for UnknownLabel {}

macro_rules! category_enum {
    ($(#[$meta:meta])* $name:ident, $display:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Category for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                <$name as Category>::from_label(value).ok_or_else(|| UnknownLabel {
                    category: $display,
                    value: value.to_string(),
                })
            }
        }
    };
}

category_enum!(
    /// Proxy of the `Churn` flag. Female sorts before Male.
    Gender, "gender", {
        Female => "Female",
        Male => "Male",
    }
);

category_enum!(
    /// Recency bucket used as an "age" axis.
    AgeGroup, "age group", {
        From18To30 => "18-30",
        From31To40 => "31-40",
        From41To50 => "41-50",
        From51To60 => "51-60",
        From61To70 => "61-70",
        Over71 => ">71",
    }
);

category_enum!(
    /// Equal-width bucket of `TotalPrice`.
    IncomeGroup, "income group", {
        Low => "Low Income",
        LowerMiddle => "Lower Middle",
        Middle => "Middle",
        UpperMiddle => "Upper Middle",
        High => "High Income",
    }
);

category_enum!(
    /// Equal-width bucket of `Quantity`.
    CreditScore, "credit score", {
        Poor => "Poor",
        Fair => "Fair",
        Good => "Good",
        VeryGood => "Very Good",
        Excellent => "Excellent",
    }
);

category_enum!(
    /// Proxy of the `Predicted_Churn` flag.
    RiskCategory, "risk category", {
        High => "High Risk",
        Low => "Low Risk",
    }
);

impl Gender {
    pub fn from_churn(churn: bool) -> Self {
        if churn { Gender::Male } else { Gender::Female }
    }
}

impl RiskCategory {
    pub fn from_predicted_churn(predicted: bool) -> Self {
        if predicted {
            RiskCategory::High
        } else {
            RiskCategory::Low
        }
    }
}

/// A row as read from the source after type coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub customer_id: i64,
    pub country: String,
    pub total_price: Option<f64>,
    pub unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub recency: Option<f64>,
    pub churn: bool,
    pub predicted_churn: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedRecord {
    #[serde(rename = "CustomerID")]
    pub customer_id: i64,
    pub country: String,
    pub total_price: Option<f64>,
    pub unit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub recency: f64,
    pub churn: bool,
    #[serde(rename = "Predicted_Churn")]
    pub predicted_churn: bool,
    pub gender: Gender,
    #[serde(rename = "Age_Group")]
    pub age_group: AgeGroup,
    #[serde(rename = "Income_Group")]
    pub income_group: Option<IncomeGroup>,
    #[serde(rename = "Credit_Score")]
    pub credit_score: Option<CreditScore>,
    #[serde(rename = "Risk_Category")]
    pub risk_category: RiskCategory,
}

/// Counts gathered while normalising a source. Every excluded row lands in
/// exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub skipped_malformed: usize,
    pub dropped_missing_recency: usize,
    pub dropped_out_of_range_age: usize,
    pub duplicate_customer_ids: usize,
}

impl LoadReport {
    pub fn rows_excluded(&self) -> usize {
        self.skipped_malformed + self.dropped_missing_recency + self.dropped_out_of_range_age
    }
}

/// Immutable result of normalising one source. Bin edges are frozen at
/// construction and never recomputed for filtered views.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    records: Vec<NormalizedRecord>,
    age_edges: Option<AgeEdges>,
    income_bins: Option<EqualWidthBins>,
    credit_bins: Option<EqualWidthBins>,
    report: LoadReport,
}

impl NormalizedTable {
    pub(crate) fn new(
        records: Vec<NormalizedRecord>,
        age_edges: Option<AgeEdges>,
        income_bins: Option<EqualWidthBins>,
        credit_bins: Option<EqualWidthBins>,
        report: LoadReport,
    ) -> Self {
        Self {
            records,
            age_edges,
            income_bins,
            credit_bins,
            report,
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `None` when every row was dropped before the edges could be derived.
    pub fn age_edges(&self) -> Option<&AgeEdges> {
        self.age_edges.as_ref()
    }

    pub fn income_bins(&self) -> Option<&EqualWidthBins> {
        self.income_bins.as_ref()
    }

    pub fn credit_bins(&self) -> Option<&EqualWidthBins> {
        self.credit_bins.as_ref()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("high risk".parse::<RiskCategory>(), Ok(RiskCategory::High));
        assert_eq!(" >71 ".parse::<AgeGroup>(), Ok(AgeGroup::Over71));
        assert!("Senior".parse::<AgeGroup>().is_err());
    }

    #[test]
    fn natural_order_matches_declaration() {
        assert_eq!(Gender::ALL, &[Gender::Female, Gender::Male]);
        assert!(IncomeGroup::Low < IncomeGroup::High);
        assert_eq!(CreditScore::from_index(3), Some(CreditScore::VeryGood));
    }

    #[test]
    fn proxies_follow_flags() {
        assert_eq!(Gender::from_churn(true), Gender::Male);
        assert_eq!(Gender::from_churn(false), Gender::Female);
        assert_eq!(
            RiskCategory::from_predicted_churn(true),
            RiskCategory::High
        );
    }
}
