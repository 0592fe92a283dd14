use std::{borrow::Borrow, collections::BTreeSet, str::FromStr};

use anyhow::{Result, anyhow};

use crate::segments::{AgeGroup, NormalizedRecord, NormalizedTable, RiskCategory};

/// Allowed values for one filter dimension.
///
/// `Only` with an empty set selects nothing; it is never widened to `Any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet<T: Ord> {
    Any,
    Only(BTreeSet<T>),
}

impl<T: Ord> Default for Facet<T> {
    fn default() -> Self {
        Facet::Any
    }
}

impl<T: Ord> Facet<T> {
    pub fn only<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Facet::Only(values.into_iter().collect())
    }

    pub fn nothing() -> Self {
        Facet::Only(BTreeSet::new())
    }

    pub fn allows<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Facet::Any => true,
            Facet::Only(set) => set.contains(value),
        }
    }

    pub fn selects_nothing(&self) -> bool {
        matches!(self, Facet::Only(set) if set.is_empty())
    }
}

/// Parses command-line facet values. `None` means the flag was not given;
/// blank entries are ignored so `--country=` yields the empty set.
pub fn parse_facet<T>(values: Option<&[String]>) -> Result<Facet<T>>
where
    T: Ord + FromStr,
    T::Err: std::fmt::Display,
{
    let Some(values) = values else {
        return Ok(Facet::Any);
    };
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<T>().map_err(|err| anyhow!("{err}")))
        .collect::<Result<BTreeSet<_>>>()
        .map(Facet::Only)
}

/// Country, age-group and risk-category membership, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFilter {
    pub countries: Facet<String>,
    pub age_groups: Facet<AgeGroup>,
    pub risk_categories: Facet<RiskCategory>,
}

impl SegmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Explicit sets holding every value present in `table`.
    pub fn observed(table: &NormalizedTable) -> Self {
        let records = table.records();
        Self {
            countries: Facet::only(records.iter().map(|r| r.country.clone())),
            age_groups: Facet::only(records.iter().map(|r| r.age_group)),
            risk_categories: Facet::only(records.iter().map(|r| r.risk_category)),
        }
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = Facet::only(countries.into_iter().map(Into::into));
        self
    }

    pub fn with_age_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = AgeGroup>,
    {
        self.age_groups = Facet::only(groups);
        self
    }

    pub fn with_risk_categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = RiskCategory>,
    {
        self.risk_categories = Facet::only(categories);
        self
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        self.countries.allows(record.country.as_str())
            && self.age_groups.allows(&record.age_group)
            && self.risk_categories.allows(&record.risk_category)
    }

    pub fn apply<'a>(&self, table: &'a NormalizedTable) -> Segment<'a> {
        if self.countries.selects_nothing()
            || self.age_groups.selects_nothing()
            || self.risk_categories.selects_nothing()
        {
            return Segment::default();
        }
        Segment {
            records: table.records().iter().filter(|r| self.matches(r)).collect(),
        }
    }
}

/// A borrowed, read-only view over part of a [`NormalizedTable`].
#[derive(Debug, Clone, Default)]
pub struct Segment<'a> {
    records: Vec<&'a NormalizedRecord>,
}

impl<'a> Segment<'a> {
    pub fn all(table: &'a NormalizedTable) -> Self {
        Self {
            records: table.records().iter().collect(),
        }
    }

    pub fn records(&self) -> &[&'a NormalizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a NormalizedRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_only_set_selects_nothing() {
        let facet: Facet<String> = Facet::nothing();
        assert!(facet.selects_nothing());
        assert!(!facet.allows("Germany"));
        assert!(Facet::<String>::Any.allows("Germany"));
    }

    #[test]
    fn parse_facet_distinguishes_absent_from_blank() {
        let absent = parse_facet::<RiskCategory>(None).expect("absent");
        assert_eq!(absent, Facet::Any);
        let blank = parse_facet::<RiskCategory>(Some(&[String::new()][..])).expect("blank");
        assert!(blank.selects_nothing());
        let parsed = parse_facet::<AgeGroup>(Some(&["18-30".to_string(), ">71".to_string()][..]))
            .expect("labels");
        assert_eq!(
            parsed,
            Facet::only([AgeGroup::From18To30, AgeGroup::Over71])
        );
        assert!(parse_facet::<AgeGroup>(Some(&["teen".to_string()][..])).is_err());
    }
}
