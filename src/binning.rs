use serde::Serialize;

use crate::segments::{AgeGroup, Category};

/// Fixed lower edges of the recency buckets, in days.
pub const AGE_EDGES: [f64; 6] = [0.0, 60.0, 120.0, 180.0, 240.0, 300.0];

pub const EQUAL_WIDTH_BINS: usize = 5;

/// Recency buckets `[0,60) [60,120) [120,180) [180,240) [240,300) [300,max+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeEdges {
    upper: f64,
}

impl AgeEdges {
    pub fn from_max(max_recency: f64) -> Self {
        Self {
            upper: max_recency + 1.0,
        }
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn edges(&self) -> Vec<f64> {
        let mut edges = AGE_EDGES.to_vec();
        edges.push(self.upper);
        edges
    }

    pub fn assign(&self, recency: f64) -> Option<AgeGroup> {
        if !recency.is_finite() || recency < AGE_EDGES[0] || recency >= self.upper {
            return None;
        }
        let index = AGE_EDGES[1..]
            .iter()
            .position(|edge| recency < *edge)
            .unwrap_or(AGE_EDGES.len() - 1);
        AgeGroup::from_index(index)
    }
}

/// Equal-width quantiser fitted once over a full column.
///
/// Intervals are right-closed with the minimum folded into the first bin.
/// When every value is identical the whole column lands in the middle bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EqualWidthBins {
    edges: Vec<f64>,
    degenerate: bool,
}

impl EqualWidthBins {
    pub fn fit<I>(values: I, bins: usize) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        if bins == 0 {
            return None;
        }
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })?;
        let width = (max - min) / bins as f64;
        let mut edges = (0..bins)
            .map(|i| min + width * i as f64)
            .collect::<Vec<_>>();
        edges.push(max);
        Some(Self {
            edges,
            degenerate: min == max,
        })
    }

    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    pub fn assign_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min() || value > self.max() {
            return None;
        }
        if self.degenerate {
            return Some((self.bins() - 1) / 2);
        }
        self.edges[1..].iter().position(|edge| value <= *edge)
    }

    pub fn assign<C: Category>(&self, value: Option<f64>) -> Option<C> {
        value
            .and_then(|v| self.assign_index(v))
            .and_then(C::from_index)
    }
}
