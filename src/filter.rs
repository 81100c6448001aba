//! Row selection. Filters always run before any aggregation.

use crate::period::YearMonth;
use crate::types::{DerivedRecord, MeterRecord};
use std::collections::BTreeSet;

/// Active date range and label filters. `None` means "everything".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
    pub regions: Option<BTreeSet<String>>,
    pub usage_types: Option<BTreeSet<String>>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, r: &MeterRecord) -> bool {
        self.from.map_or(true, |from| r.period >= from)
            && self.to.map_or(true, |to| r.period <= to)
            && self.regions.as_ref().map_or(true, |set| set.contains(&r.region))
            && self
                .usage_types
                .as_ref()
                .map_or(true, |set| set.contains(&r.usage_type))
    }

    pub fn apply<'a>(&self, data: &'a [DerivedRecord]) -> Vec<&'a DerivedRecord> {
        data.iter().filter(|d| self.matches(&d.record)).collect()
    }
}

/// Choices available to a selection: the period bounds and the distinct
/// region and usage-type labels, sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub min_period: Option<YearMonth>,
    pub max_period: Option<YearMonth>,
    pub regions: Vec<String>,
    pub usage_types: Vec<String>,
}

pub fn options(data: &[DerivedRecord]) -> FilterOptions {
    let mut regions = BTreeSet::new();
    let mut usage_types = BTreeSet::new();
    for d in data {
        regions.insert(d.record.region.clone());
        usage_types.insert(d.record.usage_type.clone());
    }
    FilterOptions {
        min_period: data.iter().map(|d| d.record.period).min(),
        max_period: data.iter().map(|d| d.record.period).max(),
        regions: regions.into_iter().collect(),
        usage_types: usage_types.into_iter().collect(),
    }
}
