//! Grouped totals with two policies.
//!
//! Meter counts are point-in-time snapshots (stock): collapsing a year into
//! one row must use the December snapshot, never the sum of twelve months.
//! Usage volumes are flows and sum across every month.

use crate::derive::MeterCounts;
use crate::period::YearMonth;
use crate::types::DerivedRecord;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Year,
    Month,
    Region,
    UsageType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Snapshot metrics. Without a `Month` key only December rows count and
    /// the year is always part of the key.
    Stock,
    /// Additive metrics, summed over all months.
    Flow,
}

/// Group identity. Fields not named by the requested keys stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Group {
    pub year: Option<i32>,
    pub period: Option<YearMonth>,
    pub region: Option<String>,
    pub usage_type: Option<String>,
}

pub fn aggregate(
    records: &[&DerivedRecord],
    keys: &[GroupKey],
    policy: Policy,
) -> BTreeMap<Group, MeterCounts> {
    let by_month = keys.contains(&GroupKey::Month);
    let year_end_only = policy == Policy::Stock && !by_month;
    let with_year = keys.contains(&GroupKey::Year) || year_end_only;

    let mut out: BTreeMap<Group, MeterCounts> = BTreeMap::new();
    for d in records {
        let r = &d.record;
        if year_end_only && !r.period.is_year_end() {
            continue;
        }
        let group = Group {
            year: with_year.then(|| r.period.year()),
            period: by_month.then_some(r.period),
            region: keys
                .contains(&GroupKey::Region)
                .then(|| r.region.clone()),
            usage_type: keys
                .contains(&GroupKey::UsageType)
                .then(|| r.usage_type.clone()),
        };
        out.entry(group).or_default().add(r);
    }
    out
}

/// Year-end stock totals keyed by year.
pub fn year_end_counts(records: &[&DerivedRecord]) -> BTreeMap<i32, MeterCounts> {
    aggregate(records, &[GroupKey::Year], Policy::Stock)
        .into_iter()
        .filter_map(|(g, c)| g.year.map(|y| (y, c)))
        .collect()
}

/// Flow totals (all months summed) keyed by year.
pub fn yearly_flow(records: &[&DerivedRecord]) -> BTreeMap<i32, MeterCounts> {
    aggregate(records, &[GroupKey::Year], Policy::Flow)
        .into_iter()
        .filter_map(|(g, c)| g.year.map(|y| (y, c)))
        .collect()
}
