//! Per-row derived metrics and the shared count arithmetic.
//!
//! Rates are always numerator-sum over denominator-sum. Aggregates go through
//! [`MeterCounts`] so a rate is never an average of row rates.

use crate::normalize::Capabilities;
use crate::types::{DerivedRecord, MeterRecord};
use crate::util::ratio_or_zero;

/// Billing meters minus gas-range-connected meters. Not clamped: a negative
/// value means the export reported more gas ranges than billed meters.
pub fn estimated_induction(total_meters: f64, gas_range_meters: f64) -> f64 {
    total_meters - gas_range_meters
}

/// Share of billed meters without a gas range, in percent. 0 when there are
/// no billed meters.
pub fn conversion_rate(total_meters: f64, gas_range_meters: f64) -> f64 {
    ratio_or_zero(estimated_induction(total_meters, gas_range_meters), total_meters) * 100.0
}

/// Usage per gas-range-connected household. 0 when nothing is connected.
pub fn usage_per_household(usage_m3: f64, gas_range_meters: f64) -> f64 {
    ratio_or_zero(usage_m3, gas_range_meters)
}

pub fn derive(record: MeterRecord, caps: &Capabilities) -> DerivedRecord {
    let (t, g, u) = (record.total_meters, record.gas_range_meters, record.usage_m3);
    DerivedRecord {
        estimated_induction: caps.induction.then(|| estimated_induction(t, g)),
        conversion_rate: caps.induction.then(|| conversion_rate(t, g)),
        usage_per_household: caps.usage_per_household.then(|| usage_per_household(u, g)),
        record,
    }
}

/// Summed raw counts for a group of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterCounts {
    pub total_meters: f64,
    pub gas_range_meters: f64,
    pub usage_m3: f64,
    pub rows: usize,
}

impl MeterCounts {
    pub fn add(&mut self, record: &MeterRecord) {
        self.total_meters += record.total_meters;
        self.gas_range_meters += record.gas_range_meters;
        self.usage_m3 += record.usage_m3;
        self.rows += 1;
    }

    pub fn estimated_induction(&self) -> f64 {
        estimated_induction(self.total_meters, self.gas_range_meters)
    }

    pub fn conversion_rate(&self) -> f64 {
        conversion_rate(self.total_meters, self.gas_range_meters)
    }

    pub fn usage_per_household(&self) -> f64 {
        usage_per_household(self.usage_m3, self.gas_range_meters)
    }
}
