//! Estimated sales lost to induction conversion.

use crate::aggregate::{year_end_counts, yearly_flow};
use crate::normalize::Capabilities;
use crate::types::{DerivedRecord, YearlySummary};
use tracing::debug;

pub const MONTHS_PER_YEAR: f64 = 12.0;

/// What-if parameters for one analysis run. The usage figure is a single
/// scalar applied to every year and region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossParams {
    /// Average monthly gas use of one household, m³.
    pub avg_monthly_usage: f64,
    /// Price per m³; revenue is omitted when absent.
    pub unit_price: Option<f64>,
}

impl Default for LossParams {
    fn default() -> Self {
        Self {
            avg_monthly_usage: 5.0,
            unit_price: Some(950.0),
        }
    }
}

pub fn annual_loss_volume(estimated_induction: f64, avg_monthly_usage: f64) -> f64 {
    estimated_induction * avg_monthly_usage * MONTHS_PER_YEAR
}

pub fn annual_loss_revenue(loss_volume_m3: f64, unit_price: f64) -> f64 {
    loss_volume_m3 * unit_price
}

/// One summary per year that has a December snapshot in `records`.
///
/// Counts come from the year-end rows; `usage_m3` sums every month and is
/// `None` when the dataset has no usage column. Years without December are
/// skipped since their installed base is unknown.
pub fn yearly_summaries(
    records: &[&DerivedRecord],
    caps: &Capabilities,
    params: &LossParams,
) -> Vec<YearlySummary> {
    let flow = yearly_flow(records);
    let stock = year_end_counts(records);
    for year in flow.keys().filter(|y| !stock.contains_key(*y)) {
        debug!(year, "no December snapshot; year omitted from yearly summary");
    }

    stock
        .into_iter()
        .map(|(year, counts)| {
            let estimated_induction = counts.estimated_induction();
            let loss_volume_m3 = annual_loss_volume(estimated_induction, params.avg_monthly_usage);
            YearlySummary {
                year,
                total_meters: counts.total_meters,
                gas_range_meters: counts.gas_range_meters,
                estimated_induction,
                conversion_rate: counts.conversion_rate(),
                usage_m3: caps
                    .usage
                    .then(|| flow.get(&year).map_or(0.0, |c| c.usage_m3)),
                loss_volume_m3,
                loss_revenue: params
                    .unit_price
                    .map(|p| annual_loss_revenue(loss_volume_m3, p)),
            }
        })
        .collect()
}
