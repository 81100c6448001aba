use crate::aggregate::{aggregate, GroupKey, Policy};
use crate::loader::MeterDataset;
use crate::types::{
    CorrelationRow, DerivedRecord, LossVsSales, LossVsSalesRow, RegionRankRow, SummaryStats,
    TrendRow, TypeTrendRow, YearlyLossRow, YearlySummary,
};
use crate::util::format_number;
use std::cmp::Ordering;

/// Monthly totals across the selection with the rate recomputed from sums.
pub fn generate_trend(selected: &[&DerivedRecord]) -> Vec<TrendRow> {
    aggregate(selected, &[GroupKey::Month], Policy::Stock)
        .into_iter()
        .filter_map(|(g, c)| {
            Some(TrendRow {
                period: g.period?.to_string(),
                total_meters: format_number(c.total_meters, 0),
                gas_range_meters: format_number(c.gas_range_meters, 0),
                estimated_induction: format_number(c.estimated_induction(), 0),
                conversion_rate: format_number(c.conversion_rate(), 2),
            })
        })
        .collect()
}

/// Conversion rate against usage per connected household, per region and
/// month, both from summed counts.
pub fn generate_correlation(selected: &[&DerivedRecord]) -> Vec<CorrelationRow> {
    aggregate(selected, &[GroupKey::Region, GroupKey::Month], Policy::Stock)
        .into_iter()
        .filter_map(|(g, c)| {
            Some(CorrelationRow {
                region: g.region?,
                period: g.period?.to_string(),
                conversion_rate: format_number(c.conversion_rate(), 2),
                usage_per_household: format_number(c.usage_per_household(), 2),
            })
        })
        .collect()
}

/// Regions ranked by conversion rate at the latest month in the selection.
pub fn generate_region_ranking(selected: &[&DerivedRecord]) -> Vec<RegionRankRow> {
    let Some(latest) = selected.iter().map(|d| d.record.period).max() else {
        return Vec::new();
    };
    let at_latest: Vec<&DerivedRecord> = selected
        .iter()
        .copied()
        .filter(|d| d.record.period == latest)
        .collect();

    let mut ranked: Vec<(f64, String, f64, f64)> =
        aggregate(&at_latest, &[GroupKey::Region, GroupKey::Month], Policy::Stock)
            .into_iter()
            .filter_map(|(g, c)| {
                Some((c.conversion_rate(), g.region?, c.total_meters, c.gas_range_meters))
            })
            .collect();
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (rate, region, total, gas))| RegionRankRow {
            rank: idx + 1,
            region,
            total_meters: format_number(total, 0),
            gas_range_meters: format_number(gas, 0),
            conversion_rate: format_number(rate, 2),
        })
        .collect()
}

/// Monthly conversion rate per usage type.
pub fn generate_type_comparison(selected: &[&DerivedRecord]) -> Vec<TypeTrendRow> {
    aggregate(selected, &[GroupKey::Month, GroupKey::UsageType], Policy::Stock)
        .into_iter()
        .filter_map(|(g, c)| {
            Some(TypeTrendRow {
                period: g.period?.to_string(),
                usage_type: g.usage_type?,
                total_meters: format_number(c.total_meters, 0),
                gas_range_meters: format_number(c.gas_range_meters, 0),
                conversion_rate: format_number(c.conversion_rate(), 2),
            })
        })
        .collect()
}

pub fn generate_yearly_loss(summaries: &[YearlySummary]) -> Vec<YearlyLossRow> {
    summaries
        .iter()
        .map(|s| YearlyLossRow {
            year: s.year,
            total_meters: format_number(s.total_meters, 0),
            estimated_induction: format_number(s.estimated_induction, 0),
            conversion_rate: format_number(s.conversion_rate, 2),
            usage_m3: s
                .usage_m3
                .map(|v| format_number(v, 0))
                .unwrap_or_else(|| "-".to_string()),
            loss_volume_m3: format_number(s.loss_volume_m3, 0),
            loss_revenue: s
                .loss_revenue
                .map(|v| format_number(v, 0))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn generate_loss_vs_sales(merged: &[LossVsSales]) -> Vec<LossVsSalesRow> {
    merged
        .iter()
        .map(|m| LossVsSalesRow {
            year: m.summary.year,
            loss_volume_m3: format_number(m.summary.loss_volume_m3, 0),
            household_sales_m3: format_number(m.household_sales_m3, 0),
            total_sales_m3: format_number(m.total_sales_m3, 0),
            household_loss_share: format_number(m.household_loss_share, 2),
            total_loss_share: format_number(m.total_loss_share, 2),
        })
        .collect()
}

pub fn generate_summary(
    dataset: &MeterDataset,
    selected: &[&DerivedRecord],
    summaries: &[YearlySummary],
) -> SummaryStats {
    let latest = summaries.last();
    let cumulative_loss_revenue = summaries
        .iter()
        .map(|s| s.loss_revenue)
        .sum::<Option<f64>>();
    SummaryStats {
        rows_read: dataset.report.total_rows,
        rows_kept: dataset.report.kept_rows,
        rows_dropped: dataset.report.dropped_rows,
        rows_selected: selected.len(),
        negative_estimates: dataset.report.negative_estimates,
        warnings: dataset.report.warnings.clone(),
        latest_year: latest.map(|s| s.year),
        latest_conversion_rate: latest.map(|s| s.conversion_rate),
        cumulative_loss_volume_m3: summaries.iter().map(|s| s.loss_volume_m3).sum(),
        cumulative_loss_revenue: cumulative_loss_revenue.filter(|_| !summaries.is_empty()),
    }
}
