use crate::period::YearMonth;
use serde::Serialize;
use tabled::Tabled;

/// One cleaned row of the meter dataset.
///
/// Numeric fields hold 0 when their column is absent; whether a value is
/// meaningful is decided by the dataset's `Capabilities`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterRecord {
    pub period: YearMonth,
    pub region: String,
    pub usage_type: String,
    pub total_meters: f64,
    pub gas_range_meters: f64,
    pub usage_m3: f64,
}

/// A meter row plus its per-row derived metrics. A metric is `None` when the
/// columns it needs were not present in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub record: MeterRecord,
    pub estimated_induction: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub usage_per_household: Option<f64>,
}

/// Year-end (December) snapshot for one calendar year of the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlySummary {
    pub year: i32,
    pub total_meters: f64,
    pub gas_range_meters: f64,
    pub estimated_induction: f64,
    pub conversion_rate: f64,
    /// Actual usage summed over every month of the year; `None` without a
    /// usage column.
    pub usage_m3: Option<f64>,
    pub loss_volume_m3: f64,
    pub loss_revenue: Option<f64>,
}

/// One month of the secondary sales dataset, volumes in thousand m³ keyed by
/// normalized category name.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub year: i32,
    pub month: u32,
    pub volumes_thousand_m3: Vec<(String, f64)>,
}

/// Sales totals for one year, in m³.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct YearlySales {
    pub year: i32,
    pub household_m3: f64,
    pub other_m3: f64,
    pub total_m3: f64,
}

/// A yearly summary joined with that year's sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossVsSales {
    pub summary: YearlySummary,
    pub household_sales_m3: f64,
    pub total_sales_m3: f64,
    pub household_loss_share: f64,
    pub total_loss_share: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub period: String,
    #[serde(rename = "TotalMeters")]
    #[tabled(rename = "TotalMeters")]
    pub total_meters: String,
    #[serde(rename = "GasRange")]
    #[tabled(rename = "GasRange")]
    pub gas_range_meters: String,
    #[serde(rename = "EstInduction")]
    #[tabled(rename = "EstInduction")]
    pub estimated_induction: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CorrelationRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub period: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
    #[serde(rename = "UsagePerHousehold")]
    #[tabled(rename = "UsagePerHousehold")]
    pub usage_per_household: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionRankRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "TotalMeters")]
    #[tabled(rename = "TotalMeters")]
    pub total_meters: String,
    #[serde(rename = "GasRange")]
    #[tabled(rename = "GasRange")]
    pub gas_range_meters: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TypeTrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub period: String,
    #[serde(rename = "UsageType")]
    #[tabled(rename = "UsageType")]
    pub usage_type: String,
    #[serde(rename = "TotalMeters")]
    #[tabled(rename = "TotalMeters")]
    pub total_meters: String,
    #[serde(rename = "GasRange")]
    #[tabled(rename = "GasRange")]
    pub gas_range_meters: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearlyLossRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "TotalMeters")]
    #[tabled(rename = "TotalMeters")]
    pub total_meters: String,
    #[serde(rename = "EstInduction")]
    #[tabled(rename = "EstInduction")]
    pub estimated_induction: String,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
    #[serde(rename = "UsageM3")]
    #[tabled(rename = "UsageM3")]
    pub usage_m3: String,
    #[serde(rename = "LossVolumeM3")]
    #[tabled(rename = "LossVolumeM3")]
    pub loss_volume_m3: String,
    #[serde(rename = "LossRevenue")]
    #[tabled(rename = "LossRevenue")]
    pub loss_revenue: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LossVsSalesRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "LossVolumeM3")]
    #[tabled(rename = "LossVolumeM3")]
    pub loss_volume_m3: String,
    #[serde(rename = "HouseholdSalesM3")]
    #[tabled(rename = "HouseholdSalesM3")]
    pub household_sales_m3: String,
    #[serde(rename = "TotalSalesM3")]
    #[tabled(rename = "TotalSalesM3")]
    pub total_sales_m3: String,
    #[serde(rename = "HouseholdLossShare")]
    #[tabled(rename = "HouseholdLossShare")]
    pub household_loss_share: String,
    #[serde(rename = "TotalLossShare")]
    #[tabled(rename = "TotalLossShare")]
    pub total_loss_share: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub rows_selected: usize,
    pub negative_estimates: usize,
    pub warnings: Vec<String>,
    pub latest_year: Option<i32>,
    pub latest_conversion_rate: Option<f64>,
    pub cumulative_loss_volume_m3: f64,
    pub cumulative_loss_revenue: Option<f64>,
}
