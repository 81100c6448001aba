//! Sales dataset loading and reconciliation against the yearly summaries.
//!
//! Source volumes are in thousand m³ and are scaled exactly once, when a
//! month is split into household and other totals.

use crate::error::LoadError;
use crate::normalize::normalize_header;
use crate::source::RawTable;
use crate::types::{LossVsSales, SalesRecord, YearlySales, YearlySummary};
use crate::util::{clean_numeric, parse_i32_safe, ratio_or_zero};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const M3_PER_THOUSAND_M3: f64 = 1000.0;

const YEAR_HEADERS: [&str; 5] = ["연", "년", "연도", "년도", "year"];
const MONTH_HEADERS: [&str; 2] = ["월", "month"];

pub fn thousand_to_m3(thousand_m3: f64) -> f64 {
    thousand_m3 * M3_PER_THOUSAND_M3
}

/// Which usage categories count as household sales and which as the rest.
/// Names are matched after header normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesCategories {
    pub household: Vec<String>,
    pub other: Vec<String>,
}

impl Default for SalesCategories {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }
        Self {
            household: owned(&["취사용", "개별난방", "중앙난방"]),
            other: owned(&[
                "일반용",
                "업무난방",
                "냉난방공조",
                "산업용",
                "열병합",
                "연료전지",
                "열전용설비",
                "수송용",
            ]),
        }
    }
}

impl SalesCategories {
    fn all(&self) -> impl Iterator<Item = &String> {
        self.household.iter().chain(self.other.iter())
    }
}

fn sum_categories(record: &SalesRecord, names: &[String]) -> f64 {
    names
        .iter()
        .map(|name| {
            let key = normalize_header(name);
            record
                .volumes_thousand_m3
                .iter()
                .find(|(cat, _)| *cat == key)
                .map_or(0.0, |(_, v)| *v)
        })
        .sum()
}

impl SalesRecord {
    pub fn household_m3(&self, cats: &SalesCategories) -> f64 {
        thousand_to_m3(sum_categories(self, &cats.household))
    }

    pub fn other_m3(&self, cats: &SalesCategories) -> f64 {
        thousand_to_m3(sum_categories(self, &cats.other))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SalesLoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Configured categories absent from the sheet; they contribute 0.
    pub missing_categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SalesDataset {
    pub records: Vec<SalesRecord>,
    pub report: SalesLoadReport,
}

pub fn load_sales_bytes(
    bytes: &[u8],
    sheet: &str,
    cats: &SalesCategories,
) -> Result<SalesDataset, LoadError> {
    let table = RawTable::from_bytes(bytes, Some(sheet))?;
    load_sales_table(&table, cats)
}

pub fn load_sales_table(
    table: &RawTable,
    cats: &SalesCategories,
) -> Result<SalesDataset, LoadError> {
    let normalized: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    let find = |names: &[&str]| normalized.iter().position(|h| names.contains(&h.as_str()));

    let (year_idx, month_idx) = match (find(&YEAR_HEADERS[..]), find(&MONTH_HEADERS[..])) {
        (Some(y), Some(m)) => (y, m),
        (y, m) => {
            let mut missing = Vec::new();
            if y.is_none() {
                missing.push("연".to_string());
            }
            if m.is_none() {
                missing.push("월".to_string());
            }
            return Err(LoadError::MissingRequiredColumns {
                missing,
                found: table.headers.iter().map(|h| h.trim().to_string()).collect(),
            });
        }
    };

    let missing_categories: Vec<String> = cats
        .all()
        .filter(|name| !normalized.contains(&normalize_header(name)))
        .cloned()
        .collect();
    for name in &missing_categories {
        warn!(category = %name, "sales category not found; counted as 0");
    }

    let mut records = Vec::new();
    for row in &table.rows {
        let cell = |i: usize| row.get(i).map(String::as_str);
        let year = parse_i32_safe(cell(year_idx));
        let month = parse_i32_safe(cell(month_idx)).filter(|m| (1..=12).contains(m));
        let (Some(year), Some(month)) = (year, month) else {
            continue;
        };
        let volumes_thousand_m3 = normalized
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != year_idx && *i != month_idx && !h.is_empty())
            .map(|(i, h)| (h.clone(), cell(i).map_or(0.0, clean_numeric)))
            .collect();
        records.push(SalesRecord {
            year,
            month: month as u32,
            volumes_thousand_m3,
        });
    }

    let report = SalesLoadReport {
        total_rows: table.rows.len(),
        kept_rows: records.len(),
        missing_categories,
    };
    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        "sales dataset loaded"
    );
    Ok(SalesDataset { records, report })
}

/// Household, other and grand totals per year, in m³.
pub fn yearly_sales(records: &[SalesRecord], cats: &SalesCategories) -> BTreeMap<i32, YearlySales> {
    let mut out: BTreeMap<i32, YearlySales> = BTreeMap::new();
    for r in records {
        let household = r.household_m3(cats);
        let other = r.other_m3(cats);
        let e = out.entry(r.year).or_insert_with(|| YearlySales {
            year: r.year,
            ..YearlySales::default()
        });
        e.household_m3 += household;
        e.other_m3 += other;
        e.total_m3 += household + other;
    }
    out
}

/// Share of potential sales lost to conversion, in percent:
/// `loss / (sales + loss) * 100`, 0 when both are 0.
pub fn loss_share(loss_m3: f64, sales_m3: f64) -> f64 {
    ratio_or_zero(loss_m3, sales_m3 + loss_m3) * 100.0
}

/// Left join of yearly summaries with sales. Every summary year survives;
/// years without sales get 0 sales.
pub fn reconcile(
    summaries: &[YearlySummary],
    sales: &BTreeMap<i32, YearlySales>,
) -> Vec<LossVsSales> {
    summaries
        .iter()
        .map(|s| {
            let ys = sales.get(&s.year).copied().unwrap_or_default();
            LossVsSales {
                summary: s.clone(),
                household_sales_m3: ys.household_m3,
                total_sales_m3: ys.total_m3,
                household_loss_share: loss_share(s.loss_volume_m3, ys.household_m3),
                total_loss_share: loss_share(s.loss_volume_m3, ys.total_m3),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
연,월,취사용,개별난방,중앙난방,일반용,산업용
2015,1,\"1,234\",100,0,10,5
2015,2,1000,0,0,0,0
2016,1,10,0,0,0,0
합계,,\"2,244\",100,0,10,5
";

    fn summary(year: i32, loss: f64) -> YearlySummary {
        YearlySummary {
            year,
            total_meters: 0.0,
            gas_range_meters: 0.0,
            estimated_induction: 0.0,
            conversion_rate: 0.0,
            usage_m3: None,
            loss_volume_m3: loss,
            loss_revenue: None,
        }
    }

    #[test]
    fn converts_thousands_once() {
        assert_eq!(thousand_to_m3(1234.0), 1_234_000.0);
        let table = RawTable::from_csv_text("연,월,취사용\n2015,1,\"1,234\"\n").unwrap();
        let ds = load_sales_table(&table, &SalesCategories::default()).unwrap();
        let yearly = yearly_sales(&ds.records, &SalesCategories::default());
        assert_eq!(yearly[&2015].household_m3, 1_234_000.0);
        assert_eq!(yearly[&2015].total_m3, 1_234_000.0);
    }

    #[test]
    fn sums_categories_per_year_and_skips_footer() {
        let table = RawTable::from_csv_text(SHEET).unwrap();
        let cats = SalesCategories::default();
        let ds = load_sales_table(&table, &cats).unwrap();
        assert_eq!(ds.report.total_rows, 4);
        assert_eq!(ds.report.kept_rows, 3);
        assert!(ds.report.missing_categories.contains(&"수송용".to_string()));

        let yearly = yearly_sales(&ds.records, &cats);
        let y = yearly[&2015];
        assert_eq!(y.household_m3, 2_334_000.0);
        assert_eq!(y.other_m3, 15_000.0);
        assert_eq!(y.total_m3, 2_349_000.0);
        assert_eq!(yearly[&2016].household_m3, 10_000.0);
    }

    #[test]
    fn left_join_keeps_years_without_sales() {
        let mut sales = BTreeMap::new();
        sales.insert(
            2015,
            YearlySales {
                year: 2015,
                household_m3: 28_000.0,
                other_m3: 0.0,
                total_m3: 72_000.0 * 3.0 - 72_000.0,
            },
        );
        let merged = reconcile(&[summary(2015, 72_000.0), summary(2016, 72_000.0)], &sales);
        assert_eq!(merged.len(), 2);
        assert!((merged[0].household_loss_share - 72.0).abs() < 1e-9);
        assert!((merged[0].total_loss_share - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(merged[1].summary.year, 2016);
        assert_eq!(merged[1].total_sales_m3, 0.0);
        assert_eq!(merged[1].household_loss_share, 100.0);
    }

    #[test]
    fn loss_share_handles_empty_base() {
        assert_eq!(loss_share(0.0, 0.0), 0.0);
    }

    #[test]
    fn missing_year_column_is_fatal() {
        let table = RawTable::from_csv_text("월,취사용\n1,5\n").unwrap();
        let err = load_sales_table(&table, &SalesCategories::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingRequiredColumns { .. }));
    }
}
