//! Load-and-clean of the meter dataset: column detection, period parsing,
//! numeric cleaning and per-row derivation, with a [`LoadReport`] of what
//! was dropped or looked suspicious.

use crate::derive::derive;
use crate::error::LoadError;
use crate::normalize::{Capabilities, Column, Schema};
use crate::period::YearMonth;
use crate::source::RawTable;
use crate::types::{DerivedRecord, MeterRecord};
use crate::util::clean_numeric;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows whose period did not parse (footer and subtotal rows).
    pub dropped_rows: usize,
    /// Rows reporting more gas ranges than billed meters.
    pub negative_estimates: usize,
    pub warnings: Vec<String>,
}

/// The cleaned meter dataset. Immutable once loaded; every view is derived
/// from it through a `Selection`.
#[derive(Debug, Clone)]
pub struct MeterDataset {
    pub records: Vec<DerivedRecord>,
    pub capabilities: Capabilities,
    pub report: LoadReport,
}

pub fn load_bytes(bytes: &[u8]) -> Result<MeterDataset, LoadError> {
    let table = RawTable::from_bytes(bytes, None)?;
    load_and_clean(&table)
}

/// Normalize columns, parse periods, clean numbers and derive per-row metrics.
///
/// Fails only when a required key column (period, region, usage type) is
/// missing. Absent numeric columns become warnings; bad cells become 0; rows
/// with an unparseable period are dropped.
pub fn load_and_clean(table: &RawTable) -> Result<MeterDataset, LoadError> {
    let schema = Schema::detect(&table.headers);
    let missing = schema.missing_required();
    if !missing.is_empty() {
        return Err(LoadError::MissingRequiredColumns {
            missing: missing.iter().map(|c| c.label().to_string()).collect(),
            found: schema.headers().to_vec(),
        });
    }
    let warnings = schema.numeric_warnings();
    let capabilities = schema.capabilities();

    let mut total_rows = 0usize;
    let mut dropped_rows = 0usize;
    let mut negative_estimates = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        total_rows += 1;
        let period = match schema.cell(row, Column::Period).and_then(YearMonth::parse) {
            Some(p) => p,
            None => {
                dropped_rows += 1;
                continue;
            }
        };

        let label = |col: Column| {
            let s = schema.cell(row, col).unwrap_or("").trim();
            if s.is_empty() {
                "Unknown".to_string()
            } else {
                s.to_string()
            }
        };
        let number = |col: Column| schema.cell(row, col).map(clean_numeric).unwrap_or(0.0);

        let record = MeterRecord {
            period,
            region: label(Column::Region),
            usage_type: label(Column::UsageType),
            total_meters: number(Column::TotalMeters),
            gas_range_meters: number(Column::GasRangeMeters),
            usage_m3: number(Column::Usage),
        };
        let derived = derive(record, &capabilities);
        if derived.estimated_induction.is_some_and(|v| v < 0.0) {
            negative_estimates += 1;
        }
        records.push(derived);
    }

    if negative_estimates > 0 {
        warn!(
            rows = negative_estimates,
            "gas-range count exceeds billed meters; estimates left negative"
        );
    }

    let report = LoadReport {
        total_rows,
        kept_rows: records.len(),
        dropped_rows,
        negative_estimates,
        warnings,
    };
    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        dropped = report.dropped_rows,
        "meter dataset loaded"
    );
    Ok(MeterDataset {
        records,
        capabilities,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
년월,시군구,용도,총 청구계량기수,가스레인지 연결 전수,사용량(m3)
201501,A구,단독,\"1,000\",950,\"4,750\"
201501.0,B구,공동,2000,1900,9500
Total,,,\"3,000\",\"2,850\",\"14,250\"
";

    #[test]
    fn drops_total_row_and_cleans_numbers() {
        let table = RawTable::from_csv_text(SAMPLE).unwrap();
        let ds = load_and_clean(&table).unwrap();
        assert_eq!(ds.report.total_rows, 3);
        assert_eq!(ds.report.kept_rows, 2);
        assert_eq!(ds.report.dropped_rows, 1);
        let first = &ds.records[0];
        assert_eq!(first.record.total_meters, 1000.0);
        assert_eq!(first.estimated_induction, Some(50.0));
        assert_eq!(first.usage_per_household, Some(5.0));
        assert_eq!(ds.records[1].record.period, YearMonth::new(2015, 1).unwrap());
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let table = RawTable::from_csv_text("년월,용도\n201501,단독\n").unwrap();
        let err = load_and_clean(&table).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingRequiredColumns { ref missing, .. } if missing == &["시군구"]
        ));
    }

    #[test]
    fn missing_numeric_column_warns_and_omits_metric() {
        let table = RawTable::from_csv_text(
            "년월,시군구,용도,총 청구계량기수,가스레인지 연결 전수\n201512,A구,단독,10,8\n",
        )
        .unwrap();
        let ds = load_and_clean(&table).unwrap();
        assert_eq!(ds.report.warnings.len(), 1);
        assert!(!ds.capabilities.usage_per_household);
        assert_eq!(ds.records[0].usage_per_household, None);
        assert_eq!(ds.records[0].estimated_induction, Some(2.0));
    }

    #[test]
    fn malformed_cells_become_zero_and_negatives_are_counted() {
        let table = RawTable::from_csv_text(
            "년월,시군구,용도,총 청구계량기수,가스레인지 연결 전수,사용량(m3)\n201501,A구,단독,-,5,abc\n",
        )
        .unwrap();
        let ds = load_and_clean(&table).unwrap();
        let r = &ds.records[0];
        assert_eq!(r.record.total_meters, 0.0);
        assert_eq!(r.record.usage_m3, 0.0);
        assert_eq!(r.estimated_induction, Some(-5.0));
        assert_eq!(r.conversion_rate, Some(0.0));
        assert_eq!(ds.report.negative_estimates, 1);
    }
}
