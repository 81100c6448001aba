//! Header normalization and the schema capability descriptor.
//!
//! Column presence is resolved once per load. Everything downstream asks the
//! [`Capabilities`] instead of probing headers row by row.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

/// The columns of the meter dataset this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Period,
    Region,
    UsageType,
    TotalMeters,
    GasRangeMeters,
    Usage,
}

impl Column {
    pub const REQUIRED: [Column; 3] = [Column::Period, Column::Region, Column::UsageType];
    pub const NUMERIC: [Column; 3] = [Column::TotalMeters, Column::GasRangeMeters, Column::Usage];

    /// Header as it appears in the city-gas export.
    pub fn label(&self) -> &'static str {
        match self {
            Column::Period => "년월",
            Column::Region => "시군구",
            Column::UsageType => "용도",
            Column::TotalMeters => "총 청구계량기수",
            Column::GasRangeMeters => "가스레인지 연결 전수",
            Column::Usage => "사용량(m3)",
        }
    }
}

// Normalized header spellings (whitespace removed, ASCII lowercased).
static ALIASES: Lazy<HashMap<&'static str, Column>> = Lazy::new(|| {
    HashMap::from([
        ("년월", Column::Period),
        ("기준년월", Column::Period),
        ("yearmonth", Column::Period),
        ("period", Column::Period),
        ("시군구", Column::Region),
        ("지역", Column::Region),
        ("region", Column::Region),
        ("용도", Column::UsageType),
        ("usagetype", Column::UsageType),
        ("type", Column::UsageType),
        ("총청구계량기수", Column::TotalMeters),
        ("totalmeters", Column::TotalMeters),
        ("가스레인지연결전수", Column::GasRangeMeters),
        ("gasrangemeters", Column::GasRangeMeters),
        ("사용량(m3)", Column::Usage),
        ("사용량(㎥)", Column::Usage),
        ("사용량", Column::Usage),
        ("usage(m3)", Column::Usage),
        ("usage", Column::Usage),
    ])
});

/// Strip every whitespace character (leading, trailing and embedded) and any
/// stray byte-order mark, then lowercase ASCII letters.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Which derived metrics the loaded columns can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Estimated induction count and conversion rate (total and gas-range counts).
    pub induction: bool,
    /// Per-connected-household usage (usage volume and gas-range count).
    pub usage_per_household: bool,
    /// Raw monthly usage volume.
    pub usage: bool,
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    index: HashMap<Column, usize>,
    headers: Vec<String>,
}

impl Schema {
    /// Resolve known columns. The first header matching a column wins.
    pub fn detect(headers: &[String]) -> Self {
        let mut index = HashMap::new();
        for (i, raw) in headers.iter().enumerate() {
            if let Some(col) = ALIASES.get(normalize_header(raw).as_str()) {
                index.entry(*col).or_insert(i);
            }
        }
        Self {
            index,
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    pub fn position(&self, col: Column) -> Option<usize> {
        self.index.get(&col).copied()
    }

    pub fn has(&self, col: Column) -> bool {
        self.index.contains_key(&col)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn missing_required(&self) -> Vec<Column> {
        Column::REQUIRED.into_iter().filter(|c| !self.has(*c)).collect()
    }

    /// Absent numeric columns are not fatal. Each one is logged and returned
    /// as a user-facing warning.
    pub fn numeric_warnings(&self) -> Vec<String> {
        Column::NUMERIC
            .into_iter()
            .filter(|c| !self.has(*c))
            .map(|c| {
                warn!(column = c.label(), "expected numeric column not found");
                format!(
                    "column '{}' not found; metrics that depend on it are omitted",
                    c.label()
                )
            })
            .collect()
    }

    pub fn capabilities(&self) -> Capabilities {
        let counts = self.has(Column::TotalMeters) && self.has(Column::GasRangeMeters);
        Capabilities {
            induction: counts,
            usage_per_household: self.has(Column::Usage) && self.has(Column::GasRangeMeters),
            usage: self.has(Column::Usage),
        }
    }

    /// Cell text for `col` in `row`, if the column exists and the row reaches it.
    pub fn cell<'a>(&self, row: &'a [String], col: Column) -> Option<&'a str> {
        self.position(col)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }
}
