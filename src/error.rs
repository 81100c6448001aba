use thiserror::Error;

/// Failures at the load boundary. Any of these ends the session: nothing
/// downstream is computed from a dataset that failed to load.
///
/// Row- and cell-level problems are not represented here; they are absorbed
/// by the loaders and reported as warnings.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("input is neither valid UTF-8 nor CP949 text")]
    Encoding,
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("input has no header row")]
    Empty,
    #[error("missing required columns {missing:?} (found {found:?})")]
    MissingRequiredColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
