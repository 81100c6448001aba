use crate::error::ConfigError;
use crate::loss::LossParams;
use crate::sales::SalesCategories;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "GAS_INDUCTION_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "gas-induction.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub avg_monthly_usage: f64,
    pub unit_price: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let p = LossParams::default();
        Self {
            avg_monthly_usage: p.avg_monthly_usage,
            unit_price: p.unit_price,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SalesConfig {
    pub sheet: String,
    pub household_categories: Vec<String>,
    pub other_categories: Vec<String>,
}

impl Default for SalesConfig {
    fn default() -> Self {
        let cats = SalesCategories::default();
        Self {
            sheet: "용도별판매량".to_string(),
            household_categories: cats.household,
            other_categories: cats.other,
        }
    }
}

impl SalesConfig {
    pub fn categories(&self) -> SalesCategories {
        SalesCategories {
            household: self.household_categories.clone(),
            other: self.other_categories.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
            preview_rows: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub sales: SalesConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Resolve configuration: an explicit path, else `GAS_INDUCTION_CONFIG`,
    /// else `gas-induction.toml` when present, else built-in defaults.
    /// Explicitly named files must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        use std::env;

        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Self::from_file(fallback);
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn loss_params(&self) -> LossParams {
        LossParams {
            avg_monthly_usage: self.analysis.avg_monthly_usage,
            unit_price: self.analysis.unit_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.loss_params(), LossParams::default());
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let cfg = AppConfig::from_toml(
            r#"
[analysis]
avg_monthly_usage = 8.5

[sales]
sheet = "Sheet1"
other_categories = ["산업용"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.avg_monthly_usage, 8.5);
        assert_eq!(cfg.analysis.unit_price, Some(950.0));
        assert_eq!(cfg.sales.sheet, "Sheet1");
        assert_eq!(cfg.sales.categories().other, vec!["산업용"]);
        assert_eq!(cfg.sales.household_categories.len(), 3);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            AppConfig::from_toml("[analysis]\navg_monthly_usage = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/gas.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
