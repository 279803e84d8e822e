use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::TableLensError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Cell values treated as absent in every input format.
    #[serde(default = "default_missing_tokens")]
    pub missing_tokens: Vec<String>,
}

fn default_missing_tokens() -> Vec<String> {
    ["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            missing_tokens: default_missing_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_mismatch_ratio")]
    pub numeric_mismatch_ratio: f64,
}

fn default_mismatch_ratio() -> f64 {
    0.8
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            numeric_mismatch_ratio: default_mismatch_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_missing_penalty")]
    pub missing_penalty: f64,
    #[serde(default = "default_heavy_missing_penalty")]
    pub heavy_missing_penalty: f64,
    #[serde(default = "default_heavy_missing_ratio")]
    pub heavy_missing_ratio: f64, // fraction of all cells
    #[serde(default = "default_duplicate_penalty")]
    pub duplicate_penalty: f64,
    #[serde(default = "default_bonus_min_rows")]
    pub shape_min_rows: usize,
    #[serde(default = "default_bonus_min_columns")]
    pub shape_min_columns: usize,
    #[serde(default = "default_optimal_above")]
    pub optimal_above: f64,
    #[serde(default = "default_stable_above")]
    pub stable_above: f64,
    #[serde(default = "default_unstructured_above")]
    pub unstructured_above: f64,
}

fn default_missing_penalty() -> f64 {
    15.0
}
fn default_heavy_missing_penalty() -> f64 {
    25.0
}
fn default_heavy_missing_ratio() -> f64 {
    0.10
}
fn default_duplicate_penalty() -> f64 {
    10.0
}
fn default_bonus_min_rows() -> usize {
    5
}
fn default_bonus_min_columns() -> usize {
    1
}
fn default_optimal_above() -> f64 {
    90.0
}
fn default_stable_above() -> f64 {
    70.0
}
fn default_unstructured_above() -> f64 {
    50.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            missing_penalty: default_missing_penalty(),
            heavy_missing_penalty: default_heavy_missing_penalty(),
            heavy_missing_ratio: default_heavy_missing_ratio(),
            duplicate_penalty: default_duplicate_penalty(),
            shape_min_rows: default_bonus_min_rows(),
            shape_min_columns: default_bonus_min_columns(),
            optimal_above: default_optimal_above(),
            stable_above: default_stable_above(),
            unstructured_above: default_unstructured_above(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilingConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_skew_threshold")]
    pub skew_threshold: f64,
    #[serde(default = "default_consistency_ratio")]
    pub consistency_ratio: f64,
    #[serde(default = "default_identifier_ratio")]
    pub identifier_ratio: f64,
    #[serde(default = "default_grouped_below")]
    pub grouped_below: usize,
    #[serde(default = "default_low_impact_pct")]
    pub low_impact_below_pct: f64,
    #[serde(default = "default_moderate_impact_pct")]
    pub moderate_impact_below_pct: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_top_k() -> usize {
    5
}
fn default_skew_threshold() -> f64 {
    1.0
}
fn default_consistency_ratio() -> f64 {
    0.05
}
fn default_identifier_ratio() -> f64 {
    0.8
}
fn default_grouped_below() -> usize {
    5
}
fn default_low_impact_pct() -> f64 {
    2.0
}
fn default_moderate_impact_pct() -> f64 {
    10.0
}
fn default_parallel() -> bool {
    true
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            skew_threshold: default_skew_threshold(),
            consistency_ratio: default_consistency_ratio(),
            identifier_ratio: default_identifier_ratio(),
            grouped_below: default_grouped_below(),
            low_impact_below_pct: default_low_impact_pct(),
            moderate_impact_below_pct: default_moderate_impact_pct(),
            parallel: default_parallel(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    #[serde(default = "default_significance")]
    pub significance: f64,
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
}

fn default_significance() -> f64 {
    0.6
}
fn default_max_findings() -> usize {
    3
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            significance: default_significance(),
            max_findings: default_max_findings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuitabilityConfig {
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default = "default_modeling_min_score")]
    pub modeling_min_score: f64,
}

fn default_min_rows() -> usize {
    50
}
fn default_modeling_min_score() -> f64 {
    70.0
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            min_rows: default_min_rows(),
            modeling_min_score: default_modeling_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows_preview: usize,
}

fn default_max_rows() -> usize {
    100
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_rows_preview: default_max_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Where derived CSV files land; next to the source file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
    #[serde(default)]
    pub relationships: RelationshipConfig,
    #[serde(default)]
    pub suitability: SuitabilityConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("table-lens")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("TABLE_LENS_CONFIG") {
            PathBuf::from(env_path) // $TABLE_LENS_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| TableLensError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self) -> crate::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| TableLensError::Config(e.to_string()))
    }

    pub fn validate(&self) -> crate::Result<()> {
        let sig = self.relationships.significance;
        if !(0.6..=0.65).contains(&sig) {
            return Err(TableLensError::Config(format!(
                "relationships.significance must be within [0.6, 0.65], got {sig}"
            )));
        }
        let ratios = [
            ("audit.numeric_mismatch_ratio", self.audit.numeric_mismatch_ratio),
            ("scoring.heavy_missing_ratio", self.scoring.heavy_missing_ratio),
            ("profiling.identifier_ratio", self.profiling.identifier_ratio),
        ];
        for (name, v) in ratios {
            if !(v > 0.0 && v <= 1.0) {
                return Err(TableLensError::Config(format!("{name} must be in (0, 1], got {v}")));
            }
        }
        let s = &self.scoring;
        if !(s.optimal_above > s.stable_above && s.stable_above > s.unstructured_above) {
            return Err(TableLensError::Config(
                "rating tiers must be strictly descending (optimal > stable > unstructured)".into(),
            ));
        }
        if self.profiling.top_k == 0 {
            return Err(TableLensError::Config("profiling.top_k must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = Config::from_toml("[relationships]\nsignificance = 0.65\n").unwrap();
        assert_eq!(cfg.relationships.significance, 0.65);
        assert_eq!(cfg.relationships.max_findings, 3);
        assert_eq!(cfg.scoring.missing_penalty, 15.0);
        assert_eq!(cfg.loader.missing_tokens.len(), 8);
    }

    #[test]
    fn rejects_significance_out_of_band() {
        let err = Config::from_toml("[relationships]\nsignificance = 0.9\n").unwrap_err();
        assert_eq!(err.kind(), "invalid_config");
    }

    #[test]
    fn rejects_unordered_tiers() {
        let mut cfg = Config::default();
        cfg.scoring.stable_above = 95.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let text = Config::default().to_toml().unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.profiling.top_k, 5);
        assert_eq!(back.suitability.min_rows, 50);
    }

    #[test]
    fn load_honours_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[suitability]\nmin_rows = 10\n").unwrap();
        std::env::set_var("TABLE_LENS_CONFIG", &path);
        let cfg = Config::load().unwrap();
        std::env::remove_var("TABLE_LENS_CONFIG");
        assert_eq!(cfg.suitability.min_rows, 10);
    }
}
