use crate::table::Table;
use serde::{Deserialize, Serialize};
use table_lens_common::ScoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Optimal,
    Stable,
    Unstructured,
    Critical,
}

impl Rating {
    pub fn for_score(score: f64, config: &ScoringConfig) -> Self {
        if score > config.optimal_above {
            Rating::Optimal
        } else if score > config.stable_above {
            Rating::Stable
        } else if score > config.unstructured_above {
            Rating::Unstructured
        } else {
            Rating::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Optimal => "Optimal",
            Rating::Stable => "Stable",
            Rating::Unstructured => "Unstructured",
            Rating::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    pub reason: String,
    pub score_delta: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: f64, // 0-100
    pub rating: Rating,
    /// Non-missing cells over all cells.
    pub density: f64,
    pub breakdown: Vec<ScoreAdjustment>,
}

impl QualityScore {
    pub fn total_delta(&self) -> f64 {
        self.breakdown.iter().map(|a| a.score_delta).sum()
    }
}

const BASELINE: f64 = 100.0;

pub fn score(table: &Table, config: &ScoringConfig) -> QualityScore {
    let total = table.total_cells();
    if total == 0 {
        return QualityScore {
            score: 0.0,
            rating: Rating::Critical,
            density: 0.0,
            breakdown: vec![ScoreAdjustment {
                reason: "empty_table".into(),
                score_delta: -BASELINE,
                explanation: format!(
                    "table has {} rows and {} columns; there is nothing to assess",
                    table.row_count(),
                    table.column_count()
                ),
            }],
        };
    }

    let mut breakdown = Vec::new();
    let missing = table.missing_count();
    let missing_ratio = missing as f64 / total as f64;
    if missing > 0 {
        // the heavy penalty replaces the base one
        let (delta, severity) = if missing_ratio > config.heavy_missing_ratio {
            (-config.heavy_missing_penalty, "heavy")
        } else {
            (-config.missing_penalty, "some")
        };
        breakdown.push(ScoreAdjustment {
            reason: "missing_values".into(),
            score_delta: delta,
            explanation: format!(
                "{severity} missing values: {missing} of {total} cells ({:.1}%) are empty",
                missing_ratio * 100.0
            ),
        });
    }

    let duplicates = table.duplicate_row_count();
    if duplicates > 0 {
        breakdown.push(ScoreAdjustment {
            reason: "duplicate_rows".into(),
            score_delta: -config.duplicate_penalty,
            explanation: format!("{duplicates} rows repeat an earlier row exactly"),
        });
    }

    if table.column_count() > config.shape_min_columns && table.row_count() > config.shape_min_rows {
        breakdown.push(ScoreAdjustment {
            reason: "structure".into(),
            score_delta: 0.0,
            explanation: format!(
                "{} rows across {} columns is enough shape for analysis",
                table.row_count(),
                table.column_count()
            ),
        });
    }

    let delta: f64 = breakdown.iter().map(|a| a.score_delta).sum();
    let score = (BASELINE + delta).clamp(0.0, 100.0);
    QualityScore {
        score,
        rating: Rating::for_score(score, config),
        density: 1.0 - missing_ratio,
        breakdown,
    }
}

#[cfg(test)]
mod tests_score {
    use super::*;
    use crate::table::Column;

    fn cfg() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn grid(rows: usize, missing: usize, dup: bool) -> Table {
        let mut a: Vec<Option<f64>> = (0..rows)
            .map(|i| if i < missing { None } else { Some(i as f64) })
            .collect();
        let mut b: Vec<Option<f64>> = (0..rows).map(|i| Some(i as f64 * 2.0)).collect();
        if dup {
            a[rows - 1] = a[rows - 2];
            b[rows - 1] = b[rows - 2];
        }
        Table::new(vec![Column::numeric("a", a), Column::numeric("b", b)]).unwrap()
    }

    #[test]
    fn clean_table_is_optimal() {
        let s = score(&grid(10, 0, false), &cfg());
        assert_eq!(s.score, 100.0);
        assert_eq!(s.rating, Rating::Optimal);
        assert_eq!(s.density, 1.0);
        assert_eq!(s.breakdown.len(), 1); // structure note only
        assert_eq!(s.breakdown[0].score_delta, 0.0);
    }

    #[test]
    fn light_missing_costs_fifteen() {
        // 1 of 40 cells = 2.5%
        let s = score(&grid(20, 1, false), &cfg());
        assert_eq!(s.score, 85.0);
        assert_eq!(s.rating, Rating::Stable);
    }

    #[test]
    fn heavy_missing_costs_twenty_five() {
        // 5 of 20 cells = 25%
        let s = score(&grid(10, 5, false), &cfg());
        assert_eq!(s.score, 75.0);
        assert_eq!(s.breakdown.iter().filter(|a| a.reason == "missing_values").count(), 1);
    }

    #[test]
    fn exactly_ten_percent_is_light() {
        // 2 of 20 cells
        let s = score(&grid(10, 2, false), &cfg());
        assert_eq!(s.score, 85.0);
    }

    #[test]
    fn duplicates_and_missing_stack() {
        let s = score(&grid(10, 5, true), &cfg());
        assert_eq!(s.score, 65.0);
        assert_eq!(s.rating, Rating::Unstructured);
    }

    #[test]
    fn empty_table_is_critical() {
        let s = score(&Table::default(), &cfg());
        assert_eq!(s.score, 0.0);
        assert_eq!(s.rating, Rating::Critical);
        assert_eq!(s.breakdown.len(), 1);
        assert_eq!((100.0 + s.total_delta()).clamp(0.0, 100.0), s.score);
    }

    #[test]
    fn small_table_gets_no_structure_note() {
        let s = score(&grid(3, 0, false), &cfg());
        assert!(s.breakdown.is_empty());
        assert_eq!(s.score, 100.0);
    }

    #[test]
    fn rating_boundaries() {
        let c = cfg();
        assert_eq!(Rating::for_score(90.0, &c), Rating::Stable);
        assert_eq!(Rating::for_score(90.5, &c), Rating::Optimal);
        assert_eq!(Rating::for_score(70.0, &c), Rating::Unstructured);
        assert_eq!(Rating::for_score(50.0, &c), Rating::Critical);
    }
}
