use crate::profile::{ColumnProfile, InferredKind};
use crate::quality::QualityScore;
use crate::relationships::Relationships;
use serde::{Deserialize, Serialize};
use table_lens_common::SuitabilityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    GroupingFrequency,
    CorrelationAnalysis,
    HistoricalReporting,
    AutomatedModeling,
}

impl Capability {
    pub fn label(&self) -> &'static str {
        match self {
            Capability::GroupingFrequency => "grouping and frequency analysis",
            Capability::CorrelationAnalysis => "correlation analysis",
            Capability::HistoricalReporting => "historical reporting",
            Capability::AutomatedModeling => "automated modeling",
        }
    }
}

pub const CAUSATION_CAVEAT: &str = "correlation findings describe co-movement only and never imply causation";
pub const FORECAST_CAVEAT: &str = "this audit makes no predictive or forecasting claim about the data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityVerdict {
    pub good_for: Vec<Capability>,
    pub not_good_for: Vec<Capability>,
    /// One line per entry in `not_good_for`, same order.
    pub reasons: Vec<String>,
    pub caveats: Vec<String>,
}

pub fn assess(
    profiles: &[ColumnProfile],
    row_count: usize,
    quality: &QualityScore,
    relationships: &Relationships,
    config: &SuitabilityConfig,
) -> SuitabilityVerdict {
    let mut good_for = Vec::new();
    let mut not_good_for = Vec::new();
    let mut reasons = Vec::new();

    // datetime columns carry categorical stats but are not grouping keys
    let categorical = profiles
        .iter()
        .filter(|p| p.inferred_kind == InferredKind::Categorical)
        .count();
    let numeric = profiles.iter().filter(|p| p.numeric_stats().is_some()).count();

    if categorical > 0 {
        good_for.push(Capability::GroupingFrequency);
    }
    if numeric >= 2 {
        good_for.push(Capability::CorrelationAnalysis);
    } else {
        not_good_for.push(Capability::CorrelationAnalysis);
        reasons.push(format!("only {numeric} numeric columns; correlation needs at least 2"));
    }
    if row_count > config.min_rows {
        good_for.push(Capability::HistoricalReporting);
    } else {
        not_good_for.push(Capability::HistoricalReporting);
        reasons.push(format!(
            "{row_count} rows is too few for robust analysis (more than {} needed)",
            config.min_rows
        ));
    }
    if quality.score < config.modeling_min_score {
        not_good_for.push(Capability::AutomatedModeling);
        reasons.push(format!(
            "quality score {:.0} is below {:.0}",
            quality.score, config.modeling_min_score
        ));
    }

    let mut caveats = vec![CAUSATION_CAVEAT.to_owned(), FORECAST_CAVEAT.to_owned()];
    if relationships.findings.is_empty() && !relationships.matrix.is_empty() {
        caveats.push("no strong pairwise relationships were found among numeric columns".into());
    }
    SuitabilityVerdict {
        good_for,
        not_good_for,
        reasons,
        caveats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::profile;
    use crate::quality::score;
    use crate::relationships::discover;
    use crate::table::{Column, Table};
    use table_lens_common::ScoringConfig;

    fn verdict(table: &Table) -> SuitabilityVerdict {
        assess(
            &profile(table),
            table.row_count(),
            &score(table, &ScoringConfig::default()),
            &discover(table),
            &SuitabilityConfig::default(),
        )
    }

    #[test]
    fn small_mixed_table() {
        let t = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::text("g", vec![Some("a"), Some("b"), Some("a")]),
        ])
        .unwrap();
        let v = verdict(&t);
        assert_eq!(v.good_for, vec![Capability::GroupingFrequency]);
        assert_eq!(v.not_good_for, vec![Capability::CorrelationAnalysis, Capability::HistoricalReporting]);
        assert_eq!(v.reasons.len(), v.not_good_for.len());
    }

    #[test]
    fn dates_alone_do_not_support_grouping() {
        let t = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::text("when", vec![Some("2024-01-01"), Some("2024-01-15"), Some("2024-01-28")]),
        ])
        .unwrap();
        let v = verdict(&t);
        assert!(!v.good_for.contains(&Capability::GroupingFrequency));
    }

    #[test]
    fn large_numeric_table() {
        let xs: Vec<Option<f64>> = (0..60).map(|i| Some(i as f64)).collect();
        let ys: Vec<Option<f64>> = (0..60).map(|i| Some((i * i) as f64)).collect();
        let t = Table::new(vec![Column::numeric("x", xs), Column::numeric("y", ys)]).unwrap();
        let v = verdict(&t);
        assert!(v.good_for.contains(&Capability::CorrelationAnalysis));
        assert!(v.good_for.contains(&Capability::HistoricalReporting));
        assert!(v.not_good_for.is_empty());
    }

    #[test]
    fn low_quality_flags_modeling() {
        let t = Table::new(vec![Column::numeric("x", vec![Some(1.0), None, None, Some(1.0)])]).unwrap();
        let v = verdict(&t);
        assert!(v.not_good_for.contains(&Capability::AutomatedModeling));
    }

    #[test]
    fn caveats_always_present() {
        let v = verdict(&Table::default());
        assert!(v.caveats.iter().any(|c| c == CAUSATION_CAVEAT));
        assert!(v.caveats.iter().any(|c| c == FORECAST_CAVEAT));
    }
}
