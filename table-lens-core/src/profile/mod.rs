pub mod frequency;
pub mod numeric;
pub mod temporal;

pub use frequency::{FrequencyCounter, FrequencyEntry, FrequencyResult};
pub use numeric::{NumericAccumulator, NumericInsight, NumericStats};
pub use temporal::{parse_datetime, TemporalAccumulator, TemporalRange};

use crate::table::{Cell, Column, ColumnKind, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use table_lens_common::ProfilingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredKind {
    Numeric,
    Datetime,
    Categorical,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImpact {
    Low,
    Moderate,
    High,
}

impl MissingImpact {
    pub fn for_percentage(pct: f64, config: &ProfilingConfig) -> Self {
        if pct < config.low_impact_below_pct {
            MissingImpact::Low
        } else if pct < config.moderate_impact_below_pct {
            MissingImpact::Moderate
        } else {
            MissingImpact::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diversity {
    IdentifierLike,
    ZeroVariance,
    HighlyGrouped,
    BalancedGroups,
}

impl Diversity {
    /// Guards are evaluated top to bottom; the first match wins.
    pub fn classify(unique: usize, rows: usize, config: &ProfilingConfig) -> Self {
        if unique as f64 > config.identifier_ratio * rows as f64 {
            Diversity::IdentifierLike
        } else if unique == 1 {
            Diversity::ZeroVariance
        } else if unique < config.grouped_below {
            Diversity::HighlyGrouped
        } else {
            Diversity::BalancedGroups
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Diversity::IdentifierLike => "near-unique / identifier-like",
            Diversity::ZeroVariance => "zero variance",
            Diversity::HighlyGrouped => "highly grouped",
            Diversity::BalancedGroups => "balanced groups",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub unique_count: usize,
    pub top_values: Vec<FrequencyEntry>,
    pub diversity: Diversity,
    pub temporal: Option<TemporalRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_kind: InferredKind,
    pub declared_kind: ColumnKind,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub missing_impact: MissingImpact,
    pub stats: ColumnStats,
}

impl ColumnProfile {
    pub fn numeric_stats(&self) -> Option<&NumericStats> {
        match &self.stats {
            ColumnStats::Numeric(s) => Some(s),
            _ => None,
        }
    }

    pub fn categorical_stats(&self) -> Option<&CategoricalStats> {
        match &self.stats {
            ColumnStats::Categorical(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.stats, ColumnStats::Skipped { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Profiler {
    config: ProfilingConfig,
}

impl Profiler {
    pub fn new(config: ProfilingConfig) -> Self {
        Self { config }
    }

    /// One profile per column, in table column order.
    pub fn profile(&self, table: &Table) -> Vec<ColumnProfile> {
        let rows = table.row_count();
        let profiles: Vec<ColumnProfile> = if self.config.parallel {
            table
                .columns()
                .par_iter()
                .map(|c| profile_column(c, rows, &self.config))
                .collect()
        } else {
            table
                .columns()
                .iter()
                .map(|c| profile_column(c, rows, &self.config))
                .collect()
        };
        tracing::debug!(columns = profiles.len(), "profiled columns");
        profiles
    }
}

pub fn profile(table: &Table) -> Vec<ColumnProfile> {
    Profiler::default().profile(table)
}

pub fn profile_column(column: &Column, rows: usize, config: &ProfilingConfig) -> ColumnProfile {
    let missing_count = column.missing_count();
    let missing_percentage = if rows > 0 {
        missing_count as f64 / rows as f64 * 100.0
    } else {
        0.0
    };
    let (inferred_kind, stats) = if column.valid_count() == 0 {
        (
            InferredKind::Absent,
            ColumnStats::Skipped {
                reason: format!("column '{}' has no valid cells", column.name),
            },
        )
    } else if column.kind == ColumnKind::Numeric {
        numeric_stats(column, config)
    } else {
        categorical_stats(column, rows, config)
    };
    ColumnProfile {
        name: column.name.clone(),
        inferred_kind,
        declared_kind: column.kind,
        missing_count,
        missing_percentage,
        missing_impact: MissingImpact::for_percentage(missing_percentage, config),
        stats,
    }
}

fn numeric_stats(column: &Column, config: &ProfilingConfig) -> (InferredKind, ColumnStats) {
    let mut acc = NumericAccumulator::new();
    column.numbers().for_each(|v| acc.add(v));
    match acc.finish(config) {
        Some(s) => (InferredKind::Numeric, ColumnStats::Numeric(s)),
        None => (
            InferredKind::Absent,
            ColumnStats::Skipped {
                reason: format!("column '{}' has no numeric values", column.name),
            },
        ),
    }
}

fn categorical_stats(column: &Column, rows: usize, config: &ProfilingConfig) -> (InferredKind, ColumnStats) {
    let mut counter = FrequencyCounter::new();
    let mut temporal = Some(TemporalAccumulator::new());
    for cell in &column.cells {
        if let Cell::Absent = cell {
            continue;
        }
        let rendered = cell.render();
        // a single unparseable value rules the column out as datetime
        if let Some(acc) = temporal.as_mut() {
            match parse_datetime(&rendered) {
                Some(ts) => acc.add(ts),
                None => temporal = None,
            }
        }
        counter.add(&rendered);
    }
    let temporal = temporal.and_then(TemporalAccumulator::finish);
    let kind = if temporal.is_some() {
        InferredKind::Datetime
    } else {
        InferredKind::Categorical
    };
    let unique_count = counter.unique_count();
    let freq = counter.top_n(config.top_k);
    let stats = CategoricalStats {
        unique_count,
        top_values: freq.top_values,
        diversity: Diversity::classify(unique_count, rows, config),
        temporal,
    };
    (kind, ColumnStats::Categorical(stats))
}
