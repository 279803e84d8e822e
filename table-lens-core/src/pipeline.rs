use crate::audit::{AuditReport, Auditor};
use crate::loader::{Loader, SourceInfo};
use crate::profile::{ColumnProfile, Profiler};
use crate::quality::{score, QualityScore};
use crate::relationships::{Discoverer, Relationships};
use crate::source::read_source;
use crate::suitability::{assess, SuitabilityVerdict};
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::path::Path;
use table_lens_common::{Config, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    pub row_index: usize,
    pub cells: Vec<Cell>,
}

/// Leading rows plus rows with at least one missing cell, from the audited table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub anomalies: Vec<AnomalyRow>,
}

impl Preview {
    pub fn of(table: &Table, limit: usize) -> Self {
        let owned = |idx: usize| table.row(idx).into_iter().cloned().collect::<Vec<Cell>>();
        let rows = (0..table.row_count().min(limit)).map(owned).collect();
        let anomalies = (0..table.row_count())
            .filter(|&r| table.row_has_missing(r))
            .take(limit)
            .map(|r| AnomalyRow {
                row_index: r,
                cells: owned(r),
            })
            .collect();
        Self {
            columns: table.column_names(),
            rows,
            anomalies,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub source: SourceInfo,
    pub audit: AuditReport,
    pub quality: QualityScore,
    pub profiles: Vec<ColumnProfile>,
    pub relationships: Relationships,
    pub suitability: SuitabilityVerdict,
    pub preview: Preview,
}

impl PipelineReport {
    pub fn table(&self) -> &Table {
        &self.audit.table
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, bytes: &[u8], extension: &str) -> Result<PipelineReport> {
        let (table, source) = Loader::new(self.config.loader.clone()).load_with_info(bytes, extension)?;
        Ok(self.analyze(&table, source))
    }

    pub fn run_path(&self, path: &Path) -> Result<PipelineReport> {
        let src = read_source(path)?;
        self.run(&src.bytes, &src.extension)
    }

    /// Every stage after loading; none of them can fail.
    pub fn analyze(&self, table: &Table, source: SourceInfo) -> PipelineReport {
        let audit = Auditor::new(self.config.audit.clone()).audit(table);
        let audited = &audit.table;
        let quality = score(audited, &self.config.scoring);
        let profiles = Profiler::new(self.config.profiling.clone()).profile(audited);
        let relationships = Discoverer::new(self.config.relationships.clone()).discover(audited);
        let suitability = assess(
            &profiles,
            audited.row_count(),
            &quality,
            &relationships,
            &self.config.suitability,
        );
        let preview = Preview::of(audited, self.config.display.max_rows_preview);
        tracing::info!(
            format = source.format.family(),
            rows = audited.row_count(),
            columns = audited.column_count(),
            score = quality.score,
            rating = %quality.rating,
            "audit complete"
        );
        PipelineReport {
            source,
            audit,
            quality,
            profiles,
            relationships,
            suitability,
            preview,
        }
    }
}
