use crate::pipeline::{Pipeline, PipelineReport};
use crate::source::SourcePath;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use table_lens_common::{Config, ErrorReport, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Audited { report: Box<PipelineReport> },
    Failed { error: ErrorReport },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl BatchEntry {
    pub fn report(&self) -> Option<&PipelineReport> {
        match &self.outcome {
            FileOutcome::Audited { report } => Some(report),
            FileOutcome::Failed { .. } => None,
        }
    }
}

/// Independent run per file; one failure never stops the others. Entries keep input order.
pub fn audit_many(paths: &[SourcePath], config: &Config) -> Result<Vec<BatchEntry>> {
    let pipeline = Pipeline::new(config.clone())?;
    let entries: Vec<BatchEntry> = paths
        .par_iter()
        .map(|sp| {
            let outcome = match pipeline.run_path(&sp.path) {
                Ok(report) => FileOutcome::Audited {
                    report: Box::new(report),
                },
                Err(e) => {
                    tracing::warn!(path = %sp.path.display(), error = %e, "file failed");
                    FileOutcome::Failed { error: ErrorReport::from(&e) }
                }
            };
            BatchEntry {
                path: sp.path.clone(),
                outcome,
            }
        })
        .collect();
    let failed = entries.iter().filter(|e| e.report().is_none()).count();
    tracing::info!(files = entries.len(), failed, "batch finished");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::resolve_paths;

    #[test]
    fn mixed_outcomes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x,y\n1,2\n3,4\n").unwrap();
        std::fs::write(dir.path().join("b.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("c.tsv"), "x\ty\n1\t2\n").unwrap();
        let paths = resolve_paths(dir.path().to_str().unwrap()).unwrap();
        let entries = audit_many(&paths, &Config::default()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].path.ends_with("a.csv"));
        assert!(entries[0].report().is_some());
        match &entries[1].outcome {
            FileOutcome::Failed { error } => assert_eq!(error.kind, "parse_error"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(entries[2].report().is_some());
    }

    #[test]
    fn invalid_config_fails_up_front() {
        let mut config = Config::default();
        config.audit.numeric_mismatch_ratio = 0.0;
        assert!(audit_many(&[], &config).is_err());
    }
}
