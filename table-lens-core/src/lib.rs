pub mod audit;
pub mod batch;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod prepare;
pub mod profile;
pub mod quality;
pub mod relationships;
pub mod source;
pub mod suitability;
pub mod table;

pub use audit::{audit, replay, AuditAction, AuditReport, AuditStep, Auditor, KindMismatch, StepSubject, TableStats};
pub use batch::{audit_many, BatchEntry, FileOutcome};
pub use export::{export_json, narrative_context, print_summary, to_canonical_csv, write_canonical_csv};
pub use loader::{load, Loader, SourceFormat, SourceInfo};
pub use pipeline::{Pipeline, PipelineReport, Preview};
pub use prepare::{apply, suggest, FillRequest, FillStrategy, PreparationPlan, PreparationRequest, PreparedTable};
pub use profile::{profile, ColumnProfile, ColumnStats, InferredKind, Profiler};
pub use quality::{score, QualityScore, Rating};
pub use relationships::{discover, CorrelationFinding, Relation, Relationships};
pub use source::{read_source, resolve_paths, SourceFile, SourcePath};
pub use suitability::{assess, Capability, SuitabilityVerdict};
pub use table::{Cell, Column, ColumnKind, Table};
pub use table_lens_common::{Config, TableLensError, Result};
