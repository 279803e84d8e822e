use crate::pipeline::PipelineReport;
use crate::profile::ColumnStats;
use crate::table::Table;
use std::path::Path;
use table_lens_common::{Result, TableLensError};

// --- canonical CSV ---

/// Header plus one record per row; absent cells are empty fields.
pub fn to_canonical_csv(table: &Table) -> Result<Vec<u8>> {
    if table.column_count() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.column_names())
        .map_err(|e| TableLensError::Other(e.to_string()))?;
    for r in 0..table.row_count() {
        writer
            .write_record(table.row(r).iter().map(|c| c.render()))
            .map_err(|e| TableLensError::Other(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| TableLensError::Other(e.to_string()))
}

pub fn write_canonical_csv(output_path: &Path, table: &Table) -> Result<()> {
    std::fs::write(output_path, to_canonical_csv(table)?)?;
    Ok(())
}

// --- headless summary output ---

pub fn print_summary(report: &PipelineReport) {
    let raw = &report.audit.raw_stats;
    let audited = &report.audit.audited_stats;
    println!("{:<16} {}", "Format:", report.source.format.family());
    println!("{:<16} {} -> {}", "Rows:", raw.row_count, audited.row_count);
    println!("{:<16} {} -> {}", "Columns:", raw.column_count, audited.column_count);
    println!("{:<16} {}", "Missing cells:", raw.missing_cells);
    println!("{:<16} {}", "Duplicate rows:", raw.duplicate_rows);
    println!(
        "{:<16} {:.0}/100 ({}, density {:.1}%)",
        "Quality:",
        report.quality.score,
        report.quality.rating,
        report.quality.density * 100.0
    );
    for adj in &report.quality.breakdown {
        println!("  {:+6.0}  {}", adj.score_delta, adj.explanation);
    }
    println!("Audit steps:");
    for step in &report.audit.steps {
        println!("  - {}", step.reason);
    }
    println!("Columns:");
    for p in &report.profiles {
        let detail = match &p.stats {
            ColumnStats::Numeric(s) => format!("mean {:.2}, std {:.2}, {}", s.mean, s.std, s.insight.label()),
            ColumnStats::Categorical(s) => format!("{} unique, {}", s.unique_count, s.diversity.label()),
            ColumnStats::Skipped { reason } => format!("skipped: {reason}"),
        };
        println!("  {:<20} {:<12} {:>5.1}% missing  {}", p.name, format!("{:?}", p.inferred_kind), p.missing_percentage, detail);
    }
    if !report.relationships.findings.is_empty() {
        println!("Relationships:");
        for s in report.relationships.sentences() {
            println!("  - {s}");
        }
    }
    for note in &report.relationships.notes {
        println!("  note: {note}");
    }
    let labels = |caps: &[crate::suitability::Capability]| {
        caps.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
    };
    println!("{:<16} {}", "Good for:", labels(&report.suitability.good_for));
    if !report.suitability.not_good_for.is_empty() {
        println!("{:<16} {}", "Not good for:", labels(&report.suitability.not_good_for));
    }
    for caveat in &report.suitability.caveats {
        println!("  caveat: {caveat}");
    }
}

// --- JSON export ---

pub fn export_json(output_path: &Path, report: &PipelineReport) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(&mut file, report).map_err(|e| TableLensError::Other(e.to_string()))?;
    Ok(())
}

/// The structured subset handed to a narrative writer; holds no raw cell values.
pub fn narrative_context(report: &PipelineReport) -> serde_json::Value {
    let columns: Vec<serde_json::Value> = report
        .profiles
        .iter()
        .map(|p| {
            let label = match &p.stats {
                ColumnStats::Numeric(s) => s.insight.label(),
                ColumnStats::Categorical(s) => s.diversity.label(),
                ColumnStats::Skipped { .. } => "skipped",
            };
            serde_json::json!({
                "name": p.name,
                "kind": p.inferred_kind,
                "missing_percentage": p.missing_percentage,
                "missing_impact": p.missing_impact,
                "label": label,
            })
        })
        .collect();
    serde_json::json!({
        "rows": report.audit.audited_stats.row_count,
        "columns": columns,
        "quality": {
            "score": report.quality.score,
            "rating": report.quality.rating,
            "density": report.quality.density,
        },
        "findings": report.relationships.sentences(),
        "good_for": report.suitability.good_for,
        "not_good_for": report.suitability.not_good_for,
        "caveats": report.suitability.caveats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;
    use crate::pipeline::Pipeline;
    use crate::table::Column;

    #[test]
    fn canonical_csv_layout() {
        let t = Table::new(vec![
            Column::numeric("a", vec![Some(1.5), None]),
            Column::text("b, c", vec![Some("x"), Some("say \"hi\"")]),
        ])
        .unwrap();
        let out = String::from_utf8(to_canonical_csv(&t).unwrap()).unwrap();
        assert_eq!(out, "a,\"b, c\"\n1.5,x\n,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn canonical_csv_reloads_identically() {
        let src = "n,label,when\n1.50,NA,2024-01-01\n-0,,2024-01-02\n3e2,plain,\n";
        let t = load(src.as_bytes(), "csv").unwrap();
        let again = load(&to_canonical_csv(&t).unwrap(), "csv").unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn single_column_empty_cell_survives() {
        let t = Table::new(vec![Column::numeric("a", vec![Some(1.0), None, Some(2.0)])]).unwrap();
        let again = load(&to_canonical_csv(&t).unwrap(), "csv").unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn tables_without_columns_reload() {
        for t in [load(b"[]", "json").unwrap(), crate::audit::audit(&load(b"a,b\n,\n,\n", "csv").unwrap()).table] {
            assert_eq!(t.column_count(), 0);
            let bytes = to_canonical_csv(&t).unwrap();
            assert_eq!(load(&bytes, "csv").unwrap(), t);
        }
    }

    #[test]
    fn json_export_and_narrative() {
        let report = Pipeline::default().run(b"x,y\n1,2\n2,4\n3,7\n", "csv").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        export_json(&path, &report).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["quality"]["rating"], "Optimal");
        assert!(doc["audit"]["steps"].is_array());
        let ctx = narrative_context(&report);
        assert_eq!(ctx["rows"], 3);
        assert_eq!(ctx["columns"].as_array().unwrap().len(), 2);
        assert!(ctx["caveats"].as_array().unwrap().len() >= 2);
    }
}
