use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use table_lens_common::Config;
use table_lens_core::{
    apply, audit_many, export_json, print_summary, resolve_paths, suggest, write_canonical_csv,
    ColumnStats, FileOutcome, FillRequest, FillStrategy, Pipeline, PipelineReport,
    PreparationRequest,
};
use tracing_subscriber::EnvFilter;

fn parse_fill(s: &str) -> Result<FillRequest, String> { // COLUMN=STRATEGY, split on the last '='
    let (column, strategy) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected COLUMN=STRATEGY, got {s}"))?;
    let strategy: FillStrategy = strategy.parse().map_err(|e| format!("{e}"))?;
    Ok(FillRequest { column: column.to_owned(), strategy })
}

#[derive(Parser)]
#[command(name = "table-lens", version, about = "Structural audit for tabular files")]
struct Cli {
    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full audit with a printed summary
    Audit { path: PathBuf, #[arg(long)] json: Option<PathBuf> },
    /// Per-column statistics
    Profile { path: PathBuf },
    /// Correlation matrix and strongest relationships
    Correlate { path: PathBuf },
    /// Suggest fixes, or apply the requested ones
    Prepare {
        path: PathBuf,
        #[arg(long)] convert: Vec<String>,
        #[arg(long, value_parser = parse_fill)] fill: Vec<FillRequest>,
        #[arg(long)] dedupe: bool,
        #[arg(long)] output: Option<PathBuf>,
    },
    /// Write the audited table as canonical CSV
    Canonicalize { path: PathBuf, #[arg(long)] output: Option<PathBuf> },
    /// Audit every supported file matched by a path, directory or glob
    Batch { pattern: String, #[arg(long)] json: Option<PathBuf> },
    /// Print the effective configuration
    Config { #[arg(long)] save: bool },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load().context("loading configuration")?;
    tracing::debug!(path = %Config::config_path().display(), "configuration loaded");
    match cli.command {
        Commands::Audit { path, json } => run_audit(&path, json.as_deref(), config)?,
        Commands::Profile { path } => run_profile(&path, config)?,
        Commands::Correlate { path } => run_correlate(&path, config)?,
        Commands::Prepare { path, convert, fill, dedupe, output } => {
            let request = PreparationRequest { convert_types: convert, fill_missing: fill, remove_duplicates: dedupe };
            run_prepare(&path, request, output, config)?
        }
        Commands::Canonicalize { path, output } => {
            let output = output.unwrap_or_else(|| derived_path(&path, "canonical", config.export.output_dir.as_deref()));
            let report = run_pipeline(&path, config)?;
            write_canonical_csv(&output, report.table())?;
            println!("wrote {} rows to {}", report.table().row_count(), output.display());
        }
        Commands::Batch { pattern, json } => run_batch(&pattern, json.as_deref(), &config)?,
        Commands::Config { save } => {
            print!("{}", config.to_toml()?);
            if save {
                config.save()?;
                eprintln!("saved to {}", Config::config_path().display());
            }
        }
    }
    Ok(())
}

fn run_pipeline(path: &Path, config: Config) -> anyhow::Result<PipelineReport> {
    let pipeline = Pipeline::new(config)?;
    let report = pipeline
        .run_path(path)
        .with_context(|| format!("auditing {}", path.display()))?;
    if let Some(e) = report.audit.empty_input_error() {
        eprintln!("warning: {e}");
    }
    Ok(report)
}

fn run_audit(path: &Path, json: Option<&Path>, config: Config) -> anyhow::Result<()> {
    let report = run_pipeline(path, config)?;
    print_summary(&report);
    if let Some(out) = json {
        export_json(out, &report)?;
        println!("exported: {}", out.display());
    }
    Ok(())
}

fn run_profile(path: &Path, config: Config) -> anyhow::Result<()> {
    let report = run_pipeline(path, config)?;
    for p in &report.profiles {
        println!("{} ({:?}, declared {:?})", p.name, p.inferred_kind, p.declared_kind);
        println!("  {:<14} {} ({:.1}%, {:?} impact)", "missing:", p.missing_count, p.missing_percentage, p.missing_impact);
        match &p.stats {
            ColumnStats::Numeric(s) => {
                println!("  {:<14} {}", "count:", s.count);
                println!("  {:<14} {:.4} / {:.4}", "mean / std:", s.mean, s.std);
                println!("  {:<14} {} | {} | {} | {} | {}", "min..max:", s.min, s.p25, s.p50, s.p75, s.max);
                println!("  {:<14} {:.3} ({})", "skew:", s.skew, s.insight.label());
            }
            ColumnStats::Categorical(s) => {
                println!("  {:<14} {} ({})", "unique:", s.unique_count, s.diversity.label());
                for e in &s.top_values {
                    println!("    {:<24} {:>6} ({:.1}%)", e.value, e.count, e.percentage);
                }
                if let Some(t) = &s.temporal {
                    println!("  {:<14} {} .. {} ({:.1} days)", "range:", t.earliest, t.latest, t.span_days);
                }
            }
            ColumnStats::Skipped { reason } => println!("  skipped: {reason}"),
        }
    }
    Ok(())
}

fn run_correlate(path: &Path, config: Config) -> anyhow::Result<()> {
    let report = run_pipeline(path, config)?;
    let rel = &report.relationships;
    if !rel.matrix.is_empty() {
        print!("{:<16}", "");
        for c in &rel.matrix.columns {
            print!(" {c:>10.10}");
        }
        println!();
        for (name, row) in rel.matrix.columns.iter().zip(&rel.matrix.values) {
            print!("{name:<16.16}");
            for v in row {
                match v {
                    Some(r) => print!(" {r:>10.3}"),
                    None => print!(" {:>10}", "-"),
                }
            }
            println!();
        }
    }
    for s in rel.sentences() {
        println!("- {s}");
    }
    for note in &rel.notes {
        println!("note: {note}");
    }
    Ok(())
}

fn run_prepare(path: &Path, request: PreparationRequest, output: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    let out = output.unwrap_or_else(|| derived_path(path, "prepared", config.export.output_dir.as_deref()));
    let report = run_pipeline(path, config)?;
    if request == PreparationRequest::default() {
        let plan = suggest(&report.audit);
        if plan.is_empty() {
            println!("nothing to prepare");
        }
        for m in &plan.missing {
            let options: Vec<&str> = m.options.iter().map(|o| o.label()).collect();
            println!("{:<20} {} missing: {}", m.column, m.count, options.join(" | "));
        }
        for c in &plan.conversions {
            println!("{:<20} {:.0}% numeric: Convert to Number | Keep as Text", c.column, c.numeric_ratio * 100.0);
        }
        if plan.duplicate_rows > 0 {
            println!("{} duplicate rows: Remove Duplicates | Keep Duplicates", plan.duplicate_rows);
        }
        return Ok(());
    }
    for name in &request.convert_types {
        if report.table().column(name).is_none() {
            bail!("no column named '{name}'");
        }
    }
    let prepared = apply(report.table(), &request);
    write_canonical_csv(&out, &prepared.table)?;
    for change in &prepared.changes {
        println!("- {change}");
    }
    println!("wrote {} rows to {}", prepared.table.row_count(), out.display());
    Ok(())
}

/// `<stem>_<suffix>.csv` in `dir`, or next to the source.
fn derived_path(path: &Path, suffix: &str, dir: Option<&Path>) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "table".into());
    let name = format!("{stem}_{suffix}.csv");
    match dir {
        Some(dir) => dir.join(name),
        None => path.with_file_name(name),
    }
}

fn run_batch(pattern: &str, json: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let paths = resolve_paths(pattern)?;
    if paths.is_empty() {
        bail!("no supported files found: {pattern}");
    }
    let entries = audit_many(&paths, config)?;
    for entry in &entries {
        match &entry.outcome {
            FileOutcome::Audited { report } => println!(
                "{:<40} {:>5.0}  {:<12} {} rows",
                entry.path.display(),
                report.quality.score,
                report.quality.rating,
                report.audit.audited_stats.row_count
            ),
            FileOutcome::Failed { error } => println!("{:<40} error ({}): {}", entry.path.display(), error.kind, error.reason),
        }
    }
    if let Some(out) = json {
        let file = std::fs::File::create(out)?;
        serde_json::to_writer_pretty(file, &entries)?;
        println!("exported: {}", out.display());
    }
    Ok(())
}
