use anyhow::{bail, Context, Result};
use autofile::config::{IntakeMarker, IntakeOptions, DEFAULT_IGNORE_DIRS};
use autofile::{apply_plan, build_plan, write_plan_artifact, AutofileError, DestLayout};
use clap::{Args, Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "autofile",
    about = "AI-assisted, bundle-aware collaborator dump intake for research projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a dump and (optionally) route it into a project
    Intake(IntakeArgs),
    /// Unattended intake of a dropped folder carrying an .autofile.json marker
    Auto(AutoArgs),
}

#[derive(Args)]
struct IntakeArgs {
    /// Path to the collaborator dump to classify
    dump: PathBuf,

    /// Target project folder name, e.g. "2025-CRISPR-MutSim"
    #[arg(long)]
    project: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct AutoArgs {
    /// Dropped folder containing an intake marker file
    drop: PathBuf,

    /// Project name fallback when the marker does not name one
    #[arg(long)]
    project: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Short label for the dump source (e.g. "AliceLab")
    #[arg(long, default_value = "")]
    source: String,

    /// Base documents directory (default: ~/Documents)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Actually copy/move files (default is a dry run that only writes the plan)
    #[arg(long)]
    apply: bool,

    /// Move files instead of copying (destructive)
    #[arg(long = "move")]
    move_files: bool,

    /// OpenAI-style API base, e.g. http://127.0.0.1:1234/v1
    #[arg(long)]
    api_base: Option<String>,

    /// Model name as exposed by the endpoint
    #[arg(long)]
    model: Option<String>,

    /// Files per classification call
    #[arg(long, default_value_t = 40)]
    batch_size: usize,

    /// Max text bytes per file to send to the model
    #[arg(long, default_value_t = 2000)]
    peek_bytes: usize,

    /// Do not send any file contents to the model (metadata only)
    #[arg(long)]
    no_content: bool,

    /// Skip the AI classifier entirely (rule-based decisions only)
    #[arg(long)]
    no_ai: bool,

    /// Comma list of bundle modes: code,manuscript,none
    #[arg(long, default_value = "code,manuscript")]
    bundle: String,

    /// Comma list of directory names to skip at any depth
    #[arg(long)]
    ignore_dirs: Option<String>,

    /// Confidence threshold below which files are quarantined
    #[arg(long, default_value_t = 0.45)]
    quarantine_threshold: f64,
}

impl CommonArgs {
    fn to_options(&self) -> IntakeOptions {
        let mut options = IntakeOptions {
            source_label: self.source.clone(),
            apply: self.apply,
            move_files: self.move_files,
            bundle_code: self.bundle.contains("code"),
            bundle_manuscript: self.bundle.contains("manuscript"),
            quarantine_threshold: self.quarantine_threshold,
            use_ai: !self.no_ai,
            batch_size: self.batch_size,
            include_content: !self.no_content,
            peek_bytes: self.peek_bytes,
            ..IntakeOptions::default()
        };
        options.ignore_dirs = match &self.ignore_dirs {
            Some(list) => parse_comma_set(list),
            None => DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
        };
        if let Some(api_base) = &self.api_base {
            options.api_base = api_base.clone();
        }
        if let Some(model) = &self.model {
            options.model = model.clone();
        }
        options
    }
}

fn parse_comma_set(list: &str) -> HashSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn base_documents_dir(base: &Option<PathBuf>) -> PathBuf {
    base.clone()
        .or_else(dirs::document_dir)
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join("Documents"))
}

fn project_dir(base: &Option<PathBuf>, project: &str) -> Result<PathBuf> {
    let dir = base_documents_dir(base)
        .join("Research")
        .join("Projects")
        .join(project);
    if !dir.exists() {
        bail!(AutofileError::ProjectNotFound(dir));
    }
    Ok(dir)
}

async fn run_intake(dump: &Path, project_dir: &Path, options: &IntakeOptions) -> Result<()> {
    if !dump.exists() {
        bail!(AutofileError::DumpNotFound(dump.to_path_buf()));
    }

    info!(
        dump = %dump.display(),
        project = %project_dir.display(),
        ai = options.use_ai,
        "Planning intake"
    );
    let plan = build_plan(dump, options).await?;

    let date = chrono::Local::now().format("%Y%m%d").to_string();
    let layout = DestLayout::new(project_dir, &options.source_label, &date);

    if options.apply {
        let outcome = apply_plan(
            &plan,
            dump,
            project_dir,
            &layout,
            options.move_files,
            options.quarantine_threshold,
        )?;
        println!("Applied. Manifest: {}", outcome.manifest_path.display());
        println!("Summary: {}", outcome.log_path.display());
    } else {
        let plan_path = write_plan_artifact(&plan, project_dir, &layout)?;
        println!("Plan written: {}", plan_path.display());
        println!("Dry run only. Use --apply to execute the plan.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Intake(args) => {
            let options = args.common.to_options();
            let project = project_dir(&args.common.base, &args.project)?;
            run_intake(&args.dump, &project, &options).await
        }
        Command::Auto(args) => {
            let drop = &args.drop;
            if !drop.exists() {
                bail!(AutofileError::DumpNotFound(drop.clone()));
            }

            let marker = IntakeMarker::load(drop);
            let project_name = marker
                .project
                .clone()
                .or_else(|| args.project.clone())
                .or_else(|| std::env::var("AUTOFILE_DEFAULT_PROJECT").ok())
                .ok_or(AutofileError::MissingProject)?;

            let mut options = args.common.to_options();
            marker.apply_to(&mut options);

            let project = project_dir(&args.common.base, &project_name)
                .with_context(|| format!("auto-intake project '{project_name}'"))?;
            run_intake(drop, &project, &options).await
        }
    }
}
