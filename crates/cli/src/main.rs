use anyhow::Context;
use chartnote_core::config::{max_decode_passes_from_env_value, orphan_label_from_env_value};
use chartnote_core::plan::decode_plan_report;
use chartnote_core::{
    extract_diagnosis, render_requisition, CoreConfig, NoteDraft, NoteService, OrderPool, Plan,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chartnote")]
#[command(about = "Clinical note text protocol and order reconciliation")]
struct Cli {
    /// Output format for structured results
    #[arg(long, value_enum, global = true, default_value_t = Format::Json)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a note document into its sections
    Parse {
        /// Note document (`-` for stdin)
        file: PathBuf,
    },
    /// Compose a note document from a JSON draft of sections and plan
    Compose {
        /// JSON draft (`-` for stdin)
        file: PathBuf,
    },
    /// Decode plan text into diagnosis entries
    PlanDecode {
        /// Plan text (`-` for stdin)
        file: PathBuf,
    },
    /// Encode JSON plan entries as plan text
    PlanEncode {
        /// JSON array of plan entries (`-` for stdin)
        file: PathBuf,
    },
    /// Build the printable requisition for a note's plan
    Requisition {
        /// Note document (`-` for stdin)
        #[arg(long)]
        note: PathBuf,
        /// JSON array of order store records
        #[arg(long)]
        pool: PathBuf,
    },
    /// Add an order under a diagnosis, listing the diagnosis in the assessment if it is new
    AddOrder {
        /// Note document (`-` for stdin)
        #[arg(long)]
        note: PathBuf,
        /// Diagnosis label the order belongs to
        diagnosis: String,
        /// Order text, e.g. "Lab: CBC"
        order: String,
    },
    /// Remove a diagnosis from a note's assessment and plan, keeping its orders under the orphan label
    RemoveDiagnosis {
        /// Note document (`-` for stdin)
        #[arg(long)]
        note: PathBuf,
        /// Diagnosis label as written in the plan
        label: String,
    },
    /// Split a diagnosis label into ICD-10 code and name
    Diagnosis {
        /// Diagnosis label, e.g. "I25.3 - Aneurysm of heart"
        label: String,
    },
}

/// Entry point for the `chartnote` command line tool.
///
/// # Environment Variables
/// - `CHARTNOTE_MAX_DECODE_PASSES`: Entity decode pass cap (default: 10)
/// - `CHARTNOTE_ORPHAN_DIAGNOSIS`: Label receiving orders of removed diagnoses (default: "Other")
/// - `RUST_LOG`: Log filter (default directive: `chartnote=info`)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chartnote=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(
        std::env::var("CHARTNOTE_MAX_DECODE_PASSES").ok(),
        std::env::var("CHARTNOTE_ORPHAN_DIAGNOSIS").ok(),
    )?;
    tracing::debug!(?config, "resolved configuration");

    let output = run(&cli.command, cli.format, &config)?;
    println!("{output}");
    Ok(())
}

fn resolve_config(
    max_decode_passes: Option<String>,
    orphan_label: Option<String>,
) -> anyhow::Result<CoreConfig> {
    let max_decode_passes = max_decode_passes_from_env_value(max_decode_passes)
        .context("reading CHARTNOTE_MAX_DECODE_PASSES")?;
    let config = CoreConfig::new(max_decode_passes, orphan_label_from_env_value(orphan_label))?;
    Ok(config)
}

fn run(command: &Commands, format: Format, config: &CoreConfig) -> anyhow::Result<String> {
    let service = NoteService::new(config);

    match command {
        Commands::Parse { file } => render(&service.parse(&read_input(file)?), format),
        Commands::Compose { file } => {
            let draft: NoteDraft = serde_json::from_str(&read_input(file)?)
                .with_context(|| format!("parsing note draft {}", file.display()))?;
            Ok(service.save(&draft))
        }
        Commands::PlanDecode { file } => render(&decode_plan_report(&read_input(file)?), format),
        Commands::PlanEncode { file } => {
            let plan: Plan = serde_json::from_str(&read_input(file)?)
                .with_context(|| format!("parsing plan entries {}", file.display()))?;
            Ok(plan.to_text())
        }
        Commands::Requisition { note, pool } => {
            let draft = service.load(&read_input(note)?);
            let orders = OrderPool::from_json(&read_input(pool)?)
                .with_context(|| format!("loading order pool {}", pool.display()))?;
            render(&render_requisition(&draft.plan, &orders), format)
        }
        Commands::AddOrder {
            note,
            diagnosis,
            order,
        } => {
            let mut draft = service.load(&read_input(note)?);
            draft.add_order(diagnosis, order)?;
            Ok(service.save(&draft))
        }
        Commands::RemoveDiagnosis { note, label } => {
            let mut draft = service.load(&read_input(note)?);
            draft.remove_diagnosis(label, config.orphan_diagnosis_label())?;
            Ok(service.save(&draft))
        }
        Commands::Diagnosis { label } => render(&extract_diagnosis(label), format),
    }
}

/// Read a whole input file, or stdin when `path` is `-`.
fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn render<T: Serialize>(value: &T, format: Format) -> anyhow::Result<String> {
    let text = match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text.trim_end().to_string())
}
