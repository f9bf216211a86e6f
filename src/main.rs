use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use medlens::analysis::AnalysisOrchestrator;
use medlens::config::{self, AnalysisConfig, ConfigError};
use medlens::medications::{MedicationSession, QuickAddPreset};
use medlens::models::MedicationEntry;

#[derive(Parser)]
#[command(name = "medlens")]
#[command(version = config::APP_VERSION)]
#[command(about = "Symptom analysis and medication interaction checks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank plausible conditions for a symptom description
    Symptoms {
        /// Free-text symptom description
        text: String,
    },
    /// Check medications for drug-drug interactions
    Interactions {
        /// Medications as name[:dosage[:time]], or a preset name
        /// (paracetamol, ibuprofen, amoxicillin)
        #[arg(required = true, num_args = 2..)]
        medications: Vec<String>,
    },
    /// Suggest a sample starting medication plan
    Plan {
        /// Condition name
        disease: String,
    },
    /// List models offered by the backend
    Models,
}

/// Parse `name[:dosage[:time]]`. Times such as `8:00 AM` contain a colon,
/// so everything after the second separator belongs to the time.
fn parse_medication_arg(arg: &str) -> Result<MedicationEntry> {
    let mut parts = arg.splitn(3, ':');
    let name = parts.next().unwrap_or_default();
    let dosage = parts.next();
    let time = parts.next();

    if dosage.is_none() {
        if let Some(preset) = QuickAddPreset::from_name(name) {
            return Ok(preset.entry());
        }
    }
    MedicationEntry::new(name, dosage, time)
        .with_context(|| format!("invalid medication argument '{arg}'"))
}

/// Pick the configuration for `command`. Without an API key the analysis
/// commands still run on their local fallbacks; listing models needs the
/// live service.
fn resolve_config(
    loaded: Result<AnalysisConfig, ConfigError>,
    command: &Commands,
) -> Result<AnalysisConfig> {
    match loaded {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingApiKey) if !matches!(command, Commands::Models) => {
            tracing::warn!(
                "{} is not set, running offline with local fallbacks",
                config::ENV_API_KEY
            );
            Ok(AnalysisConfig::offline())
        }
        Err(e) => Err(e).context("loading configuration"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    medlens::init_tracing();

    let cli = Cli::parse();
    let config = resolve_config(AnalysisConfig::from_env(), &cli.command)?;
    tracing::info!(?config, "{} v{} starting", config::APP_NAME, config::APP_VERSION);

    let orchestrator = Arc::new(
        AnalysisOrchestrator::from_config(config).context("building backend client")?,
    );

    match cli.command {
        Commands::Symptoms { text } => {
            if text.trim().is_empty() {
                bail!("symptom text must not be empty");
            }
            let records = orchestrator.analyze_symptoms(&text).await;
            print_json(&records)?;
        }
        Commands::Interactions { medications } => {
            let session = MedicationSession::new(Arc::clone(&orchestrator));
            for arg in &medications {
                session.add_medication(parse_medication_arg(arg)?)?;
            }
            match session.refresh_analysis().await? {
                Some(analysis) => print_json(&analysis)?,
                None => bail!("at least two medications are needed for an interaction check"),
            }
        }
        Commands::Plan { disease } => {
            let plan = orchestrator.suggest_medication_plan(&disease).await;
            if plan.is_empty() {
                eprintln!("No suggestions available");
            }
            print_json(&plan)?;
        }
        Commands::Models => {
            let models = orchestrator
                .list_backend_models()
                .await
                .context("listing backend models")?;
            for model in models {
                println!("{model}");
            }
        }
    }

    Ok(())
}
