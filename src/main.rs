use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use nyc_rental_pipeline::app::ports::ArtifactStore;
use nyc_rental_pipeline::config::{Config, DEFAULT_CONFIG_PATH};
use nyc_rental_pipeline::dataset::{read_csv, write_csv};
use nyc_rental_pipeline::infra::{FsArtifactStore, MlflowComponentRunner};
use nyc_rental_pipeline::observability::{self, metrics};
use nyc_rental_pipeline::pipeline::processing::clean;
use nyc_rental_pipeline::pipeline::PipelineOrchestrator;
use nyc_rental_pipeline::validation::{CheckParameters, DataValidator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nyc_rental_pipeline")]
#[command(about = "NYC short-term rental price model pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured pipeline stages
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Stages to run (comma-separated), overriding main.steps
        #[arg(long)]
        steps: Option<String>,
        /// Write a Prometheus text snapshot of the run's metrics here
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Run the data checks against local CSV files
    Check {
        #[arg(long)]
        data: PathBuf,
        /// Reference sample for the drift check; the check is skipped without one
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        min_price: f64,
        #[arg(long)]
        max_price: f64,
        #[arg(long)]
        kl_threshold: f64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clean a local CSV file
    Clean {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        min_price: f64,
        #[arg(long)]
        max_price: f64,
    },
    /// Manage the local artifact store
    Artifacts {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Point an alias such as `reference` or `prod` at a version
    Alias {
        #[arg(long, default_value = "artifacts")]
        store: PathBuf,
        /// `name:version` or `name:alias`
        reference: String,
        alias: String,
    },
    /// Upload a file as a new artifact version
    Log {
        #[arg(long, default_value = "artifacts")]
        store: PathBuf,
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        artifact_type: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = observability::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            metrics_out,
        } => run(&config, steps.as_deref(), metrics_out.as_deref()).await,
        Commands::Check {
            data,
            reference,
            min_price,
            max_price,
            kl_threshold,
            json,
        } => {
            let params = CheckParameters::new(min_price, max_price, kl_threshold)?;
            let data = read_csv(&data)
                .with_context(|| format!("Failed to read candidate data {}", data.display()))?;
            let reference = match reference {
                Some(path) => Some(read_csv(&path).with_context(|| {
                    format!("Failed to read reference data {}", path.display())
                })?),
                None => {
                    warn!("No reference dataset given; the drift check will be skipped");
                    None
                }
            };

            let report = DataValidator::with_tracing(params).validate(&data, reference.as_ref());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
                for failure in report.failures() {
                    if let Some(violation) = failure.verdict.violation() {
                        println!("  {}: {}", failure.check, violation);
                    }
                }
            }
            report.into_result()?;
            Ok(())
        }
        Commands::Clean {
            input,
            output,
            min_price,
            max_price,
        } => {
            let data = read_csv(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let (cleaned, summary) = clean(&data, min_price, max_price)?;
            write_csv(&cleaned, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Kept {} of {} rows ({} dropped) -> {}",
                summary.kept_rows,
                summary.input_rows,
                summary.dropped_rows,
                output.display()
            );
            Ok(())
        }
        Commands::Artifacts { command } => match command {
            ArtifactCommands::Alias {
                store,
                reference,
                alias,
            } => {
                let version = FsArtifactStore::new(store)
                    .add_alias(&reference, &alias)
                    .await
                    .with_context(|| format!("Failed to alias {} as {}", reference, alias))?;
                println!("{} -> {}:{}", version.reference(), version.name, alias);
                Ok(())
            }
            ArtifactCommands::Log {
                store,
                file,
                name,
                artifact_type,
                description,
            } => {
                let version = FsArtifactStore::new(store)
                    .log_artifact(&name, &artifact_type, &description, &file)
                    .await
                    .with_context(|| format!("Failed to log {}", file.display()))?;
                println!("{} ({})", version.reference(), version.digest);
                Ok(())
            }
        },
    }
}

async fn run(
    config_path: &Path,
    steps: Option<&str>,
    metrics_out: Option<&Path>,
) -> anyhow::Result<()> {
    metrics::init().map_err(|e| anyhow!("Failed to install metrics recorder: {}", e))?;

    let mut config = Config::load_from(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(steps) = steps {
        config = config.with_steps(steps)?;
    }

    let store = Arc::new(FsArtifactStore::new(&config.artifacts.root));
    // child components group their tracking runs under these
    let runner = Arc::new(
        MlflowComponentRunner::new(&config.main.components_repository)
            .with_env("WANDB_PROJECT", &config.main.project_name)
            .with_env("WANDB_RUN_GROUP", &config.main.experiment_name),
    );

    let execution = PipelineOrchestrator::new(store, runner)
        .run_pipeline(&config)
        .await?;
    for (stage, result) in &execution.step_results {
        let status = if result.success { "ok" } else { "FAILED" };
        println!("{:<22} {:<7} {}", stage.as_str(), status, result.message);
    }
    if let Some(duration) = execution.duration() {
        info!("Pipeline finished in {} ms", duration.num_milliseconds());
    }

    if let Some(path) = metrics_out {
        if metrics::write_snapshot(path)? {
            info!("Wrote metrics snapshot to {}", path.display());
        }
    }

    execution.into_result()?;
    Ok(())
}
