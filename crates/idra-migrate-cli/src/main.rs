//! idra-migrate CLI - move offline IDRA runs into the online database and bucket.

use clap::{Parser, Subcommand};
use idra_migrate::{Config, MigrateError, OfflineDb, Orchestrator, RunRequest, RunStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "idra-migrate")]
#[command(about = "Migrate offline IDRA inspection runs to the online database and object store")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate one exported run
    Migrate {
        /// Run number from the offline database
        #[arg(long)]
        run_id: i64,

        /// Bucket name [default: object_store.bucket]
        #[arg(long)]
        bucket_name: Option<String>,

        /// Owning user id [default: migration.user_id]
        #[arg(long)]
        user_id: Option<i64>,

        /// Dry run: transform and print the records without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Export a run's images and snapshots from the offline database
    Export {
        /// Run number from the offline database
        #[arg(long)]
        run_id: i64,

        /// Path to the offline SQLite database
        #[arg(long)]
        database: PathBuf,
    },

    /// Test database and object store connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?.with_auto_tuning();
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Migrate {
            run_id,
            bucket_name,
            user_id,
            dry_run,
        } => {
            let request = RunRequest::resolve(run_id, bucket_name, user_id, &config)?;

            if dry_run {
                let transformed = idra_migrate::preview(&config, &request).await?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&transformed)?);
                } else {
                    println!("\nDry run completed!");
                    println!("  Run ID: {}", run_id);
                    println!("  Detections: {}", transformed.fods.len());
                    println!(
                        "  Report: {}",
                        serde_json::to_string(&transformed.report.record)?
                    );
                }
                return Ok(());
            }

            let orchestrator = Orchestrator::from_config(config).await?;
            let result = orchestrator.migrate(&request).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                match result.status {
                    RunStatus::Completed => println!("\nMigration completed!"),
                    RunStatus::Skipped => println!("\nMigration skipped!"),
                }
                println!("  Run ID: {}", result.run_id);
                if let Some(reason) = result.skip_reason {
                    println!("  Reason: {:?}", reason);
                }
                println!("  Images: {:?}", result.blobs);
                if let Some(report_id) = result.report_id {
                    println!("  Report ID: {}", report_id);
                }
                println!("  Detections: {}", result.fod_count);
                for key in &result.artifact_keys {
                    println!("  Uploaded: {}", key);
                }
                println!("  Duration: {:.2}s", result.duration_seconds);
            }
        }

        Commands::Export { run_id, database } => {
            let images_dir = config.paths.images_dir.clone();
            let snapshot_dir = config.paths.snapshot_dir.clone();

            let summary = tokio::task::spawn_blocking(move || {
                OfflineDb::open(&database)?.export_run(run_id, &images_dir, &snapshot_dir)
            })
            .await
            .map_err(|e| MigrateError::Io(std::io::Error::other(e)))??;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\nExport completed!");
                println!("  Run ID: {}", summary.run_id);
                println!("  Images written: {}", summary.images_written);
                println!("  Images already present: {}", summary.images_skipped);
                println!("  Detection rows: {}", summary.fod_rows);
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::from_config(config).await?;
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Target ({}): {}",
                    result.target_type,
                    if result.target_ok { "OK" } else { "FAILED" }
                );
                println!(
                    "  Object store ({} {}): {}",
                    result.store_type,
                    result.bucket,
                    if result.store_ok { "OK" } else { "FAILED" }
                );
                println!(
                    "\n  Overall: {}",
                    if result.healthy() { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy() {
                return Err(MigrateError::connection(
                    "Health check failed",
                    "health-check",
                ));
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
