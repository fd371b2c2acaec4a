/*!
 * Vision Summary CLI
 *
 * Runs the count models from a module config file against replayed
 * detections.
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vision_summary::{
    config::ModuleConfig,
    error::{EXIT_RUNTIME, EXIT_SUCCESS},
    load_detectors, logging, Dependencies, Module, SummaryError,
};

#[derive(Parser, Debug)]
#[command(name = "vision-summary")]
#[command(author, version, about = "Count and bucket what an object detector sees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start every configured resource and print sensor readings until Ctrl-C
    Run {
        /// Module config file (TOML, or JSON with a .json extension)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// How often to print readings, in milliseconds
        #[arg(long, default_value = "1000")]
        report_interval_ms: u64,
    },

    /// Validate every configured resource and list its dependencies
    Validate {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Classify the current frame of a camera with a count classifier
    Classify {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Name of the count classifier resource
        #[arg(short, long)]
        resource: String,

        /// Camera to query
        #[arg(long)]
        camera: String,
    },
}

#[tokio::main]
async fn main() {
    let code = match dispatch(Cli::parse()).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<SummaryError>()
                .map_or(EXIT_RUNTIME, SummaryError::exit_code)
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            report_interval_ms,
        } => run(&config, Duration::from_millis(report_interval_ms.max(1))).await,
        Commands::Validate { config } => validate(&config),
        Commands::Classify {
            config,
            resource,
            camera,
        } => classify(&config, &resource, &camera).await,
    }
}

fn load(path: &Path) -> Result<(ModuleConfig, Dependencies)> {
    let config = ModuleConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    logging::init_logging(&config.logging)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let detectors =
        load_detectors(&config.detectors, base_dir).context("Failed to load detectors")?;
    Ok((config, detectors))
}

async fn start_module(config: &ModuleConfig, detectors: &Dependencies) -> Result<Module> {
    let mut module = Module::with_builtin_models();
    for resource in &config.resources {
        module
            .add_resource(resource, detectors)
            .await
            .with_context(|| format!("Failed to start resource {}", resource.name))?;
    }
    Ok(module)
}

async fn run(path: &Path, report_interval: Duration) -> Result<()> {
    let (config, detectors) = load(path)?;
    let mut module = start_module(&config, &detectors).await?;
    info!(
        version = vision_summary::VERSION,
        resources = module.resource_names().len(),
        "vision summary running"
    );

    let shutdown = CancellationToken::new();
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    let mut stdout = std::io::stdout();
    module
        .report_until(report_interval, &shutdown, |name, readings| {
            writeln!(stdout, "{}", json!({ "resource": name, "readings": readings }))
        })
        .await?;
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let config = ModuleConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    let module = Module::with_builtin_models();

    let mut failures = 0;
    for resource in &config.resources {
        match module.validate_resource(resource) {
            Ok(dependencies) => {
                println!("{}: ok (depends on {})", resource.name, dependencies.join(", "));
            }
            Err(e) => {
                println!("{}: {}", resource.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} resources are invalid", failures, config.resources.len());
    }
    Ok(())
}

async fn classify(path: &Path, resource: &str, camera: &str) -> Result<()> {
    let (config, detectors) = load(path)?;
    let resource_config = config
        .resource(resource)
        .ok_or_else(|| SummaryError::UnknownResource(resource.to_string()))?;

    let mut module = Module::with_builtin_models();
    module.add_resource(resource_config, &detectors).await?;

    let classifier = module
        .classifier(resource)
        .ok_or_else(|| SummaryError::WrongKind {
            resource: resource.to_string(),
            expected: "count classifier",
        })?;

    let classifications = classifier
        .classifications_from_camera(camera, &Default::default())
        .await?;
    println!("{}", serde_json::to_string_pretty(&classifications)?);

    module.close().await?;
    Ok(())
}
