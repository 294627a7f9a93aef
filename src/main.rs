//! Fridge photo analyzer.
//!
//! Usage:
//!   fridge-inventory analyze fridge.jpg
//!   fridge-inventory analyze fridge.jpg --provider anthropic -o inventory.json
//!   fridge-inventory check --provider aws --image fridge.jpg
//!
//! Credentials come from the environment (or a `.env` file): OPENAI_API_KEY,
//! ANTHROPIC_API_KEY, AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY / AWS_REGION.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fridge_inventory::{
    build_provider, Config, Pipeline, PipelineConfig, ProviderCredentials, ProviderKind,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fridge-inventory", about = "Turn a fridge photo into a JSON inventory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a fridge photo and print structured inventory data
    Analyze {
        /// Photo to analyze
        photo_path: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// openai, anthropic, or aws (default: $AI_SERVICE, then openai)
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Override the model for the chosen provider
        #[arg(long)]
        model: Option<String>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Check credentials and connectivity for a provider
    Check {
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Also run a full analysis of this photo
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: ConfigError: {e}");
            return ExitCode::FAILURE;
        }
    };

    let default_filter = config.log_level.to_lowercase();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Command::Analyze {
            photo_path,
            output,
            provider,
            model,
            pretty,
        } => {
            let kind = provider.unwrap_or(config.provider);
            match analyze(&config, kind, model, &photo_path, output.as_deref(), pretty).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Check { provider, image } => {
            let kind = provider.unwrap_or(config.provider);
            match check(&config, kind, image.as_deref()).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    println!("❌ {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn analyze(
    config: &Config,
    kind: ProviderKind,
    model: Option<String>,
    photo_path: &Path,
    output: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    let mut pipeline_config = PipelineConfig::from(config);
    if let Some(model) = model {
        pipeline_config.models.set(kind, model);
    }

    let pipeline = Pipeline::for_provider(kind, &config.credentials, pipeline_config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    info!(provider = %kind, path = %photo_path.display(), "processing photo");

    let result = match pipeline.run_with_cancel(photo_path, cancel).await {
        Ok(result) => result,
        Err(e) => anyhow::bail!("{}: {e}", e.kind()),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("failed to serialize result")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{json}\n"))
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), items = result.items().len(), "inventory written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Human-readable connectivity check, one line per step.
async fn check(config: &Config, kind: ProviderKind, image: Option<&Path>) -> anyhow::Result<()> {
    println!("{kind} connectivity check");
    println!("{}", "-".repeat(60));

    if !config.credentials.validate(kind) {
        anyhow::bail!(
            "{kind} credentials not configured: set {}",
            ProviderCredentials::env_hint(kind)
        );
    }
    println!("✅ credentials present");

    let provider = build_provider(kind, &config.credentials, &config.models, config.request_timeout);
    let reply = provider
        .ping()
        .await
        .with_context(|| format!("{kind} API connection failed"))?;
    println!("✅ API connection successful: {}", reply.trim());

    let Some(path) = image else {
        println!("vision check skipped (pass --image <path> to run it)");
        return Ok(());
    };

    let pipeline = Pipeline::new(provider, PipelineConfig::from(config));
    let result = pipeline
        .run(path)
        .await
        .with_context(|| format!("vision analysis of {} failed", path.display()))?;

    println!("✅ vision analysis complete: {} items", result.items().len());
    for item in result.items() {
        println!(
            "   {} x{} ({:.0}%{})",
            item.item_name,
            item.quantity,
            item.confidence * 100.0,
            if item.is_leftover { ", leftover" } else { "" }
        );
    }
    for warning in result.warnings() {
        println!("   warning: {warning}");
    }
    Ok(())
}
