// Writing assistant command-line entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries only JSON)
// 2. Load config, seeding config/ from defaults/ on first run
// 3. Build the oracle from the configured credentials
// 4. Spawn the session actor with the starting library
// 5. Run one subcommand against the session and print its result
// 6. Shut the session down

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quill_app::config::{self, Config};
use quill_app::AssistantHandle;
use quill_core::snippet::format_citation;
use quill_core::{Bibliography, Preset};
use quill_llm::{LlmClient, Oracle};
use serde_json::json;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "quill", version, about = "Citation and style assistant for long-form writing")]
struct Cli {
    /// Directory holding defaults/ and config/
    #[arg(long, default_value = ".")]
    base: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find up to three supporting citations for the excerpt in FILE
    Resolve {
        file: PathBuf,
    },
    /// Derive a style profile from the writing sample in FILE
    Calibrate {
        file: PathBuf,
    },
    /// Generate a passage in the current (optionally preset-adjusted) style
    Sample {
        #[arg(long)]
        preset: Option<Preset>,
    },
    /// List the style presets and the fields each one sets
    Presets,
    /// Print the research library, after adding any uploaded files
    Library {
        #[arg(long = "upload")]
        uploads: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing();
    info!("Writing assistant starting up");

    // 2. Load config
    let config = config::load_config_in(&cli.base).context("failed to load configuration")?;

    // Presets need neither the oracle nor a session.
    if let Command::Presets = cli.command {
        return print_presets();
    }

    // 3. Build the oracle
    let llm_client = LlmClient::from_settings(
        config.credentials.anthropic_api_key.as_deref(),
        &config.llm,
    );
    if llm_client.is_active() {
        info!("LLM client initialized (model: {})", config.llm.model);
    } else {
        info!("LLM client disabled (no API key); oracle calls will use fallbacks");
    }
    let oracle: Arc<dyn Oracle> = Arc::new(llm_client);

    // 4. Spawn the session
    let bibliography = starting_library(&config);
    let (handle, events, join) = AssistantHandle::spawn(config, oracle, bibliography);
    // One-shot commands never read notifications.
    drop(events);

    // 5. Run the command
    let result = run_command(&handle, cli.command).await;

    // 6. Shut down
    handle.shutdown().await.ok();
    join.await.context("session task panicked")?;

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quill=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn starting_library(config: &Config) -> Bibliography {
    if config.library.seed {
        Bibliography::seeded()
    } else {
        Bibliography::new()
    }
}

async fn run_command(
    handle: &AssistantHandle,
    command: Command,
) -> anyhow::Result<serde_json::Value> {
    match command {
        Command::Resolve { file } => {
            let excerpt = read_input(&file)?;
            let citations = handle.resolve_citations(excerpt).await?;
            let formatted: Vec<String> = citations.iter().map(format_citation).collect();
            Ok(json!({ "citations": citations, "formatted": formatted }))
        }
        Command::Calibrate { file } => {
            let sample = read_input(&file)?;
            let profile = handle
                .calibrate(sample)
                .await
                .with_context(|| format!("cannot calibrate from {}", file.display()))?;
            if profile.is_error_sentinel() {
                tracing::warn!("Style analysis failed; the error profile is now active");
            }
            Ok(serde_json::to_value(profile)?)
        }
        Command::Sample { preset } => {
            if let Some(preset) = preset {
                let profile = handle.apply_preset(preset).await?;
                handle.save_profile(profile).await?;
            }
            let sample = handle.generate_sample().await?;
            let profile = handle.snapshot().await?.profile;
            Ok(json!({ "profile": profile, "sample": sample }))
        }
        Command::Library { uploads } => {
            for path in &uploads {
                let body = read_input(path)?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload");
                handle.add_upload(name, body).await?;
            }
            let snapshot = handle.snapshot().await?;
            Ok(serde_json::to_value(snapshot.bibliography)?)
        }
        Command::Presets => presets_json(),
    }
}

fn presets_json() -> anyhow::Result<serde_json::Value> {
    let mut presets = serde_json::Map::new();
    for preset in Preset::ALL {
        presets.insert(preset.name().to_string(), serde_json::to_value(preset.patch())?);
    }
    Ok(serde_json::Value::Object(presets))
}

fn print_presets() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&presets_json()?)?);
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
