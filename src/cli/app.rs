//! `clap`-derived entry point (SPEC_FULL §0.3): one `run` subcommand that
//! drives [`crate::execute_cognitive_web_task_with_driver`] from a
//! terminal.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use lattice_browser::ChromiumBrowserDriver;
use lattice_llm::{LlmProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use lattice_memory::Lattice;
use lattice_types::SessionId;

use crate::config::RuntimeConfig;

#[derive(Parser, Debug)]
#[command(name = "latticeagent", about = "Autonomous web-navigation agent over a persistent cognitive lattice")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one goal-directed browsing task end to end.
    Run {
        /// Natural-language objective, e.g. "find the nearest store and check hours".
        #[arg(long)]
        goal: String,
        /// Starting URL.
        #[arg(long)]
        url: String,
        /// Upper bound on reasoning steps (spec §4.7).
        #[arg(long, default_value_t = 12)]
        max_iterations: u32,
        /// Run Chromium headless (default) or headed.
        #[arg(long, default_value_t = true)]
        headless: bool,
        /// Directory for debug artifacts; implies `WEB_AGENT_DEBUG=1` behavior (§0.5).
        #[arg(long)]
        debug_dir: Option<String>,
        /// Optional session file to resume from / persist to (spec §6 "may be re-opened").
        #[arg(long)]
        session_file: Option<String>,
        /// Optional config file overriding `lattice.yaml`/`lattice.toml` discovery.
        #[arg(long)]
        config: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Parses argv, wires up configuration/logging/the LLM provider, and runs
/// the requested subcommand.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { goal, url, max_iterations, headless, debug_dir, session_file, config } => {
            let mut cfg = RuntimeConfig::load(config.as_deref().map(std::path::Path::new))?;
            cfg.max_iterations = max_iterations;
            if let Some(dir) = debug_dir {
                cfg.debug = true;
                cfg.debug_dir = std::path::PathBuf::from(dir);
            }
            init_tracing(cfg.debug);

            let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::from_env()?)?);

            let mut lattice = match &session_file {
                Some(path) if std::path::Path::new(path).exists() => {
                    tracing::info!(path, "resuming lattice session");
                    Lattice::load(path)?
                }
                Some(path) => Lattice::with_persistence(SessionId::new(), path),
                None => Lattice::new(SessionId::new()),
            };

            let mut driver = ChromiumBrowserDriver::new();

            let result =
                crate::execute_cognitive_web_task_with_driver(&goal, &url, llm, &mut lattice, &mut driver, &cfg, headless, cfg.max_iterations).await;

            println!(
                "{}",
                serde_json::json!({
                    "success": result.success,
                    "goal": result.goal,
                    "url": result.url,
                    "timestamp": result.timestamp.to_rfc3339(),
                })
            );

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
