//! Playtest evaluation server
//!
//! Serves the latest (or a named) build from the submissions directory and
//! appends the test instrumentation to its entry script on the way out.
//!
//! Usage:
//!   cargo run                                  # latest submission on :8888
//!   cargo run -- 20240301-gamma --port 9000
//!   cargo run -- --bundle custom_hooks.js --debug-log

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use playtest::bundle::InstrumentationBundle;
use playtest::logging::{self, DebugLogConfig};
use playtest::server::{self, ServeState};
use playtest::settings::{ServerSettings, resolve_submission};
use playtest::tuning::AgentTuning;

#[derive(Parser, Debug)]
#[command(name = "playtest", about = "Serve a submission with test hooks injected")]
struct Args {
    /// Submission id (directory name); defaults to the latest
    submission: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    submissions_dir: Option<PathBuf>,
    /// Request path of the entry script to instrument
    #[arg(long)]
    entry_path: Option<String>,
    /// Bundle template to use instead of the built-in one
    #[arg(long)]
    bundle: Option<PathBuf>,
    #[arg(long)]
    debug_log: bool,
}

impl Args {
    /// Command-line flags win over the settings file
    fn merge(&self, mut settings: ServerSettings) -> ServerSettings {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(bind) = &self.bind {
            settings.bind = bind.clone();
        }
        if let Some(dir) = &self.submissions_dir {
            settings.submissions_dir = dir.display().to_string();
        }
        if let Some(path) = &self.entry_path {
            settings.entry_path = path.clone();
        }
        if let Some(bundle) = &self.bundle {
            settings.bundle_template = Some(bundle.display().to_string());
        }
        settings
    }
}

fn build_state(args: &Args, settings: &ServerSettings) -> Result<ServeState> {
    let root = resolve_submission(&settings.submissions_dir, args.submission.as_deref())
        .context("Cannot pick a submission to serve")?;

    let tuning = AgentTuning::load();
    let bundle = match &settings.bundle_template {
        Some(path) => InstrumentationBundle::load(path, &tuning),
        None => InstrumentationBundle::from_tuning(&tuning),
    }
    .context("Failed to render instrumentation bundle")?
    .with_target_path(settings.entry_path.clone());

    Ok(ServeState::new(root, bundle))
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&DebugLogConfig::load_with_flag(args.debug_log));

    let settings = args.merge(ServerSettings::load());
    let state = build_state(&args, &settings)?;
    info!("Submission: {}", state.root.display());

    server::run(state, &settings.listen_addr())
        .await
        .with_context(|| format!("Server on {} failed", settings.listen_addr()))
}
