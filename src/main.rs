#![forbid(unsafe_code)]

//! `arcade-launcher`: supervised game launcher binary.
//!
//! Direct-launch mode runs one game under the supervisor and exits when the
//! session is done. `serve` runs the HTTP launch bridge. `supervise` is the
//! entry point the bridge re-executes for each detached session.

use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use arcade_launcher::bridge::{self, BridgeState};
use arcade_launcher::catalog::GameCatalog;
use arcade_launcher::control::{open_surface, TerminalSource};
use arcade_launcher::models::session::SessionOutcome;
use arcade_launcher::orchestrator::artifact::WrapperArtifact;
use arcade_launcher::orchestrator::spawner::SupervisorSpawner;
use arcade_launcher::orchestrator::supervisor::{self, surface_title, SessionReport};
use arcade_launcher::{AppError, LauncherConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_arg(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "arcade-launcher", about = "Supervised game launcher", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Launch a game directly and return when its session ends.
    Launch {
        /// Game identifier (directory name, case and spaces ignored).
        game: String,
    },

    /// List discoverable games.
    List,

    /// Run the HTTP launch bridge.
    Serve {
        /// Override the configured HTTP port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Supervise one session from a manifest (used by the launch bridge).
    #[command(hide = true)]
    Supervise {
        /// Session manifest; deleted when the session ends.
        #[arg(long)]
        manifest: PathBuf,

        /// Directory the manifest must live in (defaults to the configured one).
        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        /// Read hotkeys from the controlling terminal instead of stdin.
        #[arg(long)]
        attach_terminal: bool,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    // Sessions run on a single-threaded loop; the bridge gets a pool.
    let mut builder = match args.command {
        Command::Serve { .. } => tokio::runtime::Builder::new_multi_thread(),
        _ => tokio::runtime::Builder::new_current_thread(),
    };
    builder
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let ct = CancellationToken::new();
    tokio::spawn(cancel_on_signal(ct.clone()));

    match args.command {
        Command::Supervise {
            manifest,
            artifact_dir,
            attach_terminal,
        } => {
            let artifact_dir = match artifact_dir {
                Some(dir) => dir,
                None => load_config(args.config.as_ref())?.artifact_dir(),
            };
            let source = if attach_terminal {
                TerminalSource::ControllingTty
            } else {
                TerminalSource::Stdin
            };
            let report = supervisor::supervise(
                WrapperArtifact::claim(manifest, &artifact_dir),
                |m| open_surface(&surface_title(m), source),
                ct,
            )
            .await;
            finish(&report)
        }
        Command::Launch { game } => {
            let config = load_config(args.config.as_ref())?;
            let catalog = GameCatalog::from_config(&config);
            info!(game = %game, "direct launch");
            let report = supervisor::launch(
                &config,
                &catalog,
                &game,
                |m| open_surface(&surface_title(m), TerminalSource::Stdin),
                ct,
            )
            .await?;
            finish(&report)
        }
        Command::List => {
            let config = load_config(args.config.as_ref())?;
            let catalog = GameCatalog::from_config(&config);
            for game in catalog.list()? {
                println!("{}\t{}", game.id, game.display_name);
            }
            Ok(())
        }
        Command::Serve { port } => {
            let mut config = load_config(args.config.as_ref())?;
            if let Some(port) = port {
                config.http_port = port;
            }

            let leading: Vec<OsString> =
                vec!["--log-format".into(), args.log_format.as_arg().into()];
            // A bridge started from the console shares it with its sessions.
            let spawner = SupervisorSpawner::current_exe(leading)?
                .with_artifact_dir(config.artifact_dir())
                .attach_terminal(io::stdin().is_terminal());

            let state = Arc::new(BridgeState::new(Arc::new(config), Arc::new(spawner)));
            bridge::serve(state, ct).await
        }
    }
}

/// Map a terminal session state onto the process result.
fn finish(report: &SessionReport) -> Result<()> {
    for step in report.cleanup.failures() {
        error!(action = ?step.action, result = ?step.result, "cleanup incomplete");
    }

    match &report.outcome {
        SessionOutcome::SpawnFailed { reason } => Err(AppError::Spawn(reason.clone())),
        SessionOutcome::GenerationFailed { reason } => Err(AppError::Generation(reason.clone())),
        outcome => {
            info!(%outcome, "returned to launcher");
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<LauncherConfig> {
    match path {
        Some(path) => LauncherConfig::load_from_path(path),
        None => LauncherConfig::default_for("."),
    }
}

/// Cancel `ct` on Ctrl-C or, on Unix, SIGTERM.
async fn cancel_on_signal(ct: CancellationToken) {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|err| warn!(%err, "SIGTERM handler unavailable"))
        .ok();

    let terminate = async {
        #[cfg(unix)]
        if let Some(sigterm) = sigterm.as_mut() {
            sigterm.recv().await;
            return;
        }
        std::future::pending::<()>().await;
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(%err, "ctrl-c handler failed");
                return;
            }
        }
        () = terminate => {}
    }

    info!("shutdown signal received");
    ct.cancel();
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
