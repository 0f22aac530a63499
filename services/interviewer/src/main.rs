use anyhow::{Context, Result};
use clap::Parser;
use interview_core::publisher::RoomService;
use interview_core::schedule::PromptSchedule;
use interview_service::bridge::{SessionSetup, run_session};
use interview_service::config::Config;
use interview_service::instructions::load_instructions;
use interview_service::room_service::{LiveKitRoomService, LogOnlyRoomService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Case interview agent: phase tracking and timed prompts")]
struct Cli {
    /// Name of the room the interview runs in
    room: String,

    /// Instructions file for the interviewer (overrides INSTRUCTIONS_PATH)
    #[arg(long)]
    instructions: Option<PathBuf>,

    /// Log room metadata instead of publishing it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 2. Load Configuration ---
    let config = Config::from_env(args.dry_run).context("Failed to load application configuration")?;

    // --- 3. Initialize Logging ---
    // stdout carries the bridge protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting interviewer for room '{}'...", args.room);

    // --- 4. Load Instructions ---
    let instructions_path = args.instructions.unwrap_or(config.instructions_path);
    let instructions = load_instructions(&instructions_path)
        .context("Failed to load interviewer instructions")?;
    tracing::info!("Loaded instructions from {}", instructions_path.display());

    // --- 5. Room Service ---
    let room_service: Arc<dyn RoomService> = match &config.room_service {
        Some(room_config) => Arc::new(LiveKitRoomService::new(room_config)),
        None => {
            tracing::warn!("Dry run: room metadata will only be logged");
            Arc::new(LogOnlyRoomService)
        }
    };

    let setup = SessionSetup {
        room: args.room,
        instructions,
        room_service,
        schedule: PromptSchedule::default(),
    };

    // --- 6. Run the session over stdin/stdout ---
    // Ctrl-C stops the bridge, which still tears the session down in order.
    let stop = CancellationToken::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down...");
            ctrl_c_stop.cancel();
        }
    });

    let result = run_session(tokio::io::stdin(), tokio::io::stdout(), setup, stop).await;
    match result.context("Interview session failed")? {
        Some(summary) => tracing::info!(
            "Session finished in phase '{}' after {} metadata publish(es) and {} clock prompt(s)",
            summary.final_phase,
            summary.publishes,
            summary.clock_prompts
        ),
        None => tracing::info!("No session was started"),
    }
    tracing::info!("Shutting down...");
    Ok(())
}
