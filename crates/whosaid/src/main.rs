// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! whosaid - a guess-the-author trivia server for imported chat archives.
//!
//! Binary entry point: parses arguments, optionally creates a default room
//! from a provided archive, and serves the game API plus the static front
//! end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use whosaid_game::{GameConfig, RoomManager};
use whosaid_gateway::{start_server, GatewayState, ServerConfig};

/// Guess-the-author trivia server for imported chat archives.
#[derive(Parser, Debug)]
#[command(name = "whosaid", version, about, long_about = None)]
struct Cli {
    /// Archive to create a default room from at startup.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Display name for the default room.
    #[arg(long)]
    room_name: Option<String>,

    /// Host address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Directory where room archives are materialized.
    #[arg(long, default_value = "rooms", env = "ROOMS_DIR")]
    rooms_dir: PathBuf,

    /// Directory the front end is served from.
    #[arg(long, default_value = "public", env = "WEB_ROOT")]
    web_root: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let manager = match RoomManager::new(cli.rooms_dir.clone(), GameConfig::default()).await {
        Ok(manager) => Arc::new(manager),
        Err(error) => {
            error!(%error, rooms_dir = %cli.rooms_dir.display(), "failed to set up rooms directory");
            return ExitCode::FAILURE;
        }
    };

    if let Some(db_path) = &cli.db {
        match manager
            .create_room_from_path(cli.room_name.as_deref(), db_path)
            .await
        {
            Ok(created) => {
                info!(
                    room_id = created.room_id,
                    display_name = created.display_name,
                    "default room created, share this room id"
                );
            }
            Err(error) => {
                error!(%error, db = %db_path.display(), "failed to create default room");
                return ExitCode::FAILURE;
            }
        }
    } else {
        info!("no archive provided, use POST /api/rooms to create a room");
    }

    if !cli.web_root.exists() {
        warn!(web_root = %cli.web_root.display(), "web root does not exist, static files will 404");
    }

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        web_root: cli.web_root,
    };
    let state = GatewayState { rooms: manager };

    if let Err(error) = start_server(&config, state).await {
        error!(%error, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
