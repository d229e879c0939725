use crate::coordinator::Settings;
use clap::Parser;
use painter_models::DEFAULT_MAX_PLAYERS;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "painter_server",
    rename_all = "kebab-case",
    rename_all_env = "screaming-snake"
)]
pub struct Args {
    #[arg(default_value = "0.0.0.0:3000", env = "PAINTER_HOST")]
    pub host: SocketAddr,

    /// Capacity of games created without an explicit player limit
    #[arg(long, default_value_t = DEFAULT_MAX_PLAYERS, env)]
    pub default_max_players: usize,

    /// Seconds an ended game is kept before it is deleted
    #[arg(long, default_value_t = 300, env)]
    pub cleanup_after_secs: u64,
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            default_max_players: self.default_max_players,
            cleanup_after: Duration::from_secs(self.cleanup_after_secs),
        }
    }
}
