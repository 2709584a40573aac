mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use empowerly_core::{config::get_data_dir, AppConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "empowerly")]
#[command(about = "Empowerly HR session monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with a backend sign-in response (JSON)
    Login {
        /// Read the response from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Sign out
    Logout,
    /// Show the current session and inactivity timers
    Status,
    /// Report user interaction to the daemon
    Activity {
        /// mousedown, mousemove, keypress, scroll, touchstart or click
        kind: String,
        /// Number of events to send
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Stay signed in: restart the inactivity timers now
    Stay,
    /// Report that the backend answered 401 for the session token
    Unauthorized {
        /// Error detail from the response body
        #[arg(short, long)]
        detail: Option<String>,
    },
    /// Start the session daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the session daemon
    Stop,
    /// Show the effective configuration
    Config {
        /// Print only the config file location
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(&data_dir),
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process().await,
        Commands::Stop => commands::daemon::stop_daemon(&data_dir).await,
        Commands::Config { path: true } => commands::config::handle_config_path(),
        Commands::Config { path: false } => {
            commands::config::handle_config_show(&AppConfig::load_default()?)
        }
        Commands::Login { file } => {
            let config = AppConfig::load_default()?;
            commands::session::login(&data_dir, &config, file.as_deref()).await
        }
        Commands::Logout => {
            commands::session::logout(&data_dir, &AppConfig::load_default()?).await
        }
        Commands::Status => commands::session::show_status(&data_dir).await,
        Commands::Activity { kind, count } => {
            commands::session::record_activity(&data_dir, &kind, count).await
        }
        Commands::Stay => commands::session::stay_signed_in(&data_dir).await,
        Commands::Unauthorized { detail } => {
            commands::session::report_unauthorized(&data_dir, detail).await
        }
    }
}
