//! ACE Tuner Bench Node
//!
//! Runs the radio tuner against simulated radios and logs what it does.
//! The first argument overrides the settings file location.

mod node;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use settings::Settings;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ace_node=info,ace_tuner=info,ace_regulation=info,ace_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => match Settings::settings_path() {
            Ok(path) => path,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let settings = match Settings::load_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Starting ACE tuner node (settings: {})", path.display());

    match node::run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Node stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
