//! Reference host engine for the Slumber rest quorum.
//!
//! The engine stands in for a game server. It hosts the configured worlds,
//! keeps one quorum tracker per world, and replays host events read as JSON
//! lines from stdin. Chat lines emitted by the worlds are written to the log
//! under the `slumber::chat` target.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `slumber-config.yaml` (or the first argument)
//! 3. Host the configured worlds and spawn their trackers
//! 4. Start the chat delivery task
//! 5. Process stdin events until end of input
//! 6. Log each world's final quorum state

mod error;
mod events;
mod server;

use std::path::{Path, PathBuf};

use slumber_core::config::SlumberConfig;
use slumber_world::{Announcement, Audience};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::events::HostEvent;
use crate::server::Server;

/// Configuration file read when no path is given.
const DEFAULT_CONFIG_FILE: &str = "slumber-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be loaded,
/// or if reading stdin fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("slumber-engine starting");

    // 2. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    let config = load_config(&config_path)?;
    info!(
        path = %config_path.display(),
        sleep_percentage = config.quorum.sleep_percentage,
        grant_all = config.permissions.grant_all,
        worlds = ?config.worlds,
        "Configuration loaded"
    );

    // 3. Host worlds and spawn trackers.
    let mut server = Server::new(config, config_path);

    // 4. Deliver chat.
    let chat = tokio::spawn(deliver_chat(server.subscribe_chat()));

    // 5. Replay host events.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        line_number = line_number.saturating_add(1);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => event,
            Err(err) => {
                warn!(line = line_number, error = %err, "Malformed host event skipped");
                continue;
            }
        };
        if let Err(err) = server.handle(event).await {
            warn!(line = line_number, error = %err, "Host event rejected");
        }
    }

    // 6. Report final state.
    info!(
        online = server.online().count(),
        sleep_percentage = server.config().quorum.sleep_percentage,
        "End of host events"
    );
    for (world, snapshot) in server.status().await? {
        let clock = server.world(&world).map(|hosted| hosted.clock()).unwrap_or_default();
        info!(
            %world,
            day = clock.day(),
            time = clock.time(),
            resting = snapshot.resting,
            threshold = %snapshot.threshold,
            transitions = snapshot.transitions,
            last_transition_at = ?snapshot.last_transition_at,
            "Final quorum state"
        );
    }

    // Dropping the server stops the trackers, which closes the chat channel.
    drop(server);
    if let Err(err) = chat.await {
        warn!(error = %err, "chat delivery task failed");
    }

    info!("slumber-engine shutdown complete");
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
fn load_config(path: &Path) -> Result<SlumberConfig, EngineError> {
    if path.exists() {
        Ok(SlumberConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(SlumberConfig::default())
    }
}

/// Write every chat line to the log until all worlds are gone.
async fn deliver_chat(mut rx: broadcast::Receiver<Announcement>) {
    loop {
        match rx.recv().await {
            Ok(line) => match line.audience {
                Audience::World => {
                    info!(target: "slumber::chat", world = %line.world_name, "{}", line.text);
                }
                Audience::Participant(participant) => {
                    info!(
                        target: "slumber::chat",
                        world = %line.world_name,
                        to = %participant,
                        "{}",
                        line.text
                    );
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "chat delivery lagging, lines dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use slumber_core::Threshold;

    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("slumber-engine-no-such-config.yaml");
        assert_eq!(load_config(&path).unwrap(), SlumberConfig::default());
    }

    #[test]
    fn non_numeric_percentage_still_loads() {
        let path = std::env::temp_dir().join(format!(
            "slumber-engine-lenient-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "quorum:\n  sleep_percentage: lots\nworlds:\n  - overworld\n")
            .unwrap();

        let config = load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.worlds, vec![String::from("overworld")]);
        assert_eq!(config.quorum.threshold_or_default(), Threshold::default());
    }
}
