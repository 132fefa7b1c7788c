//! Inbound host events.
//!
//! The engine reads one JSON object per line from stdin. Each object is a
//! [`HostEvent`] tagged by `type`:
//!
//! ```text
//! {"type":"join","player":"alice","world":"world"}
//! {"type":"time","world":"world","ticks":13000}
//! {"type":"bed_enter","player":"alice"}
//! {"type":"command","player":"alice","name":"setsleeppercentage","args":["0.3"]}
//! ```

use serde::Deserialize;

use crate::error::EngineError;

/// Usage line for the percentage command.
pub const SET_PERCENTAGE_USAGE: &str = "Usage : /setSleepPercentage <value between 0 and 1>";

/// One event reported by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A player connected to a world.
    Join {
        /// Player name.
        player: String,
        /// World name.
        world: String,
    },

    /// A player disconnected.
    Quit {
        /// Player name.
        player: String,
    },

    /// A player lay down in a bed.
    BedEnter {
        /// Player name.
        player: String,
    },

    /// A player got out of a bed.
    BedLeave {
        /// Player name.
        player: String,
    },

    /// Game time passed in a world.
    Time {
        /// World name.
        world: String,
        /// Ticks elapsed.
        ticks: u64,
    },

    /// A world's weather changed.
    Weather {
        /// World name.
        world: String,
        /// Rain or snow is falling.
        #[serde(default)]
        storm: bool,
        /// Thunder is active.
        #[serde(default)]
        thundering: bool,
    },

    /// A command was issued by a player, or by the console when `player`
    /// is absent.
    Command {
        /// Issuing player, `None` for the console.
        #[serde(default)]
        player: Option<String>,
        /// Command name without the leading slash.
        name: String,
        /// Command arguments.
        #[serde(default)]
        args: Vec<String>,
    },
}

/// A recognised command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Ask to be counted as resting without a bed.
    Sleep,
    /// Re-read the configuration file.
    Reload,
    /// Change the sleep percentage. `None` when the argument is missing or
    /// not a number.
    SetSleepPercentage(Option<f64>),
}

impl Command {
    /// Recognise a command by name (case-insensitive, optional leading `/`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCommand`] for any other name.
    pub fn parse(name: &str, args: &[String]) -> Result<Self, EngineError> {
        match name.trim_start_matches('/').to_lowercase().as_str() {
            "sleep" => Ok(Self::Sleep),
            "reload" => Ok(Self::Reload),
            "setsleeppercentage" => Ok(Self::SetSleepPercentage(
                args.first().and_then(|arg| arg.trim().parse().ok()),
            )),
            _ => Err(EngineError::UnknownCommand {
                name: name.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type":"join","player":"alice","world":"world"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::Join {
                player: String::from("alice"),
                world: String::from("world")
            }
        );

        let event: HostEvent = serde_json::from_str(r#"{"type":"bed_leave","player":"bob"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::BedLeave {
                player: String::from("bob")
            }
        );
    }

    #[test]
    fn weather_flags_default_to_false() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type":"weather","world":"world","storm":true}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::Weather {
                world: String::from("world"),
                storm: true,
                thundering: false
            }
        );
    }

    #[test]
    fn console_command_has_no_player() {
        let event: HostEvent = serde_json::from_str(r#"{"type":"command","name":"reload"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::Command {
                player: None,
                name: String::from("reload"),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let event = serde_json::from_str::<HostEvent>(r#"{"type":"fly","player":"alice"}"#);
        assert!(event.is_err());
    }

    #[test]
    fn recognises_commands() {
        assert_eq!(Command::parse("sleep", &[]).unwrap(), Command::Sleep);
        assert_eq!(Command::parse("/Reload", &[]).unwrap(), Command::Reload);
        assert_eq!(
            Command::parse("setSleepPercentage", &[String::from("0.3")]).unwrap(),
            Command::SetSleepPercentage(Some(0.3))
        );
        assert_eq!(
            Command::parse("setsleeppercentage", &[String::from("lots")]).unwrap(),
            Command::SetSleepPercentage(None)
        );
        assert_eq!(
            Command::parse("setsleeppercentage", &[]).unwrap(),
            Command::SetSleepPercentage(None)
        );
        assert!(matches!(
            Command::parse("fly", &[]),
            Err(EngineError::UnknownCommand { .. })
        ));
    }
}
