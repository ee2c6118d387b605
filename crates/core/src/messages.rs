use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::ManualControlState;
use crate::model::{MediaPayload, StartDateTimePayload, TrackSummary};
use crate::pattern::PatternKind;

/// Commands accepted from the control surface, one JSON object each, tagged
/// by `command`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StageCommand {
    /// A new track started playing.
    Media(MediaPayload),
    /// Correct the start of the current track without changing it.
    Position(StartDateTimePayload),
    Enabled {
        #[serde(default)]
        enabled: bool,
    },
    /// Latest gamepad state.
    Control(ManualControlState),
    /// Switch capture device; `null` stops capturing.
    Microphone {
        #[serde(default)]
        microphone: Option<String>,
    },
    Status,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FromStr for StageCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Snapshot of the stage for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatus {
    pub enabled: bool,
    pub beat: bool,
    pub tempo: f32,
    pub spectrum_adjusted: Vec<f32>,
    pub track: TrackSummary,
    pub microphone: Option<String>,
    pub pattern: Option<PatternKind>,
}

/// Response written back for each command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    Success { success: bool },
    Status(StageStatus),
    Error { error: String },
}

impl CommandReply {
    pub fn ok() -> Self {
        CommandReply::Success { success: true }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        CommandReply::Error {
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let command: StageCommand = r#"{"command": "enabled", "enabled": true}"#.parse().unwrap();
        assert!(matches!(command, StageCommand::Enabled { enabled: true }));

        let command: StageCommand = r#"{"command": "control", "cross": true, "rt": 0.75}"#
            .parse()
            .unwrap();
        let StageCommand::Control(state) = command else {
            panic!("expected control");
        };
        assert!(state.cross);
        assert_eq!(state.rt, 0.75);

        let command: StageCommand =
            r#"{"command": "position", "elapsed": 3.0, "at": "2024-05-01T20:00:03Z"}"#
                .parse()
                .unwrap();
        let StageCommand::Position(position) = command else {
            panic!("expected position");
        };
        assert_eq!(position.start_instant().unwrap().to_rfc3339(), "2024-05-01T20:00:00+00:00");

        let command: StageCommand = r#"{"command": "media", "title": "Song"}"#.parse().unwrap();
        let StageCommand::Media(media) = command else {
            panic!("expected media");
        };
        assert_eq!(media.title.as_deref(), Some("Song"));

        let command: StageCommand = r#"{"command": "microphone", "microphone": null}"#
            .parse()
            .unwrap();
        assert!(matches!(command, StageCommand::Microphone { microphone: None }));
    }

    #[test]
    fn test_rejects_unknown_command() {
        let result = r#"{"command": "self_destruct"}"#.parse::<StageCommand>();
        assert!(matches!(result, Err(CommandError::Parse(_))));
        assert!("not json".parse::<StageCommand>().is_err());
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(
            serde_json::to_string(&CommandReply::ok()).unwrap(),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&CommandReply::Error {
                error: "nope".to_string()
            })
            .unwrap(),
            r#"{"error":"nope"}"#
        );
    }
}
