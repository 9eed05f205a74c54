//! Live channel events, validated into tagged variants at the boundary.
//!
//! The server sends named events whose `data` is a JSON object. A payload that
//! does not match the shape expected for its name is rejected here instead of
//! being read field by field further in.

use serde::Deserialize;
use thiserror::Error;

use crate::Artifact;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Artifact(Artifact),
    Status(StatusEvent),
    Log(LogLine),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum StatusEvent {
    Started,
    Finished {
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogLine {
    pub stream: String,
    pub line: String,
}

impl LogLine {
    /// Same `[stream] line` layout the server writes to its log file.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.stream, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("malformed `{event}` payload: {message}")]
    Malformed { event: String, message: String },
}

impl LiveEvent {
    /// Validates a raw `(event name, data)` pair.
    pub fn parse(event: &str, data: &str) -> Result<Self, EventParseError> {
        match event {
            "artifact" => decode(event, data).map(LiveEvent::Artifact),
            "status" => decode(event, data).map(LiveEvent::Status),
            "log" => decode(event, data).map(LiveEvent::Log),
            other => Err(EventParseError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Artifact(_) => "artifact",
            LiveEvent::Status(_) => "status",
            LiveEvent::Log(_) => "log",
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &str, data: &str) -> Result<T, EventParseError> {
    serde_json::from_str(data).map_err(|err| EventParseError::Malformed {
        event: event.to_string(),
        message: err.to_string(),
    })
}
