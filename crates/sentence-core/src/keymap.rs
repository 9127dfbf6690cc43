use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Backspace,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    pub const ALL: [Key; 4] = [Key::Enter, Key::Backspace, Key::ArrowLeft, Key::ArrowRight];

    pub fn name(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Backspace => "Backspace",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0:?}")]
pub struct KeyParseError(pub String);

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enter" | "return" => Ok(Key::Enter),
            "backspace" => Ok(Key::Backspace),
            "left" | "arrowleft" => Ok(Key::ArrowLeft),
            "right" | "arrowright" => Ok(Key::ArrowRight),
            _ => Err(KeyParseError(s.to_string())),
        }
    }
}

/// Binds a key to a registered command id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: Key,
    pub command: String,
}

impl KeyBinding {
    pub fn new(key: Key, command: impl Into<String>) -> Self {
        Self {
            key,
            command: command.into(),
        }
    }
}
