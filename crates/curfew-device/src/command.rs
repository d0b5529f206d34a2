//! Commands understood by the television

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{DeviceError, DeviceResult};

/// A request the daemon can send to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Query current volume and mute state
    GetAudioStatus,
    /// Set the absolute output volume
    SetVolume { volume: u8 },
    VolumeUp,
    VolumeDown,
    /// Turn the television off
    PowerOff,
}

impl DeviceCommand {
    /// Opaque command name sent over the wire
    pub fn uri(&self) -> &'static str {
        match self {
            Self::GetAudioStatus => "ssap://audio/getStatus",
            Self::SetVolume { .. } => "ssap://audio/setVolume",
            Self::VolumeUp => "ssap://audio/volumeUp",
            Self::VolumeDown => "ssap://audio/volumeDown",
            Self::PowerOff => "ssap://system/turnOff",
        }
    }

    /// Command parameters, if any
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::SetVolume { volume } => Some(json!({ "volume": volume })),
            _ => None,
        }
    }
}

/// Reply to [`DeviceCommand::GetAudioStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AudioStatus {
    pub volume: u8,
    #[serde(default)]
    pub mute: bool,
}

impl AudioStatus {
    pub fn from_response(payload: &Value) -> DeviceResult<Self> {
        // Some firmwares nest the numbers under "volumeStatus"
        let source = payload.get("volumeStatus").unwrap_or(payload);
        Self::deserialize(source)
            .map_err(|e| DeviceError::Protocol(format!("bad audio status: {}", e)))
    }
}
