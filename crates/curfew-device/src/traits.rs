//! Device client traits

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::{AudioStatus, DeviceCommand};

/// Errors from device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Command {command} timed out")]
    CommandTimeout { command: &'static str },

    #[error("Command {command} failed: {message}")]
    CommandFailed {
        command: &'static str,
        message: String,
    },

    #[error("Session already closed")]
    SessionClosed,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeviceError {
    /// True when the device could not be reached at all, which the
    /// enforcement cycle reads as "the television is off".
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::ConnectTimeout(_))
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Opens short-lived sessions to the television
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Connect within `timeout`. Failure means the device is off or absent.
    async fn connect(&self, timeout: Duration) -> DeviceResult<Box<dyn DeviceSession>>;
}

/// An open connection to the device.
///
/// Callers must call [`DeviceSession::close`] on every path once they are
/// done, including after a failed command.
#[async_trait]
pub trait DeviceSession: Send {
    /// Send one command and wait for its reply payload
    async fn send(&mut self, command: DeviceCommand) -> DeviceResult<Value>;

    /// Release the connection. Closing twice is a no-op.
    async fn close(&mut self);

    async fn audio_status(&mut self) -> DeviceResult<AudioStatus> {
        let payload = self.send(DeviceCommand::GetAudioStatus).await?;
        AudioStatus::from_response(&payload)
    }

    async fn set_volume(&mut self, volume: u8) -> DeviceResult<()> {
        self.send(DeviceCommand::SetVolume { volume }).await.map(|_| ())
    }

    async fn power_off(&mut self) -> DeviceResult<()> {
        self.send(DeviceCommand::PowerOff).await.map(|_| ())
    }
}
