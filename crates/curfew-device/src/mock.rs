//! Mock device for testing

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{DeviceClient, DeviceCommand, DeviceError, DeviceResult, DeviceSession};

/// Shared state behind a [`MockDevice`] and all of its sessions
#[derive(Debug, Clone)]
pub struct MockDeviceState {
    /// Whether connect succeeds. Powering off clears it.
    pub reachable: bool,
    pub volume: u8,
    pub muted: bool,
    pub powered_off: bool,
    pub connects: usize,
    pub closes: usize,
    pub open_sessions: usize,
    /// Every command sent, in order
    pub sent: Vec<DeviceCommand>,
}

impl Default for MockDeviceState {
    fn default() -> Self {
        Self {
            reachable: true,
            volume: 10,
            muted: false,
            powered_off: false,
            connects: 0,
            closes: 0,
            open_sessions: 0,
            sent: Vec::new(),
        }
    }
}

/// In-process stand-in for the television
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockDeviceState>>,

    /// Configure the status query to fail
    pub fail_audio_status: Arc<Mutex<bool>>,

    /// Configure power and volume commands to fail
    pub fail_commands: Arc<Mutex<bool>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(self, volume: u8) -> Self {
        self.state.lock().unwrap().volume = volume;
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        let mut state = self.state.lock().unwrap();
        state.reachable = reachable;
        if reachable {
            state.powered_off = false;
        }
    }

    pub fn set_volume(&self, volume: u8) {
        self.state.lock().unwrap().volume = volume;
    }

    pub fn snapshot(&self) -> MockDeviceState {
        self.state.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<DeviceCommand> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    pub fn is_powered_off(&self) -> bool {
        self.state.lock().unwrap().powered_off
    }
}

#[async_trait]
impl DeviceClient for MockDevice {
    async fn connect(&self, timeout: Duration) -> DeviceResult<Box<dyn DeviceSession>> {
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(DeviceError::ConnectTimeout(timeout));
        }
        state.connects += 1;
        state.open_sessions += 1;

        Ok(Box::new(MockDeviceSession {
            state: self.state.clone(),
            fail_audio_status: *self.fail_audio_status.lock().unwrap(),
            fail_commands: *self.fail_commands.lock().unwrap(),
            closed: false,
        }))
    }
}

struct MockDeviceSession {
    state: Arc<Mutex<MockDeviceState>>,
    fail_audio_status: bool,
    fail_commands: bool,
    closed: bool,
}

#[async_trait]
impl DeviceSession for MockDeviceSession {
    async fn send(&mut self, command: DeviceCommand) -> DeviceResult<Value> {
        if self.closed {
            return Err(DeviceError::SessionClosed);
        }

        let mut state = self.state.lock().unwrap();
        state.sent.push(command);

        let failing = match command {
            DeviceCommand::GetAudioStatus => self.fail_audio_status,
            _ => self.fail_commands,
        };
        if failing {
            return Err(DeviceError::CommandFailed {
                command: command.uri(),
                message: "mock failure".into(),
            });
        }

        match command {
            DeviceCommand::GetAudioStatus => {
                return Ok(json!({
                    "returnValue": true,
                    "volume": state.volume,
                    "mute": state.muted,
                }));
            }
            DeviceCommand::SetVolume { volume } => state.volume = volume.min(100),
            DeviceCommand::VolumeUp => state.volume = state.volume.saturating_add(1).min(100),
            DeviceCommand::VolumeDown => state.volume = state.volume.saturating_sub(1),
            DeviceCommand::PowerOff => {
                state.powered_off = true;
                state.reachable = false;
            }
        }

        Ok(json!({ "returnValue": true }))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut state = self.state.lock().unwrap();
        state.closes += 1;
        state.open_sessions = state.open_sessions.saturating_sub(1);
    }
}
