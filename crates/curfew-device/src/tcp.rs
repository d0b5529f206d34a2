//! TCP device client
//!
//! Each frame is one JSON object terminated by a newline. Requests carry an
//! id that the device echoes in its reply:
//!
//! ```text
//! -> {"id":1,"type":"request","uri":"ssap://audio/getStatus"}
//! <- {"id":1,"type":"response","payload":{"returnValue":true,"volume":8}}
//! <- {"id":2,"type":"error","error":"401 insufficient permissions"}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace};

use crate::{DeviceClient, DeviceCommand, DeviceError, DeviceResult, DeviceSession};

/// Longest frame accepted from the device, newline included
const MAX_FRAME_BYTES: u64 = 64 * 1024;

#[derive(Debug, Serialize)]
struct RequestFrame<'a> {
    id: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Connects to the television over TCP
#[derive(Debug, Clone)]
pub struct TcpDeviceClient {
    address: String,
    command_timeout: Duration,
}

impl TcpDeviceClient {
    pub fn new(address: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            command_timeout,
        }
    }
}

#[async_trait]
impl DeviceClient for TcpDeviceClient {
    async fn connect(&self, timeout: Duration) -> DeviceResult<Box<dyn DeviceSession>> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&self.address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(DeviceError::Unreachable(e.to_string())),
            Err(_) => return Err(DeviceError::ConnectTimeout(timeout)),
        };
        if let Err(e) = stream.set_nodelay(true) {
            trace!(error = %e, "Could not set TCP_NODELAY");
        }
        debug!(address = %self.address, "Connected to device");

        let (read_half, write_half) = stream.into_split();
        Ok(Box::new(TcpDeviceSession {
            reader: BufReader::new(read_half),
            writer: Some(write_half),
            next_request_id: 1,
            command_timeout: self.command_timeout,
        }))
    }
}

/// One open TCP connection to the device
pub struct TcpDeviceSession {
    reader: BufReader<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    next_request_id: u64,
    command_timeout: Duration,
}

impl TcpDeviceSession {
    async fn round_trip(&mut self, command: DeviceCommand) -> DeviceResult<Value> {
        let writer = self.writer.as_mut().ok_or(DeviceError::SessionClosed)?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = RequestFrame {
            id: request_id,
            kind: "request",
            uri: command.uri(),
            payload: command.payload(),
        };
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;

        loop {
            let mut line = String::new();
            let n = (&mut self.reader)
                .take(MAX_FRAME_BYTES)
                .read_line(&mut line)
                .await?;
            if n == 0 {
                return Err(DeviceError::ConnectionClosed);
            }
            if n as u64 == MAX_FRAME_BYTES && !line.ends_with('\n') {
                return Err(DeviceError::Protocol(format!(
                    "frame exceeds {} bytes",
                    MAX_FRAME_BYTES
                )));
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: ResponseFrame = serde_json::from_str(line)?;
            if frame.id != Some(request_id) {
                // Unsolicited events and stale replies
                trace!(id = ?frame.id, kind = %frame.kind, "Skipping unrelated frame");
                continue;
            }

            return match frame.kind.as_str() {
                "response" => {
                    if frame.payload.get("returnValue") == Some(&Value::Bool(false)) {
                        let message = frame
                            .payload
                            .get("errorText")
                            .and_then(Value::as_str)
                            .unwrap_or("returnValue false")
                            .to_string();
                        Err(DeviceError::CommandFailed {
                            command: command.uri(),
                            message,
                        })
                    } else {
                        Ok(frame.payload)
                    }
                }
                "error" => Err(DeviceError::CommandFailed {
                    command: command.uri(),
                    message: frame.error.unwrap_or_else(|| "unknown error".into()),
                }),
                other => Err(DeviceError::Protocol(format!(
                    "unexpected frame type: {}",
                    other
                ))),
            };
        }
    }
}

#[async_trait]
impl DeviceSession for TcpDeviceSession {
    async fn send(&mut self, command: DeviceCommand) -> DeviceResult<Value> {
        match tokio::time::timeout(self.command_timeout, self.round_trip(command)).await {
            Ok(result) => result,
            Err(_) => Err(DeviceError::CommandTimeout {
                command: command.uri(),
            }),
        }
    }

    async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
            debug!("Device session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Answers each request with `reply(request)`, one connection only
    async fn fake_device<F>(reply: F) -> String
    where
        F: Fn(&Value) -> Vec<Value> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    break;
                }
                let request: Value = serde_json::from_str(line.trim()).unwrap();
                for frame in reply(&request) {
                    let mut out = frame.to_string();
                    out.push('\n');
                    write_half.write_all(out.as_bytes()).await.unwrap();
                }
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_audio_status_round_trip() {
        let addr = fake_device(|req| {
            assert_eq!(req["type"], "request");
            assert_eq!(req["uri"], "ssap://audio/getStatus");
            vec![json!({
                "id": req["id"],
                "type": "response",
                "payload": { "returnValue": true, "volume": 9, "mute": false }
            })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        let status = session.audio_status().await.unwrap();
        assert_eq!(status.volume, 9);
        session.close().await;
    }

    #[tokio::test]
    async fn test_set_volume_sends_payload() {
        let addr = fake_device(|req| {
            assert_eq!(req["uri"], "ssap://audio/setVolume");
            assert_eq!(req["payload"]["volume"], 5);
            vec![json!({ "id": req["id"], "type": "response", "payload": { "returnValue": true } })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        session.set_volume(5).await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    async fn test_unrelated_frames_are_skipped() {
        let addr = fake_device(|req| {
            vec![
                json!({ "type": "event", "payload": { "foregroundApp": "netflix" } }),
                json!({ "id": 999, "type": "response", "payload": {} }),
                json!({ "id": req["id"], "type": "response", "payload": { "returnValue": true } }),
            ]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        assert!(session.power_off().await.is_ok());
        session.close().await;
    }

    #[tokio::test]
    async fn test_error_frame_is_command_failure() {
        let addr = fake_device(|req| {
            vec![json!({ "id": req["id"], "type": "error", "error": "401 insufficient permissions" })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        let err = session.power_off().await.unwrap_err();
        match err {
            DeviceError::CommandFailed { command, message } => {
                assert_eq!(command, "ssap://system/turnOff");
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error: {other}"),
        }
        session.close().await;
    }

    #[tokio::test]
    async fn test_return_value_false_is_command_failure() {
        let addr = fake_device(|req| {
            vec![json!({
                "id": req["id"],
                "type": "response",
                "payload": { "returnValue": false, "errorText": "volume locked" }
            })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        let err = session.set_volume(3).await.unwrap_err();
        assert!(matches!(err, DeviceError::CommandFailed { .. }));
        session.close().await;
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let addr = fake_device(|req| {
            vec![json!({
                "id": req["id"],
                "type": "response",
                "payload": { "returnValue": true, "padding": "x".repeat(100_000) }
            })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        let err = session.audio_status().await.unwrap_err();
        match err {
            DeviceError::Protocol(message) => assert!(message.contains("65536")),
            other => panic!("unexpected error: {other}"),
        }
        session.close().await;
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        let addr = fake_device(|_| Vec::new()).await;

        let client = TcpDeviceClient::new(addr, Duration::from_millis(100));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        let err = session.audio_status().await.unwrap_err();
        assert!(matches!(err, DeviceError::CommandTimeout { .. }));
        session.close().await;
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let err = client.connect(Duration::from_secs(1)).await.err().unwrap();
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let addr = fake_device(|req| {
            vec![json!({ "id": req["id"], "type": "response", "payload": {} })]
        })
        .await;

        let client = TcpDeviceClient::new(addr, Duration::from_secs(1));
        let mut session = client.connect(Duration::from_secs(1)).await.unwrap();
        session.close().await;
        session.close().await;
        let err = session.power_off().await.unwrap_err();
        assert!(matches!(err, DeviceError::SessionClosed));
    }
}
