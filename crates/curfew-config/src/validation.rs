//! Configuration validation

use crate::schema::RawConfig;
use std::net::SocketAddr;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format for {field} '{value}': {message}")]
    InvalidTimeFormat {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("Device address cannot be empty")]
    EmptyDeviceAddress,

    #[error("tick_seconds must be greater than zero")]
    ZeroTick,

    #[error("connect timeout {timeout_ms}ms must be shorter than the tick interval {tick_ms}ms")]
    TimeoutExceedsTick { timeout_ms: u64, tick_ms: u64 },

    #[error("Volume cap {0} is out of range (0-100)")]
    VolumeCapOutOfRange(u8),

    #[error("free_window_end {end} must be after free_window_start {start}")]
    FreeWindowInverted { start: String, end: String },

    #[error("Invalid http_bind address '{0}'")]
    InvalidBindAddress(String),
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.device.address.trim().is_empty() {
        errors.push(ValidationError::EmptyDeviceAddress);
    }

    let schedule = &config.schedule;
    let tick_secs = schedule.tick_seconds.unwrap_or(crate::DEFAULT_TICK_SECONDS);
    if tick_secs == 0 {
        errors.push(ValidationError::ZeroTick);
    } else {
        let timeout_ms = config
            .device
            .connect_timeout_ms
            .unwrap_or(crate::DEFAULT_CONNECT_TIMEOUT_MS);
        let tick_ms = tick_secs * 1000;
        if timeout_ms >= tick_ms {
            errors.push(ValidationError::TimeoutExceedsTick {
                timeout_ms,
                tick_ms,
            });
        }
    }

    let times = [
        ("blocked_before", &schedule.blocked_before),
        ("free_window_start", &schedule.free_window_start),
        ("free_window_end", &schedule.free_window_end),
        ("enable_reset_at", &schedule.enable_reset_at),
    ];
    for (field, value) in times {
        if let Some(value) = value {
            check_time(field, value, &mut errors);
        }
    }

    if let Some(end) = &schedule.free_window_end {
        let start = schedule
            .free_window_start
            .as_deref()
            .unwrap_or(crate::DEFAULT_FREE_WINDOW_START);
        if let (Ok(s), Ok(e)) = (parse_time(start), parse_time(end))
            && e <= s
        {
            errors.push(ValidationError::FreeWindowInverted {
                start: start.to_string(),
                end: end.clone(),
            });
        }
    }

    if let Some(volume) = &config.volume {
        if volume.cap > 100 {
            errors.push(ValidationError::VolumeCapOutOfRange(volume.cap));
        }
        check_time("volume.until", &volume.until, &mut errors);
    }

    if let Some(bind) = &config.service.http_bind
        && bind.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidBindAddress(bind.clone()));
    }

    errors
}

fn check_time(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if let Err(message) = parse_time(value) {
        errors.push(ValidationError::InvalidTimeFormat {
            field,
            value: value.to_string(),
            message,
        });
    }
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<(u8, u8), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = parts[0]
        .parse()
        .map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = parts[1]
        .parse()
        .map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }

    Ok((hour, minute))
}
