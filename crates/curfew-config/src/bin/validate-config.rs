//! Config validation CLI tool
//!
//! Validates a curfewd configuration file and reports any errors.

use curfew_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a curfewd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match curfew_config::load_config(&config_path) {
        Ok(policy) => {
            let schedule = &policy.schedule;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", curfew_config::CURRENT_CONFIG_VERSION);
            println!("  Device: {}", policy.device.address);
            println!("  Tick: {}", format_duration(schedule.tick));
            println!("  Daily budget: {}", format_duration(schedule.daily_budget));
            println!("  Blocked before: {}", schedule.blocked_before);
            match schedule.free_window.end {
                Some(end) => println!("  Free window: {} - {}", schedule.free_window.start, end),
                None => println!("  Free window: after {}", schedule.free_window.start),
            }
            println!("  Re-enable at: {}", schedule.enable_reset_at);
            match &policy.volume {
                Some(volume) => {
                    println!("  Volume cap: {} until {}", volume.cap, volume.until)
                }
                None => println!("  Volume cap: none"),
            }
            println!("  State file: {}", policy.service.state_file.display());
            println!("  Status page: http://{}", policy.service.http_bind);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                curfew_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                curfew_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                curfew_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                curfew_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        curfew_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
