//! Global logging backend of the simulator.
//!
//! What gets logged at which level:
//! - `error`: failures of the statistics CSV output.
//! - `warn`: recoverable anomalies, e.g. a learned strategy picking empty slots during evaluation.
//! - `info`: configuration loading, training and evaluation phases, per-strategy summaries
//!   and the final comparison table. Training progress every 1000 steps.
//! - `debug`: per-step arrivals, drops, expiry and buffer occupancy; network creation.
//! - `trace`: every single transmission.
use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::path::Path;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "relay_sim.log";
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Level requested through `RUST_LOG`, `info` if unset or unparsable.
pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    value.and_then(|v| v.trim().parse::<LevelFilter>().ok()).unwrap_or(DEFAULT_LEVEL)
}

/// Installs the global logger: coloured records on stderr and plain records in `logs/relay_sim.log`.
///
/// Call once at the start of `main`. A second call only reports that a logger is
/// already installed. The level comes from `RUST_LOG`,
/// e.g. `RUST_LOG=debug relay-sim --strategy dqn`.
pub fn init() {
    let level = level_from_env(std::env::var("RUST_LOG").ok().as_deref());
    let log_file_path = Path::new(LOG_DIR).join(LOG_FILE);

    let colors = ColoredLevelConfig::new().error(Color::Red).warn(Color::Yellow).info(Color::Green).debug(Color::Blue).trace(Color::BrightBlack);

    let console = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("[{} {} {}] {}", Local::now().format("%H:%M:%S%.3f"), colors.color(record.level()), record.target(), message))
        })
        .chain(std::io::stderr());

    let mut dispatch = Dispatch::new().level(level).level_for("serde", LevelFilter::Warn).chain(console);

    // Without a writable working directory the run continues with console output only.
    let file = fs::create_dir_all(LOG_DIR).and_then(|_| fern::log_file(&log_file_path));
    let file_enabled = match file {
        Ok(file) => {
            dispatch = dispatch.chain(
                Dispatch::new()
                    .format(|out, message, record| {
                        out.finish(format_args!("[{} {} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), record.target(), message))
                    })
                    .chain(file),
            );
            true
        }
        Err(e) => {
            eprintln!("Log file '{}' unavailable, logging to console only: {}", log_file_path.display(), e);
            false
        }
    };

    if let Err(e) = dispatch.apply() {
        eprintln!("Logger already installed: {}", e);
        return;
    }

    if file_enabled {
        log::info!("Logging at level {} to console and '{}'.", level, log_file_path.display());
    } else {
        log::info!("Logging at level {} to console.", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_info() {
        assert_eq!(level_from_env(None), LevelFilter::Info);
        assert_eq!(level_from_env(Some("chatty")), LevelFilter::Info);
    }

    #[test]
    fn level_is_read_case_insensitively() {
        assert_eq!(level_from_env(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(level_from_env(Some(" trace ")), LevelFilter::Trace);
        assert_eq!(level_from_env(Some("off")), LevelFilter::Off);
    }
}
