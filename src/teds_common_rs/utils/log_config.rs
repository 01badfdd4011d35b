use chrono::Local;
use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use super::config_loader::LogSettings;

pub fn parse_level(s: &str) -> Result<LevelFilter, String> {
    match s.to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" => Ok(LevelFilter::Off),
        _ => Err(format!("Invalid log level: {}", s)),
    }
}

/// `RUST_LOG` wins over the configured level; `debug` forces debug output.
pub fn build_logger(settings: &LogSettings, debug: bool) -> Builder {
    let level = if debug { "debug" } else { settings.level.as_str() };
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    let timestamps = settings.timestamps;
    builder.format(move |buf, record| {
        if timestamps {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(buf, "[{}] [{}] {}", record.level(), record.target(), record.args())
        }
    });
    builder
}

/// Installs the global logger. A second call is a no-op.
pub fn init_logging(settings: &LogSettings, debug: bool) {
    let _ = build_logger(settings, debug).try_init();
}
