use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::env;

/// Level from `--level`, else `RUST_LOG`, else info.
pub fn log_level(level: Option<&str>) -> LevelFilter {
    let raw = match level {
        Some(level) => level.to_string(),
        None => env::var("RUST_LOG").unwrap_or_default(),
    };
    match raw.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Logs go to stderr; stdout carries the tables and status lines.
pub fn setup_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}: {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
