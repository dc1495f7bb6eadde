use colored::Colorize;
use log::{Level, LevelFilter};
use std::io::Write;

/// Installs the console logger. `RUST_LOG` still overrides the default level.
pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", format_message(record.level(), &record.args().to_string())));
    let _ = builder.try_init();
}

/// Severity prefix and color for one console message.
pub fn format_message(level: Level, message: &str) -> String {
    match level {
        Level::Error => format!("{} {}", "Error:".red(), message),
        Level::Warn => format!("{} {}", "Warning:".yellow(), message),
        Level::Info => format!("{}", message.cyan()),
        Level::Debug | Level::Trace => format!("{}", message.dimmed()),
    }
}
