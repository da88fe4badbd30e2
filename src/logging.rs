use std::path::PathBuf;

use color_eyre::Result;
use color_eyre::eyre::Context;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Wire up console and optional file logging.
///
/// The console and the log file get independent level filters so a quiet
/// terminal can still leave a debug trail on disk.
pub fn setup_logging(
    console_level: LevelFilter,
    log_file: Option<PathBuf>,
    file_level: LevelFilter,
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::BrightBlack)
        .trace(Color::Magenta);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().chain(console);

    if let Some(path) = log_file {
        let file = fern::Dispatch::new()
            .level(file_level)
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {} {}] {}",
                    humantime::format_rfc3339_seconds(std::time::SystemTime::now()),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(
                fern::log_file(&path)
                    .wrap_err(format!("Failed to open log file: {}", path.display()))?,
            );
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().wrap_err("Failed to initialize logging")?;
    Ok(())
}
