//! Logging configuration from the CLI flags.

use colored::*;
use fern::Dispatch;
use log::LevelFilter;
use regex::Regex;
use time::format_description;
use time::OffsetDateTime;

fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn colored_level(level: log::Level) -> ColoredString {
    match level {
        log::Level::Error => "ERROR".bright_red(),
        log::Level::Warn => "WARN".yellow(),
        log::Level::Info => "INFO".green(),
        log::Level::Debug => "DEBUG".cyan(),
        log::Level::Trace => "TRACE".dimmed(),
    }
}

fn directive_level(name: Option<&str>) -> LevelFilter {
    match name {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        // bare target, or explicit "trace"
        _ => LevelFilter::Trace,
    }
}

/// Set up stderr logging. Component directives take the `TARGET[=LEVEL]`
/// form; a bare target logs at `trace`.
pub fn setup(verbose: u8, components: Vec<&str>, log_time: bool) -> Result<(), String> {
    let directive = Regex::new(r"^([A-Za-z0-9_:]+)(?:=(error|warn|info|debug|trace))?$")
        .map_err(|e| e.to_string())?;

    let mut dispatch = Dispatch::new().level(verbosity_level(verbose));
    for spec in components {
        let caps = directive.captures(spec).ok_or_else(|| {
            format!("Invalid log directive '{}', expected TARGET[=LEVEL]", spec)
        })?;
        let target = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let level = directive_level(caps.get(2).map(|m| m.as_str()));
        dispatch = dispatch.level_for(target.to_string(), level);
    }

    let time_format = format_description::parse("[hour]:[minute]:[second].[subsecond digits:3]")
        .map_err(|e| e.to_string())?;

    dispatch
        .format(move |out, message, record| {
            let level = colored_level(record.level());
            if log_time {
                let now =
                    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
                let stamp = now.format(&time_format).unwrap_or_default();
                out.finish(format_args!(
                    "{} {:>5} {} {}",
                    stamp.dimmed(),
                    level,
                    record.target().dimmed(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{:>5} {} {}",
                    level,
                    record.target().dimmed(),
                    message
                ))
            }
        })
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
