//! Logger module
//!
//! Provides logging utilities for the backend including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - Dev-server supervisor events

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};
pub use writer::LogLevel;

use crate::config::{Config, DevServerConfig};
use std::io;
use std::net::SocketAddr;
use std::process::ExitStatus;
use std::sync::OnceLock;

static ACCESS_FORMAT: OnceLock<AccessLogFormat> = OnceLock::new();

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> io::Result<()> {
    let level = config
        .logging
        .level
        .parse::<LogLevel>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let _ = ACCESS_FORMAT.set(AccessLogFormat::parse(&config.logging.access_log_format));

    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn enabled(level: LogLevel) -> bool {
    writer::get().map_or(level <= LogLevel::Info, |w| w.enabled(level))
}

/// Write to info/access log
fn write_info(message: &str) {
    if !enabled(LogLevel::Info) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_debug(message: &str) {
    if !enabled(LogLevel::Debug) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Sheet backend started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    write_info(&format!("Static bundle: {}", config.static_files.root));
    write_info(&format!(
        "Dev server command: {} {} (in {})",
        config.dev_server.program,
        config.dev_server.args.join(" "),
        config.dev_server.working_dir
    ));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(LogLevel::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(LogLevel::Warn, &format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry) {
    let line = match ACCESS_FORMAT.get() {
        Some(format) => entry.render(format),
        None => entry.render(&AccessLogFormat::Combined),
    };
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_sheet_saved(id: &str, replaced: bool) {
    let verb = if replaced { "Overwrote" } else { "Saved" };
    write_debug(&format!("[Store] {verb} sheet '{id}'"));
}

pub fn log_dev_server_started(command: &DevServerConfig, pid: Option<u32>) {
    let pid = pid.map_or_else(|| "?".to_string(), |p| p.to_string());
    write_info(&format!(
        "[DevServer] Started '{} {}' in '{}' (pid {pid})",
        command.program,
        command.args.join(" "),
        command.working_dir
    ));
}

pub fn log_dev_server_reused(pid: Option<u32>) {
    let pid = pid.map_or_else(|| "?".to_string(), |p| p.to_string());
    write_info(&format!("[DevServer] Already running (pid {pid}), not spawning another"));
}

pub fn log_dev_server_exited(status: &ExitStatus) {
    write_error(LogLevel::Warn, &format!("[DevServer] Exited on its own: {status}"));
}

pub fn log_dev_server_stopped(status: &ExitStatus) {
    write_info(&format!("[DevServer] Stopped: {status}"));
}

pub fn log_shutdown(reason: &str) {
    write_info(&format!("\n[Shutdown] {reason}, stopping server"));
}
