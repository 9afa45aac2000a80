//! File-backed tracing setup.
//!
//! The terminal belongs to the UI while it runs, so events only go to
//! `HUNTER_LOG_FILE`. Without it no subscriber is installed and every
//! `tracing` call is a no-op.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{HunterConfig, DEFAULT_LOG_FILTER};

/// Installs the global subscriber. Returns `false` when logging is disabled.
pub fn init(config: &HunterConfig) -> io::Result<bool> {
    let Some(path) = config.log_file.as_deref() else {
        return Ok(false);
    };

    let file = open_log_file(path)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(&config.log_filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    Ok(installed)
}

/// Parses `directives`, falling back to the default filter when invalid.
pub fn build_env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    OpenOptions::new().create(true).append(true).open(path)
}
