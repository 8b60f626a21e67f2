//! Logging capability handed to every pipeline stage
//!
//! Stages never touch a global logger directly. They receive a `&dyn Reporter`
//! so tests can capture warnings with `MemoryReporter` instead of installing
//! a process-wide subscriber.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub trait Reporter {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Production reporter: forwards to the `tracing` subscriber installed by
/// [`init_tracing`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!(target: "etl", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "etl", "{}", message);
    }
}

/// Install the global subscriber: formatted output on stdout plus, when a
/// path is given, plain-text lines appended to a log file.
///
/// `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

#[cfg(test)]
pub use memory::MemoryReporter;

#[cfg(test)]
mod memory {
    use super::Reporter;
    use std::cell::RefCell;

    /// Collects messages in memory for assertions.
    #[derive(Debug, Default)]
    pub struct MemoryReporter {
        infos: RefCell<Vec<String>>,
        warnings: RefCell<Vec<String>>,
    }

    impl MemoryReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn infos(&self) -> Vec<String> {
            self.infos.borrow().clone()
        }

        pub fn warnings(&self) -> Vec<String> {
            self.warnings.borrow().clone()
        }
    }

    impl Reporter for MemoryReporter {
        fn info(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_string());
        }

        fn warn(&self, message: &str) {
            self.warnings.borrow_mut().push(message.to_string());
        }
    }
}
