//! 📡 logging.rs: how loud should we be?
//!
//! One `-v` per notch. Zero means warnings only, because CI logs are long enough already.
//! `RUST_LOG` still wins if someone set it, because someone always knows better.
//!
//! Output goes to stderr. Stdout belongs to the binary path we print at the end,
//! and scripts downstream will `$(...)` it without mercy.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// 🎚️ Logging setup, built once in `main` and handed to `init`. The library never touches it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub verbosity: u8,
}

impl LogConfig {
    pub fn from_verbosity(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// 📊 0 → WARN, 1 → INFO, 2 → DEBUG, 3+ → TRACE.
    pub fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level().into())
            .from_env_lossy()
    }

    /// 🚀 Install the global subscriber. Call once. Calling twice is an error, not a panic.
    pub fn init(&self) -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!("💀 Could not install the tracing subscriber: {err}"))
    }
}
