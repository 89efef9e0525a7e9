//! Console logging setup.

use std::fmt;
use std::time::Instant;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Renders the time since process start as `[MM:SS]`.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    start: Instant,
}

impl RunClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RunClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatTime for RunClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", mm_ss(self.start.elapsed().as_secs()))
    }
}

fn mm_ss(secs: u64) -> String {
    format!("[{:02}:{:02}]", secs / 60, secs % 60)
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init(no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(RunClock::new())
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}
