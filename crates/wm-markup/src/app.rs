//! Application facts shared by built-in variables and plugins.

use std::time::{Duration, Instant};

/// Name, version and start time of the hosting application.
#[derive(Clone, Debug)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub base_url: String,
    started: Instant,
}

impl AppInfo {
    /// Create application info with this crate's version, started now.
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            base_url: base_url.into(),
            started: Instant::now(),
        }
    }

    /// Override the reported version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Time since the application started.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for AppInfo {
    fn default() -> Self {
        Self::new("wikimark", "http://localhost:3000")
    }
}

/// Format an uptime as `Xd Yh Zm`, dropping leading zero units.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
