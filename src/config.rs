use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{Error, Result};

const DEFAULT_TTL_SECS: u32 = 31 * 24 * 60 * 60;
const DEFAULT_REFRESH_WINDOW_SECS: u32 = 24 * 60 * 60;

/// Lifetime and refresh policy applied by the [`SessionManager`](crate::SessionManager).
///
/// Deserializable so it can live in an application's own configuration file;
/// missing fields take their defaults.
///
/// ```
/// use server_sessions_seaorm::SessionConfig;
/// use time::Duration;
///
/// let config = SessionConfig::default()
///     .with_ttl(Duration::hours(12))
///     .with_refresh_window(Duration::hours(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session lives after its last persisted write.
    pub ttl_secs: u32,
    /// A clean session is re-saved when it is this close to expiring, which
    /// gives sliding-window expiry without writing on every request.
    pub refresh_window_secs: u32,
    /// Issue a new client token whenever the owning user of a bound session
    /// changes. When off, the user is updated in place.
    pub rotate_on_user_change: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            refresh_window_secs: DEFAULT_REFRESH_WINDOW_SECS,
            rotate_on_user_change: false,
        }
    }
}

impl SessionConfig {
    /// Sets the session lifetime, clamped to whole seconds.
    ///
    /// A refresh window that no longer fits inside the new lifetime is
    /// shrunk to half of it; set the window afterwards to override.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = clamp_secs(ttl);
        if self.refresh_window_secs >= self.ttl_secs {
            self.refresh_window_secs = self.ttl_secs / 2;
        }
        self
    }

    /// Sets the near-expiry refresh window, clamped to whole seconds.
    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window_secs = clamp_secs(window);
        self
    }

    pub fn with_rotate_on_user_change(mut self, rotate: bool) -> Self {
        self.rotate_on_user_change = rotate;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.ttl_secs))
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::seconds(i64::from(self.refresh_window_secs))
    }

    /// Rejects settings that would make every write an expired one or force a
    /// save on every request.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(Error::Config("session lifetime must be positive".into()));
        }
        if self.refresh_window_secs >= self.ttl_secs {
            return Err(Error::Config(format!(
                "refresh window ({}s) must be shorter than the session lifetime ({}s)",
                self.refresh_window_secs, self.ttl_secs
            )));
        }
        Ok(())
    }
}

fn clamp_secs(duration: Duration) -> u32 {
    duration.whole_seconds().clamp(0, i64::from(u32::MAX)) as u32
}
