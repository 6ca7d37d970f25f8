//! Timeout budget applied per transport instance.

use std::time::Duration;

/// Connect, read and total timeouts for one transport.
///
/// The three dimensions are independent: `connect` bounds connection
/// establishment, `read` bounds each read from the socket, `total` bounds
/// the whole exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    /// Connection establishment timeout.
    pub connect: Duration,
    /// Per-read timeout.
    pub read: Duration,
    /// Whole-request timeout.
    pub total: Duration,
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(30),
            total: Duration::from_secs(30),
        }
    }
}

impl TimeoutBudget {
    /// Creates a budget from explicit durations.
    pub const fn new(connect: Duration, read: Duration, total: Duration) -> Self {
        Self {
            connect,
            read,
            total,
        }
    }

    /// Returns `true` if every dimension is non-zero.
    pub fn is_valid(&self) -> bool {
        !self.connect.is_zero() && !self.read.is_zero() && !self.total.is_zero()
    }

    /// Derives the budget for a single call.
    ///
    /// Connect and read overrides replace their own dimension only. When
    /// either is overridden, `total` grows to at least `connect + read` so a
    /// long-poll read is not cut short by the instance-wide total.
    pub fn with_overrides(&self, overrides: &TimeoutOverrides) -> Self {
        if overrides.connect.is_none() && overrides.read.is_none() {
            return *self;
        }
        let connect = overrides.connect.unwrap_or(self.connect);
        let read = overrides.read.unwrap_or(self.read);
        Self {
            connect,
            read,
            total: self.total.max(connect.saturating_add(read)),
        }
    }
}

/// Per-call timeout overrides as passed by the bot-API client.
///
/// `write` and `pool` are accepted for signature compatibility; there is no
/// pool to wait on and writes are covered by `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutOverrides {
    /// Connect timeout override.
    pub connect: Option<Duration>,
    /// Read timeout override.
    pub read: Option<Duration>,
    /// Write timeout (ignored).
    pub write: Option<Duration>,
    /// Pool timeout (ignored).
    pub pool: Option<Duration>,
}

impl TimeoutOverrides {
    /// No overrides.
    pub const NONE: Self = Self {
        connect: None,
        read: None,
        write: None,
        pool: None,
    };

    /// Sets the connect override.
    pub fn with_connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    /// Sets the read override.
    pub fn with_read(mut self, timeout: Duration) -> Self {
        self.read = Some(timeout);
        self
    }

    /// Sets the write override.
    pub fn with_write(mut self, timeout: Duration) -> Self {
        self.write = Some(timeout);
        self
    }

    /// Sets the pool override.
    pub fn with_pool(mut self, timeout: Duration) -> Self {
        self.pool = Some(timeout);
        self
    }

    /// Returns `true` if nothing is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overrides_keeps_budget() {
        let budget = TimeoutBudget::default();
        assert_eq!(budget.with_overrides(&TimeoutOverrides::NONE), budget);

        let ignored = TimeoutOverrides::NONE
            .with_write(Duration::from_secs(1))
            .with_pool(Duration::from_secs(1));
        assert_eq!(budget.with_overrides(&ignored), budget);
    }

    #[test]
    fn test_overrides_stay_independent() {
        let budget = TimeoutBudget::new(
            Duration::from_secs(15),
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
        let derived = budget.with_overrides(&TimeoutOverrides::NONE.with_connect(Duration::from_secs(2)));
        assert_eq!(derived.connect, Duration::from_secs(2));
        assert_eq!(derived.read, Duration::from_secs(30));
        assert_eq!(derived.total, Duration::from_secs(32));
    }

    #[test]
    fn test_long_read_extends_total() {
        let budget = TimeoutBudget::default();
        let derived = budget.with_overrides(&TimeoutOverrides::NONE.with_read(Duration::from_secs(60)));
        assert_eq!(derived.read, Duration::from_secs(60));
        assert_eq!(derived.total, Duration::from_secs(70));
    }

    #[test]
    fn test_validity() {
        assert!(TimeoutBudget::default().is_valid());
        let zero = TimeoutBudget::new(Duration::ZERO, Duration::from_secs(1), Duration::from_secs(1));
        assert!(!zero.is_valid());
    }
}
