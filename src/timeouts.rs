//! Connect and request deadlines for the HTTP transport.
//!
//! A request that runs past its deadline fails like any other transport
//! failure, with a [`QueryError`](crate::QueryError).

use std::time::Duration;

/// Anything longer than this is treated as no deadline at all.
const NO_DEADLINE_ABOVE: Duration = Duration::from_secs(86400 * 365);

/// Connect and request deadlines.
///
/// # Examples
///
/// ```rust
/// use clickhouse_link::LinkTimeouts;
/// use std::time::Duration;
///
/// // 10s to connect, 30s per request
/// let timeouts = LinkTimeouts::default();
///
/// // Heavy aggregation over a remote cluster
/// let timeouts = LinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(5))
///     .request_timeout(Duration::from_secs(900))
///     .build();
///
/// // A server on localhost or in the same pod
/// let timeouts = LinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// TCP connect plus TLS handshake.
    pub connection_timeout: Duration,

    /// From sending the SQL until the whole reply body is read; zero disables.
    pub request_timeout: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl LinkTimeouts {
    pub fn builder() -> LinkTimeoutsBuilder {
        LinkTimeoutsBuilder {
            timeouts: Self::default(),
        }
    }

    /// For a server on the same host or network.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// For reports and other analytical queries that scan a lot of data.
    pub fn long_running() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
        }
    }

    /// Whether `duration` means "no deadline": zero, or longer than a year.
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > NO_DEADLINE_ABOVE
    }
}

/// Builder for [`LinkTimeouts`], starting from the defaults.
#[derive(Debug, Clone)]
pub struct LinkTimeoutsBuilder {
    timeouts: LinkTimeouts,
}

impl LinkTimeoutsBuilder {
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    /// Request deadline in seconds; 0 disables it.
    pub fn request_timeout_secs(self, secs: u64) -> Self {
        self.request_timeout(Duration::from_secs(secs))
    }

    pub fn build(self) -> LinkTimeouts {
        self.timeouts
    }
}
