use thiserror::Error;

/// Errors raised while building or delivering metric lines
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metric name that normalizes to nothing
    #[error("Invalid metric key: {0:?}")]
    InvalidMetricKey(String),

    /// Value that cannot be serialized
    #[error("Invalid value for metric {metric}: {reason}")]
    InvalidValue {
        /// Normalized metric key
        metric: String,
        /// What is wrong with the value
        reason: String,
    },

    /// Transport failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// 401 or 403 from the ingest endpoint
    #[error("Not authorized to send metrics (HTTP {status})")]
    Unauthorized {
        /// HTTP status code
        status: u16,
    },

    /// Any other non-success response
    #[error("Unexpected HTTP status {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// Every retry attempt failed
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },

    /// Export attempted after shutdown
    #[error("Exporter is shut down")]
    Shutdown,

    /// Filesystem or stdio failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML decoding failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

impl ExporterError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a new invalid value error
    pub fn invalid_value<M: Into<String>, R: Into<String>>(metric: M, reason: R) -> Self {
        Self::InvalidValue {
            metric: metric.into(),
            reason: reason.into(),
        }
    }

    /// Maps an HTTP status code that is not a success to its error.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            _ => Self::HttpStatus { status },
        }
    }

    /// Returns true if the failed operation may be attempted again.
    ///
    /// Only failures where no response was received qualify; any HTTP status
    /// is a definitive answer from the server.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true if this error permanently disables the exporter.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Shutdown)
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidMetricKey(_) | Self::InvalidValue { .. } => "validation",
            Self::Network(_) | Self::RetriesExhausted { .. } => "network",
            Self::Unauthorized { .. } => "auth",
            Self::HttpStatus { .. } => "http",
            Self::Shutdown => "shutdown",
            Self::Io(_) => "io",
            Self::Serialization(_) | Self::Yaml(_) => "serialization",
        }
    }
}
