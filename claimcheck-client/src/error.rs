use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for broker transport operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors surfaced by the broker transport
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BrokerError {
    /// Create a transport error from any error type
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }
}

/// Configuration mutations rejected before being applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("blob key prefix exceeds maximum length of {max} characters: {length}")]
    PrefixTooLong { length: usize, max: usize },

    #[error("blob key prefix contains invalid characters; only alphanumeric characters and '.', '/', '_', '-' are allowed")]
    PrefixInvalidChars,

    #[error("unrecognized configuration key: {0}")]
    UnknownKey(String),

    #[error("invalid value '{value}' for configuration key '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Application property rules broken by a send call.
///
/// Raised before any blob or broker I/O has happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyViolation {
    #[error("number of application properties ({count}) exceeds maximum allowed ({max})")]
    TooMany { count: usize, max: usize },

    #[error("application property name '{name}' is reserved and cannot be used")]
    Reserved { name: String },

    #[error("total size of application properties ({size} bytes) exceeds maximum allowed ({max} bytes)")]
    TooLarge { size: usize, max: usize },
}

/// Errors surfaced to users of the extended client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid application properties: {0}")]
    Property(#[from] PropertyViolation),

    #[error("failed to send message: {source}")]
    SendFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to receive messages: {source}")]
    ReceiveFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("message handler failed: {source}")]
    Handler {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("broker backend failure: {0}")]
    Broker(#[from] BrokerError),
}

impl ClientError {
    /// Wrap the underlying cause of a failed send
    pub fn send_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SendFailed {
            source: Box::new(error),
        }
    }

    /// Wrap the underlying cause of a failed receive or resolve
    pub fn receive_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ReceiveFailed {
            source: Box::new(error),
        }
    }
}
