//! Error types for aam2mail.
//!
//! Only [`ConfigError`] is meant to reach the process boundary. Source,
//! decode and delivery failures are absorbed by the retrieval engine and
//! surface as log lines and summary counters.

/// Per-source failures. The engine skips the source for this cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Cannot reach {server}: {reason}")]
    Connection { server: String, reason: String },

    #[error("{server} rejected the request: {reason}")]
    Protocol { server: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A candidate subject tag that cannot be a valid hsub/esub.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("tag contains non-hexadecimal characters")]
    NotHex,

    #[error("tag length {len} outside {min}..={max} hex digits")]
    InvalidLength { len: usize, min: usize, max: usize },
}

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No text, hsub or esub subjects defined")]
    NoMatchRules,

    #[error("Not configured to write Maildir or mbox output")]
    NoDeliverySink,

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mailbox sink failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Mailbox {sink} failed: {reason}")]
    Sink { sink: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Watermark persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
