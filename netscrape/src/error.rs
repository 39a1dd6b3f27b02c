//! Error types for netscrape.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netscrape operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Shell channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Command output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Normalization errors for an auxiliary dataset
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Device list errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts, or changed
    #[error("Host key for {host}:{port} rejected: {reason}")]
    HostKeyRejected {
        host: String,
        port: u16,
        reason: String,
    },

    /// Connection establishment timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
}

/// Shell channel errors (prompt matching, channel I/O).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt was not seen within the command timeout
    #[error("Prompt not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed by the device
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Device session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Privileged mode could not be entered
    #[error("Failed to enter privileged mode on {host}: prompt '{prompt}'")]
    EnableFailed { host: String, prompt: String },

    /// Invalid session configuration
    #[error("Invalid session configuration: {message}")]
    InvalidConfig { message: String },
}

/// Parser errors. The collector treats these like an empty parse.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The TextFSM template failed to compile
    #[error("Template '{template}' is invalid: {message}")]
    Template { template: String, message: String },

    /// The output could not be run through the template
    #[error("Parsing with template '{template}' failed: {message}")]
    Output { template: String, message: String },

    /// A template override could not be read
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Normalization failure, scoped to a single dataset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A record is missing the sort key
    #[error("record {index} has no '{field}' field")]
    MissingKey { field: String, index: usize },

    /// A record's sort key is not an integer
    #[error("record {index} has non-integer '{field}' value '{value}'")]
    NotInteger {
        field: String,
        value: String,
        index: usize,
    },
}

/// Device list errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// A device list could not be read
    #[error("Failed to read device list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required setting has no value
    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    /// A setting has an unusable value
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Reachability probe errors. The prober classifies these as unreachable.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The target is not an IP address
    #[error("'{0}' is not an IP address")]
    InvalidAddress(String),

    /// No ICMP socket for this address family
    #[error("No ICMP client for {0}")]
    ClientUnavailable(&'static str),

    /// The probe did not finish in time
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error writing the artifact
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook encoding error
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Result type alias using netscrape's Error.
pub type Result<T> = std::result::Result<T, Error>;
