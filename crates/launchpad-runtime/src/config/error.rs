//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading settings or persisting the store.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Settings file has an extension no enabled format handles.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// Extracting settings from the layered sources failed.
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The directory that should hold the store file does not exist.
    #[error(
        "The parent directory of the configuration file {} does not exist; \
         create it or point {var} elsewhere",
        .path.display()
    )]
    MissingDirectory {
        /// Requested store file.
        path: PathBuf,
        /// Environment variable that overrides the location.
        var: &'static str,
    },

    /// No per-user configuration directory is known on this platform.
    #[error("No user configuration directory available; set {var}")]
    NoConfigDir {
        /// Environment variable that overrides the location.
        var: &'static str,
    },

    /// The default configuration directory could not be created.
    #[error(
        "Failed to create configuration directory {}: {source}; \
         set {var} to use another location",
        .path.display()
    )]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Environment variable that overrides the location.
        var: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the store file failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// Store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the store file failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON of the expected shape.
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        /// Store file.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored configuration could not be serialized.
    #[error("Failed to serialize configuration for '{product}.{mode}': {source}")]
    Serialize {
        /// Product name.
        product: String,
        /// Launch mode.
        mode: String,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The store document could not be encoded.
    #[error("Failed to encode configuration: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
