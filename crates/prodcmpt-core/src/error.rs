//! Error types for loading, editing and persisting product components
//!
//! Findings about the model itself (invalid cardinalities, template cycles, deltas) are never
//! errors; they are reported as [`crate::diagnostics::Message`]s. This type covers the failures
//! around the engine: files, configuration, persistence and edit commands on unknown parts.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for product component operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// A model or component file could not be parsed
    #[error("Parse error in '{source_name}': {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    /// An element tree does not describe a valid part
    #[error("Persistence error in <{element}>: {message}")]
    PersistenceError { element: String, message: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate definition: {name} is defined more than once")]
    DuplicateDefinition { name: String },

    #[error("Unknown product component: {name}")]
    UnknownProductCmpt { name: String },

    /// An edit addressed a property value, link or generation that does not exist
    #[error("Unknown part in {container}: {part}")]
    UnknownPart { container: String, part: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Persistence,
    Config,
    Io,
    Definition,
    Reference,
    Internal,
}

impl ModelError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::ParseError { .. } => ErrorKind::Parse,
            ModelError::PersistenceError { .. } => ErrorKind::Persistence,
            ModelError::ConfigError { .. } => ErrorKind::Config,
            ModelError::IoError { .. } => ErrorKind::Io,
            ModelError::DuplicateDefinition { .. } => ErrorKind::Definition,
            ModelError::UnknownProductCmpt { .. } | ModelError::UnknownPart { .. } => {
                ErrorKind::Reference
            }
            ModelError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable (loading can continue with the other files)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Parse | ErrorKind::Persistence | ErrorKind::Definition
        )
    }

    /// Create a parse error
    pub fn parse_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error for the given element name
    pub fn persistence_error(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PersistenceError {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_product_cmpt(name: impl Into<String>) -> Self {
        Self::UnknownProductCmpt { name: name.into() }
    }

    pub fn unknown_part(container: impl Into<String>, part: impl Into<String>) -> Self {
        Self::UnknownPart {
            container: container.into(),
            part: part.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
