//! Error handling module for fomod-wizard
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every failure the engine can produce happens while loading a descriptor;
//! evaluation itself is infallible.

use thiserror::Error;

/// Main error type for fomod-wizard
#[derive(Error, Debug)]
pub enum WizardError {
    /// IO errors (reading descriptors, selections, installed-file lists)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ModuleConfig.xml is not well-formed XML
    #[error("Failed to parse ModuleConfig XML: {0}")]
    Xml(String),

    /// Byte content could not be decoded as UTF-8/UTF-16 text
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// An enum tag (operator, group type, plugin type, ...) was not recognised
    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    /// Structurally invalid descriptor (depth limit, empty names, ...)
    #[error("Invalid descriptor: {0}")]
    Descriptor(String),
}

/// Result type alias for fomod-wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;

impl WizardError {
    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a descriptor validation error
    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::Descriptor(msg.into())
    }

    /// Create an unknown-value error for the given enum kind
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.into(),
        }
    }

    /// Returns true if this error means the descriptor itself is malformed
    /// (as opposed to the file being unreadable).
    pub fn is_malformed_descriptor(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

impl From<roxmltree::Error> for WizardError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WizardError::descriptor("dependency tree too deep");
        assert_eq!(
            err.to_string(),
            "Invalid descriptor: dependency tree too deep"
        );

        let err = WizardError::unknown("group type", "SelectSome");
        assert_eq!(err.to_string(), "Unknown group type 'SelectSome'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WizardError = io_err.into();
        assert!(matches!(err, WizardError::Io(_)));
        assert!(!err.is_malformed_descriptor());
    }

    #[test]
    fn test_xml_error_conversion() {
        let xml_err = roxmltree::Document::parse("<config>").unwrap_err();
        let err: WizardError = xml_err.into();
        assert!(matches!(err, WizardError::Xml(_)));
        assert!(err.is_malformed_descriptor());
    }
}
