//! Error types for the diary engine
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the presentation layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Draft not found: {0}")]
    DraftNotFound(i64),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(i64),

    #[error("Insight not found: {0}")]
    InsightNotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Attachment {filename} rejected: {reason}")]
    AttachmentRejected { filename: String, reason: String },

    #[error("Template kind cannot change once an entry exists")]
    TemplateLocked,

    #[error("No entries available to summarize")]
    NoEntries,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True for errors raised locally before any collaborator call was issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::AttachmentRejected { .. }
                | AppError::TemplateLocked
                | AppError::NoEntries
                | AppError::InvalidTransition(_)
        )
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(AppError::NoEntries.is_validation());
        assert!(AppError::TemplateLocked.is_validation());
        assert!(!AppError::EntryNotFound(3).is_validation());
        assert!(!AppError::Collaborator("offline".to_string()).is_validation());
    }

    #[test]
    fn test_serializes_as_display_string() {
        let json = serde_json::to_string(&AppError::InsightNotFound(7)).unwrap();
        assert_eq!(json, "\"Insight not found: 7\"");
    }

    #[test]
    fn test_serializes_nested_errors() {
        let failed: std::result::Result<(), AppError> = Err(AppError::EntryNotFound(2));
        let json = serde_json::to_value(&vec![failed]).unwrap();
        assert_eq!(json, serde_json::json!([{ "Err": "Entry not found: 2" }]));
    }
}
