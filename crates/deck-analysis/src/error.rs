//! Error types for the deck analysis pipeline.
//!
//! Variants are split by who can fix the problem: the uploader (unsupported or
//! unreadable documents), the operator (provider configuration), or nobody right
//! now (provider outage, model output drift). Callers should branch on
//! [`AnalysisError::kind`] rather than on message text.
use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("unsupported file type: .{0} (supported: pdf, pptx)")]
    UnsupportedFormat(String),

    #[error("could not read document: {0}")]
    InvalidDocument(String),

    #[error(
        "no text could be extracted from the document; it may be a scanned or image-only file, \
         re-export it as a text-based PDF"
    )]
    EmptyDocument,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("AI provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("malformed AI response: {message}")]
    MalformedAiResponse { message: String, raw: String },
}

/// Stable classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    InvalidDocument,
    EmptyDocument,
    Configuration,
    Provider,
    MalformedAiResponse,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AnalysisError::InvalidDocument(_) => ErrorKind::InvalidDocument,
            AnalysisError::EmptyDocument => ErrorKind::EmptyDocument,
            AnalysisError::Configuration(_) => ErrorKind::Configuration,
            AnalysisError::Provider(_) => ErrorKind::Provider,
            AnalysisError::MalformedAiResponse { .. } => ErrorKind::MalformedAiResponse,
        }
    }

    /// True when the uploader can fix the problem by submitting a different file.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedFormat | ErrorKind::InvalidDocument | ErrorKind::EmptyDocument
        )
    }

    /// True when a fresh, user-initiated re-analysis may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Provider)
    }
}
