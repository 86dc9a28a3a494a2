use deck_analysis::{AnalysisError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file is {size} bytes, above the {limit}-byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl AppError {
    /// Text returned to the MCP client. Operator-side details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(_) => "analysis service unavailable".to_string(),
            AppError::InvalidRequest(_) | AppError::Io { .. } | AppError::TooLarge { .. } => {
                self.to_string()
            }
            AppError::Analysis(e) if e.is_user_error() => e.to_string(),
            AppError::Analysis(e) if e.is_retryable() => {
                "the AI service did not respond successfully; please try again later".to_string()
            }
            AppError::Analysis(e) if e.kind() == ErrorKind::Configuration => {
                "analysis service unavailable".to_string()
            }
            AppError::Analysis(_) => {
                "analysis failed: the AI response could not be interpreted".to_string()
            }
        }
    }
}
