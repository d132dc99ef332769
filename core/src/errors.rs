use thiserror::Error;

/// Gemini API errors
#[derive(Error, Debug)]
pub enum GeminiError {
    /// Error object reported by the API inside an otherwise successful stream
    #[error("API Error: {0}")]
    ApiError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Stream Error: {0}")]
    StreamError(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for Gemini operations
pub type GeminiResult<T> = Result<T, GeminiError>;
