use std::fmt;

#[derive(Debug)]
pub enum GeminiError {
    ConfigError(String),
    ClientError(String),
    RequestError(String),
    ResponseError(String),
    SerializationError(String),
    DecodeError(String),
    InternalError(String),
}

impl fmt::Display for GeminiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            GeminiError::ClientError(msg) => write!(f, "Client error: {}", msg),
            GeminiError::RequestError(msg) => write!(f, "Request error: {}", msg),
            GeminiError::ResponseError(msg) => write!(f, "Response error: {}", msg),
            GeminiError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            GeminiError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            GeminiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for GeminiError {}

pub type Result<T> = std::result::Result<T, GeminiError>;
