use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Terminology client error: {message}")]
    Terminology { message: String },

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

impl ValidatorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn terminology(message: impl Into<String>) -> Self {
        Self::Terminology {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
