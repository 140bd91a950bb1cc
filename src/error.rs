use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrSchemaError {
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown namespace: {namespace}")]
    UnknownNamespace { namespace: String },

    #[error("Invalid identifier: {identifier}")]
    InvalidIdentifier { identifier: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ShrSchemaError {
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShrSchemaError>;
