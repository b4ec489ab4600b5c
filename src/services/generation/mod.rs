pub mod client;
pub mod gateway;
pub mod schema;
pub mod wire;

use std::fmt;

/// Substring the service uses when the key has no access to a paid model.
pub const MISSING_ENTITLEMENT_MARKER: &str = "Requested entity was not found";

#[derive(Debug)]
pub enum GenerationError {
    Transport(reqwest::Error),
    Service { status: u16, message: String },
    MalformedResponse(String),
    MissingEntitlement(String),
    EmptyResponse,
    NoImage,
    InvalidInput(String),
}

impl GenerationError {
    pub fn is_missing_entitlement(&self) -> bool {
        matches!(self, GenerationError::MissingEntitlement(_))
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(err) => write!(f, "HTTP error: {}", err),
            GenerationError::Service { status, message } => {
                write!(f, "Generation service returned {}: {}", status, message)
            }
            GenerationError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            GenerationError::MissingEntitlement(msg) => {
                write!(f, "API key lacks access to this model: {}", msg)
            }
            GenerationError::EmptyResponse => write!(f, "Generation service returned no content"),
            GenerationError::NoImage => write!(f, "Failed to generate image."),
            GenerationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err)
    }
}
