use thiserror::Error;

/// A model type declares something that cannot work, detected when an instance is constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid declaration of model `{model}`: {message}")]
pub struct ConfigurationError {
    pub model: &'static str,
    pub message: String,
}

/// Access of a relation name the model type does not declare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown relation `{relation}` on `{model}`")]
pub struct UnknownRelationError {
    pub model: &'static str,
    pub relation: String,
}

/// Non-success status reported by the backend, code and message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct QueryError {
    pub code: String,
    pub message: String,
}

impl QueryError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
