use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeriscopeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Reasoning error: {0}")]
    Reasoning(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
