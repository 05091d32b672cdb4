use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("not initialized: run 'agent-health init'")]
    NotInitialized,

    #[error("invalid metrics record: {0}")]
    InvalidMetricsRecord(String),

    #[error("cannot rank an empty team")]
    EmptyTeam,

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("agent already exists: {0}")]
    AgentExists(String),

    #[error("definition document not found: {0}")]
    DocumentNotFound(String),

    #[error("definition document changed during update: {0}")]
    DocumentWriteConflict(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HealthError>;
