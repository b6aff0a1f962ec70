use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Failed to publish event: {0}")]
    Publish(#[from] broker::BrokerError),
}

pub type TaskResult<T> = Result<T, TaskError>;
