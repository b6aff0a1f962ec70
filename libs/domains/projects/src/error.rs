use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Repository error: {0}")]
    Repository(String),
}

pub type ProjectResult<T> = Result<T, ProjectError>;
