use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Directory error: {0}")]
    Directory(String),
}

pub type UserResult<T> = Result<T, UserError>;
