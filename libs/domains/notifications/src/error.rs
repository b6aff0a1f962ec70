use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Email provider error: {0}")]
    Provider(String),

    #[error("Push hub error: {0}")]
    Hub(String),

    #[error("Lookup error: {0}")]
    Lookup(String),
}

impl From<domain_projects::ProjectError> for NotificationError {
    fn from(e: domain_projects::ProjectError) -> Self {
        Self::Lookup(e.to_string())
    }
}

impl From<domain_users::UserError> for NotificationError {
    fn from(e: domain_users::UserError) -> Self {
        Self::Lookup(e.to_string())
    }
}

pub type NotificationResult<T> = Result<T, NotificationError>;
