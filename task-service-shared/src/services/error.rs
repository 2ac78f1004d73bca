/// Domain errors raised by the services
///
/// The HTTP layer maps each variant to a status code. `Repository` and
/// `Password` are internal failures whose details are logged, not returned.

use crate::password::PasswordError;
use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("{entity} with id {id} not found")]
    EntityNotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl ServiceError {
    pub fn task_not_found(id: i64) -> Self {
        Self::EntityNotFound { entity: "Task", id }
    }

    pub fn user_not_found_by_id(id: i64) -> Self {
        Self::EntityNotFound { entity: "User", id }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
