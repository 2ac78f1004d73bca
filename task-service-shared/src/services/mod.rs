/// Domain services
///
/// Services own the business rules: soft-delete scoping, owner and role
/// validation, role-set replacement. Each operation runs inside a
/// [`log_execution::LogExecution`] wrapper that logs its duration.
///
/// - `task_service`: [`TaskService`]
/// - `user_service`: [`UserService`]

pub mod error;
pub mod task_service;
pub mod user_service;

pub use error::{ServiceError, ServiceResult};
pub use task_service::TaskService;
pub use user_service::UserService;
