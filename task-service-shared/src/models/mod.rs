/// Persisted entities and paging types
///
/// - `task`: Tasks with soft-delete flag and owning user
/// - `user`: User accounts and their role set
/// - `role`: Named roles seeded by migrations
/// - `page`: Page requests, sort orders and result pages
///
/// Storage lives behind the traits in [`crate::repository`].

pub mod page;
pub mod role;
pub mod task;
pub mod user;

pub use page::{Direction, Page, PageError, PageRequest, SortField, SortOrder};
pub use role::Role;
pub use task::{NewTask, Task, TaskChanges, TaskSortField};
pub use user::{NewUser, User, UserSortField};
