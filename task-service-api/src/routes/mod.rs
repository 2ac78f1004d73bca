/// API route handlers
///
/// - `health`: Health check endpoint
/// - `info`: Application and system details
/// - `tasks`: Task endpoints
/// - `users`: User and role endpoints

pub mod health;
pub mod info;
pub mod tasks;
pub mod users;

use serde::Deserialize;

/// Paging query parameters shared by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub sort: Option<String>,
}
