/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded migration runner for the `migrations/` directory
///
/// Queries live in [`crate::repository::postgres`].

pub mod migrations;
pub mod pool;
