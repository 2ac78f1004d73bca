/// Middleware for the API server
///
/// - `rate_limit`: token bucket limiter for `/api/v1`

pub mod rate_limit;
