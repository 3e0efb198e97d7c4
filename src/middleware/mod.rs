pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{require_auth, AuthProfile};
pub use rate_limit::{limit_requests, RateLimiter};
pub use response::{ApiResponse, ApiResult};
