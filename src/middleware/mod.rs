pub mod auth;
pub mod response;

pub use auth::{require_auth, require_moderator, AuthUser};
pub use response::{ApiResponse, ApiResult};
