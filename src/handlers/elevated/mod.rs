// handlers/elevated/mod.rs - moderation handlers
//
// Route prefix: /api/admin. require_auth runs first, then require_moderator;
// administrator-only operations check again in the service.

pub mod events;
pub mod users;
