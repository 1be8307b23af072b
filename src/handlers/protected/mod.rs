// handlers/protected/mod.rs - handlers behind require_auth
//
// Route prefix: /api. Every handler receives the caller as Extension<AuthUser>;
// ownership and role checks happen in the services.

pub mod auth;
pub mod documents;
pub mod events;
pub mod ratings;
pub mod reservations;
