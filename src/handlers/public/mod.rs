// handlers/public/mod.rs - handlers that need no session
//
// Route prefix: none. Inputs are untrusted and validated field by field.

pub mod auth;
pub mod events;
pub mod system;
