// handlers/mod.rs - three access tiers
//
// public    - no authentication (/, /health, /auth/*, /events/*)
// protected - valid session required (/api/*)
// elevated  - session with role Moderador or above (/api/admin/*)

pub mod elevated;
pub mod extract;
pub mod protected;
pub mod public;
