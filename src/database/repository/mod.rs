//! Hand-written SQL per table group.
//!
//! Read helpers take the pool; helpers that run inside a transaction take a
//! `&mut PgConnection` so callers can pass `&mut tx`.

pub mod bans;
pub mod events;
pub mod ratings;
pub mod reservations;
pub mod users;
