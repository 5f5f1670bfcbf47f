//! Domain core for the Agora discussion-board backend.
//!
//! Holds the shared primitive types, the domain error taxonomy, and the
//! authentication session lifecycle ([`auth`]). All I/O lives behind the
//! collaborator traits in [`auth::store`]; this crate never talks to a
//! database or the network directly.

pub mod auth;
pub mod error;
pub mod types;
