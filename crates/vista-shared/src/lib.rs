//! # vista-shared
//!
//! Vocabulary types and wire DTOs shared between the BoardVista server and
//! the client API gateway.
//!
//! Nothing in this crate performs I/O; it exists so both sides of the HTTP
//! boundary agree on the same serde representations.

pub mod api;
pub mod types;

pub use types::{ChatRole, Facility, Gender, MessageType, Role};
