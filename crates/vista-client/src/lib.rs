//! # vista-client
//!
//! API gateway for the BoardVista REST backend.
//!
//! [`ApiGateway`] wraps every endpoint with the typed DTOs from
//! `vista-shared` and attaches the bearer token persisted by
//! [`TokenStore`] -- a single file in the platform data directory, written
//! once per login.

pub mod gateway;
pub mod token_store;

mod error;

pub use error::ClientError;
pub use gateway::{ApiGateway, ListingSearch};
pub use token_store::TokenStore;
