//! Domain models shared by the API and the client.

pub mod auth;
pub mod credits;
