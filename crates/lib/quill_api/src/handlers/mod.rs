//! Request handlers.

pub mod completions;
pub mod contact;
pub mod credits;
pub mod health;
pub mod image;
