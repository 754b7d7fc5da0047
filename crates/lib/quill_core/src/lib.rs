//! # quill_core
//!
//! Core domain logic for Quill.

pub mod actions;
pub mod auth;
pub mod contact;
pub mod credits;
pub mod generation;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
