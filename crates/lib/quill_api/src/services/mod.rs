//! Service layer between handlers and `quill_core`.

pub mod completions;
pub mod credits;
