//! Command handlers for the taiga-dl CLI.

pub mod auth;
pub mod categories;
pub mod completions;
pub mod fetch;
pub mod version;
