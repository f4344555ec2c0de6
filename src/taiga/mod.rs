//! Taiga REST API core: session management, resilient GET, pagination, and
//! field projection.

mod api;
mod categories;
mod client;
mod error;

pub use api::TaigaApi;
pub use categories::{CATEGORY_MAP, CategorySpec, Shape, category_names, lookup, validate_table};
pub use client::{Credentials, TaigaClient, censor};
pub use error::{Result, TaigaError};
