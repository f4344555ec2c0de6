//! Trait definitions for interacting with Taiga.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::Result;

/// Trait for Taiga API operations (enables testing with fake
/// implementations).
///
/// The backend layer only ever needs two primitives from the HTTP client:
/// "fetch this query, optionally capped at N pages" and "fetch a fixed set of
/// fields from a single-page endpoint".
#[async_trait]
pub trait TaigaApi: Send + Sync {
  /// Fetch a query, following pagination headers until the last page or the
  /// given cap.
  ///
  /// # Arguments
  /// * `query` - Query relative to the API base URL (e.g. `tasks?project=42`).
  /// * `max_pages` - Upper bound on pages to fetch. `None` and `Some(0)` both
  ///   mean "no cap".
  ///
  /// # Returns
  /// A JSON array with all fetched records in page order for list endpoints,
  /// or the single JSON object for dict endpoints.
  async fn fetch(&self, query: &str, max_pages: Option<usize>) -> Result<Value>;

  /// Fetch a single-page endpoint and project exactly the expected fields.
  ///
  /// # Arguments
  /// * `query` - Query relative to the API base URL.
  /// * `expected` - Field names that must all be present in the response.
  ///
  /// # Returns
  /// A mapping restricted to `expected`; fields the server returned beyond
  /// those are never copied.
  async fn pick_fields(&self, query: &str, expected: &[&str]) -> Result<Map<String, Value>>;
}
