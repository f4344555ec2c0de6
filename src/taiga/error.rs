//! Error types for the Taiga API client and backend layer.

use thiserror::Error;

/// Errors that can occur when talking to a Taiga instance or classifying the
/// records it returns.
#[derive(Debug, Error)]
pub enum TaigaError {
  /// Required construction arguments are missing or incomplete.
  #[error("missing arguments instantiating a Taiga client: {0}")]
  MissingArguments(String),

  /// A network operation was attempted before authentication headers exist.
  #[error("uninitiated Taiga client asked to perform a request: {0}")]
  UninitiatedClient(String),

  /// `login()` was invoked on a token-born client.
  ///
  /// Token-born clients never need to log in; only clients constructed with a
  /// user/password pair can.
  #[error("missing user or password at login (token-born clients do not need to log in)")]
  LoginLacksCredentials,

  /// The authentication endpoint rejected the login request.
  #[error("login to {url} failed with HTTP {status}: {detail}")]
  LoginFailed {
    /// The auth endpoint that was called.
    url: String,
    /// HTTP status code returned by the server.
    status: u16,
    /// Diagnostic detail with the password censored.
    detail: String,
  },

  /// A page fetch returned a status code other than 200.
  #[error("unexpected HTTP code {status} retrieving {url}: {body}")]
  UnexpectedHttpCode {
    /// The URL that was requested.
    url: String,
    /// HTTP status code returned by the server.
    status: u16,
    /// Raw response body for diagnostics.
    body: String,
  },

  /// The server rate-limited the request and advertised no usable delay.
  #[error("rate limited retrieving {url} with no usable retry delay: {detail}")]
  RateLimited {
    /// The URL that was requested.
    url: String,
    /// Raw 429 response body.
    detail: String,
  },

  /// A required field was absent from a single-page projection response.
  #[error("retrieved record for {query} lacks the {field} property")]
  MissingExpectedItem {
    /// Name of the missing field.
    field: String,
    /// Query whose response was inspected.
    query: String,
  },

  /// A category name outside the fixed category table was requested.
  #[error("unknown category: {0}")]
  UnknownCategory(String),

  /// An item's keys match none of the known categories.
  #[error("unidentified item category for keys {0}")]
  UnclassifiedItem(String),

  /// A broken assumption about server behavior. Should never happen.
  #[error("broken flow, this should never happen: {0}")]
  Canary(String),

  /// Transport-level failure from the HTTP client.
  #[error("network error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Result type for Taiga API operations.
pub type Result<T> = std::result::Result<T, TaigaError>;
