//! HTTP client implementation for talking to the Taiga REST API.
//!
//! The client manages bearer-token acquisition, waits out rate-limit
//! responses, and walks cursor-style pagination headers to assemble a complete
//! result set across multiple sequential HTTP calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::time::sleep;

use super::api::TaigaApi;
use super::error::{Result, TaigaError};

/// Pagination response headers set by Taiga on list endpoints.
const H_PAGINATED: &str = "x-paginated";
const H_PAGINATION_COUNT: &str = "x-pagination-count";
const H_PAGINATED_BY: &str = "x-paginated-by";
const H_PAGINATION_CURRENT: &str = "x-pagination-current";
const H_PAGINATION_NEXT: &str = "x-pagination-next";

/// Credentials for authenticating against a Taiga instance.
///
/// Exactly one of the two forms is valid: an opaque API token, or a complete
/// user/password pair from which a token is obtained via [`TaigaClient::login`].
#[derive(Clone)]
pub enum Credentials {
  /// An API token, usable immediately without a login call.
  Token(String),
  /// A user/password pair; the client must log in before issuing requests.
  Login {
    /// Taiga account username.
    user: String,
    /// Taiga account password.
    pswd: String,
  },
}

// Secrets stay censored even in debug output.
impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Token(token) => f.debug_tuple("Token").field(&censor(token)).finish(),
      Self::Login { user, pswd } => f
        .debug_struct("Login")
        .field("user", user)
        .field("pswd", &censor(pswd))
        .finish(),
    }
  }
}

impl Credentials {
  /// Assemble credentials from optional parts, typically CLI flags.
  ///
  /// A token wins when both a token and a user/password pair are supplied.
  /// Supplying neither, or only one half of the pair, is a configuration
  /// error.
  pub fn from_parts(token: Option<String>, user: Option<String>, pswd: Option<String>) -> Result<Self> {
    if let Some(token) = token {
      return Ok(Self::Token(token));
    }
    match (user, pswd) {
      (Some(user), Some(pswd)) => Ok(Self::Login { user, pswd }),
      _ => Err(TaigaError::MissingArguments(
        "either an API token or a complete user and password pair".to_string(),
      )),
    }
  }
}

/// Return a censored version of the given secret.
///
/// Long secrets keep three characters visible on each side, short ones only
/// one, so logs and error messages never leak the full value.
pub fn censor(uncensored: &str) -> String {
  let chars: Vec<char> = uncensored.chars().collect();
  let visible = if chars.len() > 8 { 3 } else { 1 };
  let head: String = chars.iter().take(visible).collect();
  let tail: String = chars.iter().rev().take(visible).collect::<Vec<_>>().into_iter().rev().collect();
  format!("{head}...{tail}")
}

/// Response body of the fixed `auth` endpoint.
#[derive(Debug, Deserialize)]
struct LoginResponse {
  auth_token: String,
}

/// Taiga API client.
///
/// Holds the session state: base URL, current bearer token (absent until
/// login for user/password clients), and the header set recomputed from the
/// token. All requests are strictly sequential; connections are not reused
/// across calls.
#[derive(Clone)]
pub struct TaigaClient {
  base_url: String,
  credentials: Credentials,
  token: Option<String>,
  headers: Option<HeaderMap>,
  client: reqwest::Client,
}

impl TaigaClient {
  /// Create a new Taiga client.
  ///
  /// # Arguments
  /// * `base_url` - The base URL of the Taiga API (e.g., https://api.taiga.io/api/v1/)
  /// * `credentials` - Either an API token or a user/password pair
  /// * `timeout_secs` - Request timeout in seconds
  ///
  /// # Returns
  /// A configured `TaigaClient`. Token-born clients are immediately ready for
  /// API calls; user/password clients must call [`login`](Self::login) first.
  ///
  /// # Errors
  /// Returns an error if the base URL is empty or the underlying
  /// `reqwest::Client` cannot be built. No network call is made here.
  pub fn new(base_url: impl Into<String>, credentials: Credentials, timeout_secs: u64) -> Result<Self> {
    let base_url = base_url.into().trim().to_string();
    if base_url.is_empty() {
      return Err(TaigaError::MissingArguments("url (Taiga API base URL)".to_string()));
    }

    // Queries are appended directly to the base URL.
    let base_url = if base_url.ends_with('/') {
      base_url
    } else {
      format!("{base_url}/")
    };

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(format!("taiga-dl/{} ({})", env!("CARGO_PKG_VERSION"), env!("TARGET")))
      .build()?;

    let mut session = Self {
      base_url,
      credentials,
      token: None,
      headers: None,
      client,
    };

    if let Credentials::Token(token) = &session.credentials {
      let token = token.clone();
      session.token = Some(token.clone());
      session.set_headers()?;
      tracing::debug!("client initiated with token {}", censor(&token));
    }

    Ok(session)
  }

  /// Return the current session token, if any, for reuse.
  pub fn get_token(&self) -> Option<&str> {
    self.token.as_deref()
  }

  /// Absolute URL for a query relative to the API base.
  fn api_url(&self, query: &str) -> String {
    format!("{}{}", self.base_url, query)
  }

  /// (Re)set session headers according to the current token.
  fn set_headers(&mut self) -> Result<()> {
    let token = self
      .token
      .as_ref()
      .ok_or_else(|| TaigaError::Canary("setting headers without a token".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    // Signal the server to close the HTTP session after each request.
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
      .map_err(|_| TaigaError::MissingArguments("token contains characters not valid in a header".to_string()))?;
    headers.insert(header::AUTHORIZATION, bearer);

    self.headers = Some(headers);
    Ok(())
  }

  /// Obtain a session token from the API and (re)set session headers.
  ///
  /// Performs a single `POST {base}auth` with the user/password pair in a
  /// JSON body. On any failure the token state is left unchanged.
  ///
  /// # Errors
  /// * [`TaigaError::LoginLacksCredentials`] when the client was constructed
  ///   with a token instead of a user/password pair.
  /// * [`TaigaError::LoginFailed`] on a non-200 response; the diagnostic
  ///   detail carries the password only in censored form.
  pub async fn login(&mut self) -> Result<()> {
    let (user, pswd) = match &self.credentials {
      Credentials::Login { user, pswd } => (user.clone(), pswd.clone()),
      Credentials::Token(_) => return Err(TaigaError::LoginLacksCredentials),
    };

    let url = self.api_url("auth");
    let body = serde_json::json!({ "type": "normal", "username": user, "password": pswd });

    tracing::debug!("logging in {}:{}@{}", user, censor(&pswd), self.base_url);

    let response = self
      .client
      .post(&url)
      .header(header::CONNECTION, "close")
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if status == StatusCode::OK {
      let payload: LoginResponse = response.json().await?;
      self.token = Some(payload.auth_token);
      self.set_headers()?;
      Ok(())
    } else {
      let text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      let detail = text.replace(&pswd, &censor(&pswd));
      Err(TaigaError::LoginFailed {
        url,
        status: status.as_u16(),
        detail,
      })
    }
  }

  /// Issue a single GET with the current session headers, cooperatively
  /// waiting out one rate-limit response.
  ///
  /// A 429 whose `_error_message` embeds exactly one integer is retried once
  /// after sleeping that many seconds; the retry result is returned as-is.
  /// A 429 with no usable delay is a hard error. All other status codes are
  /// returned to the caller for inspection.
  async fn http_get(&self, url: &str) -> Result<reqwest::Response> {
    let headers = self
      .headers
      .as_ref()
      .ok_or_else(|| TaigaError::UninitiatedClient(url.to_string()))?;

    tracing::debug!("GET {url}");
    let response = self.client.get(url).headers(headers.clone()).send().await?;

    if response.status() != StatusCode::TOO_MANY_REQUESTS {
      return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    let Some(delay) = advised_delay(&detail) else {
      return Err(TaigaError::RateLimited {
        url: url.to_string(),
        detail,
      });
    };

    tracing::info!("rate limited, sleeping for {delay} seconds before retrying {url}");
    sleep(Duration::from_secs(delay)).await;

    let retry = self.client.get(url).headers(headers.clone()).send().await?;
    Ok(retry)
  }

  /// Fetch one page, requiring HTTP 200.
  async fn fetch_page(&self, url: &str) -> Result<(HeaderMap, Value)> {
    let response = self.http_get(url).await?;

    let status = response.status();
    if status != StatusCode::OK {
      let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      return Err(TaigaError::UnexpectedHttpCode {
        url: url.to_string(),
        status: status.as_u16(),
        body,
      });
    }

    let headers = response.headers().clone();
    let body = response.json().await?;
    Ok((headers, body))
  }

  /// Generic request handler: fetch a query and follow pagination headers.
  ///
  /// # Arguments
  /// * `query` - Query relative to the API base URL.
  /// * `max_pages` - Maximum number of pages to request; all pages when
  ///   `None` or `Some(0)`.
  ///
  /// # Returns
  /// The accumulated JSON array in page order for paginated endpoints, or the
  /// single page body otherwise.
  pub async fn fetch(&self, query: &str, max_pages: Option<usize>) -> Result<Value> {
    let url = self.api_url(query);
    let (headers, body) = self.fetch_page(&url).await?;

    let paginated = [H_PAGINATED, H_PAGINATION_COUNT, H_PAGINATED_BY]
      .iter()
      .all(|name| headers.contains_key(*name));
    if !paginated {
      return Ok(body);
    }

    let count = header_u64(&headers, H_PAGINATION_COUNT)?;
    let per_page = header_u64(&headers, H_PAGINATED_BY)?;
    if per_page == 0 {
      return Err(TaigaError::Canary(format!("{H_PAGINATED_BY} header is zero for {url}")));
    }

    let total = count.div_ceil(per_page) as usize;
    let stop = match max_pages {
      Some(cap) if cap > 0 => cap.min(total),
      _ => total,
    };

    let Value::Array(mut records) = body else {
      return Err(TaigaError::Canary(format!("paginated response for {url} is not a JSON array")));
    };

    let mut page_headers = headers;
    while (header_u64(&page_headers, H_PAGINATION_CURRENT)? as usize) < stop {
      let next_url = header_str(&page_headers, H_PAGINATION_NEXT)?;
      let (headers, body) = self.fetch_page(&next_url).await?;

      let Value::Array(more) = body else {
        return Err(TaigaError::Canary(format!(
          "paginated response for {next_url} is not a JSON array"
        )));
      };
      records.extend(more);
      page_headers = headers;

      tracing::info!("got yet {} items out of {}", records.len(), count);
    }

    Ok(Value::Array(records))
  }

  /// Cherry-pick an explicit list of fields from a single-page endpoint.
  ///
  /// # Arguments
  /// * `query` - Query relative to the API base URL, expected to return one
  ///   JSON object.
  /// * `expected` - Fields that must all be present in the response.
  ///
  /// # Returns
  /// A strict projection: exactly the expected fields, never a superset.
  ///
  /// # Errors
  /// [`TaigaError::MissingExpectedItem`] when any expected field is absent.
  pub async fn pick_fields(&self, query: &str, expected: &[&str]) -> Result<Map<String, Value>> {
    let record = self.fetch(query, None).await?;

    let Value::Object(record) = record else {
      return Err(TaigaError::Canary(format!("response for {query} is not a JSON object")));
    };

    let mut output = Map::new();
    for field in expected {
      match record.get(*field) {
        Some(value) => {
          output.insert((*field).to_string(), value.clone());
        }
        None => {
          return Err(TaigaError::MissingExpectedItem {
            field: (*field).to_string(),
            query: query.to_string(),
          });
        }
      }
    }
    Ok(output)
  }
}

#[async_trait]
impl TaigaApi for TaigaClient {
  async fn fetch(&self, query: &str, max_pages: Option<usize>) -> Result<Value> {
    TaigaClient::fetch(self, query, max_pages).await
  }

  async fn pick_fields(&self, query: &str, expected: &[&str]) -> Result<Map<String, Value>> {
    TaigaClient::pick_fields(self, query, expected).await
  }
}

/// Extract the server-advised retry delay from a 429 response body.
///
/// The delay is the single integer-looking token in the free-text
/// `_error_message`; zero or several such tokens means no usable delay.
fn advised_delay(body: &str) -> Option<u64> {
  let message = serde_json::from_str::<Value>(body).ok()?;
  let message = message.get("_error_message")?.as_str()?.to_string();

  let nums: Vec<u64> = message.split_whitespace().filter_map(|w| w.parse().ok()).collect();
  match nums.as_slice() {
    [delay] => Some(*delay),
    _ => None,
  }
}

/// Read a numeric pagination header, failing with a canary error when it is
/// absent or not an integer.
fn header_u64(headers: &HeaderMap, name: &str) -> Result<u64> {
  headers
    .get(name)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.parse().ok())
    .ok_or_else(|| TaigaError::Canary(format!("{name} header is missing or not numeric")))
}

/// Read a string pagination header.
fn header_str(headers: &HeaderMap, name: &str) -> Result<String> {
  headers
    .get(name)
    .and_then(|value| value.to_str().ok())
    .map(str::to_string)
    .ok_or_else(|| TaigaError::Canary(format!("{name} header is missing while more pages are due")))
}

#[cfg(test)]
mod tests {
  use super::*;

  const TST_URL: &str = "https://a.taiga.instance/API/V9/";

  #[test]
  fn test_client_with_token_is_ready_without_network() {
    let client = TaigaClient::new(TST_URL, Credentials::Token("a_valid_token".to_string()), 30).unwrap();
    assert_eq!(client.get_token(), Some("a_valid_token"));
    assert!(client.headers.is_some());
  }

  #[test]
  fn test_client_with_user_and_pswd_has_no_token_until_login() {
    let credentials = Credentials::Login {
      user: "a_user".to_string(),
      pswd: "a_password".to_string(),
    };
    let client = TaigaClient::new(TST_URL, credentials, 30).unwrap();
    assert_eq!(client.get_token(), None);
    assert!(client.headers.is_none());
  }

  #[test]
  fn test_client_requires_base_url() {
    let result = TaigaClient::new("  ", Credentials::Token("tkn".to_string()), 30);
    assert!(matches!(result, Err(TaigaError::MissingArguments(_))));
  }

  #[test]
  fn test_client_appends_trailing_slash() {
    let client = TaigaClient::new(
      "https://a.taiga.instance/API/V9",
      Credentials::Token("tkn".to_string()),
      30,
    )
    .unwrap();
    assert_eq!(client.api_url("auth"), "https://a.taiga.instance/API/V9/auth");
  }

  #[test]
  fn test_credentials_from_parts_requires_token_or_full_pair() {
    assert!(Credentials::from_parts(None, None, None).is_err());
    assert!(Credentials::from_parts(None, Some("user".to_string()), None).is_err());
    assert!(Credentials::from_parts(None, None, Some("pswd".to_string())).is_err());

    let pair = Credentials::from_parts(None, Some("user".to_string()), Some("pswd".to_string())).unwrap();
    assert!(matches!(pair, Credentials::Login { .. }));
  }

  #[test]
  fn test_credentials_from_parts_prefers_token() {
    let creds = Credentials::from_parts(
      Some("tkn".to_string()),
      Some("user".to_string()),
      Some("pswd".to_string()),
    )
    .unwrap();
    assert!(matches!(creds, Credentials::Token(token) if token == "tkn"));
  }

  #[test]
  fn test_credentials_debug_output_censors_secrets() {
    let creds = Credentials::Login {
      user: "a_user".to_string(),
      pswd: "a_long_password".to_string(),
    };
    let printed = format!("{creds:?}");
    assert!(printed.contains("a_user"));
    assert!(printed.contains("a_l...ord"));
    assert!(!printed.contains("a_long_password"));
  }

  #[test]
  fn test_censor_hides_the_middle() {
    assert_eq!(censor("a_long_password"), "a_l...ord");
    assert_eq!(censor("short"), "s...t");
  }

  #[tokio::test]
  async fn test_login_on_token_born_client_fails() {
    let mut client = TaigaClient::new(TST_URL, Credentials::Token("tkn".to_string()), 30).unwrap();
    let result = client.login().await;
    assert!(matches!(result, Err(TaigaError::LoginLacksCredentials)));
    // Token state is untouched by the failed call.
    assert_eq!(client.get_token(), Some("tkn"));
  }

  #[tokio::test]
  async fn test_get_before_login_fails_without_network_call() {
    let credentials = Credentials::Login {
      user: "a_user".to_string(),
      pswd: "a_password".to_string(),
    };
    // The host does not exist; the call must fail before reaching it.
    let client = TaigaClient::new("https://no.such.host.invalid/api/v1/", credentials, 30).unwrap();
    let result = client.fetch("projects/1", None).await;
    assert!(matches!(result, Err(TaigaError::UninitiatedClient(_))));
  }

  #[test]
  fn test_advised_delay_takes_the_single_integer_token() {
    let body = r#"{"_error_message": "Request was throttled. Expected available in 42 seconds."}"#;
    assert_eq!(advised_delay(body), Some(42));
  }

  #[test]
  fn test_advised_delay_rejects_ambiguous_or_missing_delays() {
    let two = r#"{"_error_message": "throttled 5 times, wait 42 seconds"}"#;
    assert_eq!(advised_delay(two), None);

    let none = r#"{"_error_message": "throttled, try again later"}"#;
    assert_eq!(advised_delay(none), None);

    assert_eq!(advised_delay("not json"), None);
    assert_eq!(advised_delay(r#"{"detail": "wait 42"}"#), None);
  }
}
