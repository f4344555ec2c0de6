//! Harvesting backend built on top of the Taiga client.
//!
//! Exposes the narrow capability surface a data-collection host needs: a
//! fixed set of named categories served as JSON record sequences, per-item
//! identity/timestamp extractors, and category classification.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::taiga::{self, Credentials, Result, Shape, TaigaApi, TaigaClient, TaigaError};

/// Default request timeout for backend-owned clients, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Taiga harvesting backend for a single project (the "origin").
///
/// Generic over [`TaigaApi`] so tests can substitute a fake client.
pub struct TaigaBackend<A = TaigaClient> {
  origin: String,
  tag: String,
  api: A,
}

impl TaigaBackend<TaigaClient> {
  /// Create a backend bound to a project id, with a token-born client.
  ///
  /// # Arguments
  /// * `origin` - Project id whose data is harvested.
  /// * `url` - Base URL of the Taiga API. Mandatory.
  /// * `token` - API token. Mandatory; backends never drive the login flow.
  ///
  /// # Errors
  /// [`TaigaError::MissingArguments`] when either url or token is absent.
  pub fn new(origin: impl Into<String>, url: Option<&str>, token: Option<&str>) -> Result<Self> {
    let (Some(url), Some(token)) = (url, token) else {
      return Err(TaigaError::MissingArguments(
        "both url and token are mandatory for a backend".to_string(),
      ));
    };

    let client = TaigaClient::new(url, Credentials::Token(token.to_string()), DEFAULT_TIMEOUT_SECS)?;
    Ok(Self::with_api(origin, client))
  }
}

impl<A: TaigaApi> TaigaBackend<A> {
  /// Create a backend over an existing API implementation.
  ///
  /// The tag defaults to the origin, as hosts expect when none is given.
  pub fn with_api(origin: impl Into<String>, api: A) -> Self {
    let origin = origin.into();
    Self {
      tag: origin.clone(),
      origin,
      api,
    }
  }

  /// Replace the default tag attached to harvested items.
  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = tag.into();
    self
  }

  /// Project id this backend harvests.
  pub fn origin(&self) -> &str {
    &self.origin
  }

  /// Tag attached to item envelopes.
  pub fn tag(&self) -> &str {
    &self.tag
  }

  /// Fetch all items of one category, in server page order.
  ///
  /// List categories pass their records through untouched. Dict categories
  /// yield a single record; `id` and `modified_date` are standard fields most
  /// Taiga items carry, but some dict endpoints lack them, so defaults are
  /// injected first and the actual values overlaid on top.
  ///
  /// # Arguments
  /// * `category` - One of the names in [`taiga::CATEGORY_MAP`].
  /// * `max_pages` - Page cap forwarded to the pager; `None` fetches all.
  pub async fn fetch_items(&self, category: &str, max_pages: Option<usize>) -> Result<Vec<Value>> {
    let spec = taiga::lookup(category)?;
    let items = self.api.fetch(&spec.query(&self.origin), max_pages).await?;

    match items {
      Value::Array(records) => Ok(records),
      Value::Object(record) => {
        let mut completed = Map::new();
        completed.insert("id".to_string(), origin_id(&self.origin));
        completed.insert(
          "modified_date".to_string(),
          Value::String(Utc::now().to_rfc3339()),
        );
        completed.extend(record);
        Ok(vec![Value::Object(completed)])
      }
      other => Err(TaigaError::Canary(format!(
        "{category} response is neither a list nor a dict: {other}"
      ))),
    }
  }

  /// Fetch the preconfigured field projection of a dict category.
  ///
  /// # Errors
  /// [`TaigaError::MissingExpectedItem`] when the server response lacks any
  /// of the category's required fields.
  pub async fn fetch_fields(&self, category: &str) -> Result<Map<String, Value>> {
    let spec = taiga::lookup(category)?;
    if spec.shape != Shape::Dict {
      return Err(TaigaError::Canary(format!(
        "{category} is not a single-object category"
      )));
    }
    self.api.pick_fields(&spec.query(&self.origin), spec.fields).await
  }

  /// Wrap a harvested item in a metadata envelope carrying origin, tag,
  /// category, identity, and modification timestamp.
  pub fn metadata(&self, category: &str, item: &Value) -> Result<Value> {
    Ok(serde_json::json!({
      "backend_name": "taiga",
      "origin": self.origin,
      "tag": self.tag,
      "category": category,
      "id": metadata_id(item)?,
      "updated_on": metadata_updated_on(item)?,
      "fetched_on": Utc::now().timestamp() as f64,
      "data": item,
    }))
  }
}

/// Inject the origin as a numeric id when it parses as one, keeping slugs as
/// strings.
fn origin_id(origin: &str) -> Value {
  match origin.parse::<i64>() {
    Ok(id) => Value::from(id),
    Err(_) => Value::String(origin.to_string()),
  }
}

/// Extract the identifier from a Taiga item.
pub fn metadata_id(item: &Value) -> Result<String> {
  match item.get("id") {
    Some(Value::String(id)) => Ok(id.clone()),
    Some(Value::Number(id)) => Ok(id.to_string()),
    _ => Err(TaigaError::Canary("item lacks an id property".to_string())),
  }
}

/// Extract the update time from a Taiga item, as Unix seconds.
///
/// Dict items lacking `modified_date` get it injected by
/// [`TaigaBackend::fetch_items`], so every harvested item carries one.
pub fn metadata_updated_on(item: &Value) -> Result<f64> {
  let as_string = item
    .get("modified_date")
    .and_then(Value::as_str)
    .ok_or_else(|| TaigaError::Canary("item lacks a modified_date property".to_string()))?;

  let as_datetime: DateTime<chrono::FixedOffset> = DateTime::parse_from_rfc3339(as_string)
    .map_err(|e| TaigaError::Canary(format!("unparseable modified_date {as_string}: {e}")))?;

  Ok(as_datetime.timestamp_millis() as f64 / 1000.0)
}

/// Identify an item's category by matching each category's required-field set
/// against the item's keys.
///
/// Exactly one match identifies the item. Several simultaneous matches mean a
/// semi-identified item and are reported rather than resolved by picking one.
pub fn metadata_category(item: &Value) -> Result<&'static str> {
  let Value::Object(record) = item else {
    return Err(TaigaError::Canary("item to classify is not a JSON object".to_string()));
  };

  let candidates: Vec<&'static str> = taiga::CATEGORY_MAP
    .iter()
    .filter(|spec| spec.fields.iter().all(|field| record.contains_key(*field)))
    .map(|spec| spec.name)
    .collect();

  match candidates.as_slice() {
    [category] => Ok(category),
    [] => {
      let keys: Vec<&str> = record.keys().map(String::as_str).collect();
      Err(TaigaError::UnclassifiedItem(format!("{keys:?}")))
    }
    several => Err(TaigaError::Canary(format!("semi-identified item, could be: {several:?}"))),
  }
}

/// Archiving isn't supported.
pub fn has_archiving() -> bool {
  false
}

/// Resuming isn't supported.
pub fn has_resuming() -> bool {
  false
}
