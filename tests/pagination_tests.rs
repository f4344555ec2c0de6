//! Pager and projection tests against a mocked HTTP endpoint.

use httpmock::prelude::*;
use serde_json::json;
use taiga_dl::taiga::{Credentials, TaigaClient, TaigaError};

fn token_client(server: &MockServer) -> TaigaClient {
  TaigaClient::new(server.base_url(), Credentials::Token("a_valid_token".to_string()), 30).unwrap()
}

#[tokio::test]
async fn test_single_page_fetch_returns_records_in_order() {
  let server = MockServer::start();
  let mock = server.mock(|when, then| {
    when.method(GET).path("/tasks").query_param("project", "42");
    then
      .status(200)
      .json_body(json!([{"id": 30}, {"id": 10}, {"id": 20}]));
  });

  let client = token_client(&server);
  let records = client.fetch("tasks?project=42", None).await.unwrap();

  assert_eq!(records, json!([{"id": 30}, {"id": 10}, {"id": 20}]));
  assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_fetch_sends_bearer_and_close_headers() {
  let server = MockServer::start();
  let mock = server.mock(|when, then| {
    when
      .method(GET)
      .path("/tasks")
      .header("authorization", "Bearer a_valid_token")
      .header("content-type", "application/json")
      .header("connection", "close");
    then.status(200).json_body(json!([]));
  });

  let client = token_client(&server);
  client.fetch("tasks?project=42", None).await.unwrap();

  assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_dict_endpoint_returns_the_single_object() {
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/projects/42/stats");
    then.status(200).json_body(json!({"total_milestones": 5}));
  });

  let client = token_client(&server);
  let record = client.fetch("projects/42/stats", None).await.unwrap();

  assert_eq!(record, json!({"total_milestones": 5}));
}

/// Mount three pages of two records each, linked via pagination headers.
fn mount_three_pages(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>, httpmock::Mock<'_>) {
  let page3 = server.mock(|when, then| {
    when.method(GET).path("/tasks-page-3");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "6")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "3")
      .json_body(json!([{"id": 5}, {"id": 6}]));
  });
  let page2 = server.mock(|when, then| {
    when.method(GET).path("/tasks-page-2");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "6")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "2")
      .header("X-Pagination-Next", server.url("/tasks-page-3"))
      .json_body(json!([{"id": 3}, {"id": 4}]));
  });
  let page1 = server.mock(|when, then| {
    when.method(GET).path("/tasks").query_param("project", "42");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "6")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "1")
      .header("X-Pagination-Next", server.url("/tasks-page-2"))
      .json_body(json!([{"id": 1}, {"id": 2}]));
  });
  (page1, page2, page3)
}

#[tokio::test]
async fn test_multi_page_fetch_concatenates_in_page_order() {
  let server = MockServer::start();
  let (page1, page2, page3) = mount_three_pages(&server);

  let client = token_client(&server);
  let records = client.fetch("tasks?project=42", None).await.unwrap();

  let ids: Vec<i64> = records
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["id"].as_i64().unwrap())
    .collect();
  assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
  assert_eq!(page1.calls(), 1);
  assert_eq!(page2.calls(), 1);
  assert_eq!(page3.calls(), 1);
}

#[tokio::test]
async fn test_capped_fetch_stops_at_the_cap() {
  let server = MockServer::start();
  let (_page1, _page2, page3) = mount_three_pages(&server);

  let client = token_client(&server);
  let records = client.fetch("tasks?project=42", Some(2)).await.unwrap();

  assert_eq!(records.as_array().unwrap().len(), 4);
  // The page past the cap is never requested.
  assert_eq!(page3.calls(), 0);
}

#[tokio::test]
async fn test_cap_beyond_total_fetches_all_available_pages() {
  let server = MockServer::start();
  let (_page1, _page2, page3) = mount_three_pages(&server);

  let client = token_client(&server);
  let records = client.fetch("tasks?project=42", Some(9)).await.unwrap();

  assert_eq!(records.as_array().unwrap().len(), 6);
  assert_eq!(page3.calls(), 1);
}

#[tokio::test]
async fn test_cap_of_zero_means_no_cap() {
  let server = MockServer::start();
  mount_three_pages(&server);

  let client = token_client(&server);
  let records = client.fetch("tasks?project=42", Some(0)).await.unwrap();

  assert_eq!(records.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_partial_last_page_is_fetched() {
  // Five records paginated by two: the total page count must round up.
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/wiki-page-3");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "5")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "3")
      .json_body(json!([{"id": 5}]));
  });
  server.mock(|when, then| {
    when.method(GET).path("/wiki-page-2");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "5")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "2")
      .header("X-Pagination-Next", server.url("/wiki-page-3"))
      .json_body(json!([{"id": 3}, {"id": 4}]));
  });
  server.mock(|when, then| {
    when.method(GET).path("/wiki");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "5")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "1")
      .header("X-Pagination-Next", server.url("/wiki-page-2"))
      .json_body(json!([{"id": 1}, {"id": 2}]));
  });

  let client = token_client(&server);
  let records = client.fetch("wiki?project=42", None).await.unwrap();

  assert_eq!(records.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_incomplete_pagination_headers_mean_a_single_page() {
  // Only one of the three pagination markers is present, so the result is
  // complete after page 1.
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/epics");
    then
      .status(200)
      .header("x-paginated", "true")
      .json_body(json!([{"id": 1}]));
  });

  let client = token_client(&server);
  let records = client.fetch("epics?project=42", None).await.unwrap();

  assert_eq!(records, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_non_200_first_page_is_a_hard_error_with_diagnostics() {
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/projects/42");
    then.status(500).body("backend exploded");
  });

  let client = token_client(&server);
  let result = client.fetch("projects/42", None).await;

  match result {
    Err(TaigaError::UnexpectedHttpCode { url, status, body }) => {
      assert!(url.contains("/projects/42"));
      assert_eq!(status, 500);
      assert_eq!(body, "backend exploded");
    }
    other => panic!("expected UnexpectedHttpCode, got {other:?}"),
  }

  // The failed fetch leaves the session token untouched.
  assert_eq!(client.get_token(), Some("a_valid_token"));
}

#[tokio::test]
async fn test_non_200_on_a_subsequent_page_is_the_same_hard_error() {
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/tasks-page-2");
    then.status(500).body("backend exploded");
  });
  server.mock(|when, then| {
    when.method(GET).path("/tasks");
    then
      .status(200)
      .header("x-paginated", "true")
      .header("x-pagination-count", "4")
      .header("x-paginated-by", "2")
      .header("x-pagination-current", "1")
      .header("X-Pagination-Next", server.url("/tasks-page-2"))
      .json_body(json!([{"id": 1}, {"id": 2}]));
  });

  let client = token_client(&server);
  let result = client.fetch("tasks?project=42", None).await;

  match result {
    Err(TaigaError::UnexpectedHttpCode { url, status, .. }) => {
      assert!(url.contains("/tasks-page-2"));
      assert_eq!(status, 500);
    }
    other => panic!("expected UnexpectedHttpCode, got {other:?}"),
  }
}

#[tokio::test]
async fn test_projection_copies_exactly_the_expected_fields() {
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/projects/42");
    then.status(200).json_body(json!({"a": 1, "b": 2, "c": 3}));
  });

  let client = token_client(&server);
  let fields = client.pick_fields("projects/42", &["a", "b"]).await.unwrap();

  assert_eq!(fields.len(), 2);
  assert_eq!(fields["a"], json!(1));
  assert_eq!(fields["b"], json!(2));
  assert!(!fields.contains_key("c"));
}

#[tokio::test]
async fn test_projection_fails_fast_on_a_missing_field() {
  let server = MockServer::start();
  server.mock(|when, then| {
    when.method(GET).path("/projects/42");
    then.status(200).json_body(json!({"a": 1, "c": 3}));
  });

  let client = token_client(&server);
  let result = client.pick_fields("projects/42", &["a", "b"]).await;

  match result {
    Err(TaigaError::MissingExpectedItem { field, query }) => {
      assert_eq!(field, "b");
      assert_eq!(query, "projects/42");
    }
    other => panic!("expected MissingExpectedItem, got {other:?}"),
  }
}
