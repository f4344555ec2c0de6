//! Scripted fake Taiga server for testing response sequences.
//!
//! Serves a fixed queue of canned responses over raw TCP, one connection per
//! response, in order. The client always sends `Connection: close`, so each
//! exchange is a full connection lifecycle, which keeps the server trivially
//! simple and makes same-URL response sequences (429 then 200) easy to
//! script.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One canned HTTP response.
pub struct CannedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: String,
}

impl CannedResponse {
  /// A JSON response with the given status.
  pub fn json(status: u16, body: serde_json::Value) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.to_string(),
    }
  }

  /// Attach an extra response header.
  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }
}

/// A fake Taiga server answering requests from a fixed response queue.
pub struct FakeTaigaServer {
  base_url: String,
}

impl FakeTaigaServer {
  /// Start the server; it answers exactly one request per queued response,
  /// in order, then stops accepting connections.
  pub async fn start(responses: Vec<CannedResponse>) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
      for response in responses {
        let Ok((mut socket, _)) = listener.accept().await else {
          return;
        };

        // Read the request head; the request bodies in these tests are small
        // enough to arrive together with it.
        let mut buf = vec![0u8; 8192];
        let mut read = 0;
        loop {
          match socket.read(&mut buf[read..]).await {
            Ok(0) => break,
            Ok(n) => {
              read += n;
              if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                break;
              }
            }
            Err(_) => return,
          }
        }

        let reason = match response.status {
          200 => "OK",
          401 => "Unauthorized",
          429 => "Too Many Requests",
          500 => "Internal Server Error",
          _ => "Canned",
        };

        let mut head = format!(
          "HTTP/1.1 {} {}\r\nconnection: close\r\ncontent-type: application/json\r\ncontent-length: {}\r\n",
          response.status,
          reason,
          response.body.len()
        );
        for (name, value) in &response.headers {
          head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(response.body.as_bytes()).await;
        let _ = socket.shutdown().await;
      }
    });

    Self {
      base_url: format!("http://{addr}/"),
    }
  }

  /// Base URL of the fake server, with a trailing slash.
  pub fn base_url(&self) -> &str {
    &self.base_url
  }
}
