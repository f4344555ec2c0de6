//! taiga-dl - Harvest Taiga project data as JSON records
//!
//! This is the main entry point for the CLI application.

#[tokio::main]
async fn main() {
  taiga_dl::cli::run().await;
}
