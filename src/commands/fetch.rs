//! Harvest command handler: fetches the selected categories of a project and
//! emits them as NDJSON.

use std::path::Path;
use std::process;

use anyhow::Context;

use crate::backend::TaigaBackend;
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::taiga::{self, Credentials, TaigaClient};

/// Handle the main harvest flow.
///
/// Progress chrome goes to stderr so that stdout stays clean for the NDJSON
/// records when no `--output` directory is given.
pub(crate) async fn handle_fetch_command(project: &str, cli: &Cli, colors: &ColorScheme) {
  let categories: Vec<&str> = if cli.fetch.categories.is_empty() {
    taiga::category_names()
  } else {
    cli.fetch.categories.iter().map(String::as_str).collect()
  };

  eprintln!("{} {}", colors.progress("→"), colors.info("Harvesting project"));
  eprintln!("  {}: {}", colors.emphasis("Project"), colors.number(project));
  if let Some(ref url) = cli.auth.url {
    eprintln!("  {}: {}", colors.emphasis("URL"), colors.link(url));
  }
  eprintln!("  {}: {}", colors.emphasis("Categories"), categories.join(", "));
  if let Some(cap) = cli.fetch.max_pages.filter(|cap| *cap > 0) {
    eprintln!("  {}: {}", colors.emphasis("Page cap"), colors.number(cap));
  }

  if cli.behavior.dry_run {
    eprintln!(
      "\n{} {}",
      colors.warning("⚠"),
      colors.warning("DRY RUN: No requests will be made")
    );
    return;
  }

  if let Err(e) = harvest(project, &categories, cli, colors).await {
    eprintln!("{} {}", colors.error("✗"), colors.error("Harvest failed"));
    eprintln!("  {}: {e:#}", colors.emphasis("Error"));
    process::exit(1);
  }

  eprintln!("\n{} {}", colors.success("✓"), colors.success("Harvest complete"));
}

/// Run the harvest: authenticate, fetch each category, and write records.
async fn harvest(project: &str, categories: &[&str], cli: &Cli, colors: &ColorScheme) -> anyhow::Result<()> {
  let url = cli.auth.url.as_deref().context("--url is required")?;
  let credentials = Credentials::from_parts(
    cli.auth.token.clone(),
    cli.auth.user.clone(),
    cli.auth.password.clone(),
  )?;

  let mut client = TaigaClient::new(url, credentials, cli.performance.timeout)?;

  // Token-born clients are ready immediately; user/password clients log in
  // once up front.
  if client.get_token().is_none() {
    eprintln!("\n{} {}", colors.info("→"), colors.info("Logging in"));
    client.login().await.context("login failed")?;
  }

  let mut backend = TaigaBackend::with_api(project, client);
  if let Some(ref tag) = cli.fetch.tag {
    backend = backend.with_tag(tag);
  }

  let max_pages = cli.fetch.max_pages.filter(|cap| *cap > 0);

  if let Some(ref dir) = cli.fetch.output {
    tokio::fs::create_dir_all(dir)
      .await
      .with_context(|| format!("failed to create output directory {dir}"))?;
  }

  for category in categories {
    eprintln!("\n{} {} {}", colors.info("→"), colors.info("Fetching"), colors.emphasis(category));

    let items = backend.fetch_items(category, max_pages).await?;

    let mut lines = String::new();
    for item in &items {
      let record = if cli.fetch.metadata {
        backend.metadata(category, item)?
      } else {
        item.clone()
      };
      lines.push_str(&serde_json::to_string(&record)?);
      lines.push('\n');
    }

    match cli.fetch.output {
      Some(ref dir) => {
        let path = Path::new(dir).join(format!("{category}.ndjson"));
        tokio::fs::write(&path, &lines)
          .await
          .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!(
          "  {} {} records → {}",
          colors.success("✓"),
          colors.number(items.len()),
          colors.path(path.display())
        );
      }
      None => {
        print!("{lines}");
        eprintln!("  {} {} records", colors.success("✓"), colors.number(items.len()));
      }
    }
  }

  Ok(())
}
