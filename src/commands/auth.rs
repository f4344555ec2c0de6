//! Authentication subcommand handlers.
//!
//! Covers both `taiga-dl auth test`, which performs a live login for
//! user/password credentials, and `taiga-dl auth show`, which prints the
//! currently detected credential sources.

use std::process;

use clap::Subcommand;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::taiga::{Credentials, TaigaClient, censor};

/// Authentication subcommands
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
  /// Verify that the configured credentials can authenticate
  Test,
  /// Show the currently configured credential sources
  Show,
}

/// Dispatch the authentication subcommands defined under `taiga-dl auth`.
pub(crate) async fn handle_auth_command(subcommand: &AuthCommand, cli: &Cli, colors: &ColorScheme) {
  match subcommand {
    AuthCommand::Test => test_auth(cli, colors).await,
    AuthCommand::Show => show_auth_config(cli, colors),
  }
}

/// Validate the configured credentials, performing a login call for
/// user/password pairs.
async fn test_auth(cli: &Cli, colors: &ColorScheme) {
  let base_url = match &cli.auth.url {
    Some(url) => url,
    None => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Base URL not provided"));
      eprintln!("\n{}", colors.info("Please provide the Taiga API URL:"));
      eprintln!("  taiga-dl auth test --url https://api.taiga.io/api/v1/");
      eprintln!("  Or set the TAIGA_URL environment variable");
      process::exit(1);
    }
  };

  println!("{} {}", colors.info("→"), colors.info("Testing authentication"));
  println!("  {}: {}", colors.emphasis("URL"), colors.link(base_url));

  let credentials = match Credentials::from_parts(
    cli.auth.token.clone(),
    cli.auth.user.clone(),
    cli.auth.password.clone(),
  ) {
    Ok(credentials) => credentials,
    Err(e) => {
      eprintln!("\n{} {}", colors.error("✗"), colors.error("Incomplete credentials"));
      eprintln!("  {e}");
      eprintln!("\n{}", colors.info("Provide credentials via:"));
      eprintln!("  • CLI flags: --token, or --user and --password");
      eprintln!("  • Environment variables: TAIGA_TOKEN, or TAIGA_USER and TAIGA_PASSWORD");
      process::exit(2);
    }
  };

  let mut client = match TaigaClient::new(base_url, credentials, cli.performance.timeout) {
    Ok(client) => client,
    Err(e) => {
      eprintln!("\n{} {}", colors.error("✗"), colors.error("Failed to create API client"));
      eprintln!("  {e}");
      process::exit(1);
    }
  };

  // Token-born clients are ready without any network call.
  if let Some(token) = client.get_token() {
    println!("\n{} {}", colors.success("✓"), colors.success("Token configured"));
    println!("  {}: {}", colors.emphasis("Token"), colors.dimmed(censor(token)));
    println!(
      "\n{} Token-born clients do not need to log in.",
      colors.info("ℹ")
    );
    return;
  }

  println!("\n{} {}", colors.info("→"), colors.info("Calling the auth endpoint..."));
  match client.login().await {
    Ok(()) => {
      println!("\n{} {}", colors.success("✓"), colors.success("Login successful!"));
      if let Some(token) = client.get_token() {
        println!("  {}: {}", colors.emphasis("Token"), colors.dimmed(censor(token)));
      }
      println!("\n{} Your credentials are working correctly.", colors.info("ℹ"));
    }
    Err(e) => {
      eprintln!("\n{} {}", colors.error("✗"), colors.error("Login failed"));
      eprintln!("  {e}");
      eprintln!("\n{}", colors.info("Common issues:"));
      eprintln!("  1. Wrong username or password");
      eprintln!("  2. Wrong base URL - should point at the API, e.g. https://api.taiga.io/api/v1/");
      eprintln!("  3. Network connectivity issues");
      eprintln!(
        "\n{}",
        colors.dimmed("Run 'taiga-dl auth show' to see your current configuration")
      );
      process::exit(2);
    }
  }
}

/// Display the currently configured authentication sources and values.
///
/// The output highlights whether values came from CLI flags or environment
/// variables so that users can quickly diagnose conflicts. Secrets are only
/// ever printed in censored form.
fn show_auth_config(cli: &Cli, colors: &ColorScheme) {
  println!("{}\n", colors.emphasis("Authentication Configuration"));

  let source_of = |env_name: &str, flag_value: bool| {
    if std::env::var(env_name).is_ok() {
      "environment variable"
    } else if flag_value {
      "command-line flag"
    } else {
      "not set"
    }
  };

  if let Some(ref url) = cli.auth.url {
    println!("{}: {}", colors.emphasis("Base URL"), colors.link(url));
    println!(
      "  {}: {}",
      colors.dimmed("Source"),
      colors.dimmed(source_of("TAIGA_URL", true))
    );
  } else {
    println!("{}: {}", colors.emphasis("Base URL"), colors.dimmed("(not set)"));
  }

  if let Some(ref user) = cli.auth.user {
    println!("\n{}: {}", colors.emphasis("Username"), user);
    println!(
      "  {}: {}",
      colors.dimmed("Source"),
      colors.dimmed(source_of("TAIGA_USER", true))
    );
  } else {
    println!("\n{}: {}", colors.emphasis("Username"), colors.dimmed("(not set)"));
  }

  if let Some(ref password) = cli.auth.password {
    println!("\n{}: {}", colors.emphasis("Password"), colors.dimmed(censor(password)));
    println!(
      "  {}: {}",
      colors.dimmed("Source"),
      colors.dimmed(source_of("TAIGA_PASSWORD", true))
    );
  } else {
    println!("\n{}: {}", colors.emphasis("Password"), colors.dimmed("(not set)"));
  }

  if let Some(ref token) = cli.auth.token {
    println!("\n{}: {}", colors.emphasis("API Token"), colors.dimmed(censor(token)));
    println!(
      "  {}: {} characters",
      colors.dimmed("Length"),
      colors.number(token.chars().count())
    );
    println!(
      "  {}: {}",
      colors.dimmed("Source"),
      colors.dimmed(source_of("TAIGA_TOKEN", true))
    );
  } else {
    println!("\n{}: {}", colors.emphasis("API Token"), colors.dimmed("(not set)"));
  }

  // Summary of what a harvest run would do with this configuration
  if cli.auth.url.is_none() {
    println!(
      "\n{} {} is required for API access",
      colors.warning("⚠"),
      colors.emphasis("Base URL")
    );
    println!("  Set via --url flag or TAIGA_URL environment variable");
  }

  let has_pair = cli.auth.user.is_some() && cli.auth.password.is_some();
  if cli.auth.token.is_none() && !has_pair {
    println!(
      "\n{} {} for API access",
      colors.warning("⚠"),
      colors.warning("Credentials incomplete")
    );
    println!("  Provide --token, or both --user and --password");
  } else if cli.auth.token.is_some() {
    println!(
      "\n{} {}",
      colors.success("✓"),
      colors.success("Token configured (no login needed)")
    );
  } else {
    println!(
      "\n{} {}",
      colors.success("✓"),
      colors.success("User/password configured (a login call will obtain a token)")
    );
  }
}
