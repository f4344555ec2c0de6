//! Command-line interface definitions for taiga-dl.
//!
//! This module defines the CLI structure using clap derives and dispatches to
//! the command handlers.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::color::ColorScheme;
use crate::commands::auth::{AuthCommand, handle_auth_command};
use crate::commands::categories::handle_categories_command;
use crate::commands::completions::handle_completions_command;
use crate::commands::fetch::handle_fetch_command;
use crate::commands::version::handle_version_command;
use crate::taiga;

/// taiga-dl - Harvest Taiga project data as JSON records
#[derive(Debug, Parser)]
#[command(
  name = "taiga-dl",
  version,
  about = "Harvest Taiga project data as JSON records",
  long_about = "A command-line tool for harvesting project-management data from a Taiga instance.\n\
                Fetches the configured categories (basics, stats, issues_stats, epics,\n\
                userstories, tasks, wiki) and emits them as NDJSON.",
  styles = get_clap_styles()
)]
pub struct Cli {
  /// Project id (or slug) to harvest
  #[arg(value_name = "PROJECT_ID")]
  pub project: Option<String>,

  /// Subcommand to execute
  #[command(subcommand)]
  pub command: Option<Command>,

  /// Authentication options
  #[command(flatten)]
  pub auth: AuthOptions,

  /// Harvest options
  #[command(flatten)]
  pub fetch: FetchOptions,

  /// Behavior options
  #[command(flatten)]
  pub behavior: BehaviorOptions,

  /// Performance options
  #[command(flatten)]
  pub performance: PerformanceOptions,
}

/// Subcommands for debugging and introspection
#[derive(Debug, Subcommand)]
pub enum Command {
  /// List the known categories, their queries, and required fields
  Categories,

  /// Authentication testing and inspection
  Auth {
    #[command(subcommand)]
    subcommand: AuthCommand,
  },

  /// Display version and build information
  Version {
    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Show only version number
    #[arg(long)]
    short: bool,
  },

  /// Generate shell completion scripts
  Completions {
    /// Target shell for completions
    #[arg(value_enum)]
    shell: Shell,
  },
}

/// Normalize a URL by adding https:// if no scheme is present
fn normalize_url(url: &str) -> Result<String, String> {
  let trimmed = url.trim();

  let parsed = match Url::parse(trimmed) {
    Ok(parsed) => parsed,
    Err(_) => {
      // Failed to parse, likely missing scheme
      let with_https = format!("https://{trimmed}");
      Url::parse(&with_https).map_err(|e| format!("Invalid URL: {e}"))?
    }
  };

  Ok(parsed.to_string())
}

/// Authentication options
#[derive(Debug, Parser)]
pub struct AuthOptions {
  /// Base URL of the Taiga API (e.g. https://api.taiga.io/api/v1/)
  #[arg(long, env = "TAIGA_URL", value_name = "URL", value_parser = normalize_url, global = true)]
  pub url: Option<String>,

  /// Taiga username (requires --password)
  #[arg(long, env = "TAIGA_USER", value_name = "USER", global = true)]
  pub user: Option<String>,

  /// Taiga password (requires --user)
  #[arg(long, env = "TAIGA_PASSWORD", value_name = "PASSWORD", global = true)]
  pub password: Option<String>,

  /// Taiga API token; takes precedence over --user/--password
  #[arg(long, env = "TAIGA_TOKEN", value_name = "TOKEN", global = true)]
  pub token: Option<String>,
}

/// Harvest options
#[derive(Debug, Parser)]
pub struct FetchOptions {
  /// Category to harvest (repeatable; all categories when omitted)
  #[arg(short = 'c', long = "category", value_name = "NAME")]
  pub categories: Vec<String>,

  /// Maximum number of pages to fetch per category (0 means no cap)
  #[arg(long, value_name = "N")]
  pub max_pages: Option<usize>,

  /// Write one <category>.ndjson file per category into this directory
  /// instead of printing to stdout
  #[arg(short = 'o', long, value_name = "DIR")]
  pub output: Option<String>,

  /// Wrap each record in a metadata envelope (origin, category, id, updated_on)
  #[arg(long)]
  pub metadata: bool,

  /// Tag attached to metadata envelopes (defaults to the project id)
  #[arg(long, value_name = "TAG", requires = "metadata")]
  pub tag: Option<String>,
}

/// Behavior options
#[derive(Debug, Parser)]
pub struct BehaviorOptions {
  /// Show what would be harvested without making any request
  #[arg(long)]
  pub dry_run: bool,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Colorize output
  #[arg(long, value_enum, default_value = "auto", value_name = "WHEN")]
  pub color: ColorOption,
}

/// Color output options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
  Auto,
  Always,
  Never,
}

/// Performance options
#[derive(Debug, Parser)]
pub struct PerformanceOptions {
  /// Request timeout in seconds
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout: u64,
}

/// Shells supported by the completions subcommand
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
  Bash,
  Zsh,
  Fish,
  Powershell,
  Elvish,
}

impl Cli {
  /// Parse CLI arguments from the environment
  pub fn parse_args() -> Self {
    Self::parse()
  }

  /// Validate CLI arguments
  ///
  /// Returns an error if the CLI configuration is invalid.
  pub fn validate(&self) -> Result<(), String> {
    // Check if we have a project id or a command
    if self.project.is_none() && self.command.is_none() {
      return Err("Either provide a project id or use a subcommand".to_string());
    }

    // Harvesting needs a base URL and complete credentials
    if self.project.is_some() {
      if self.auth.url.is_none() {
        return Err("--url is required when harvesting a project".to_string());
      }

      let has_pair = self.auth.user.is_some() && self.auth.password.is_some();
      if self.auth.token.is_none() && !has_pair {
        return Err("Provide --token, or both --user and --password".to_string());
      }
    }

    // An incomplete user/password pair is a configuration error wherever a
    // login could happen; `auth show` must still run to diagnose it.
    let may_log_in = self.project.is_some()
      || matches!(
        &self.command,
        Some(Command::Auth {
          subcommand: AuthCommand::Test
        })
      );
    if may_log_in && self.auth.user.is_some() != self.auth.password.is_some() {
      return Err("--user and --password must be provided together".to_string());
    }

    // Unknown categories are rejected before any network call
    for category in &self.fetch.categories {
      if taiga::lookup(category).is_err() {
        return Err(format!(
          "Unknown category '{}'. Known categories: {}",
          category,
          taiga::category_names().join(", ")
        ));
      }
    }

    Ok(())
  }
}

/// Parse CLI arguments, initialize shared services, and dispatch to the chosen
/// command.
pub async fn run() {
  let cli = Cli::parse_args();

  init_tracing(&cli.behavior);

  // Create color scheme based on user preference
  let colors = ColorScheme::new(cli.behavior.color);

  // Validate CLI arguments
  if let Err(e) = cli.validate() {
    eprintln!("{} {}", colors.error("Error:"), e);
    process::exit(4); // Invalid arguments exit code
  }

  // The category table is declared statically; check its invariants once.
  if let Err(e) = taiga::validate_table() {
    eprintln!("{} {}", colors.error("Error:"), e);
    process::exit(1);
  }

  // Handle subcommands
  if let Some(ref command) = cli.command {
    match command {
      Command::Categories => {
        handle_categories_command(&colors);
      }
      Command::Auth { subcommand } => {
        handle_auth_command(subcommand, &cli, &colors).await;
      }
      Command::Version { json, short } => {
        handle_version_command(*json, *short, &colors);
      }
      Command::Completions { shell } => {
        handle_completions_command(*shell);
      }
    }
    return;
  }

  // Handle the main harvest functionality
  if let Some(ref project) = cli.project {
    handle_fetch_command(project, &cli, &colors).await;
  }
}

fn init_tracing(behavior: &BehaviorOptions) {
  let level = if behavior.quiet {
    LevelFilter::ERROR
  } else {
    match behavior.verbose {
      0 => LevelFilter::WARN,
      1 => LevelFilter::INFO,
      2 => LevelFilter::DEBUG,
      _ => LevelFilter::TRACE,
    }
  };

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Get custom styles for clap help output
fn get_clap_styles() -> clap::builder::Styles {
  use clap::builder::styling::{AnsiColor, Effects};

  clap::builder::Styles::styled()
    .header(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .literal(AnsiColor::BrightGreen.on_default())
    .placeholder(AnsiColor::BrightCyan.on_default())
    .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
    .valid(AnsiColor::BrightGreen.on_default())
    .invalid(AnsiColor::BrightRed.on_default())
}
