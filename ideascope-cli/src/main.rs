//! Ideascope CLI: score startup ideas and analyze their market.
//!
//! Each command runs one pipeline and prints a single JSON document on stdout.
//! Logs go to stderr and to a JSON file under the platform data directory.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Ideascope: startup idea scoring and market intelligence
#[derive(Parser, Debug)]
#[command(name = "ideascope", version, about, long_about = None)]
struct Cli {
    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Score an idea on six weighted dimensions and look for related patents
    Score(ScoreArgs),
    /// Run the market intelligence pipeline
    Market(MarketArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Idea description
    #[arg(long, required_unless_present = "input")]
    pub idea: Option<String>,

    /// Keyword (repeatable)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Industry tag
    #[arg(long)]
    pub industry: Option<String>,

    /// Read the request from a JSON file ("-" for stdin)
    #[arg(long, conflicts_with_all = ["idea", "keywords", "industry"])]
    pub input: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct MarketArgs {
    /// Startup idea
    #[arg(long, required_unless_present = "input")]
    pub idea: Option<String>,

    /// Ideal customer
    #[arg(long, required_unless_present = "input")]
    pub customer: Option<String>,

    /// Problem being solved
    #[arg(long, required_unless_present = "input")]
    pub problem: Option<String>,

    /// Industry
    #[arg(long, required_unless_present = "input")]
    pub industry: Option<String>,

    /// Known competitors
    #[arg(long)]
    pub competitors: Option<String>,

    /// Unique value proposition
    #[arg(long)]
    pub unique_value: Option<String>,

    /// Business model
    #[arg(long)]
    pub business_model: Option<String>,

    /// Geographic regions
    #[arg(long)]
    pub regions: Option<String>,

    /// Read the request from a JSON file ("-" for stdin)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "ideascope", "ideascope")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ideascope.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.model.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_flags() {
        let cli = Cli::try_parse_from([
            "ideascope",
            "score",
            "--idea",
            "Solar kiosks",
            "-k",
            "solar",
            "-k",
            "charging",
            "--industry",
            "Energy",
        ])
        .unwrap();
        match cli.command {
            Commands::Score(args) => {
                assert_eq!(args.idea.as_deref(), Some("Solar kiosks"));
                assert_eq!(args.keywords, vec!["solar", "charging"]);
                assert_eq!(args.industry.as_deref(), Some("Energy"));
            }
            other => panic!("Expected score, got {:?}", other),
        }
    }

    #[test]
    fn test_score_requires_idea_or_input() {
        assert!(Cli::try_parse_from(["ideascope", "score"]).is_err());
        assert!(Cli::try_parse_from(["ideascope", "score", "--input", "req.json"]).is_ok());
        assert!(
            Cli::try_parse_from(["ideascope", "score", "--input", "a.json", "--idea", "x"])
                .is_err()
        );
    }

    #[test]
    fn test_market_requires_core_fields() {
        assert!(Cli::try_parse_from(["ideascope", "market", "--idea", "x"]).is_err());
        let cli = Cli::try_parse_from([
            "ideascope",
            "market",
            "--idea",
            "x",
            "--customer",
            "y",
            "--problem",
            "z",
            "--industry",
            "w",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["ideascope", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
