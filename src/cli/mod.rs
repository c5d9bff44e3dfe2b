//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// PII Detector - personal data classifier for public-records requests
#[derive(Parser, Debug)]
#[command(name = "pii-detector")]
#[command(version, about, long_about = None)]
#[command(author = "PII Detector Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pii-detector.toml", env = "PII_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PII_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every record of a CSV file
    Classify(commands::classify::ClassifyArgs),

    /// Score predictions against a gold standard
    Evaluate(commands::evaluate::EvaluateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Runs the selected command and returns the process exit code
    pub async fn execute(&self) -> anyhow::Result<i32> {
        match &self.command {
            Commands::Classify(args) => args.execute(&self.config).await,
            Commands::Evaluate(args) => args.execute().await,
            Commands::ValidateConfig(args) => args.execute(&self.config).await,
            Commands::Init(args) => args.execute().await,
        }
    }
}
