//! Evaluate command implementation

use crate::evaluation::{evaluate, LabelTable};
use crate::log_error_with_context;
use clap::{Args, ValueEnum};

/// Report rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

/// Arguments for the evaluate command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Classified CSV produced by `classify`
    #[arg(short, long)]
    pub predictions: String,

    /// Gold standard (JSON array or CSV)
    #[arg(short, long)]
    pub gold: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub output: Option<String>,
}

impl EvaluateArgs {
    /// Execute the evaluate command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(
            predictions = %self.predictions,
            gold = %self.gold,
            "Starting evaluation"
        );

        let predictions = match LabelTable::load(&self.predictions, "predictions") {
            Ok(t) => t,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load predictions");
                eprintln!("❌ {e}");
                return Ok(1);
            }
        };
        let gold = match LabelTable::load(&self.gold, "gold") {
            Ok(t) => t,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load gold standard");
                eprintln!("❌ {e}");
                return Ok(1);
            }
        };

        let report = match evaluate(&predictions, &gold) {
            Ok(report) => report,
            Err(e) => {
                log_error_with_context!(&e, "Evaluation failed");
                eprintln!("❌ {e}");
                return Ok(e.exit_code());
            }
        };

        match self.format {
            ReportFormat::Console => println!("{}", report.format_console()),
            ReportFormat::Json => println!("{}", report.format_json()?),
        }
        if let Some(path) = &self.output {
            std::fs::write(path, report.format_json()?)?;
            println!("📄 Report written to {path}");
        }
        Ok(0)
    }
}
