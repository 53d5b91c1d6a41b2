//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, dashboard::DashboardArgs, init::InitArgs, lot::LotCommands,
    meas::MeasCommands, part::PartCommands,
};

#[derive(Parser)]
#[command(name = "ilt")]
#[command(author, version, about = "Inspection Lot Tracker")]
#[command(long_about = "Inspection Lot Tracker. Tracks production lots through sampled dimensional inspection against part type tolerance templates.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Act as this user instead of the configured one
    #[arg(long, global = true, env = "ILT_USER")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ILT project
    Init(InitArgs),

    /// Part type management (dimension templates)
    #[command(subcommand)]
    Part(PartCommands),

    /// Inspection lot management
    #[command(subcommand)]
    Lot(LotCommands),

    /// Record and review measured pieces
    #[command(subcommand)]
    Meas(MeasCommands),

    /// Show your lots at a glance
    Dashboard(DashboardArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and summaries
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Formats rendered through [`crate::cli::table::Table`]
    pub fn is_tabular(self) -> bool {
        matches!(
            self,
            OutputFormat::Auto | OutputFormat::Tsv | OutputFormat::Csv | OutputFormat::Md
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ilt", "lot", "list", "--format", "json", "--user", "ana"])
            .unwrap();
        assert_eq!(cli.global.format, OutputFormat::Json);
        assert_eq!(cli.global.user.as_deref(), Some("ana"));
    }
}
