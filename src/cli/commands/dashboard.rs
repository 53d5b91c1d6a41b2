//! `ilt dashboard` command - Overview of the acting user's lots

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_rate, truncate_str, Session};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct DashboardArgs {
    /// Recent lots to show (default: config `recent_limit`, else 5)
    #[arg(long, short = 'n')]
    pub recent: Option<usize>,
}

pub fn run(args: DashboardArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    let limit = args.recent.unwrap_or_else(|| session.config.recent_limit());
    let dashboard = session.service.dashboard(&session.user, limit)?;

    match session.format(global) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&dashboard).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&dashboard).into_diagnostic()?),
        OutputFormat::Id => {
            for lot in &dashboard.recent {
                println!("{}", lot.id);
            }
        }
        tabular => {
            if tabular == OutputFormat::Auto {
                println!(
                    "{} {}",
                    style("Dashboard for").bold(),
                    style(&session.user.username).cyan()
                );
                println!("{}", style("─".repeat(60)).dim());
                println!("  Lots:        {}", style(dashboard.total_lots).bold());
                println!("  In progress: {}", style(dashboard.in_progress).yellow());
                println!("  Completed:   {}", style(dashboard.completed).green());
                println!(
                    "  Approval:    {}",
                    format_rate(dashboard.overall_approval_rate)
                );
                println!("{}", style("─".repeat(60)).dim());
                if dashboard.recent.is_empty() {
                    return Ok(());
                }
                println!();
                println!("{}:", style("Recent lots").bold());
            }

            let short_ids = session.remember_listing(dashboard.recent.iter().map(|l| &l.id));
            let mut table = Table::new(["SHORT", "CODE", "DESCRIPTION", "STATUS", "SAMPLES", "APPROVAL"]);
            for lot in &dashboard.recent {
                table.push([
                    short_ids.label(&lot.id),
                    lot.code.clone(),
                    truncate_str(&lot.description, 30),
                    lot.status.to_string(),
                    format!("{}/{}", lot.sample_count, lot.desired_samples),
                    format_rate(lot.approval_rate),
                ]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}
