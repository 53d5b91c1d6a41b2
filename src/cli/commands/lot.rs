//! `ilt lot` command - Inspection lot management

use chrono::{Duration, NaiveDate, Utc};
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, format_rate, truncate_str, Session};
use crate::cli::table::{print_summary, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::workflow::{self, MINIMUM_APPROVAL_RATE};
use crate::core::{LotUpdate, NewLot};
use crate::entities::{Lot, LotStatus};

#[derive(Subcommand, Debug)]
pub enum LotCommands {
    /// Open a new inspection lot
    New(NewArgs),

    /// List your lots (or every lot with --all)
    List(ListArgs),

    /// Show a lot's details and statistics
    Show(IdArg),

    /// Change a lot's description or notes
    Update(UpdateArgs),

    /// Delete a lot without measurements
    Delete(ConfirmArgs),

    /// Decide the lot: approved at 90% or more, else rejected
    Complete(IdArg),

    /// Put a completed lot back in progress
    Reopen(IdArg),

    /// Discard all measurements and start over
    Restart(ConfirmArgs),

    /// Lot count and mean approval rate per day
    Stats(StatsArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Part type being inspected (ID, partial ID or @N)
    #[arg(long, short = 'p')]
    pub part: String,

    /// Lot description
    #[arg(long, short = 'd')]
    pub description: String,

    /// Total units in the lot
    #[arg(long, short = 'Q')]
    pub quantity: u32,

    /// Samples to measure before the lot can be completed
    #[arg(long, short = 's')]
    pub samples: Option<u32>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Every lot, not only yours (administrators only)
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Filter by status (in_progress, ready, approved, rejected)
    #[arg(long, short = 's')]
    pub status: Option<LotStatus>,

    /// Only lots whose description contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub id: String,

    /// New description (default: keep)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// New notes (default: keep; empty string clears)
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ConfirmArgs {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub id: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// First day (YYYY-MM-DD, default: 29 days before --to)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Lot count and mean approval rate per owner, best first
    #[arg(long, conflicts_with_all = ["from", "to", "by_part"])]
    pub by_user: bool,

    /// Part types by number of lots, most used first
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub by_part: bool,
}

/// Run a lot subcommand
pub fn run(cmd: LotCommands, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    match cmd {
        LotCommands::New(args) => run_new(&session, args, global),
        LotCommands::List(args) => run_list(&session, args, global),
        LotCommands::Show(args) => run_show(&session, args, global),
        LotCommands::Update(args) => run_update(&session, args, global),
        LotCommands::Delete(args) => run_delete(&session, args, global),
        LotCommands::Complete(args) => run_complete(&session, args, global),
        LotCommands::Reopen(args) => run_reopen(&session, args, global),
        LotCommands::Restart(args) => run_restart(&session, args, global),
        LotCommands::Stats(args) => run_stats(&session, args, global),
    }
}

fn styled_status(status: LotStatus) -> String {
    let text = style(status.as_str());
    let styled = match status {
        LotStatus::InProgress => text.yellow(),
        LotStatus::ReadyForReview => text.cyan(),
        LotStatus::Approved => text.green(),
        LotStatus::Rejected => text.red(),
    };
    styled.to_string()
}

fn run_new(session: &Session, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let part_type = session.resolve_part_type(&args.part)?;

    let mut input = NewLot::new(args.description, part_type, args.quantity);
    input.desired_samples = args.samples;
    input.notes = args.notes;
    let lot = session.service.create_lot(&session.user, input)?;

    if global.quiet {
        println!("{}", lot.code);
    } else {
        println!(
            "{} Created lot {} ({}) with {} unit(s), {} sample(s) required",
            style("✓").green(),
            style(&lot.code).yellow(),
            style(&lot.id).cyan(),
            lot.quantity,
            lot.desired_samples
        );
    }
    Ok(())
}

fn run_list(session: &Session, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut lots = if args.all {
        session.service.list_all_lots(&session.user)?
    } else {
        session.service.list_lots_for(&session.user)?
    };

    if let Some(status) = args.status {
        lots.retain(|l| l.status == status);
    }
    if let Some(ref text) = args.search {
        let needle = text.trim().to_lowercase();
        lots.retain(|l| l.description.to_lowercase().contains(&needle));
    }
    if let Some(limit) = args.limit {
        lots.truncate(limit);
    }

    if args.count {
        println!("{}", lots.len());
        return Ok(());
    }

    let format = session.format(global);
    if lots.is_empty() && format == OutputFormat::Auto {
        println!("No lots found.");
        return Ok(());
    }

    let short_ids = session.remember_listing(lots.iter().map(|l| &l.id));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lots).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&lots).into_diagnostic()?),
        OutputFormat::Id => {
            for lot in &lots {
                println!("{}", lot.id);
            }
        }
        tabular => {
            let mut table = Table::new([
                "SHORT", "CODE", "DESCRIPTION", "STATUS", "SAMPLES", "APPROVAL", "OWNER",
            ]);
            for lot in &lots {
                table.push([
                    short_ids.label(&lot.id),
                    lot.code.clone(),
                    truncate_str(&lot.description, 30),
                    lot.status.to_string(),
                    format!("{}/{}", lot.stats.sample_count, lot.desired_samples),
                    format_rate(lot.stats.approval_rate),
                    lot.owner.clone(),
                ]);
            }
            print!("{}", table.render(tabular));
            print_summary(table.len(), "lot", tabular);
        }
    }
    Ok(())
}

fn run_show(session: &Session, args: IdArg, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let lot = session.service.get_lot(&id)?;

    match session.format(global) {
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&lot).into_diagnostic()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lot).into_diagnostic()?),
        OutputFormat::Id => println!("{}", lot.id),
        _ => {
            // A dangling part type reference still shows the lot
            let part_name = session
                .service
                .get_part_type(&lot.part_type)
                .map(|pt| pt.name)
                .unwrap_or_else(|_| lot.part_type.to_string());
            print_lot(&lot, &part_name);
        }
    }
    Ok(())
}

fn print_lot(lot: &Lot, part_name: &str) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("Code").bold(), style(&lot.code).yellow());
    println!("{}: {}", style("ID").bold(), style(&lot.id).cyan());
    println!("{}: {}", style("Description").bold(), lot.description);
    println!("{}: {}", style("Part Type").bold(), part_name);
    println!("{}: {}", style("Status").bold(), styled_status(lot.status));
    println!("{}", style("─".repeat(60)).dim());

    let stats = &lot.stats;
    println!();
    println!("{}:", style("Inspection").bold());
    println!(
        "  Samples: {} of {} required ({} remaining)",
        stats.sample_count,
        lot.desired_samples,
        lot.samples_remaining()
    );
    println!(
        "  Approved: {}  Rejected: {}  Rate: {}",
        style(stats.approved_count).green(),
        style(stats.rejected_count).red(),
        format_rate(stats.approval_rate)
    );
    println!(
        "  Sampled: {} of {} unit(s)",
        format_rate(stats.sampling_percentage),
        lot.quantity
    );

    if let Some(ref notes) = lot.notes {
        println!();
        println!("{}", style("Notes:").bold());
        println!("{}", notes);
    }

    let next: Vec<String> = workflow::allowed_transitions(lot.status)
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    if !next.is_empty() {
        println!();
        println!("{}: {}", style("Can move to").dim(), next.join(", "));
    }

    println!("{}", style("─".repeat(60)).dim());
    print!(
        "{}: {} | {}: {}",
        style("Owner").dim(),
        lot.owner,
        style("Created").dim(),
        lot.created.format("%Y-%m-%d %H:%M")
    );
    if let Some(completed) = lot.completed {
        print!(" | {}: {}", style("Completed").dim(), completed.format("%Y-%m-%d %H:%M"));
    }
    println!();
}

fn run_update(session: &Session, args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let current = session.service.get_lot(&id)?;

    let update = LotUpdate {
        description: args.description.unwrap_or(current.description),
        notes: args.notes.or(current.notes),
    };
    let lot = session.service.update_lot(&session.user, &id, update)?;

    if !global.quiet {
        println!("{} Updated lot {}", style("✓").green(), style(&lot.code).yellow());
    }
    Ok(())
}

fn run_delete(session: &Session, args: ConfirmArgs, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let lot = session.service.get_lot(&id)?;

    if !confirm(&format!("Delete lot {}?", lot.code), args.yes, global.quiet)? {
        return Ok(());
    }

    session.service.delete_lot(&session.user, &id)?;
    if !global.quiet {
        println!("{} Deleted lot {}", style("✓").green(), style(&lot.code).yellow());
    }
    Ok(())
}

fn run_complete(session: &Session, args: IdArg, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let approved = session.service.complete_lot(&id)?;
    let lot = session.service.get_lot(&id)?;

    if global.quiet {
        println!("{}", lot.status);
        return Ok(());
    }

    let verdict = if approved {
        style("APROVADO").green().bold()
    } else {
        style("REPROVADO").red().bold()
    };
    println!(
        "{} Lot {} {} with {} approval (minimum {})",
        style("✓").green(),
        style(&lot.code).yellow(),
        verdict,
        format_rate(lot.stats.approval_rate),
        format_rate(MINIMUM_APPROVAL_RATE)
    );
    Ok(())
}

fn run_reopen(session: &Session, args: IdArg, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let lot = session.service.reopen_lot(&id)?;

    if !global.quiet {
        println!(
            "{} Lot {} is {}",
            style("✓").green(),
            style(&lot.code).yellow(),
            styled_status(lot.status)
        );
    }
    Ok(())
}

fn run_restart(session: &Session, args: ConfirmArgs, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_lot(&args.id)?;
    let lot = session.service.get_lot(&id)?;

    let prompt = format!(
        "Discard {} measurement(s) of lot {}?",
        lot.measurements.len(),
        lot.code
    );
    if !confirm(&prompt, args.yes, global.quiet)? {
        return Ok(());
    }

    let lot = session.service.restart_lot(&id)?;
    if !global.quiet {
        println!(
            "{} Lot {} restarted, {} sample(s) required",
            style("✓").green(),
            style(&lot.code).yellow(),
            lot.desired_samples
        );
    }
    Ok(())
}

fn run_stats(session: &Session, args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    if args.by_user {
        return run_stats_by_user(session, global);
    }
    if args.by_part {
        return run_stats_by_part(session, global);
    }

    let to = args.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = args.from.unwrap_or(to - Duration::days(29));
    let stats = session.service.statistics_by_period(from, to)?;

    match session.format(global) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&stats).into_diagnostic()?),
        OutputFormat::Id => {
            for day in &stats {
                println!("{}", day.day);
            }
        }
        tabular => {
            if stats.is_empty() && tabular == OutputFormat::Auto {
                println!("No lots created between {} and {}.", from, to);
                return Ok(());
            }
            let mut table = Table::new(["DAY", "LOTS", "MEAN APPROVAL"]);
            for day in &stats {
                table.push([
                    day.day.to_string(),
                    day.lot_count.to_string(),
                    format_rate(day.mean_approval_rate),
                ]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}

fn run_stats_by_user(session: &Session, global: &GlobalOpts) -> Result<()> {
    let performance = session.service.performance_by_user()?;

    match session.format(global) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&performance).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&performance).into_diagnostic()?),
        OutputFormat::Id => {
            for entry in &performance {
                println!("{}", entry.username);
            }
        }
        tabular => {
            let mut table = Table::new(["USER", "LOTS", "MEAN APPROVAL"]);
            for entry in &performance {
                table.push([
                    entry.username.clone(),
                    entry.lot_count.to_string(),
                    format_rate(entry.mean_approval_rate),
                ]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}

fn run_stats_by_part(session: &Session, global: &GlobalOpts) -> Result<()> {
    let usage = session.service.most_used_part_types()?;

    match session.format(global) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&usage).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&usage).into_diagnostic()?),
        OutputFormat::Id => {
            for entry in &usage {
                println!("{}", entry.part_type_id);
            }
        }
        tabular => {
            let mut table = Table::new(["PART TYPE", "LOTS"]);
            for entry in &usage {
                table.push([entry.name.clone(), entry.lot_count.to_string()]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}
