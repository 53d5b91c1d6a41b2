//! `ilt meas` command - Record measured pieces against a lot

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;

use crate::cli::helpers::{format_rate, Session};
use crate::cli::table::Table;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::codec::encode_measurements;
use crate::core::tolerance::findings;
use crate::core::MeasurementInput;
use crate::entities::{DimensionSpec, MeasurementRecord, Verdict};

#[derive(Subcommand, Debug)]
pub enum MeasCommands {
    /// Record one measured piece
    Add(AddArgs),

    /// List a lot's measurements
    List(LotArg),

    /// Remove a measurement by its ID
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub lot: String,

    /// Measured value: name=value (repeat for each dimension)
    #[arg(long = "dim", value_name = "NAME=VALUE", value_parser = parse_reading)]
    pub dims: Vec<(String, f64)>,

    /// Prompt for each dimension of the part type's template
    #[arg(long, short = 'i', conflicts_with = "dims")]
    pub interactive: bool,

    /// Observation recorded with the piece
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct LotArg {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub lot: String,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Lot ID, lot code (LOTE-NNNNNN), partial ID or @N
    pub lot: String,

    /// Measurement ID (see `ilt meas list`)
    pub id: u64,
}

/// Parse `name=value` into a dimension reading
pub fn parse_reading(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid reading '{}'. Use name=value", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid reading '{}': missing dimension name", s));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value '{}' for dimension '{}'", value.trim(), name))?;
    if !value.is_finite() {
        return Err(format!("Value for dimension '{}' must be a finite number", name));
    }
    Ok((name.to_string(), value))
}

/// Run a meas subcommand
pub fn run(cmd: MeasCommands, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    match cmd {
        MeasCommands::Add(args) => run_add(&session, args, global),
        MeasCommands::List(args) => run_list(&session, args, global),
        MeasCommands::Remove(args) => run_remove(&session, args, global),
    }
}

fn prompt_readings(template: &[DimensionSpec]) -> Result<BTreeMap<String, f64>> {
    let theme = ColorfulTheme::default();
    let mut readings = BTreeMap::new();
    for spec in template {
        let prompt = match spec.range() {
            Some((nominal, tol)) => format!("{} [{} ± {} {}]", spec.label, nominal, tol, spec.unit),
            None => format!("{} [{}]", spec.label, spec.unit),
        };
        let raw: String = Input::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                let input = input.trim();
                if input.is_empty() || input.parse::<f64>().is_ok_and(f64::is_finite) {
                    Ok(())
                } else {
                    Err("Enter a number, or leave empty to skip".to_string())
                }
            })
            .interact_text()
            .into_diagnostic()?;
        if let Some(value) = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()) {
            readings.insert(spec.name.clone(), value);
        }
    }
    Ok(readings)
}

fn run_add(session: &Session, args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let lot_id = session.resolve_lot(&args.lot)?;
    let lot = session.service.get_lot(&lot_id)?;
    let template = session.service.measurement_template(&lot.part_type)?;

    let dimensions = if args.interactive {
        prompt_readings(&template.dimensions)?
    } else {
        args.dims.into_iter().collect()
    };
    let input = MeasurementInput {
        dimensions,
        note: args.note,
    };
    let problems = findings(&input.dimensions, &template.dimensions);

    let (lot, record) = session.service.add_measurement(&lot_id, input)?;

    if global.quiet {
        println!("{}", record.verdict);
        return Ok(());
    }

    let verdict = match record.verdict {
        Verdict::Approved => style(record.verdict.as_str()).green().bold(),
        Verdict::Rejected => style(record.verdict.as_str()).red().bold(),
    };
    println!(
        "{} Piece {} of lot {}: {}",
        style("✓").green(),
        record.piece_number,
        style(&lot.code).yellow(),
        verdict
    );
    for finding in &problems {
        println!("  {} {}", style("•").red(), finding);
    }
    println!(
        "  {}/{} samples, {} approved, status {}",
        lot.stats.sample_count,
        lot.desired_samples,
        format_rate(lot.stats.approval_rate),
        lot.status
    );
    Ok(())
}

fn format_dimensions(record: &MeasurementRecord) -> String {
    record
        .dimensions
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_list(session: &Session, args: LotArg, global: &GlobalOpts) -> Result<()> {
    let lot_id = session.resolve_lot(&args.lot)?;
    let records = session.service.list_measurements(&lot_id)?;

    match session.format(global) {
        OutputFormat::Json => println!("{}", encode_measurements(&records)?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&records).into_diagnostic()?),
        OutputFormat::Id => {
            for record in &records {
                println!("{}", record.id);
            }
        }
        tabular => {
            if records.is_empty() && tabular == OutputFormat::Auto {
                println!("No measurements recorded.");
                return Ok(());
            }
            let mut table = Table::new(["ID", "PIECE", "TAKEN", "STATUS", "DIMENSIONS", "NOTE"]);
            for record in &records {
                table.push([
                    record.id.to_string(),
                    record.piece_number.to_string(),
                    record.taken_at.format("%Y-%m-%d %H:%M").to_string(),
                    record.verdict.to_string(),
                    format_dimensions(record),
                    record.note.clone().unwrap_or_default(),
                ]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}

fn run_remove(session: &Session, args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let lot_id = session.resolve_lot(&args.lot)?;
    let lot = session.service.remove_measurement(&lot_id, args.id)?;

    if !global.quiet {
        println!(
            "{} Removed measurement {} from lot {} ({} sample(s) left, status {})",
            style("✓").green(),
            args.id,
            style(&lot.code).yellow(),
            lot.stats.sample_count,
            lot.status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading() {
        assert_eq!(
            parse_reading("comprimento=50.05").unwrap(),
            ("comprimento".to_string(), 50.05)
        );
        assert_eq!(parse_reading(" d = -1 ").unwrap(), ("d".to_string(), -1.0));
        assert!(parse_reading("comprimento").is_err());
        assert!(parse_reading("=1").is_err());
        assert!(parse_reading("d=abc").is_err());
        assert!(parse_reading("d=inf").is_err());
        assert!(parse_reading("d=NaN").is_err());
    }
}
