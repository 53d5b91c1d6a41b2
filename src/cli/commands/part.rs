//! `ilt part` command - Part types and their dimension templates

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{confirm, format_short_id, truncate_str, Session};
use crate::cli::table::{print_summary, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::codec::{decode_template, encode_template};
use crate::core::error::QcError;
use crate::core::NewPartType;
use crate::entities::part_type::validate_template;
use crate::entities::{DimensionSpec, PartType};

#[derive(Subcommand, Debug)]
pub enum PartCommands {
    /// Create a part type (administrators only)
    New(NewArgs),

    /// List part types
    List(ListArgs),

    /// Show a part type with its dimensions
    Show(IdArg),

    /// Replace name, description or dimensions (administrators only)
    Update(UpdateArgs),

    /// Delete a part type no lot uses (administrators only)
    Delete(DeleteArgs),

    /// Show the dimensions an inspector must measure
    Template(IdArg),

    /// Lot count per part type
    Usage,

    /// Edit a part type file in your editor (administrators only)
    Edit(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Part type name (unique, case-insensitive)
    #[arg(long, short = 'n')]
    pub name: String,

    /// Free-text description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Dimension spec: nome:label:unidade[:tolerancia[:valorPadrao]]
    #[arg(long = "dim", value_name = "SPEC")]
    pub dims: Vec<DimensionSpec>,

    /// Read dimensions from a JSON file ({"dimensoes": [...]})
    #[arg(long, value_name = "PATH", conflicts_with = "dims")]
    pub template_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only part types whose name contains this text
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Only part types referenced by at least one lot
    #[arg(long)]
    pub in_use: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Part type ID, partial ID or @N
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Part type ID, partial ID or @N
    pub id: String,

    /// New name (default: keep)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// New description (default: keep; empty string clears)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Replacement dimension specs (default: keep current template)
    #[arg(long = "dim", value_name = "SPEC")]
    pub dims: Vec<DimensionSpec>,

    /// Replacement dimensions from a JSON file
    #[arg(long, value_name = "PATH", conflicts_with = "dims")]
    pub template_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Part type ID, partial ID or @N
    pub id: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Run a part subcommand
pub fn run(cmd: PartCommands, global: &GlobalOpts) -> Result<()> {
    let session = Session::open(global)?;
    match cmd {
        PartCommands::New(args) => run_new(&session, args, global),
        PartCommands::List(args) => run_list(&session, args, global),
        PartCommands::Show(args) => run_show(&session, args, global),
        PartCommands::Update(args) => run_update(&session, args, global),
        PartCommands::Delete(args) => run_delete(&session, args, global),
        PartCommands::Template(args) => run_template(&session, args, global),
        PartCommands::Usage => run_usage(&session, global),
        PartCommands::Edit(args) => run_edit(&session, args),
    }
}

fn read_template_file(path: &Path) -> Result<Vec<DimensionSpec>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))?;
    Ok(decode_template(&json)?)
}

fn run_new(session: &Session, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let dimensions = match args.template_file {
        Some(ref path) => read_template_file(path)?,
        None => args.dims,
    };

    let input = NewPartType {
        name: args.name,
        description: args.description,
        dimensions,
    };
    let part_type = session.service.create_part_type(&session.user, input)?;

    if global.quiet {
        println!("{}", part_type.id);
    } else {
        println!(
            "{} Created part type {} ({}) with {} dimension(s)",
            style("✓").green(),
            style(&part_type.name).yellow(),
            style(&part_type.id).cyan(),
            part_type.dimensions.len()
        );
    }
    Ok(())
}

fn run_list(session: &Session, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let part_types = match (args.in_use, args.search.as_deref()) {
        (true, search) => {
            let needle = search.unwrap_or("").to_lowercase();
            session
                .service
                .part_types_in_use()?
                .into_iter()
                .filter(|pt| pt.name.to_lowercase().contains(&needle))
                .collect()
        }
        (false, Some(text)) => session.service.search_part_types(text)?,
        (false, None) => session.service.list_part_types()?,
    };

    if args.count {
        println!("{}", part_types.len());
        return Ok(());
    }

    let format = session.format(global);
    if part_types.is_empty() && format == OutputFormat::Auto {
        println!("No part types found.");
        return Ok(());
    }

    let short_ids = session.remember_listing(part_types.iter().map(|pt| &pt.id));

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&part_types).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&part_types).into_diagnostic()?),
        OutputFormat::Id => {
            for pt in &part_types {
                println!("{}", pt.id);
            }
        }
        tabular => {
            let mut table = Table::new(["SHORT", "ID", "NAME", "DIMS", "AUTHOR"]);
            for pt in &part_types {
                table.push([
                    short_ids.label(&pt.id),
                    format_short_id(&pt.id),
                    truncate_str(&pt.name, 30),
                    pt.dimensions.len().to_string(),
                    pt.author.clone(),
                ]);
            }
            print!("{}", table.render(tabular));
            print_summary(table.len(), "part type", tabular);
        }
    }
    Ok(())
}

fn run_show(session: &Session, args: IdArg, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_part_type(&args.id)?;
    let part_type = session.service.get_part_type(&id)?;

    match session.format(global) {
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&part_type).into_diagnostic()?),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&part_type).into_diagnostic()?)
        }
        OutputFormat::Id => println!("{}", part_type.id),
        _ => print_part_type(&part_type),
    }
    Ok(())
}

fn print_part_type(part_type: &PartType) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&part_type.id).cyan());
    println!("{}: {}", style("Name").bold(), style(&part_type.name).yellow());
    if let Some(ref description) = part_type.description {
        println!("{}: {}", style("Description").bold(), description);
    }
    println!("{}", style("─".repeat(60)).dim());

    println!();
    println!(
        "{} ({}):",
        style("Dimensions").bold(),
        part_type.dimensions.len()
    );
    for spec in &part_type.dimensions {
        let range = match spec.range() {
            Some((nominal, tol)) => format!("{} ± {} {}", nominal, tol, spec.unit),
            None => style("no tolerance check").dim().to_string(),
        };
        println!("  • {} ({}) {}", style(&spec.name).cyan(), spec.label, range);
    }

    println!("{}", style("─".repeat(60)).dim());
    print!(
        "{}: {} | {}: {}",
        style("Author").dim(),
        part_type.author,
        style("Created").dim(),
        part_type.created.format("%Y-%m-%d %H:%M")
    );
    if let Some(updated) = part_type.updated {
        print!(" | {}: {}", style("Updated").dim(), updated.format("%Y-%m-%d %H:%M"));
    }
    println!();
}

fn run_update(session: &Session, args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_part_type(&args.id)?;
    let current = session.service.get_part_type(&id)?;

    let dimensions = match (args.template_file, args.dims.is_empty()) {
        (Some(path), _) => read_template_file(&path)?,
        (None, false) => args.dims,
        (None, true) => current.dimensions,
    };
    let input = NewPartType {
        name: args.name.unwrap_or(current.name),
        description: args.description.or(current.description),
        dimensions,
    };
    let part_type = session.service.update_part_type(&session.user, &id, input)?;

    if !global.quiet {
        println!(
            "{} Updated part type {} ({} dimension(s))",
            style("✓").green(),
            style(&part_type.name).yellow(),
            part_type.dimensions.len()
        );
    }
    Ok(())
}

fn run_delete(session: &Session, args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_part_type(&args.id)?;
    let part_type = session.service.get_part_type(&id)?;

    let prompt = format!("Delete part type {}?", part_type.name);
    if !confirm(&prompt, args.yes, global.quiet)? {
        return Ok(());
    }

    session.service.delete_part_type(&session.user, &id)?;
    if !global.quiet {
        println!(
            "{} Deleted part type {}",
            style("✓").green(),
            style(&part_type.name).yellow()
        );
    }
    Ok(())
}

fn run_template(session: &Session, args: IdArg, global: &GlobalOpts) -> Result<()> {
    let id = session.resolve_part_type(&args.id)?;
    let template = session.service.measurement_template(&id)?;

    match session.format(global) {
        OutputFormat::Json => println!("{}", encode_template(&template.dimensions)?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&template).into_diagnostic()?),
        OutputFormat::Id => {
            for spec in &template.dimensions {
                println!("{}", spec.name);
            }
        }
        tabular => {
            let mut table = Table::new(["NAME", "LABEL", "UNIT", "NOMINAL", "TOLERANCE"]);
            for spec in &template.dimensions {
                let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
                table.push([
                    spec.name.clone(),
                    spec.label.clone(),
                    spec.unit.clone(),
                    number(spec.nominal),
                    number(spec.tolerance),
                ]);
            }
            if tabular == OutputFormat::Auto {
                println!(
                    "{} {}",
                    style("Measurement template for").bold(),
                    style(&template.part_type_name).yellow()
                );
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}

fn run_usage(session: &Session, global: &GlobalOpts) -> Result<()> {
    let usage = session.service.part_type_usage()?;

    match session.format(global) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&usage).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&usage).into_diagnostic()?),
        OutputFormat::Id => {
            for entry in &usage {
                println!("{}", entry.part_type_id);
            }
        }
        tabular => {
            let mut table = Table::new(["NAME", "LOTS"]);
            for entry in &usage {
                table.push([entry.name.clone(), entry.lot_count.to_string()]);
            }
            print!("{}", table.render(tabular));
        }
    }
    Ok(())
}

fn run_edit(session: &Session, args: IdArg) -> Result<()> {
    if !session.user.is_admin() {
        return Err(QcError::AccessDenied(format!(
            "editing a part type requires the administrator role (user '{}')",
            session.user.username
        ))
        .into());
    }

    let id = session.resolve_part_type(&args.id)?;
    let path = session.service.store().path_of(&id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(session.config.editor()).yellow()
    );
    session.config.run_editor(&path).into_diagnostic()?;

    // Reload so a broken edit is reported right away
    let edited = session.service.get_part_type(&id)?;
    validate_template(&edited.dimensions)?;
    println!(
        "{} {} has {} dimension(s)",
        style("✓").green(),
        style(&edited.name).yellow(),
        edited.dimensions.len()
    );
    Ok(())
}
