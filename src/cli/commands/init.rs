//! `ilt init` command - Initialize a new ILT project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ProjectError, MARKER_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Also initialize a git repository
    #[arg(long)]
    pub git: bool,

    /// Rewrite .ilt/config.yaml even if the project already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    if args.git {
        init_git(&path)?;
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized ILT project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add yourself as ADMINISTRADOR",
                style(format!("edit {}/team.yaml", MARKER_DIR)).yellow()
            );
            println!(
                "  {} Define a part type",
                style("ilt part new --name NAME --dim nome:label:unidade:tol:nominal").yellow()
            );
            println!(
                "  {} Open an inspection lot",
                style("ilt lot new --part @1 --quantity 100 --samples 10").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} ILT project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("ilt init --force").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn init_git(path: &Path) -> Result<()> {
    if path.join(".git").exists() {
        println!("{} Git repository already exists", style("✓").green());
        return Ok(());
    }

    let output = std::process::Command::new("git")
        .arg("init")
        .current_dir(path)
        .output()
        .into_diagnostic()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(miette::miette!("Failed to initialize git: {}", stderr));
    }
    println!("{} Initialized git repository", style("✓").green());

    let gitignore_path = path.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(
            &gitignore_path,
            format!("# ILT session state\n/{}/shortids.json\n\n# Editor backups\n*.swp\n*~\n", MARKER_DIR),
        )
        .into_diagnostic()?;
    }
    Ok(())
}

fn print_structure(root: &Path) {
    let mut entries = vec![
        format!("{}/", MARKER_DIR),
        format!("{}/config.yaml", MARKER_DIR),
        format!("{}/team.yaml", MARKER_DIR),
    ];
    entries.extend(EntityPrefix::all().iter().map(|p| format!("{}/", p.directory())));

    for entry in entries {
        if root.join(&entry).exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
