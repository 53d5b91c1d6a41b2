//! Shared helper functions for CLI commands
//!
//! Opening the project-backed service, resolving the acting user and turning
//! command-line references into entity IDs.

use clap::ValueEnum;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::{is_lot_code, EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::core::store::{BatchStore, FileStore};
use crate::core::team::{ConfigIdentity, IdentityProvider, TeamRoster, User};
use crate::core::{Config, QualityService};

/// Service over the discovered project's files
pub type CliService = QualityService<FileStore>;

/// Everything a command needs once the project is found
pub struct Session {
    pub service: CliService,
    pub user: User,
    pub config: Config,
}

impl Session {
    /// Discover the project and resolve the acting user
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = Project::discover()?;
        let config = Config::load_for(Some(&project));
        let roster = TeamRoster::load(&project)?;

        let mut identity = ConfigIdentity::new(&config, roster);
        if let Some(ref user) = global.user {
            identity = identity.with_username(user.clone());
        }
        let user = identity.current_user();
        debug!(user = %user.username, admin = user.is_admin(), root = %project.root().display(), "session opened");

        Ok(Self {
            service: QualityService::with_system_clock(FileStore::new(project)),
            user,
            config,
        })
    }

    pub fn project(&self) -> &Project {
        self.service.store().project()
    }

    /// `--format`, or the configured `default_format` when left on auto
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        if global.format != OutputFormat::Auto {
            return global.format;
        }
        self.config
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Auto)
    }

    pub fn short_ids(&self) -> ShortIdIndex {
        ShortIdIndex::load(self.project())
    }

    /// Renumber `@N` aliases after a listing; failure to persist is not fatal
    pub fn remember_listing<'a>(&self, ids: impl IntoIterator<Item = &'a EntityId>) -> ShortIdIndex {
        let mut index = ShortIdIndex::new();
        index.rebuild(ids);
        if let Err(e) = index.save(self.project()) {
            debug!(error = %e, "could not save short id index");
        }
        index
    }

    /// Resolve a part type reference (full ID, `@N`, or unique partial ID)
    pub fn resolve_part_type(&self, reference: &str) -> Result<EntityId> {
        let candidates: Vec<EntityId> = self
            .service
            .list_part_types()?
            .into_iter()
            .map(|pt| pt.id)
            .collect();
        resolve_reference(&self.short_ids(), reference, EntityPrefix::Pt, &candidates)
    }

    /// Resolve a lot reference (full ID, lot code, `@N`, or unique partial ID)
    pub fn resolve_lot(&self, reference: &str) -> Result<EntityId> {
        if is_lot_code(reference) {
            return Ok(self.service.find_lot_by_code(reference)?.id);
        }
        let candidates: Vec<EntityId> = self
            .service
            .store()
            .list_lots()?
            .into_iter()
            .map(|l| l.id)
            .collect();
        resolve_reference(&self.short_ids(), reference, EntityPrefix::Lot, &candidates)
    }
}

/// Match a reference against known IDs of one entity type
pub fn resolve_reference(
    short_ids: &ShortIdIndex,
    reference: &str,
    prefix: EntityPrefix,
    candidates: &[EntityId],
) -> Result<EntityId> {
    let reference = reference.trim();
    let name = prefix.entity_name();

    if reference.starts_with('@') {
        let full = short_ids.resolve(reference).ok_or_else(|| {
            miette::miette!(
                "Unknown short ID '{}'. Run a list command first to assign short IDs.",
                reference
            )
        })?;
        let id = EntityId::parse(full).into_diagnostic()?;
        if id.prefix() != prefix {
            return Err(miette::miette!(
                "Short ID '{}' refers to {}, not a {}",
                reference,
                id,
                name
            ));
        }
        return Ok(id);
    }

    if let Ok(id) = EntityId::parse(reference) {
        if id.prefix() == prefix {
            return Ok(id);
        }
    }

    let needle = reference.to_uppercase();
    let matches: Vec<&EntityId> = candidates
        .iter()
        .filter(|id| id.to_string().contains(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Err(miette::miette!("No {} found matching '{}'", name, reference)),
        many => Err(miette::miette!(
            "'{}' is ambiguous: matches {} {}s",
            reference,
            many.len(),
            name
        )),
    }
}

/// Ask before a destructive action; `--yes` or `--quiet` skip the prompt
pub fn confirm(prompt: &str, yes: bool, quiet: bool) -> Result<bool> {
    if yes || quiet {
        return Ok(true);
    }
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()?;
    if !answer {
        println!("{}", style("Aborted.").yellow());
    }
    Ok(answer)
}

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Rate with one decimal and a percent sign
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Lot);
        let formatted = format_short_id(&id);
        assert!(formatted.len() <= 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("diâmetro externo", 8), "diâme...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_resolve_full_and_partial_ids() {
        let ids: Vec<EntityId> = (0..2).map(|_| EntityId::new(EntityPrefix::Pt)).collect();
        let index = ShortIdIndex::new();

        let full = ids[0].to_string();
        let resolved = resolve_reference(&index, &full, EntityPrefix::Pt, &ids).unwrap();
        assert_eq!(resolved, ids[0]);

        let tail = &ids[1].to_string()[20..];
        let resolved =
            resolve_reference(&index, &tail.to_lowercase(), EntityPrefix::Pt, &ids).unwrap();
        assert_eq!(resolved, ids[1]);

        assert!(resolve_reference(&index, "PT-", EntityPrefix::Pt, &ids).is_err());
        assert!(resolve_reference(&index, "nothing", EntityPrefix::Pt, &ids).is_err());
    }

    #[test]
    fn test_resolve_short_id_checks_type() {
        let lot = EntityId::new(EntityPrefix::Lot);
        let mut index = ShortIdIndex::new();
        index.rebuild([&lot]);

        assert_eq!(
            resolve_reference(&index, "@1", EntityPrefix::Lot, &[]).unwrap(),
            lot
        );
        assert!(resolve_reference(&index, "@1", EntityPrefix::Pt, &[]).is_err());
        assert!(resolve_reference(&index, "@7", EntityPrefix::Lot, &[]).is_err());
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(66.666), "66.7%");
        assert_eq!(format_rate(0.0), "0.0%");
    }
}
