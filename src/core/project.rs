//! Project discovery and structure

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::team::TeamRoster;

/// Marker directory at the project root
pub const MARKER_DIR: &str = ".ilt";

/// Represents an ILT project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .ilt/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open a project at a known root without searching
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(MARKER_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::write_structure(root)
    }

    /// Force initialization even if .ilt/ exists (rewrites config, keeps data)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let ilt_dir = root.join(MARKER_DIR);
        std::fs::create_dir_all(&ilt_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(ilt_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let team_path = ilt_dir.join("team.yaml");
        if !team_path.exists() {
            std::fs::write(&team_path, TeamRoster::default_template())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(prefix.directory()))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Inspection Lot Tracker project configuration

# Acting user (overridden by ILT_USER or --user)
# user: ""

# Roles used when the user is not listed in team.yaml
# roles: []

# Editor for `ilt part edit` (default: $EDITOR)
# editor: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# Recent lots shown by `ilt dashboard`
# recent_limit: 5
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .ilt configuration directory
    pub fn ilt_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Directory holding entities of a given type
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(prefix.directory())
    }

    /// Path of an entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix()).join(format!("{}.ilt.yaml", id))
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("not an ILT project (searched from {searched_from:?})")]
    #[diagnostic(code(ilt::project::not_found), help("run 'ilt init' to create one"))]
    NotFound { searched_from: PathBuf },

    #[error("ILT project already exists at {0:?}")]
    #[diagnostic(code(ilt::project::exists), help("use --force to rewrite the configuration"))]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    #[diagnostic(code(ilt::project::io))]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.ilt_dir().exists());
        assert!(project.ilt_dir().join("config.yaml").exists());
        assert!(project.ilt_dir().join("team.yaml").exists());
        assert!(project.root().join("part-types").is_dir());
        assert!(project.root().join("lots").is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
        assert!(Project::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_project_discover_finds_marker_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_marker_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_entity_path() {
        let project = Project::at("/tmp/proj");
        let id = EntityId::new(EntityPrefix::Lot);
        let path = project.entity_path(&id);
        assert!(path.starts_with("/tmp/proj/lots"));
        assert!(path.to_string_lossy().ends_with(".ilt.yaml"));
    }
}
