//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Number of recent lots shown on the dashboard unless configured
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// ILT configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acting username
    pub user: Option<String>,

    /// Roles used when the user is not in the team roster
    pub roles: Option<Vec<String>>,

    /// Editor command for `ilt part edit`
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Recent lots listed on the dashboard
    pub recent_limit: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_for(project.as_ref())
    }

    /// Load configuration for a known project (or none)
    pub fn load_for(project: Option<&Project>) -> Self {
        // 1. Built-in defaults (already in Default impl)
        let mut config = Config::default();

        // 2. Global user config (~/.config/ilt/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.ilt/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.ilt_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.merge_env(|key| std::env::var(key).ok());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match Self::parse(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Parse a config document; an empty or comment-only file is the default config
    fn parse(contents: &str) -> Result<Config, serde_yml::Error> {
        match serde_yml::from_str::<serde_yml::Value>(contents)? {
            serde_yml::Value::Null => Ok(Config::default()),
            value => serde_yml::from_value(value),
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ilt")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.roles.is_some() {
            self.roles = other.roles;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.recent_limit.is_some() {
            self.recent_limit = other.recent_limit;
        }
    }

    /// Apply `ILT_USER`, `ILT_ROLES` (comma separated) and `ILT_EDITOR`
    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(user) = var("ILT_USER").filter(|u| !u.trim().is_empty()) {
            self.user = Some(user);
        }
        if let Some(roles) = var("ILT_ROLES") {
            self.roles = Some(
                roles
                    .split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect(),
            );
        }
        if let Some(editor) = var("ILT_EDITOR") {
            self.editor = Some(editor);
        }
    }

    /// Get the acting username, falling back to the login name
    pub fn username(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Roles used when the roster does not list the user
    pub fn roles(&self) -> Vec<String> {
        self.roles.clone().unwrap_or_default()
    }

    /// Recent lots shown on the dashboard
    pub fn recent_limit(&self) -> usize {
        self.recent_limit.unwrap_or(DEFAULT_RECENT_LIMIT)
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let mut parts = editor.split_whitespace();

        let Some(cmd) = parts.next() else {
            return std::process::Command::new("vi").arg(file_path).status();
        };

        std::process::Command::new(cmd)
            .args(parts)
            .arg(file_path)
            .status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_merge_prefers_later_layers() {
        let mut config: Config = serde_yml::from_str("user: global\nrecent_limit: 3\n").unwrap();
        let project: Config = serde_yml::from_str("user: project\neditor: nano\n").unwrap();
        config.merge(project);

        assert_eq!(config.username(), "project");
        assert_eq!(config.editor.as_deref(), Some("nano"));
        assert_eq!(config.recent_limit(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ILT_USER", "inspector"),
            ("ILT_ROLES", "administrador, ,INSPETOR"),
        ]);
        let mut config = Config {
            user: Some("file-user".to_string()),
            ..Config::default()
        };
        config.merge_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.username(), "inspector");
        assert_eq!(config.roles(), vec!["administrador", "INSPETOR"]);
    }

    #[test]
    fn test_config_written_by_init_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let path = project.ilt_dir().join("config.yaml");

        let config = Config::read_file(&path).expect("init config should parse");
        assert!(config.user.is_none());
        assert_eq!(config.recent_limit(), DEFAULT_RECENT_LIMIT);
    }

    #[test]
    fn test_parse_empty_and_invalid_documents() {
        assert!(Config::parse("").unwrap().user.is_none());
        assert!(Config::parse("# only a comment\n").unwrap().editor.is_none());
        assert_eq!(Config::parse("recent_limit: 8\n").unwrap().recent_limit(), 8);
        assert!(Config::parse("- a\n- b\n").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.recent_limit(), DEFAULT_RECENT_LIMIT);
        assert!(config.roles().is_empty());
    }
}
