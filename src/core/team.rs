//! Users, roles and the team roster used for owner/admin checks

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::config::Config;
use crate::core::project::Project;
use crate::core::store::StoreError;

/// Role that grants administrator operations
pub const ADMIN_ROLE: &str = "ADMINISTRADOR";

/// The acting user of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    /// Upper-cased role names
    pub roles: BTreeSet<String>,
}

impl User {
    pub fn new<I, R>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        Self {
            username: username.into(),
            roles: roles
                .into_iter()
                .map(|r| r.as_ref().trim().to_uppercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// User holding the administrator role
    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, [ADMIN_ROLE])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(&role.to_uppercase())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Supplies the user on whose behalf operations run
pub trait IdentityProvider {
    fn current_user(&self) -> User;
}

impl IdentityProvider for User {
    fn current_user(&self) -> User {
        self.clone()
    }
}

/// A team member with their roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl TeamMember {
    pub fn to_user(&self) -> User {
        User::new(self.username.clone(), &self.roles)
    }
}

/// Team roster stored in `.ilt/team.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

fn default_version() -> u32 {
    1
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self {
            version: 1,
            members: Vec::new(),
        }
    }
}

impl TeamRoster {
    /// Load the roster from a project; `None` when the project has none
    pub fn load(project: &Project) -> Result<Option<Self>, StoreError> {
        Self::load_from_path(&project.ilt_dir().join("team.yaml"))
    }

    /// Load a roster from a specific path
    pub fn load_from_path(path: &Path) -> Result<Option<Self>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let roster = crate::core::store::parse_yaml(&contents, path)?;
        Ok(Some(roster))
    }

    /// Save the roster to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<(), StoreError> {
        let contents = serde_yml::to_string(self)?;
        std::fs::write(path, contents).map_err(|e| StoreError::io(path, e))
    }

    /// Find an active member by username (case-insensitive)
    pub fn find_member(&self, username: &str) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.active && m.username.eq_ignore_ascii_case(username))
    }

    /// Get all active members
    pub fn active_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| m.active)
    }

    /// Generate default team.yaml template content
    pub fn default_template() -> &'static str {
        r#"# Inspection team roster
# Members listed here get their roles from this file.
# The ADMINISTRADOR role allows managing part types and deleting any lot.

version: 1

members: []
  # - name: "Jane Smith"
  #   username: "jsmith"        # Matches ILT_USER / config `user` / $USER
  #   email: "jane@example.com"
  #   roles: [ADMINISTRADOR]
  #   active: true
"#
    }
}

/// Identity resolved from configuration and the team roster.
///
/// The username comes from config (`user`, `ILT_USER`) or the login name;
/// roles come from the matching roster member, else from config `roles`.
#[derive(Debug, Clone)]
pub struct ConfigIdentity {
    username: String,
    fallback_roles: Vec<String>,
    roster: Option<TeamRoster>,
}

impl ConfigIdentity {
    pub fn new(config: &Config, roster: Option<TeamRoster>) -> Self {
        Self {
            username: config.username(),
            fallback_roles: config.roles(),
            roster,
        }
    }

    /// Act as a different user than the configured one
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

impl IdentityProvider for ConfigIdentity {
    fn current_user(&self) -> User {
        match self
            .roster
            .as_ref()
            .and_then(|r| r.find_member(&self.username))
        {
            Some(member) => member.to_user(),
            None => User::new(self.username.clone(), &self.fallback_roles),
        }
    }
}
