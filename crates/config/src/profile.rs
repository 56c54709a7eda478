//! Profile manifest schema
//!
//! Each profile directory holds a `profile.yml`:
//!
//! ```yaml
//! name: work
//! git:
//!   config_path: gitconfig
//! environment:
//!   variables:
//!     API_URL: https://api.example.com
//!   env_file: .env
//!   script_path: "{{profile_dir}}/init.sh"
//! dotfiles:
//!   "~/.vimrc": "{{profile_dir}}/.vimrc"
//! hooks:
//!   on_activate: hooks/activate.sh
//!   on_deactivate: hooks/deactivate.sh
//! ```
//!
//! Path values are stored as written and resolved later against the profile
//! directory (see `kontext_core::path::resolve_in_profile`).

use indexmap::IndexMap;
use kontext_core::name::validate_variable_name;
use kontext_core::{ProfileName, Result};
use serde::{Deserialize, Serialize};

/// Git identity section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSection {
    /// Git config fragment, usually relative to the profile directory
    pub config_path: String,
}

/// Environment section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSection {
    /// Explicit variables, exported in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,

    /// `.env` style file inside the profile directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// Shell script sourced last during activation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
}

impl EnvironmentSection {
    /// True when nothing is configured
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.env_file.is_none() && self.script_path.is_none()
    }
}

/// Lifecycle hook section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HooksSection {
    /// Script run when the profile becomes active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_activate: Option<String>,

    /// Script run after the profile's environment is torn down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_deactivate: Option<String>,
}

/// Which lifecycle event a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Profile activation
    Activate,
    /// Profile deactivation
    Deactivate,
}

impl HookKind {
    /// Value exported as `KONTEXT_HOOK_TYPE`
    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Activate => "activate",
            HookKind::Deactivate => "deactivate",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "activate" => Ok(HookKind::Activate),
            "deactivate" => Ok(HookKind::Deactivate),
            other => Err(format!(
                "unknown hook type '{other}' (expected 'activate' or 'deactivate')"
            )),
        }
    }
}

/// A named profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name, identical to its directory name
    pub name: ProfileName,

    /// Git identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSection>,

    /// Environment variables, env file and script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentSection>,

    /// Target path → source path inside the profile directory
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dotfiles: IndexMap<String, String>,

    /// Lifecycle hooks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<HooksSection>,
}

impl Profile {
    /// Create an empty profile
    pub fn new(name: ProfileName) -> Self {
        Self {
            name,
            git: None,
            environment: None,
            dotfiles: IndexMap::new(),
            hooks: None,
        }
    }

    /// Explicit variables, empty when no environment section exists
    pub fn variables(&self) -> impl Iterator<Item = (&String, &String)> {
        self.environment
            .iter()
            .flat_map(|env| env.variables.iter())
    }

    /// Configured env file
    pub fn env_file(&self) -> Option<&str> {
        self.environment.as_ref()?.env_file.as_deref()
    }

    /// Configured script
    pub fn script_path(&self) -> Option<&str> {
        self.environment.as_ref()?.script_path.as_deref()
    }

    /// Configured git fragment
    pub fn git_config_path(&self) -> Option<&str> {
        self.git.as_ref().map(|g| g.config_path.as_str())
    }

    /// Hook for a lifecycle event
    pub fn hook(&self, kind: HookKind) -> Option<&str> {
        let hooks = self.hooks.as_ref()?;
        match kind {
            HookKind::Activate => hooks.on_activate.as_deref(),
            HookKind::Deactivate => hooks.on_deactivate.as_deref(),
        }
    }

    /// Check invariants that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `InvalidVariableName` for any explicit variable whose name is
    /// not a shell identifier.
    pub fn validate(&self) -> Result<()> {
        for (key, _) in self.variables() {
            validate_variable_name(key)?;
        }
        Ok(())
    }

    /// Serialize to manifest YAML
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse manifest YAML
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}
