//! Create command implementation
//!
//! Builds a profile from flags and persists it. Paths are stored as given
//! and resolved against the profile directory when used.

use clap::Args;
use indexmap::IndexMap;
use kontext_config::{EnvironmentSection, GitSection, HookKind, HooksSection, Profile};
use kontext_core::name::validate_variable_name;
use kontext_core::path::resolve_in_profile;
use kontext_core::ProfileName;
use kontext_engine::{git, hooks};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// File name for fragments written from `--git-name` / `--git-email`
const GIT_FRAGMENT: &str = "gitconfig";

/// Create a new profile
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Profile name (letters, digits, '-' and '_')
    pub name: String,

    /// Git user.name for this profile
    #[arg(long, value_name = "NAME", conflicts_with = "git_config")]
    pub git_name: Option<String>,

    /// Git user.email for this profile
    #[arg(long, value_name = "EMAIL", conflicts_with = "git_config")]
    pub git_email: Option<String>,

    /// Existing git config fragment, relative to the profile directory
    #[arg(long, value_name = "FILE")]
    pub git_config: Option<String>,

    /// Environment variable (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// `.env` file inside the profile directory
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<String>,

    /// Shell script sourced at the end of activation
    #[arg(long, value_name = "FILE")]
    pub script: Option<String>,

    /// Dotfile link, target=source (repeatable)
    #[arg(long = "dotfile", value_name = "TARGET=SOURCE")]
    pub dotfiles: Vec<String>,

    /// Hook run when the profile activates
    #[arg(long, value_name = "FILE")]
    pub on_activate: Option<String>,

    /// Hook run when the profile deactivates
    #[arg(long, value_name = "FILE")]
    pub on_deactivate: Option<String>,
}

impl CreateCommand {
    /// Build the profile described by the flags
    ///
    /// Nothing is written; all validation happens here.
    pub fn build(&self) -> Result<Profile> {
        let mut profile = Profile::new(ProfileName::new(&self.name)?);

        let variables = parse_assignments("--env", &self.env)?;
        for key in variables.keys() {
            validate_variable_name(key)?;
        }

        let environment = EnvironmentSection {
            variables,
            env_file: self.env_file.clone(),
            script_path: self.script.clone(),
        };
        if !environment.is_empty() {
            profile.environment = Some(environment);
        }

        profile.dotfiles = parse_assignments("--dotfile", &self.dotfiles)?;

        if self.on_activate.is_some() || self.on_deactivate.is_some() {
            profile.hooks = Some(HooksSection {
                on_activate: self.on_activate.clone(),
                on_deactivate: self.on_deactivate.clone(),
            });
        }

        let config_path = if self.git_name.is_some() || self.git_email.is_some() {
            Some(GIT_FRAGMENT.to_string())
        } else {
            self.git_config.clone()
        };
        profile.git = config_path.map(|config_path| GitSection { config_path });

        Ok(profile)
    }
}

impl Command for CreateCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let profile = self.build()?;
        let dir = context.store.create(&profile)?;

        if self.git_name.is_some() || self.git_email.is_some() {
            git::write_identity(
                &dir.join(GIT_FRAGMENT),
                self.git_name.as_deref(),
                self.git_email.as_deref(),
            )?;
        }

        // Early feedback only: hooks may be added to the directory later
        for kind in [HookKind::Activate, HookKind::Deactivate] {
            if let Some(raw) = profile.hook(kind) {
                let path = resolve_in_profile(raw, &dir)?;
                if let Err(e) = hooks::validate_hook_path(&path) {
                    tracing::warn!("{kind} hook: {e}");
                }
            }
        }

        println!(
            "{} Created profile {} in {}",
            "✓".green(),
            profile.name.bold(),
            dir.to_string().dimmed()
        );
        println!(
            "  Tag a directory with {}",
            format!("kontext tag {}", profile.name).cyan()
        );
        Ok(())
    }
}

/// Parse repeated `KEY=VALUE` arguments, later duplicates win
pub fn parse_assignments(kind: &'static str, raw: &[String]) -> Result<IndexMap<String, String>> {
    let mut map = IndexMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            return Err(CommandError::InvalidAssignment {
                kind,
                value: item.clone(),
            });
        };
        if key.is_empty() {
            return Err(CommandError::InvalidAssignment {
                kind,
                value: item.clone(),
            });
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}
