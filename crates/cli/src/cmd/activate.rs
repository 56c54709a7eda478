//! Shell-facing commands: `activate`, `deactivate`, `switch`, `hook-env`
//!
//! Each prints shell code on stdout for `eval`. Diagnostics go to stderr
//! through tracing so the evaluated text stays clean.

use clap::Args;
use kontext_core::ProfileName;
use kontext_engine::{DotfileChange, Transition, resolver};

use crate::command::Command;
use crate::common::{RuntimeContext, emit_script, report_warnings, shell_profile};
use crate::error::{CommandError, Result};

/// Print activation code for a profile
#[derive(Debug, Args)]
pub struct ActivateCommand {
    /// Profile name (default: the profile tagged for this directory)
    pub name: Option<String>,
}

impl Command for ActivateCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = match &self.name {
            Some(name) => context.existing_profile(name)?,
            None => resolver::get_active_profile(Some(context.cwd()))
                .ok_or_else(|| CommandError::NoActiveProfile(context.cwd().to_path_buf()))?,
        };

        let transition = context
            .session()
            .activate(&name)
            .map_err(|e| context.with_guidance(e))?;
        finish(&transition)
    }
}

/// Print deactivation code
#[derive(Debug, Args)]
pub struct DeactivateCommand {
    /// Profile name (default: the profile active in this shell)
    pub name: Option<String>,
}

impl Command for DeactivateCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let Some(raw) = self.name.clone().or_else(shell_profile) else {
            tracing::info!("No profile is active in this shell");
            return Ok(());
        };

        let name = ProfileName::new(&raw)?;
        let transition = context.session().deactivate(&name)?;
        finish(&transition)
    }
}

/// Deactivate the current profile and activate another
#[derive(Debug, Args)]
pub struct SwitchCommand {
    /// Profile to switch to
    pub name: String,
}

impl Command for SwitchCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = context.existing_profile(&self.name)?;
        let transition = context
            .session()
            .switch(shell_profile().as_deref(), &name)
            .map_err(|e| context.with_guidance(e))?;
        finish(&transition)
    }
}

/// Print whatever the shell needs to match the current directory
///
/// Meant for prompt hooks; prints nothing when no change is needed.
#[derive(Debug, Args)]
pub struct HookEnvCommand {}

impl Command for HookEnvCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let current = shell_profile();
        match context
            .session()
            .hook_env(context.cwd(), current.as_deref())?
        {
            Some(transition) => finish(&transition),
            None => Ok(()),
        }
    }
}

fn finish(transition: &Transition) -> Result<()> {
    report_warnings(&transition.warnings);
    for change in &transition.dotfiles {
        match change {
            DotfileChange::AlreadyLinked { .. } => tracing::debug!("{change}"),
            _ => tracing::info!("{change}"),
        }
    }
    emit_script(&transition.script)
}
