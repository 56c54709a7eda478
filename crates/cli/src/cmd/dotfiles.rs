//! `dotfiles apply` / `dotfiles remove`
//!
//! Same links as activation, without touching the shell. Failures here are
//! errors rather than warnings.

use clap::Args;
use kontext_engine::DotfileChange;
use owo_colors::OwoColorize;

use crate::common::RuntimeContext;
use crate::error::Result;

/// Profile whose dotfiles to manage
#[derive(Debug, Args)]
pub struct DotfilesCommand {
    /// Profile name
    pub name: String,
}

impl DotfilesCommand {
    /// Link the profile's dotfiles, backing up what was there
    pub fn apply(&self, context: &RuntimeContext) -> Result<Vec<DotfileChange>> {
        let name = context.existing_profile(&self.name)?;
        let profile = context.store.load(name.as_str())?;
        let changes = context.session().dotfiles(&name)?.apply(&profile.dotfiles)?;
        print_changes(&changes);
        Ok(changes)
    }

    /// Remove the profile's links and restore backups
    pub fn remove(&self, context: &RuntimeContext) -> Result<Vec<DotfileChange>> {
        let name = context.existing_profile(&self.name)?;
        let profile = context.store.load(name.as_str())?;
        let changes = context.session().dotfiles(&name)?.remove(&profile.dotfiles)?;
        print_changes(&changes);
        Ok(changes)
    }
}

fn print_changes(changes: &[DotfileChange]) {
    if changes.is_empty() {
        println!("{}", "No dotfiles in this profile".dimmed());
        return;
    }
    for change in changes {
        let mark = match change {
            DotfileChange::Linked { .. } | DotfileChange::Unlinked { .. } => "✓".green().to_string(),
            DotfileChange::AlreadyLinked { .. } => "·".dimmed().to_string(),
            DotfileChange::Skipped { .. } => "!".yellow().to_string(),
        };
        println!("  {mark} {change}");
    }
}
