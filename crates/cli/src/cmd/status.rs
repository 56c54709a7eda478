//! Status command implementation
//!
//! Shows which profile controls the current directory, which one the shell
//! has active, and whether they disagree.

use clap::Args;
use kontext_engine::{CURRENT_PROFILE_VAR, git, resolver};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::{RuntimeContext, shell_profile};
use crate::error::Result;

/// Show the active profile
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl Command for StatusCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let active = resolver::active_profile(context.cwd());
        let in_shell = shell_profile();

        match &active {
            Some(active) => {
                println!("{} {}", "Profile:".bold(), active.name.green().bold());
                println!("  {:14} {}", "marker".dimmed(), active.marker.display());

                match context.store.get(active.name.as_str()) {
                    Ok(Some(profile)) => {
                        let dir = context.store.profile_dir(&active.name)?;
                        if let Some(raw) = profile.git_config_path() {
                            let identity = kontext_core::path::resolve_in_profile(raw, &dir)
                                .ok()
                                .and_then(|path| git::read_identity(&path).ok());
                            if let Some(identity) = identity {
                                let who = match (identity.user_name, identity.user_email) {
                                    (Some(name), Some(email)) => format!("{name} <{email}>"),
                                    (Some(name), None) => name,
                                    (None, Some(email)) => format!("<{email}>"),
                                    (None, None) => "-".to_string(),
                                };
                                println!("  {:14} {who}", "git".dimmed());
                            }
                        }
                    }
                    Ok(None) => println!(
                        "  {}",
                        format!("profile '{}' does not exist", active.name).red()
                    ),
                    Err(e) => println!("  {}", e.to_string().red()),
                }
            }
            None => println!("{}", "No profile for this directory".dimmed()),
        }

        let shell_line = in_shell.as_deref().unwrap_or("-");
        println!("  {:14} {shell_line}", CURRENT_PROFILE_VAR.dimmed());

        let wanted = active.as_ref().map(|a| a.name.as_str());
        if wanted != in_shell.as_deref() {
            println!(
                "{}",
                "Shell is out of date; run `eval \"$(kontext hook-env)\"`".yellow()
            );
        }
        Ok(())
    }
}
