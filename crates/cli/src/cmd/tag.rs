//! `tag` / `untag`: manage directory markers

use clap::Args;
use kontext_core::ProfileName;
use kontext_core::path::resolve_user_path;
use kontext_engine::{MARKER_FILE, lifecycle, resolver};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Tag a directory with a profile
#[derive(Debug, Args)]
pub struct TagCommand {
    /// Profile name
    pub name: String,

    /// Directory to tag (default: current directory)
    pub dir: Option<PathBuf>,

    /// Replace an existing marker
    #[arg(short, long)]
    pub force: bool,
}

impl Command for TagCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = ProfileName::new(&self.name)?;
        let dir = target_dir(self.dir.as_ref(), context)?;

        let marker = lifecycle::tag_directory(&context.store, &dir, &name, self.force)
            .map_err(|e| context.with_guidance(e))?;

        println!(
            "{} Tagged {} with {}",
            "✓".green(),
            dir.display(),
            name.bold()
        );
        tracing::debug!("Marker written to {}", marker.display());
        Ok(())
    }
}

/// Remove the marker from a directory
#[derive(Debug, Args)]
pub struct UntagCommand {
    /// Directory to untag (default: current directory)
    pub dir: Option<PathBuf>,
}

impl Command for UntagCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let dir = target_dir(self.dir.as_ref(), context)?;

        if resolver::remove_marker(&dir)? {
            println!("{} Removed {} from {}", "✓".green(), MARKER_FILE, dir.display());
            if let Some(inherited) = resolver::active_profile(&dir) {
                println!(
                    "  Still controlled by {} via {}",
                    inherited.name.bold(),
                    inherited.marker.display().dimmed()
                );
            }
        } else {
            println!("{}", format!("{} has no {MARKER_FILE}", dir.display()).yellow());
        }
        Ok(())
    }
}

fn target_dir(dir: Option<&PathBuf>, context: &RuntimeContext) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(resolve_user_path(&dir.to_string_lossy(), context.cwd())?),
        None => Ok(context.cwd().to_path_buf()),
    }
}
