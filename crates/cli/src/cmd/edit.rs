//! Edit command implementation
//!
//! Opens a profile's manifest in the user's editor and re-validates it once
//! the editor exits.

use clap::Args;
use kontext_config::Config;
use kontext_engine::session;
use owo_colors::OwoColorize;
use std::env;
use std::path::Path;
use std::process::Command as ProcessCommand;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Edit a profile manifest
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Profile name
    pub name: String,
}

impl Command for EditCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = context.existing_profile(&self.name)?;
        let manifest = context.store.manifest_path(&name);

        let (editor, args) = get_editor(&context.config)?;
        run_editor(&editor, &args, &manifest)?;

        // The store rejects unparsable manifests and renamed profiles
        let profile = context.store.load(name.as_str())?;
        profile.validate()?;

        let dir = context.store.profile_dir(&name)?;
        let problems = session::diagnose(&profile, &dir);
        for problem in &problems {
            println!("  {} {problem}", "!".yellow());
        }
        println!("{} Profile {} is valid", "✓".green(), name.bold());
        Ok(())
    }
}

/// Get the editor command to use
///
/// Order: `general.editor` from the config file, `$VISUAL`, `$EDITOR`, then
/// the platform default. Values are split shell-style so `code --wait` works.
fn get_editor(config: &Config) -> Result<(String, Vec<String>)> {
    let configured = config
        .general
        .editor
        .clone()
        .or_else(|| env::var("VISUAL").ok())
        .or_else(|| env::var("EDITOR").ok())
        .filter(|value| !value.trim().is_empty());

    if let Some(command) = configured {
        let words = shell_words::split(&command).map_err(|e| CommandError::EditorFailed {
            editor: command.clone(),
            message: e.to_string(),
        })?;
        if let Some((program, args)) = words.split_first() {
            return Ok((program.clone(), args.to_vec()));
        }
    }

    #[cfg(unix)]
    const DEFAULT_EDITOR: &str = "vi";
    #[cfg(windows)]
    const DEFAULT_EDITOR: &str = "notepad.exe";

    Ok((DEFAULT_EDITOR.to_string(), vec![]))
}

/// Run the editor with the given file
fn run_editor(editor: &str, args: &[String], file: &Path) -> Result<()> {
    let status = ProcessCommand::new(editor)
        .args(args)
        .arg(file)
        .status()
        .map_err(|e| CommandError::EditorFailed {
            editor: editor.to_string(),
            message: e.to_string(),
        })?;

    if !status.success() {
        return Err(CommandError::EditorFailed {
            editor: editor.to_string(),
            message: format!("exited with {status}"),
        });
    }

    Ok(())
}
