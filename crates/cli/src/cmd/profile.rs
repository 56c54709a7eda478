//! Profile inspection and removal: `list`, `show`, `delete`

use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use kontext_config::{HookKind, Profile};
use kontext_core::AbsPath;
use kontext_engine::{git, lifecycle, resolver, session};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::{RuntimeContext, shell_profile};
use crate::error::Result;

/// List all profiles
#[derive(Debug, Args)]
pub struct ListCommand {}

impl Command for ListCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let names = context.store.list()?;
        if names.is_empty() {
            println!("{}", "No profiles yet.".yellow());
            println!("Create one with {}", "kontext create <name>".cyan());
            return Ok(());
        }

        let active = resolver::get_active_profile(Some(context.cwd()));
        let in_shell = shell_profile();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["", "Profile", "Dotfiles", "Variables", "Hooks"]);

        for name in names {
            let profile = match context.store.get(name.as_str()) {
                Ok(Some(profile)) => profile,
                _ => continue,
            };

            let is_active = active.as_ref() == Some(&name);
            let marker = match (is_active, in_shell.as_deref() == Some(name.as_str())) {
                (true, _) => "●",
                (false, true) => "○",
                (false, false) => "",
            };

            let name_cell = if is_active {
                Cell::new(name.as_str()).fg(Color::Green)
            } else {
                Cell::new(name.as_str())
            };

            let hooks = [HookKind::Activate, HookKind::Deactivate]
                .into_iter()
                .filter(|kind| profile.hook(*kind).is_some())
                .map(HookKind::as_str)
                .collect::<Vec<_>>()
                .join(", ");

            table.add_row(vec![
                Cell::new(marker),
                name_cell,
                Cell::new(profile.dotfiles.len()),
                Cell::new(profile.variables().count()),
                Cell::new(hooks),
            ]);
        }

        println!("{table}");
        println!(
            "{}",
            "● active in this directory  ○ active in this shell".dimmed()
        );
        Ok(())
    }
}

/// Show one profile
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Profile name
    pub name: String,
}

impl Command for ShowCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = context.existing_profile(&self.name)?;
        let profile = context.store.load(name.as_str())?;
        let dir = context.store.profile_dir(&name)?;

        print_profile(&profile, &dir);

        let problems = session::diagnose(&profile, &dir);
        if !problems.is_empty() {
            println!();
            println!("{}", "Problems".bold());
            for problem in &problems {
                println!("  {} {problem}", "!".yellow());
            }
        }
        Ok(())
    }
}

fn print_profile(profile: &Profile, dir: &AbsPath) {
    println!("{}", profile.name.bold());
    print_row("directory", &dir.to_string());

    if let Some(raw) = profile.git_config_path() {
        print_row("git config", raw);
        if let Ok(path) = kontext_core::path::resolve_in_profile(raw, dir) {
            if let Ok(identity) = git::read_identity(&path) {
                if let Some(name) = identity.user_name {
                    print_row("  user.name", &name);
                }
                if let Some(email) = identity.user_email {
                    print_row("  user.email", &email);
                }
            }
        }
    }

    if let Some(env_file) = profile.env_file() {
        print_row("env file", env_file);
    }
    if let Some(script) = profile.script_path() {
        print_row("script", script);
    }
    for kind in [HookKind::Activate, HookKind::Deactivate] {
        if let Some(hook) = profile.hook(kind) {
            print_row(&format!("{kind} hook"), hook);
        }
    }

    let variables: Vec<_> = profile.variables().collect();
    if !variables.is_empty() {
        println!();
        println!("{}", "Variables".bold());
        for (key, value) in variables {
            println!("  {}={value}", key.cyan());
        }
    }

    if !profile.dotfiles.is_empty() {
        println!();
        println!("{}", "Dotfiles".bold());
        for (target, source) in &profile.dotfiles {
            println!("  {target} {} {source}", "→".dimmed());
        }
    }
}

fn print_row(label: &str, value: &str) {
    println!("  {:14} {}", label.dimmed(), value);
}

/// Delete a profile
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Profile name
    pub name: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl Command for DeleteCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let name = context.existing_profile(&self.name)?;

        // Guard before prompting so a refused delete never asks
        if let Some(active) = resolver::active_profile(context.cwd()) {
            if active.name == name {
                return Err(kontext_core::Error::ActiveProfileConflict {
                    name: name.to_string(),
                    marker: active.marker,
                }
                .into());
            }
        }

        if !self.yes {
            use dialoguer::{Confirm, theme::ColorfulTheme};

            let dir = context.store.profile_dir(&name)?;
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "Delete profile '{name}' and everything in {dir}?"
                ))
                .default(false)
                .interact()?;

            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
        }

        let leftovers =
            lifecycle::delete_profile(&context.store, context.state_dir(), &name, context.cwd())?;
        println!("{} Deleted profile {}", "✓".green(), name.bold());

        if !leftovers.is_empty() {
            println!(
                "{}",
                "Dotfile backups from this profile were not restored:".yellow()
            );
            for record in leftovers {
                let saved = record
                    .backup_path
                    .or(record.symlink_target)
                    .map_or_else(String::new, |p| p.display().to_string());
                println!("  {} {} {saved}", record.original_path.display(), "←".dimmed());
            }
        }
        Ok(())
    }
}
