//! kontext CLI library
//!
//! All CLI logic lives here so it can be exercised from tests; `main.rs`
//! only parses arguments and renders errors.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use command::Command;
use common::{ResolvedPaths, RuntimeContext};

/// kontext - directory-scoped developer profiles
#[derive(Parser)]
#[command(name = "kontext")]
#[command(about = "Switch git identity, environment, dotfiles and hooks by directory")]
#[command(version)]
#[command(long_about = "Switch git identity, environment, dotfiles and hooks by directory

A profile bundles a git identity, environment variables, dotfiles and
lifecycle hooks. Tag a directory with a profile and every shell that enters
it (or any subdirectory) activates that profile.

Shell integration evaluates the output of `kontext hook-env` on every
directory change:

  eval \"$(kontext hook-env)\"")]
pub struct Cli {
    /// Directory holding the profiles
    #[arg(long, env = "KONTEXT_PROFILES_DIR", value_name = "DIR", global = true)]
    pub profiles_dir: Option<PathBuf>,

    /// Directory for kontext state (dotfile backups)
    #[arg(long, env = "KONTEXT_STATE_DIR", value_name = "DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, env = "KONTEXT_CONFIG", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file
    #[arg(long, env = "KONTEXT_LOG_FILE", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a profile
    Create(cmd::create::CreateCommand),

    /// List profiles
    #[command(visible_alias = "ls")]
    List(cmd::profile::ListCommand),

    /// Show a profile's configuration
    Show(cmd::profile::ShowCommand),

    /// Edit a profile manifest in your editor
    Edit(cmd::edit::EditCommand),

    /// Delete a profile and everything in its directory
    #[command(visible_alias = "rm")]
    Delete(cmd::profile::DeleteCommand),

    /// Bind a directory (and its subdirectories) to a profile
    Tag(cmd::tag::TagCommand),

    /// Remove a directory's profile binding
    Untag(cmd::tag::UntagCommand),

    /// Show which profile controls the current directory
    Status(cmd::status::StatusCommand),

    /// Print shell code activating a profile
    Activate(cmd::activate::ActivateCommand),

    /// Print shell code deactivating a profile
    Deactivate(cmd::activate::DeactivateCommand),

    /// Print shell code switching the current shell to another profile
    Switch(cmd::activate::SwitchCommand),

    /// Print shell code for a directory change (used by shell integration)
    HookEnv(cmd::activate::HookEnvCommand),

    /// Run or check lifecycle hooks
    #[command(subcommand)]
    Hook(HookCommands),

    /// Link or unlink a profile's dotfiles
    #[command(subcommand)]
    Dotfiles(DotfilesCommands),
}

/// Lifecycle hook commands
#[derive(Subcommand)]
pub enum HookCommands {
    /// Run a hook script with the kontext environment and timeout
    ///
    /// Always exits successfully: hook failures are reported as warnings.
    Run(cmd::hooks::RunCommand),

    /// Check that a hook script exists and is readable
    Validate(cmd::hooks::ValidateCommand),
}

/// Dotfile commands
#[derive(Subcommand)]
pub enum DotfilesCommands {
    /// Link a profile's dotfiles, backing up what is in the way
    Apply(cmd::dotfiles::DotfilesCommand),

    /// Unlink a profile's dotfiles and restore backups
    Remove(cmd::dotfiles::DotfilesCommand),
}

/// Execute the command based on the command type
fn execute_command(command: Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Create(create_cmd) => create_cmd.execute(context)?,
        Commands::List(list_cmd) => list_cmd.execute(context)?,
        Commands::Show(show_cmd) => show_cmd.execute(context)?,
        Commands::Edit(edit_cmd) => edit_cmd.execute(context)?,
        Commands::Delete(delete_cmd) => delete_cmd.execute(context)?,
        Commands::Tag(tag_cmd) => tag_cmd.execute(context)?,
        Commands::Untag(untag_cmd) => untag_cmd.execute(context)?,
        Commands::Status(status_cmd) => status_cmd.execute(context)?,
        Commands::Activate(activate_cmd) => activate_cmd.execute(context)?,
        Commands::Deactivate(deactivate_cmd) => deactivate_cmd.execute(context)?,
        Commands::Switch(switch_cmd) => switch_cmd.execute(context)?,
        Commands::HookEnv(hook_env_cmd) => hook_env_cmd.execute(context)?,
        Commands::Hook(hook_cmd) => match hook_cmd {
            HookCommands::Run(run_cmd) => {
                // Failures were already reported as warnings
                run_cmd.execute(context)?;
            }
            HookCommands::Validate(validate_cmd) => validate_cmd.execute(context)?,
        },
        Commands::Dotfiles(dotfiles_cmd) => match dotfiles_cmd {
            DotfilesCommands::Apply(apply_cmd) => {
                apply_cmd.apply(context)?;
            }
            DotfilesCommands::Remove(remove_cmd) => {
                remove_cmd.remove(context)?;
            }
        },
    }

    Ok(())
}

/// Main entry point for the CLI logic
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - Directories cannot be determined
/// - Command execution fails
pub fn run(cli: Cli) -> Result<()> {
    kontext_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = kontext_config::Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let paths = ResolvedPaths::resolve(
        cli.profiles_dir.as_deref(),
        cli.state_dir.as_deref(),
        &config,
    )?;
    tracing::debug!(
        profiles = %paths.profiles_dir.display(),
        state = %paths.state_dir.display(),
        "Resolved directories"
    );

    let context = RuntimeContext::new(config, paths).with_config_path(cli.config.as_deref());
    execute_command(cli.command, &context)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hook_run() {
        let cli = Cli::try_parse_from([
            "kontext", "hook", "run", "on.sh", "--profile", "work", "--type", "activate",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Hook(HookCommands::Run(_))));
    }

    #[test]
    fn test_parse_config_before_hook_run() {
        let cli = Cli::try_parse_from([
            "kontext", "--config", "k.toml", "hook", "run", "on.sh", "--profile", "work",
            "--type", "deactivate",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("k.toml")));
        assert!(matches!(cli.command, Commands::Hook(HookCommands::Run(_))));
    }

    #[test]
    fn test_parse_create_with_repeated_flags() {
        let cli = Cli::try_parse_from([
            "kontext",
            "create",
            "work",
            "--env",
            "A=1",
            "--env",
            "B=2",
            "--dotfile",
            "~/.vimrc=.vimrc",
        ])
        .unwrap();
        let Commands::Create(create) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(create.env, ["A=1", "B=2"]);
        assert_eq!(create.dotfiles, ["~/.vimrc=.vimrc"]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kontext", "list", "--profiles-dir", "/tmp/p", "-v"]).unwrap();
        assert_eq!(cli.profiles_dir, Some(PathBuf::from("/tmp/p")));
        assert!(cli.verbose);
    }
}
