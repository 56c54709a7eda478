//! Hook commands
//!
//! `hook run` is what generated activation scripts call; it always exits 0
//! so a failing hook never aborts the surrounding `eval`.

use clap::Args;
use kontext_config::HookKind;
use kontext_core::ProfileName;
use kontext_core::path::resolve_user_path;
use kontext_engine::{HookRunner, hooks};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Run a hook script with the configured timeout
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Hook script path
    pub path: String,

    /// Profile the hook belongs to
    #[arg(long)]
    pub profile: String,

    /// Hook type: activate or deactivate
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: HookKind,
}

impl Command for RunCommand {
    type Output = bool;

    fn execute(&self, context: &RuntimeContext) -> Result<bool> {
        let profile = match ProfileName::new(&self.profile) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("{} hook not run: {e}", self.kind);
                return Ok(false);
            }
        };

        let runner = HookRunner::new(context.config.hook_timeout())
            .cwd(context.cwd())
            .stdout_to_stderr(true);
        Ok(runner.run_or_warn(&self.path, &profile, self.kind))
    }
}

/// Check that a hook script exists and is readable
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Hook script path
    pub path: String,
}

impl Command for ValidateCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let path = resolve_user_path(&self.path, context.cwd())?;
        hooks::validate_hook_path(&path)?;
        println!("{} {} is a usable hook", "✓".green(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::common::ResolvedPaths;
    use kontext_config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> RuntimeContext {
        RuntimeContext::new(
            Config::default(),
            ResolvedPaths {
                profiles_dir: temp.path().join("profiles"),
                state_dir: temp.path().join("state"),
                cwd: temp.path().to_path_buf(),
            },
        )
    }

    #[test]
    fn test_missing_hook_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let ok = RunCommand {
            path: "nope.sh".to_string(),
            profile: "work".to_string(),
            kind: HookKind::Activate,
        }
        .execute(&context(&temp))
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_bad_profile_name_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let ok = RunCommand {
            path: "on.sh".to_string(),
            profile: "../x".to_string(),
            kind: HookKind::Deactivate,
        }
        .execute(&context(&temp))
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_validate() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("on.sh"), "#!/bin/sh\n").unwrap();
        let ctx = context(&temp);

        ValidateCommand {
            path: "on.sh".to_string(),
        }
        .execute(&ctx)
        .unwrap();
        assert!(
            ValidateCommand {
                path: "missing.sh".to_string(),
            }
            .execute(&ctx)
            .is_err()
        );
    }
}
