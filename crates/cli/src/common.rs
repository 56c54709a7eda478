//! Common utilities and types shared across CLI commands

use anyhow::Context;
use kontext_config::{Config, ProfileStore};
use kontext_core::{Error, ProfileName, Warning};
use kontext_engine::{CURRENT_PROFILE_VAR, HookInvocation, Session};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CommandError, Result};

/// Resolved directories for one invocation
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    /// Root holding one directory per profile
    pub profiles_dir: PathBuf,
    /// Root for persisted state (backup ledgers)
    pub state_dir: PathBuf,
    /// Working directory the command runs in
    pub cwd: PathBuf,
}

impl ResolvedPaths {
    /// Resolve directories: CLI overrides first, then `config.toml`, then XDG
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be determined.
    pub fn resolve(
        profiles_dir: Option<&Path>,
        state_dir: Option<&Path>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;

        let profiles_dir = match profiles_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.profiles_dir()?,
        };
        let state_dir = match state_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.state_dir()?,
        };

        Ok(Self {
            profiles_dir: absolutize(profiles_dir, &cwd),
            state_dir: absolutize(state_dir, &cwd),
            cwd,
        })
    }
}

/// Runtime context for CLI commands
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// Shared settings
    pub config: Arc<Config>,
    /// Resolved directories
    pub paths: ResolvedPaths,
    /// Profile storage
    pub store: ProfileStore,
    /// Explicit `config.toml`, forwarded to hooks run from generated scripts
    pub config_path: Option<PathBuf>,
}

impl RuntimeContext {
    /// Create a context from settings and resolved paths
    pub fn new(config: Config, paths: ResolvedPaths) -> Self {
        let store = ProfileStore::new(&paths.profiles_dir);
        Self {
            config: Arc::new(config),
            paths,
            store,
            config_path: None,
        }
    }

    /// Remember the `--config` file so `hook run` sees the same settings
    #[must_use]
    pub fn with_config_path(mut self, path: Option<&Path>) -> Self {
        self.config_path = path.map(|path| absolutize(path.to_path_buf(), &self.paths.cwd));
        self
    }

    /// Working directory
    #[inline]
    pub fn cwd(&self) -> &Path {
        &self.paths.cwd
    }

    /// State directory
    #[inline]
    pub fn state_dir(&self) -> &Path {
        &self.paths.state_dir
    }

    /// Session whose generated scripts call back into this binary for hooks
    pub fn session(&self) -> Session<'_> {
        Session::new(&self.store, self.state_dir(), self.hook_invocation())
    }

    /// How generated scripts call hooks
    pub fn hook_invocation(&self) -> HookInvocation {
        match std::env::current_exe() {
            Ok(exe) => HookInvocation::Runner {
                exe,
                config: self.config_path.clone(),
            },
            Err(e) => {
                tracing::debug!("Cannot locate own executable, hooks run directly: {e}");
                HookInvocation::Direct
            }
        }
    }

    /// Validate `name` and require that the profile exists
    ///
    /// # Errors
    ///
    /// `ProfileNotFound` listing the available profiles.
    pub fn existing_profile(&self, name: &str) -> Result<ProfileName> {
        let name = ProfileName::new(name)?;
        if self.store.exists(&name) {
            Ok(name)
        } else {
            Err(self.not_found(name.as_str()))
        }
    }

    /// `ProfileNotFound` for `name` with the current profile list
    pub fn not_found(&self, name: &str) -> CommandError {
        let available = self
            .store
            .list()
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();
        CommandError::profile_not_found(name, available)
    }

    /// Turn store `NotFound` errors into the guided variant
    pub fn with_guidance(&self, error: Error) -> CommandError {
        match error {
            Error::NotFound { name } => self.not_found(&name),
            other => other.into(),
        }
    }
}

/// Profile recorded in the calling shell, if any
pub fn shell_profile() -> Option<String> {
    std::env::var(CURRENT_PROFILE_VAR)
        .ok()
        .filter(|value| !value.is_empty())
}

/// Write shell code for the caller to evaluate
///
/// Nothing else may go to stdout from the activation commands.
pub fn emit_script(script: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(script.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Log each warning on stderr
pub fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        warning.log();
    }
}

fn absolutize(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        kontext_core::path::normalize(&cwd.join(path))
    }
}
