//! Hook execution engine
//!
//! Runs one lifecycle script in a child process:
//!
//! - the script inherits the parent environment plus `KONTEXT_PROFILE` and
//!   `KONTEXT_HOOK_TYPE`
//! - standard streams are inherited (stdout can be folded into stderr when
//!   the caller's stdout is being evaluated by a shell)
//! - a wall-clock timeout kills the child
//!
//! Every failure comes back as a [`Warning`]. Hooks never block switching.

use kontext_config::HookKind;
use kontext_core::path::resolve_user_path;
use kontext_core::{Error, ProfileName, Result, Warning};
use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable carrying the profile name
pub const PROFILE_ENV: &str = "KONTEXT_PROFILE";

/// Environment variable carrying `activate` or `deactivate`
pub const HOOK_TYPE_ENV: &str = "KONTEXT_HOOK_TYPE";

/// Hook execution runner
#[derive(Debug, Clone)]
pub struct HookRunner {
    timeout: Duration,
    cwd: Option<PathBuf>,
    stdout_to_stderr: bool,
}

impl HookRunner {
    /// Create a runner with the given wall-clock budget
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cwd: None,
            stdout_to_stderr: false,
        }
    }

    /// Resolve relative hook paths against `cwd` instead of the process cwd
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Send hook stdout to our stderr
    #[must_use]
    pub fn stdout_to_stderr(mut self, enabled: bool) -> Self {
        self.stdout_to_stderr = enabled;
        self
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a hook path: absolute, `~`-relative, or relative to the cwd
    pub fn resolve(&self, hook_path: &str) -> Result<PathBuf> {
        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        resolve_user_path(hook_path, &cwd)
    }

    /// Execute a hook
    #[tracing::instrument(skip(self), fields(timeout = self.timeout.as_secs()))]
    pub fn execute(
        &self,
        hook_path: &str,
        profile: &ProfileName,
        kind: HookKind,
    ) -> std::result::Result<(), Warning> {
        let script = self.resolve(hook_path).map_err(|e| Warning::HookSpawn {
            path: PathBuf::from(hook_path),
            message: e.to_string(),
        })?;

        if !script.is_file() {
            return Err(Warning::HookMissing { path: script });
        }

        match ensure_executable(&script) {
            Ok(true) => tracing::debug!("Made hook executable: {}", script.display()),
            Ok(false) => {}
            Err(e) => tracing::debug!("Could not set executable bit: {e}"),
        }

        let (program, args) = command_line(&script);
        tracing::debug!("Executing hook: {:?} {:?}", program, args);

        // Status is inspected below rather than turned into an error by duct
        let mut expression = duct::cmd(program, args)
            .env(PROFILE_ENV, profile.as_str())
            .env(HOOK_TYPE_ENV, kind.as_str())
            .unchecked();
        if self.stdout_to_stderr {
            expression = expression.stdout_to_stderr();
        }

        let handle = expression.start().map_err(|e| Warning::HookSpawn {
            path: script.clone(),
            message: e.to_string(),
        })?;

        match handle.wait_timeout(self.timeout) {
            Ok(Some(output)) if output.status.success() => {
                tracing::debug!("Hook completed");
                Ok(())
            }
            Ok(Some(output)) => Err(Warning::HookNonZeroExit {
                path: script,
                code: output.status.code(),
            }),
            Ok(None) => {
                if let Err(e) = handle.kill() {
                    tracing::debug!("Failed to kill timed out hook: {e}");
                }
                Err(Warning::HookTimeout {
                    path: script,
                    seconds: self.timeout.as_secs(),
                })
            }
            Err(e) => Err(Warning::HookSpawn {
                path: script,
                message: e.to_string(),
            }),
        }
    }

    /// Execute a hook and log any failure
    ///
    /// Returns whether the hook succeeded.
    pub fn run_or_warn(&self, hook_path: &str, profile: &ProfileName, kind: HookKind) -> bool {
        match self.execute(hook_path, profile, kind) {
            Ok(()) => true,
            Err(warning) => {
                warning.log();
                false
            }
        }
    }
}

/// Pre-flight check used when authoring profiles: the hook exists and is readable
///
/// Does not execute anything.
pub fn validate_hook_path(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| Error::file_io("access hook", path, e))?;
    if !metadata.is_file() {
        return Err(Error::file_io(
            "access hook",
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    fs::File::open(path).map_err(|e| Error::file_io("read hook", path, e))?;
    Ok(())
}

/// Add execute bits matching the existing read bits
///
/// Returns whether permissions were changed.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> std::io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode();
    if mode & 0o100 != 0 {
        return Ok(false);
    }
    let new_mode = mode | 0o100 | ((mode & 0o044) >> 2);
    fs::set_permissions(path, fs::Permissions::from_mode(new_mode))?;
    Ok(true)
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> std::io::Result<bool> {
    Ok(false)
}

/// Scripts without a shebang are run through `sh`
fn command_line(script: &Path) -> (OsString, Vec<OsString>) {
    if has_shebang(script) {
        (script.as_os_str().to_owned(), Vec::new())
    } else {
        (OsString::from("sh"), vec![script.as_os_str().to_owned()])
    }
}

fn has_shebang(script: &Path) -> bool {
    let Ok(file) = fs::File::open(script) else {
        return false;
    };
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).is_ok() && first_line.starts_with("#!")
}
