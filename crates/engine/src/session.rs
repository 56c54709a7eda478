//! Profile switching
//!
//! Ties the pieces together for one CLI invocation: load the profile,
//! apply or remove its dotfiles, and produce the shell text for the calling
//! shell. Everything that can be rejected is checked before the first
//! symlink is made; I/O failures while linking are downgraded to warnings so
//! the environment part of a switch still happens.

use crate::activation::{GeneratedScript, HookInvocation, ScriptGenerator};
use crate::dotfiles::{DotfileChange, DotfileManager};
use crate::resolver;
use kontext_config::{Profile, ProfileStore};
use kontext_core::{AbsPath, Error, ProfileName, Result, Warning};
use std::path::{Path, PathBuf};

/// Result of a switch: shell text, dotfile changes and warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Shell code for the calling shell
    pub script: String,
    /// Dotfile changes made on disk
    pub dotfiles: Vec<DotfileChange>,
    /// Non-fatal problems
    pub warnings: Vec<Warning>,
}

impl Transition {
    fn push(&mut self, generated: GeneratedScript) {
        self.script.push_str(&generated.script);
        self.warnings.extend(generated.warnings);
    }

    fn extend(&mut self, other: Transition) {
        self.script.push_str(&other.script);
        self.dotfiles.extend(other.dotfiles);
        self.warnings.extend(other.warnings);
    }

    /// Log every warning
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warning.log();
        }
    }
}

/// A profile ready to activate: script generated, dotfiles resolved
#[derive(Debug)]
struct Prepared {
    profile: Profile,
    manager: DotfileManager,
    script: GeneratedScript,
}

/// Activation and deactivation against a profile store
#[derive(Debug, Clone)]
pub struct Session<'a> {
    store: &'a ProfileStore,
    state_dir: PathBuf,
    generator: ScriptGenerator,
}

impl<'a> Session<'a> {
    /// Create a session
    pub fn new(store: &'a ProfileStore, state_dir: impl Into<PathBuf>, hooks: HookInvocation) -> Self {
        Self {
            store,
            state_dir: state_dir.into(),
            generator: ScriptGenerator::new(hooks),
        }
    }

    /// Dotfile manager for a profile
    pub fn dotfiles(&self, name: &ProfileName) -> Result<DotfileManager> {
        Ok(DotfileManager::new(
            name,
            self.store.profile_dir(name)?,
            &self.state_dir,
        ))
    }

    /// Activate `name`: link dotfiles and build the activation script
    ///
    /// The script is generated and every dotfile source checked before
    /// anything on disk changes, so a fatal error leaves `~` untouched.
    ///
    /// # Errors
    ///
    /// - `NotFound`/`CorruptManifest` from the store
    /// - `InvalidVariableName` and env-file `PathEscape` from script generation
    /// - `PathEscape`/`SourceMissing` for a dotfile source
    ///
    /// I/O failures while linking are warnings.
    #[tracing::instrument(skip(self), fields(profile = %name))]
    pub fn activate(&self, name: &ProfileName) -> Result<Transition> {
        let prepared = self.prepare(name)?;
        Self::link(prepared)
    }

    /// Load, generate and check everything activation needs, without side effects
    fn prepare(&self, name: &ProfileName) -> Result<Prepared> {
        let profile = self.store.load(name.as_str())?;
        let dir = self.store.profile_dir(name)?;
        let script = self.generator.activation(&profile, &dir)?;

        let manager = self.dotfiles(name)?;
        manager.plan(&profile.dotfiles)?;

        Ok(Prepared {
            profile,
            manager,
            script,
        })
    }

    fn link(prepared: Prepared) -> Result<Transition> {
        let Prepared {
            profile,
            manager,
            script,
        } = prepared;
        let mut transition = Transition::default();

        if !profile.dotfiles.is_empty() {
            match manager.apply(&profile.dotfiles) {
                Ok(changes) => transition.dotfiles = changes,
                Err(e @ (Error::PathEscape { .. } | Error::SourceMissing { .. })) => return Err(e),
                Err(e) => transition.warnings.push(dotfile_warning(&profile, &e)),
            }
        }

        transition.push(script);
        Ok(transition)
    }

    /// Deactivate `name`: unlink dotfiles and build the deactivation script
    ///
    /// A profile that no longer exists still gets its marker variables unset.
    #[tracing::instrument(skip(self), fields(profile = %name))]
    pub fn deactivate(&self, name: &ProfileName) -> Result<Transition> {
        let Some(profile) = self.store.get(name.as_str())? else {
            tracing::warn!("Profile '{name}' no longer exists; clearing shell state only");
            let mut transition = Transition::default();
            transition.push(self.generator.deactivation(None)?);
            return Ok(transition);
        };
        let dir = self.store.profile_dir(name)?;
        let mut transition = Transition::default();

        if !profile.dotfiles.is_empty() {
            match self.dotfiles(name)?.remove(&profile.dotfiles) {
                Ok(changes) => transition.dotfiles = changes,
                Err(e) => transition.warnings.push(dotfile_warning(&profile, &e)),
            }
        }

        transition.push(self.generator.deactivation(Some((&profile, &dir)))?);
        Ok(transition)
    }

    /// Deactivate the shell's current profile (if any), then activate `to`
    pub fn switch(&self, current: Option<&str>, to: &ProfileName) -> Result<Transition> {
        // A target that cannot be activated leaves the current profile in place
        let prepared = self.prepare(to)?;

        let mut transition = self.leave(current);
        transition.extend(Self::link(prepared)?);
        Ok(transition)
    }

    /// Directory-change entry point
    ///
    /// `current` is the shell's `KONTEXT_CURRENT_PROFILE`. Returns `None`
    /// when the profile controlling `cwd` is already active.
    pub fn hook_env(&self, cwd: &Path, current: Option<&str>) -> Result<Option<Transition>> {
        let wanted = resolver::active_profile(cwd).map(|active| active.name);
        let current = current.filter(|c| !c.is_empty());

        if wanted.as_ref().map(ProfileName::as_str) == current {
            return Ok(None);
        }
        tracing::debug!(?current, ?wanted, "Profile change");

        let mut transition = self.leave(current);
        if let Some(name) = wanted {
            match self.activate(&name) {
                Ok(activated) => transition.extend(activated),
                // A stale marker must not break `cd`
                Err(e) => tracing::warn!("Cannot activate '{name}': {e}"),
            }
        }
        Ok(Some(transition))
    }

    /// Deactivation of the shell's current profile, never failing
    fn leave(&self, current: Option<&str>) -> Transition {
        let Some(current) = current.filter(|c| !c.is_empty()) else {
            return Transition::default();
        };

        let attempt = ProfileName::new(current).and_then(|name| self.deactivate(&name));
        match attempt {
            Ok(transition) => transition,
            Err(e) => {
                tracing::warn!("Cannot deactivate '{current}': {e}");
                let mut transition = Transition::default();
                if let Ok(generated) = self.generator.deactivation(None) {
                    transition.push(generated);
                }
                transition
            }
        }
    }
}

/// Problems with a stored profile that would surface at activation time
///
/// Nothing is executed or modified.
pub fn diagnose(profile: &Profile, profile_dir: &AbsPath) -> Vec<Warning> {
    use kontext_config::HookKind;
    use kontext_core::path::resolve_in_profile;

    let mut warnings = Vec::new();
    let resolve = |raw: &str| resolve_in_profile(raw, profile_dir).ok();

    for kind in [HookKind::Activate, HookKind::Deactivate] {
        if let Some(path) = profile.hook(kind).and_then(resolve) {
            if !path.is_file() {
                warnings.push(Warning::HookMissing { path });
            }
        }
    }
    if let Some(path) = profile.env_file().and_then(resolve) {
        if !path.is_file() {
            warnings.push(Warning::EnvFileMissing { path });
        }
    }
    if let Some(path) = profile.script_path().and_then(resolve) {
        if !path.is_file() {
            warnings.push(Warning::ScriptMissing { path });
        }
    }
    if let Some(path) = profile.git_config_path().and_then(resolve) {
        if let Err(warning) = crate::git::read_identity(&path) {
            warnings.push(warning);
        }
    }
    warnings
}

fn dotfile_warning(profile: &Profile, error: &kontext_core::Error) -> Warning {
    Warning::Dotfile {
        target: format!("profile '{}'", profile.name),
        message: error.to_string(),
    }
}
