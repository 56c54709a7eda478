//! Environment activation scripts
//!
//! kontext cannot change its parent shell's environment, so activation and
//! deactivation are emitted as POSIX shell text for the shell integration to
//! `eval`.
//!
//! Activation order:
//!
//! 1. export `KONTEXT_PROFILE_DIR`
//! 2. run the activate hook (checked for existence when the script runs)
//! 3. export the env file's assignments
//! 4. export explicit variables, overriding env-file keys
//!    - git include variables for the profile's git fragment
//! 5. source the profile script, which may override anything
//! 6. export `KONTEXT_CURRENT_PROFILE`
//!
//! Deactivation runs the same steps backwards: env-file keys and explicit
//! variables are unset, then git variables, then both marker variables, and
//! the deactivate hook runs last against the cleaned environment.

use crate::envfile::{self, EnvFile};
use crate::git;
use crate::hooks::{HOOK_TYPE_ENV, PROFILE_ENV};
use crate::shell;
use indexmap::IndexSet;
use kontext_config::{HookKind, Profile};
use kontext_core::name::validate_variable_name;
use kontext_core::path::{ensure_within, resolve_in_profile};
use kontext_core::{AbsPath, Result, Warning};
use std::path::{Path, PathBuf};

/// Variable holding the active profile's directory
pub const PROFILE_DIR_VAR: &str = "KONTEXT_PROFILE_DIR";

/// Variable holding the active profile's name
pub const CURRENT_PROFILE_VAR: &str = "KONTEXT_CURRENT_PROFILE";

/// How generated scripts start hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookInvocation {
    /// Execute the hook file directly with the environment contract set inline
    Direct,
    /// Go through `<exe> hook run`, which enforces the timeout
    Runner {
        /// The kontext executable
        exe: PathBuf,
        /// `--config` file to pass along, if the caller used one
        config: Option<PathBuf>,
    },
}

/// Shell text plus the warnings found while producing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedScript {
    /// Shell code to evaluate
    pub script: String,
    /// Non-fatal problems
    pub warnings: Vec<Warning>,
}

/// Builds activation and deactivation scripts
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    hooks: HookInvocation,
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new(HookInvocation::Direct)
    }
}

impl ScriptGenerator {
    /// Create a generator
    pub fn new(hooks: HookInvocation) -> Self {
        Self { hooks }
    }

    /// Activation script for `profile` stored in `profile_dir`
    ///
    /// # Errors
    ///
    /// - `InvalidVariableName` for an explicit variable with a bad name
    /// - `PathEscape` when the env file resolves outside the profile directory
    pub fn activation(&self, profile: &Profile, profile_dir: &AbsPath) -> Result<GeneratedScript> {
        for (key, _) in profile.variables() {
            validate_variable_name(key)?;
        }

        let mut lines = vec![format!("# kontext: activate {}", profile.name)];
        let mut warnings = Vec::new();

        // 1
        lines.push(shell::export(PROFILE_DIR_VAR, &profile_dir.to_string()));

        // 2
        if let Some(hook) = profile.hook(HookKind::Activate) {
            let hook = resolve_in_profile(hook, profile_dir)?;
            lines.extend(self.hook_lines(&hook, profile, HookKind::Activate));
        }

        // 3
        if let Some(env) = load_env_file(profile, profile_dir, &mut warnings)? {
            for (key, value) in &env.entries {
                lines.push(shell::export(key, value));
            }
        }

        // 4
        for (key, value) in profile.variables() {
            lines.push(shell::export(key, value));
        }
        if let Some(fragment) = git_fragment(profile, profile_dir, &mut warnings) {
            for (key, value) in git::include_assignments(&fragment) {
                lines.push(shell::export(key, &value));
            }
        }

        // 5
        if let Some(script) = profile.script_path() {
            let script = resolve_in_profile(script, profile_dir)?;
            let quoted = shell::quote(&script.to_string_lossy());
            lines.push(format!("if [ -f {quoted} ]; then"));
            lines.push(format!("  . {quoted}"));
            lines.push("else".to_string());
            lines.push(format!(
                "  {}",
                shell::warn(&format!("script not found: {}", script.display()))
            ));
            lines.push("fi".to_string());
        }

        // 6
        lines.push(shell::export(CURRENT_PROFILE_VAR, profile.name.as_str()));

        Ok(GeneratedScript {
            script: join(lines),
            warnings,
        })
    }

    /// Deactivation script
    ///
    /// Without a profile only the marker variables are unset, which is what a
    /// shell needs when its recorded profile no longer exists.
    ///
    /// # Errors
    ///
    /// Same conditions as [`activation`](Self::activation).
    pub fn deactivation(&self, profile: Option<(&Profile, &AbsPath)>) -> Result<GeneratedScript> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        let mut unsets: IndexSet<String> = IndexSet::new();

        if let Some((profile, profile_dir)) = profile {
            for (key, _) in profile.variables() {
                validate_variable_name(key)?;
            }
            lines.push(format!("# kontext: deactivate {}", profile.name));

            // 1
            if let Some(env) = load_env_file(profile, profile_dir, &mut warnings)? {
                unsets.extend(env.keys().map(str::to_string));
            }

            // 2
            unsets.extend(profile.variables().map(|(key, _)| key.clone()));

        } else {
            lines.push("# kontext: deactivate".to_string());
        }

        let markers = [CURRENT_PROFILE_VAR, PROFILE_DIR_VAR];
        lines.extend(
            unsets
                .iter()
                .filter(|name| !markers.contains(&name.as_str()))
                .map(|name| shell::unset(name)),
        );

        // 2b
        if let Some((profile, profile_dir)) = profile {
            lines.extend(git_unset_lines(profile, profile_dir));
        }

        // 3
        lines.extend(markers.iter().map(|name| shell::unset(name)));

        // 4
        if let Some((profile, profile_dir)) = profile {
            if let Some(hook) = profile.hook(HookKind::Deactivate) {
                let hook = resolve_in_profile(hook, profile_dir)?;
                lines.extend(self.hook_lines(&hook, profile, HookKind::Deactivate));
            }
        }

        Ok(GeneratedScript {
            script: join(lines),
            warnings,
        })
    }

    fn hook_lines(&self, hook: &Path, profile: &Profile, kind: HookKind) -> Vec<String> {
        let quoted = shell::quote(&hook.to_string_lossy());
        let failed = shell::warn(&format!("{kind} hook failed: {}", hook.display()));

        let invoke = match &self.hooks {
            HookInvocation::Direct => format!(
                "{PROFILE_ENV}={} {HOOK_TYPE_ENV}={} {quoted} 1>&2 || {failed}",
                shell::quote(profile.name.as_str()),
                kind.as_str()
            ),
            HookInvocation::Runner { exe, config } => format!(
                "{}{} hook run {quoted} --profile {} --type {} 1>&2 || {failed}",
                shell::quote(&exe.to_string_lossy()),
                config
                    .as_ref()
                    .map(|path| format!(" --config {}", shell::quote(&path.to_string_lossy())))
                    .unwrap_or_default(),
                shell::quote(profile.name.as_str()),
                kind.as_str()
            ),
        };

        vec![
            format!("if [ -f {quoted} ]; then"),
            format!("  {invoke}"),
            "else".to_string(),
            format!(
                "  {}",
                shell::warn(&format!("{kind} hook not found: {}", hook.display()))
            ),
            "fi".to_string(),
        ]
    }
}

/// Parse the profile's env file, if any
///
/// A missing file becomes a warning; a file outside the profile directory is
/// a sandbox violation.
fn load_env_file(
    profile: &Profile,
    profile_dir: &AbsPath,
    warnings: &mut Vec<Warning>,
) -> Result<Option<EnvFile>> {
    let Some(raw) = profile.env_file() else {
        return Ok(None);
    };
    let path = ensure_within(&resolve_in_profile(raw, profile_dir)?, profile_dir)?;

    match envfile::load(&path) {
        Ok(mut env) => {
            warnings.append(&mut env.warnings);
            Ok(Some(env))
        }
        Err(warning) => {
            warnings.push(warning);
            Ok(None)
        }
    }
}

/// Usable git fragment, or `None` with a warning
fn git_fragment(
    profile: &Profile,
    profile_dir: &AbsPath,
    warnings: &mut Vec<Warning>,
) -> Option<PathBuf> {
    let raw = profile.git_config_path()?;

    let checked = resolve_in_profile(raw, profile_dir)
        .and_then(|path| ensure_within(&path, profile_dir));
    let path = match checked {
        Ok(path) => path,
        Err(e) => {
            warnings.push(Warning::GitConfig {
                path: PathBuf::from(raw),
                message: e.to_string(),
            });
            return None;
        }
    };

    match git::read_identity(&path) {
        Ok(_) => Some(path),
        Err(warning) => {
            warnings.push(warning);
            None
        }
    }
}

/// Unset the git include only while it still points at this profile's fragment
///
/// Activation skips the git step for an unusable fragment, and the shell may
/// carry the user's own `GIT_CONFIG_*` values, so the comparison decides.
fn git_unset_lines(profile: &Profile, profile_dir: &AbsPath) -> Vec<String> {
    let Some(raw) = profile.git_config_path() else {
        return Vec::new();
    };
    let Ok(fragment) =
        resolve_in_profile(raw, profile_dir).and_then(|path| ensure_within(&path, profile_dir))
    else {
        return Vec::new();
    };

    let [.., (value_var, value)] = git::include_assignments(&fragment);
    let mut lines = vec![format!(
        "if [ \"${{{value_var}-}}\" = {} ]; then",
        shell::quote(&value)
    )];
    lines.extend(git::GIT_ENV_VARS.iter().map(|name| format!("  {}", shell::unset(name))));
    lines.push("fi".to_string());
    lines
}

fn join(lines: Vec<String>) -> String {
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use kontext_config::{EnvironmentSection, GitSection, HooksSection};
    use kontext_core::{Error, ProfileName};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AbsPath) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("work");
        fs::create_dir_all(&dir).unwrap();
        (temp, AbsPath::new(dir).unwrap())
    }

    fn profile() -> Profile {
        Profile::new(ProfileName::new("work").unwrap())
    }

    fn position(script: &str, needle: &str) -> usize {
        script
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not in:\n{script}"))
    }

    #[test]
    fn test_explicit_variable_overrides_env_file() {
        let (_temp, dir) = setup();
        fs::write(dir.join(".env"), "# comment\n\nAPI_URL=a\nOTHER=\"quoted\"\n").unwrap();

        let mut p = profile();
        let mut env = EnvironmentSection {
            env_file: Some(".env".to_string()),
            ..EnvironmentSection::default()
        };
        env.variables.insert("API_URL".to_string(), "b".to_string());
        p.environment = Some(env);

        let out = ScriptGenerator::default().activation(&p, &dir).unwrap();
        let a = position(&out.script, "export API_URL=\"a\"");
        let b = position(&out.script, "export API_URL=\"b\"");
        assert!(a < b, "explicit variable must be exported last");
        assert!(out.script.contains("export OTHER=\"quoted\""));
        assert!(!out.script.contains("comment"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_activation_order() {
        let (_temp, dir) = setup();
        fs::write(dir.join(".env"), "FROM_FILE=1\n").unwrap();
        fs::write(dir.join("gitconfig"), "[user]\n\tname = Ada\n").unwrap();

        let mut p = profile();
        let mut env = EnvironmentSection {
            env_file: Some(".env".to_string()),
            script_path: Some("{{profile_dir}}/init.sh".to_string()),
            ..EnvironmentSection::default()
        };
        env.variables.insert("EXPLICIT".to_string(), "2".to_string());
        p.environment = Some(env);
        p.git = Some(GitSection {
            config_path: "gitconfig".to_string(),
        });
        p.hooks = Some(HooksSection {
            on_activate: Some("hooks/on.sh".to_string()),
            on_deactivate: None,
        });

        let script = ScriptGenerator::default()
            .activation(&p, &dir)
            .unwrap()
            .script;

        let steps = [
            position(&script, "export KONTEXT_PROFILE_DIR="),
            position(&script, "KONTEXT_HOOK_TYPE=activate"),
            position(&script, "export FROM_FILE="),
            position(&script, "export EXPLICIT="),
            position(&script, "export GIT_CONFIG_COUNT=\"1\""),
            position(&script, "/init.sh\""),
            position(&script, "export KONTEXT_CURRENT_PROFILE=\"work\""),
        ];
        assert!(steps.windows(2).all(|w| w[0] < w[1]), "{script}");
        assert!(script.contains(&format!("[ -f \"{}\" ]", dir.join("hooks/on.sh").display())));
    }

    #[test]
    fn test_values_are_escaped() {
        let (_temp, dir) = setup();
        let mut p = profile();
        let mut env = EnvironmentSection::default();
        env.variables
            .insert("EVIL".to_string(), "\"; rm -rf ~; `id` $HOME".to_string());
        p.environment = Some(env);

        let script = ScriptGenerator::default()
            .activation(&p, &dir)
            .unwrap()
            .script;
        assert!(script.contains(r#"export EVIL="\"; rm -rf ~; \`id\` \$HOME""#));
    }

    #[test]
    fn test_invalid_variable_name_is_fatal() {
        let (_temp, dir) = setup();
        let mut p = profile();
        let mut env = EnvironmentSection::default();
        env.variables.insert("1BAD".to_string(), "x".to_string());
        p.environment = Some(env);

        let err = ScriptGenerator::default().activation(&p, &dir).unwrap_err();
        assert!(matches!(err, Error::InvalidVariableName { .. }));
    }

    #[test]
    fn test_missing_env_file_and_git_fragment_warn() {
        let (_temp, dir) = setup();
        let mut p = profile();
        p.environment = Some(EnvironmentSection {
            env_file: Some(".env".to_string()),
            ..EnvironmentSection::default()
        });
        p.git = Some(GitSection {
            config_path: "gitconfig".to_string(),
        });

        let out = ScriptGenerator::default().activation(&p, &dir).unwrap();
        assert!(matches!(out.warnings[0], Warning::EnvFileMissing { .. }));
        assert!(matches!(out.warnings[1], Warning::GitConfig { .. }));
        assert!(!out.script.contains("GIT_CONFIG"));
        assert!(out.script.contains("KONTEXT_CURRENT_PROFILE"));
    }

    #[test]
    fn test_env_file_outside_profile_is_fatal() {
        let (_temp, dir) = setup();
        let mut p = profile();
        p.environment = Some(EnvironmentSection {
            env_file: Some("../other/.env".to_string()),
            ..EnvironmentSection::default()
        });

        let err = ScriptGenerator::default().activation(&p, &dir).unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[test]
    fn test_deactivation_order_and_dedup() {
        let (_temp, dir) = setup();
        fs::write(dir.join(".env"), "API_URL=a\nTOKEN=t\n").unwrap();

        let mut p = profile();
        let mut env = EnvironmentSection {
            env_file: Some(".env".to_string()),
            ..EnvironmentSection::default()
        };
        env.variables.insert("API_URL".to_string(), "b".to_string());
        env.variables.insert("EDITOR".to_string(), "vim".to_string());
        p.environment = Some(env);
        p.git = Some(GitSection {
            config_path: "gitconfig".to_string(),
        });
        p.hooks = Some(HooksSection {
            on_activate: None,
            on_deactivate: Some("off.sh".to_string()),
        });

        let script = ScriptGenerator::default()
            .deactivation(Some((&p, &dir)))
            .unwrap()
            .script;

        assert_eq!(script.matches("unset API_URL").count(), 1);
        let steps = [
            position(&script, "unset API_URL"),
            position(&script, "unset TOKEN"),
            position(&script, "unset EDITOR"),
            position(&script, "unset GIT_CONFIG_COUNT"),
            position(&script, "unset KONTEXT_CURRENT_PROFILE"),
            position(&script, "unset KONTEXT_PROFILE_DIR"),
            position(&script, "KONTEXT_HOOK_TYPE=deactivate"),
        ];
        assert!(steps.windows(2).all(|w| w[0] < w[1]), "{script}");
    }

    #[test]
    fn test_bare_deactivation() {
        let script = ScriptGenerator::default().deactivation(None).unwrap().script;
        assert_eq!(
            script,
            "# kontext: deactivate\nunset KONTEXT_CURRENT_PROFILE\nunset KONTEXT_PROFILE_DIR\n"
        );
    }

    #[test]
    fn test_runner_invocation() {
        let (_temp, dir) = setup();
        let mut p = profile();
        p.hooks = Some(HooksSection {
            on_activate: Some("/abs/on.sh".to_string()),
            on_deactivate: None,
        });

        let script = ScriptGenerator::new(HookInvocation::Runner {
            exe: PathBuf::from("/bin/kontext"),
            config: None,
        })
        .activation(&p, &dir)
        .unwrap()
        .script;
        assert!(script.contains(
            "\"/bin/kontext\" hook run \"/abs/on.sh\" --profile \"work\" --type activate 1>&2 || echo"
        ));

        let script = ScriptGenerator::new(HookInvocation::Runner {
            exe: PathBuf::from("/bin/kontext"),
            config: Some(PathBuf::from("/etc/my kontext.toml")),
        })
        .activation(&p, &dir)
        .unwrap()
        .script;
        assert!(script.contains(
            "\"/bin/kontext\" --config \"/etc/my kontext.toml\" hook run \"/abs/on.sh\" --profile"
        ));
    }

    fn git_profile(dir: &AbsPath) -> Profile {
        fs::write(
            dir.join("gitconfig"),
            "[user]\n\tname = Work\n\temail = w@example.com\n",
        )
        .unwrap();
        let mut p = profile();
        p.git = Some(GitSection {
            config_path: "gitconfig".to_string(),
        });
        p
    }

    fn run_sh(program: &str) -> String {
        let output = duct::cmd("sh", ["-c", program])
            .stdout_capture()
            .unchecked()
            .run()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn test_deactivation_keeps_foreign_git_include() {
        let (_temp, dir) = setup();
        let p = git_profile(&dir);
        let script = ScriptGenerator::default()
            .deactivation(Some((&p, &dir)))
            .unwrap()
            .script;
        assert!(script.contains(&format!(
            "if [ \"${{GIT_CONFIG_VALUE_0-}}\" = \"{}\" ]; then",
            dir.join("gitconfig").display()
        )));

        let out = run_sh(&format!(
            "export GIT_CONFIG_COUNT=1 GIT_CONFIG_KEY_0=core.pager GIT_CONFIG_VALUE_0=less\n{script}printf '%s' \"$GIT_CONFIG_COUNT:$GIT_CONFIG_VALUE_0\""
        ));
        assert_eq!(out, "1:less");
    }

    #[test]
    fn test_deactivation_removes_own_git_include() {
        let (_temp, dir) = setup();
        let p = git_profile(&dir);
        let generator = ScriptGenerator::default();
        let on = generator.activation(&p, &dir).unwrap().script;
        let off = generator.deactivation(Some((&p, &dir))).unwrap().script;

        let out = run_sh(&format!(
            "{on}{off}printf '%s' \"${{GIT_CONFIG_COUNT-none}}:${{GIT_CONFIG_VALUE_0-none}}\""
        ));
        assert_eq!(out, "none:none");
    }
}
