//! POSIX shell text helpers
//!
//! Profile-authored values end up inside double quotes in generated scripts.
//! Inside double quotes only `"`, `\`, `$` and backtick are special, so those
//! four are backslash-escaped and nothing else is touched.

/// Escape a value for embedding between double quotes
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Wrap a value in double quotes with escaping
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// `export NAME="value"`; `name` must already be validated
pub fn export(name: &str, value: &str) -> String {
    format!("export {name}={}", quote(value))
}

/// `unset NAME`; `name` must already be validated
pub fn unset(name: &str) -> String {
    format!("unset {name}")
}

/// A `kontext: warning:` line printed on stderr when the script runs
pub fn warn(message: &str) -> String {
    format!("echo {} >&2", quote(&format!("kontext: warning: {message}")))
}
