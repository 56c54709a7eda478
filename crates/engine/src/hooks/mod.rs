//! Lifecycle hooks
//!
//! A profile may name an `on_activate` and an `on_deactivate` script. They are
//! run by [`HookRunner`] with a bounded wall-clock time; any failure is a
//! warning and never stops the profile switch.

pub mod executor;

pub use executor::{HOOK_TYPE_ENV, HookRunner, PROFILE_ENV, validate_hook_path};
