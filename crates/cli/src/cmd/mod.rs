//! CLI command implementations
//!
//! Commands under `activate` write shell code to stdout; everything else
//! writes human-readable output.

pub mod activate;
pub mod create;
pub mod dotfiles;
pub mod edit;
pub mod hooks;
pub mod profile;
pub mod status;
pub mod tag;
