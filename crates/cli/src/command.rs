//! Command trait for the kontext CLI
//!
//! Every subcommand that needs settings or the profile store implements
//! [`Command`] and receives a [`RuntimeContext`].

use crate::common::RuntimeContext;
use crate::error::Result;

/// Trait for all kontext commands
///
/// # Example
///
/// ```rust,ignore
/// use crate::command::Command;
/// use crate::common::RuntimeContext;
/// use crate::error::Result;
/// use clap::Args;
///
/// #[derive(Debug, Args)]
/// pub struct MyCommand {
///     pub name: String,
/// }
///
/// impl Command for MyCommand {
///     type Output = ();
///
///     fn execute(&self, context: &RuntimeContext) -> Result<()> {
///         let profile = context.store.load(&self.name)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Command {
    /// The type returned by this command
    type Output;

    /// Execute the command with the given runtime context
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` if the command fails. Messages should tell
    /// the user what to do next.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
