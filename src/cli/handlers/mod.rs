//! Command handlers for CLI operations
//!
//! Execution logic for each subcommand, kept apart from parsing.

pub mod check;
pub mod migrate;
pub mod once;
pub mod run;

pub use check::CheckCommandHandler;
pub use migrate::MigrateCommandHandler;
pub use once::OnceCommandHandler;
pub use run::RunCommandHandler;
