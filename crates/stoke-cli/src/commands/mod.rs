//! Command implementations for the stoke CLI.
//!
//! - [`dev`] - Build, watch and serve with live reload
//! - [`check`] - Configuration validation
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod check;
pub mod dev;

pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
