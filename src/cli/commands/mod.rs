//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod ask;
pub mod init;
pub mod process;
pub mod serve;
pub mod status;
