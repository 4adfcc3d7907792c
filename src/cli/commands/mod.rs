//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod ask;
pub mod documents;
pub mod index;
pub mod init;
pub mod search;
#[cfg(feature = "http-server")]
pub mod serve;
