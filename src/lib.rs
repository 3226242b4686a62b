//! sshya library crate.
//!
//! This library provides the core functionality for sshya, including:
//! - The persisted connection store
//! - Client argument construction and ssh command parsing
//! - Interactive session orchestration with terminal bridging
//! - Global cancel-key handling

pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod session;
pub mod ssh;
pub mod store;
pub mod terminal;

#[cfg(test)]
mod test_utils;
