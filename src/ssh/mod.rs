//! Remote-login client argument handling.

pub mod command;
pub mod parse;

pub use command::{single_quote, CommandBuilder};
pub use parse::{parse_ssh_command, ParsedSsh};
