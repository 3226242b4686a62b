//! Command-line operations built on the store, the command builder and the
//! session layer.
//!
//! Each command writes to a caller-supplied writer so it can be exercised
//! without a terminal. Argument dispatch lives in the binary.

pub mod list;
pub mod probe;
pub mod shell;
pub mod transfer;

use crate::error::{Result, SshyaError};
use crate::ssh::ParsedSsh;
use crate::store::{expand_home, Connection, ConnectionDraft, ConnectionStore};

/// Parse `<alias> <user>@<host> [-p port] [-i key] [-d remote_path]`.
pub fn parse_profile_args(args: &[String]) -> Result<ConnectionDraft> {
    let (Some(alias), Some(target)) = (args.first(), args.get(1)) else {
        return Err(SshyaError::Validation(
            "expected <alias> <user>@<host> [-p port] [-i key] [-d remote_path]".to_string(),
        ));
    };
    let Some((user, host)) = target.split_once('@') else {
        return Err(SshyaError::Validation(format!("expected user@host, got \"{target}\"")));
    };

    let mut draft = ConnectionDraft::new(alias.as_str(), user, host);
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        let Some(value) = rest.next() else {
            return Err(SshyaError::Validation(format!("missing value for {flag}")));
        };
        draft = match flag.as_str() {
            "-p" | "--port" => draft.port(value.as_str()),
            "-i" | "--key" => draft.key_path(value.as_str()),
            "-d" | "--dir" => draft.remote_path(value.as_str()),
            other => return Err(SshyaError::Validation(format!("unknown option: {other}"))),
        };
    }
    Ok(draft)
}

/// Remove `--alias <name>` from `args`, returning the name.
pub fn take_alias_flag(args: &mut Vec<String>) -> Option<String> {
    let index = args.iter().position(|a| a == "--alias")?;
    if index + 1 >= args.len() {
        args.remove(index);
        return None;
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Some(value)
}

/// Resolution of a pasted ssh command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickConnect {
    /// A stored connection already matches
    Existing(Connection),
    /// Saved under a new alias
    Created(Connection),
}

impl QuickConnect {
    pub fn connection(&self) -> &Connection {
        match self {
            QuickConnect::Existing(c) | QuickConnect::Created(c) => c,
        }
    }
}

/// Find a stored connection matching user, host, key and port exactly, or
/// save the parsed one under `alias`.
pub fn resolve_quick_connect(
    store: &ConnectionStore,
    parsed: &ParsedSsh,
    alias: Option<&str>,
) -> Result<QuickConnect> {
    let key_path = parsed.key_path.as_deref().map(|k| expand_home(k.trim(), store.home()));
    let existing = store.load()?.into_iter().find(|c| {
        c.user == parsed.user
            && c.host == parsed.host
            && c.key_path == key_path
            && c.port.as_deref() == parsed.port.as_deref()
    });
    if let Some(connection) = existing {
        return Ok(QuickConnect::Existing(connection));
    }

    let Some(alias) = alias.filter(|a| !a.trim().is_empty()) else {
        return Err(SshyaError::Validation(
            "not saved yet, pass --alias <name> to save it".to_string(),
        ));
    };

    let mut draft = ConnectionDraft::new(alias, parsed.user.as_str(), parsed.host.as_str());
    draft.key_path.clone_from(&parsed.key_path);
    draft.port.clone_from(&parsed.port);
    Ok(QuickConnect::Created(store.add(draft)?))
}
