//! Argument construction for the remote-login client.
//!
//! This is the only place stored, user-controlled path data is turned into
//! a remote command, so every path that reaches a remote shell goes through
//! [`single_quote`].

use std::path::PathBuf;

use crate::store::{expand_home, Connection};

/// Forces pseudo-terminal allocation even though the client's stdin is a pipe.
pub const FORCE_PTY_FLAG: &str = "-tt";

/// Requests a pseudo-terminal in the printable command, where the client
/// inherits the caller's terminal.
pub const PRINT_PTY_FLAG: &str = "-t";

/// Command run remotely after changing directory.
pub const LOGIN_SHELL: &str = "exec \"$SHELL\" -l";

/// Escape `'` as `'\''` so the value can sit inside single quotes.
pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Wrap `value` in single quotes for a POSIX shell.
pub fn single_quote(value: &str) -> String {
    format!("'{}'", escape_single_quotes(value))
}

/// `cd '<remote_path>' && exec "$SHELL" -l`
pub fn remote_command(remote_path: &str) -> String {
    format!("cd {} && {}", single_quote(remote_path), LOGIN_SHELL)
}

/// Builds client argument vectors from connection profiles.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    home: PathBuf,
}

impl CommandBuilder {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Arguments for an interactive session, in fixed order:
    /// `-i <key>`, `-p <port>`, `user@host`, then the forced-pty flag and
    /// remote command when a remote path is set.
    pub fn args(&self, connection: &Connection) -> Vec<String> {
        let mut args = self.target_args(connection);
        args.push(connection.destination());

        if let Some(remote_path) = connection.remote_path.as_deref() {
            args.push(FORCE_PTY_FLAG.to_string());
            args.push(remote_command(remote_path));
        }
        args
    }

    /// One-line command for shell integrations.
    ///
    /// The key path is quoted; the remote command is appended as-is after
    /// `user@host` so consumers can split on ` -t `.
    pub fn printable(&self, connection: &Connection) -> String {
        let mut parts = Vec::new();
        if let Some(key_path) = connection.key_path.as_deref() {
            parts.push("-i".to_string());
            parts.push(single_quote(&expand_home(key_path, &self.home)));
        }
        if let Some(port) = connection.port.as_deref() {
            parts.push("-p".to_string());
            parts.push(port.to_string());
        }
        parts.push(PRINT_PTY_FLAG.to_string());
        parts.push(connection.destination());
        if let Some(remote_path) = connection.remote_path.as_deref() {
            parts.push(remote_command(remote_path));
        }
        parts.join(" ")
    }

    /// Non-interactive reachability check that runs `exit` remotely.
    pub fn probe_args(&self, connection: &Connection, timeout_secs: u64) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={timeout_secs}"),
        ];
        args.extend(self.target_args(connection));
        args.push(connection.destination());
        args.push("exit".to_string());
        args
    }

    fn target_args(&self, connection: &Connection) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key_path) = connection.key_path.as_deref() {
            args.push("-i".to_string());
            args.push(expand_home(key_path, &self.home));
        }
        if let Some(port) = connection.port.as_deref() {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn connection() -> Connection {
        Connection {
            id: 1,
            alias: "box".to_string(),
            user: "root".to_string(),
            host: "10.0.0.1".to_string(),
            key_path: None,
            port: None,
            remote_path: None,
            last_used: None,
        }
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::new("/home/u")
    }

    #[test]
    fn args_expand_key_and_keep_fixed_order() {
        let conn = Connection {
            key_path: Some("~/.ssh/id".to_string()),
            port: Some("2222".to_string()),
            ..connection()
        };
        assert_eq!(
            builder().args(&conn),
            vec!["-i", "/home/u/.ssh/id", "-p", "2222", "root@10.0.0.1"]
        );
    }

    #[test]
    fn args_without_optionals_is_just_destination() {
        assert_eq!(builder().args(&connection()), vec!["root@10.0.0.1"]);
    }

    #[test]
    fn remote_path_appends_pty_flag_and_login_shell() {
        let conn = Connection {
            remote_path: Some("/var/www".to_string()),
            ..connection()
        };
        assert_eq!(
            builder().args(&conn),
            vec![
                "root@10.0.0.1",
                FORCE_PTY_FLAG,
                "cd '/var/www' && exec \"$SHELL\" -l"
            ]
        );
    }

    #[test]
    fn single_quotes_in_path_are_escaped() {
        assert_eq!(single_quote("/tmp/a'b"), "'/tmp/a'\\''b'");
        assert_eq!(
            remote_command("/tmp/a'b"),
            "cd '/tmp/a'\\''b' && exec \"$SHELL\" -l"
        );
    }

    #[test]
    fn quoted_path_round_trips_through_posix_shell() {
        for path in ["/tmp/a'b", "/srv/$HOME/x", "/a b/`id`", "it's; rm -rf /", "''"] {
            let script = format!("printf '%s' {}", single_quote(path));
            let output = Command::new("sh").arg("-c").arg(&script).output().unwrap();
            assert!(output.status.success());
            assert_eq!(String::from_utf8(output.stdout).unwrap(), path);
        }
    }

    #[test]
    fn builder_is_deterministic() {
        let conn = Connection {
            key_path: Some("/k".to_string()),
            remote_path: Some("/x".to_string()),
            ..connection()
        };
        assert_eq!(builder().args(&conn), builder().args(&conn));
    }

    #[test]
    fn printable_quotes_key_and_always_requests_tty() {
        let conn = Connection {
            key_path: Some("~/keys/it's.pem".to_string()),
            port: Some("22".to_string()),
            remote_path: Some("/var/www".to_string()),
            ..connection()
        };
        assert_eq!(
            builder().printable(&conn),
            "-i '/home/u/keys/it'\\''s.pem' -p 22 -t root@10.0.0.1 cd '/var/www' && exec \"$SHELL\" -l"
        );
        assert_eq!(builder().printable(&connection()), "-t root@10.0.0.1");
    }

    #[test]
    fn probe_args_run_exit_in_batch_mode() {
        let conn = Connection {
            port: Some("2200".to_string()),
            remote_path: Some("/ignored".to_string()),
            ..connection()
        };
        assert_eq!(
            builder().probe_args(&conn, 5),
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=5",
                "-p",
                "2200",
                "root@10.0.0.1",
                "exit"
            ]
        );
    }
}
