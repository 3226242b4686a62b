//! Parse a pasted `ssh ...` command line back into connection fields.

/// Connection fields recovered from an ssh command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSsh {
    pub user: String,
    pub host: String,
    pub key_path: Option<String>,
    pub port: Option<String>,
}

/// Parse `[ssh] [-i key] [-p port] user@host` in any flag order.
///
/// `-i` and `-p` accept the value either as the next word or attached
/// (`-i/path/key`, `-p2222`). Returns `None` without a `user@host` word.
pub fn parse_ssh_command<S: AsRef<str>>(args: &[S]) -> Option<ParsedSsh> {
    let mut words: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    if words.first() == Some(&"ssh") {
        words.remove(0);
    }

    let destination = words.iter().find(|w| w.contains('@') && !w.starts_with('-'))?;
    let (user, host) = destination.split_once('@')?;

    let mut key_path = None;
    let mut port = None;
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        match word {
            "-i" if i + 1 < words.len() => {
                key_path = Some(words[i + 1].to_string());
                i += 1;
            }
            "-p" if i + 1 < words.len() => {
                port = Some(words[i + 1].to_string());
                i += 1;
            }
            _ if word.starts_with("-i") && word.len() > 2 => key_path = Some(word[2..].to_string()),
            _ if word.starts_with("-p") && word.len() > 2 => port = Some(word[2..].to_string()),
            _ => {}
        }
        i += 1;
    }

    Some(ParsedSsh {
        user: user.to_string(),
        host: host.to_string(),
        key_path,
        port,
    })
}
