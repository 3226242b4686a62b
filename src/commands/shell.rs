//! Shell integration snippet and `about` text.

use std::io::Write;

use anyhow::Context;
use crossterm::style::Stylize;

use crate::error::Result;

pub const REPOSITORY: &str = "https://github.com/ceneka/sshya";

/// Shell function that picks a connection with fzf and hands `sshya print`
/// to the system client. It splits the printed command on ` -t ` so the
/// remote command stays one word.
pub fn fzf_snippet() -> String {
    [
        "_fzf_sshya() {",
        "  local line alias userhost command oldstty",
        "  # Temporarily disable XON/XOFF so Ctrl-S works, then restore",
        "  oldstty=$(stty -g 2>/dev/null)",
        "  stty -ixon 2>/dev/null || true",
        "  line=$(sshya list --oneline --names | fzf --tac --with-nth=1,2 --delimiter=$'\\t') || { stty \"$oldstty\" 2>/dev/null || true; return; }",
        "  alias=${line%%$'\\t'*}",
        "  userhost=${line#*$'\\t'}; userhost=${userhost%%$'\\t'*}",
        "  command=$(sshya print \"$alias\")",
        "  echo \"Connecting: $alias ($userhost)\"",
        "  if [ -n \"$ZSH_VERSION\" ]; then",
        "    local -a _args",
        "    local remote_cmd=\"\"",
        "    if [[ \"$command\" == *' -t '*' '* ]]; then",
        "      _args=(${(zQ)command%% -t *})",
        "      remote_cmd=\"${command#* -t }\"",
        "      ssh \"${_args[@]}\" -t \"${remote_cmd%% *}\" \"${remote_cmd#* }\"",
        "    else",
        "      _args=(${(zQ)command})",
        "      ssh \"${_args[@]}\"",
        "    fi",
        "    zle -R -c",
        "  else",
        "    read -r -a __args <<< \"$command\"",
        "    ssh \"${__args[@]}\"",
        "  fi",
        "  stty \"$oldstty\" 2>/dev/null || true",
        "}",
        "# zsh widget binding (recommended):",
        "zle -N _fzf_sshya",
        "bindkey '^S' _fzf_sshya",
    ]
    .join("\n")
}

pub fn print_fzf_instructions(out: &mut dyn Write) -> Result<()> {
    let write = |out: &mut dyn Write| -> std::io::Result<()> {
        writeln!(
            out,
            "{}",
            "To enable a quick fzf-powered SSH launcher, add this to your shell rc:".yellow()
        )?;
        writeln!(out, "\n{}\n", "~/.bashrc or ~/.zshrc".bold())?;
        writeln!(out, "{}", fzf_snippet().cyan())?;
        writeln!(out, "\n{}", "Notes:".green())?;
        writeln!(out, "- This expects {} to be installed.", "fzf".bold())?;
        writeln!(
            out,
            "- On bash, you can bind with: {}",
            "bind -x '\"\\C-s\":_fzf_sshya'".cyan()
        )?;
        writeln!(out, "- If Ctrl-S is flow control, disable with: {}", "stty -ixon".cyan())
    };
    write(out).context("Failed to write instructions")?;
    Ok(())
}

pub fn print_about(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", "SSHya CLI".bold())
        .and_then(|()| writeln!(out, "{}", format!("Version {}", env!("CARGO_PKG_VERSION")).grey()))
        .and_then(|()| writeln!(out, "{}", REPOSITORY.grey()))
        .context("Failed to write about")?;
    Ok(())
}
