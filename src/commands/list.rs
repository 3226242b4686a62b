//! `list` output: an aligned table, or one line per connection for shell
//! integrations.

use std::io::Write;

use anyhow::Context;
use crossterm::style::Stylize;

use crate::error::Result;
use crate::ssh::CommandBuilder;
use crate::store::{Connection, ConnectionStore};

const HEADERS: [&str; 4] = ["Alias", "User", "Host", "Port"];
const GUTTER: &str = "  ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub oneline: bool,
    /// With `oneline`: prefix `alias<TAB>user@host<TAB>`
    pub names: bool,
}

/// Header, separator and one row per connection. Columns are padded to the
/// widest cell; trailing padding is trimmed.
pub fn render_table(connections: &[Connection]) -> Vec<String> {
    let rows: Vec<[&str; 4]> = connections
        .iter()
        .map(|c| {
            [
                c.alias.as_str(),
                c.user.as_str(),
                c.host.as_str(),
                c.port.as_deref().unwrap_or(""),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let join = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join(GUTTER).trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join(HEADERS));
    lines.push(widths.map(|w| "-".repeat(w)).join(GUTTER));
    lines.extend(rows.into_iter().map(join));
    lines
}

/// One line per connection: the printable client arguments, optionally
/// prefixed with the alias and destination.
pub fn render_oneline(connections: &[Connection], builder: &CommandBuilder, names: bool) -> Vec<String> {
    connections
        .iter()
        .map(|c| {
            let args = builder.printable(c);
            if names {
                format!("{}\t{}\t{}", c.alias, c.destination(), args)
            } else {
                args
            }
        })
        .collect()
}

pub fn run(store: &ConnectionStore, builder: &CommandBuilder, options: ListOptions, out: &mut dyn Write) -> Result<()> {
    let connections = store.load()?;

    if options.oneline {
        for line in render_oneline(&connections, builder, options.names) {
            writeln!(out, "{line}").context("Failed to write list")?;
        }
        return Ok(());
    }

    if connections.is_empty() {
        writeln!(out, "{}", "No connections found. Add one with \"sshya add\"".yellow())
            .context("Failed to write list")?;
        return Ok(());
    }

    let mut lines = render_table(&connections).into_iter();
    if let Some(header) = lines.next() {
        writeln!(out, "{}", header.bold()).context("Failed to write list")?;
    }
    for line in lines {
        writeln!(out, "{line}").context("Failed to write list")?;
    }
    Ok(())
}
