//! sshya: store named SSH connections and open them by alias.
//!
//! Usage:
//!   sshya connect <alias>        Open an interactive session
//!   sshya list [--oneline]       Show stored connections
//!   sshya --help                 Show all commands

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context as _};
use crossterm::style::Stylize;
use tracing::debug;

use sshya::commands::list::ListOptions;
use sshya::commands::{self, list, probe, shell, transfer, QuickConnect};
use sshya::config::{self, Config};
use sshya::error::{Result, SshyaError};
use sshya::input::CANCEL_EXIT_CODE;
use sshya::logging;
use sshya::session::{IdleOutcome, SessionOrchestrator};
use sshya::ssh::{parse_ssh_command, CommandBuilder};
use sshya::store::{Connection, ConnectionStore};
use sshya::terminal::RawModeController;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            1
        }
    };

    // Guards are dropped by now, so the terminal is back in its prior mode
    process::exit(code);
}

/// Loaded configuration plus the store and builder derived from it
struct Context {
    config: Config,
    store: ConnectionStore,
    builder: CommandBuilder,
}

impl Context {
    fn load() -> Result<Self> {
        let config = Config::load()?;
        let home = config::home_dir()?;
        let store = ConnectionStore::new(config.store_path(&home), &home);
        store.init()?;

        Ok(Self {
            config,
            store,
            builder: CommandBuilder::new(home),
        })
    }

    fn orchestrator(&self) -> SessionOrchestrator {
        SessionOrchestrator::new(
            self.store.clone(),
            self.builder.clone(),
            sshya::session::SystemLauncher,
            self.config.ssh_program.clone(),
            RawModeController::system(),
        )
    }

    fn resolve(&self, alias: &str) -> Result<Connection> {
        self.store
            .find_by_alias(alias)?
            .ok_or_else(|| SshyaError::NotFound(alias.to_string()))
    }
}

fn run(args: &[String]) -> Result<i32> {
    let Some(command) = args.first() else {
        print_usage();
        return Ok(0);
    };
    let rest = &args[1..];

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_usage();
            return Ok(0);
        }
        "--version" | "-V" => {
            println!("sshya {}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }
        "about" => {
            shell::print_about(&mut io::stdout())?;
            return Ok(0);
        }
        "fzf" | "instructions" | "install" => {
            shell::print_fzf_instructions(&mut io::stdout())?;
            return Ok(0);
        }
        _ => {}
    }

    if let Err(e) = logging::init(Config::data_dir().as_deref()) {
        eprintln!("{}", format!("Logging disabled: {e:#}").yellow());
    }
    let ctx = Context::load()?;

    match command.as_str() {
        "print" => {
            let connection = ctx.resolve(required(rest, "alias")?)?;
            println!("{}", ctx.builder.printable(&connection));
            Ok(0)
        }
        "list" | "ls" | "ps" => {
            let options = ListOptions {
                oneline: has_flag(rest, "--oneline"),
                names: has_flag(rest, "--names"),
            };
            list::run(&ctx.store, &ctx.builder, options, &mut io::stdout())?;
            Ok(0)
        }
        "add" | "create" | "new" => {
            let connection = ctx.store.add(commands::parse_profile_args(rest)?)?;
            println!("{}", format!("Connection \"{}\" added.", connection.alias).green());
            Ok(0)
        }
        "update" | "edit" => {
            let draft = commands::parse_profile_args(rest)?;
            let alias = draft.alias.trim().to_string();
            if !ctx.store.update(draft)? {
                return Err(SshyaError::NotFound(alias));
            }
            println!("{}", format!("Connection \"{alias}\" updated.").green());
            Ok(0)
        }
        "remove" | "delete" | "rm" => {
            let alias = required(rest, "alias")?;
            if ctx.store.remove(alias)? {
                println!("{}", format!("Connection \"{alias}\" removed.").green());
            } else {
                println!("{}", format!("No connection named \"{alias}\", nothing removed.").yellow());
            }
            Ok(0)
        }
        "connect" | "c" => {
            let alias = required(rest, "alias")?;
            let connection = ctx.resolve(alias)?;
            connect(&ctx, alias, &connection)
        }
        "recent" => {
            for connection in ctx.store.by_recent_use()? {
                println!("{}", connection.alias);
            }
            Ok(0)
        }
        "test" => test_connection(&ctx, required(rest, "alias")?),
        "import" => import(&ctx, rest),
        "export" => {
            let file = rest
                .first()
                .map_or_else(|| PathBuf::from(transfer::DEFAULT_EXPORT_FILE), PathBuf::from);
            let count = transfer::export_connections(&ctx.store, &file)?;
            if count == 0 {
                println!("{}", "No connections to export.".yellow());
                return Ok(1);
            }
            println!(
                "{}",
                format!("Successfully exported {count} connections to {}", file.display()).green()
            );
            Ok(0)
        }
        "ssh" => quick_connect(&ctx, rest),
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run 'sshya --help' for usage.");
            Ok(1)
        }
    }
}

fn connect(ctx: &Context, alias: &str, connection: &Connection) -> Result<i32> {
    let mut orchestrator = ctx.orchestrator();
    orchestrator.install_interceptor()?;

    let result = orchestrator.run(alias, connection);
    orchestrator.release_interceptor();

    let report = result?;
    report.log_deferred(alias);
    debug!(?report, "session report");
    Ok(report.exit_code)
}

fn test_connection(ctx: &Context, alias: &str) -> Result<i32> {
    let connection = ctx.resolve(alias)?;
    println!("\nTesting connection to {}...", alias.blue());

    let mut orchestrator = ctx.orchestrator();
    orchestrator.install_interceptor()?;
    probe::spawn_probe(
        ctx.config.ssh_program.clone(),
        ctx.builder.probe_args(&connection, ctx.config.test_timeout_secs),
        orchestrator.event_sender(),
    )
    .context("Failed to start connection test")?;

    let outcome = orchestrator.wait_idle();
    orchestrator.release_interceptor();

    match outcome {
        IdleOutcome::Cancelled => Ok(CANCEL_EXIT_CODE),
        IdleOutcome::Probe(result) => {
            let ok = probe::report(&result, &mut io::stdout(), &mut io::stderr())?;
            Ok(if ok { 0 } else { 1 })
        }
        IdleOutcome::Disconnected => Err(anyhow!("connection test ended without a result").into()),
    }
}

fn import(ctx: &Context, rest: &[String]) -> Result<i32> {
    let overwrite = has_flag(rest, "--overwrite");
    let Some(file) = rest.iter().find(|a| !a.starts_with("--")) else {
        return Err(anyhow!("File is required: sshya import <file> [--overwrite]").into());
    };

    let summary = transfer::import_file(&ctx.store, &PathBuf::from(file), overwrite)?;
    println!("Found {} connections to import.", summary.found);
    for element in &summary.invalid {
        println!("{}", format!("Skipping invalid connection object: {element}").yellow());
    }
    println!("{}", "\nImport complete!".green());
    println!("- {} new connections added.", summary.added);
    println!("- {} connections overwritten.", summary.overwritten);
    println!("- {} connections skipped.", summary.skipped);
    Ok(0)
}

fn quick_connect(ctx: &Context, rest: &[String]) -> Result<i32> {
    let mut words = rest.to_vec();
    let alias = commands::take_alias_flag(&mut words);
    let Some(parsed) = parse_ssh_command(&words) else {
        return Err(anyhow!(
            "Could not parse SSH command. Expected format: ssh -i <key> user@host -p <port>"
        )
        .into());
    };

    let resolved = commands::resolve_quick_connect(&ctx.store, &parsed, alias.as_deref())?;
    let connection = resolved.connection();
    let message = match &resolved {
        QuickConnect::Existing(c) => format!("Found existing connection with alias \"{}\". Connecting...", c.alias),
        QuickConnect::Created(c) => format!("Connection saved as \"{}\". Connecting...", c.alias),
    };
    println!("{}", message.green());

    connect(ctx, &connection.alias, connection)
}

fn required<'a>(rest: &'a [String], what: &str) -> Result<&'a str> {
    rest.first()
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{what} is required").into())
}

fn has_flag(rest: &[String], flag: &str) -> bool {
    rest.iter().any(|a| a == flag)
}

fn print_usage() {
    println!("sshya {}: store SSH connections and open them by alias", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  sshya connect <alias>                  Open an interactive session (alias: c)");
    println!("  sshya print <alias>                    Print client arguments for an alias");
    println!("  sshya list [--oneline [--names]]       List connections (aliases: ls, ps)");
    println!("  sshya add <alias> <user>@<host> [-p port] [-i key] [-d remote_path]");
    println!("                                         Add a connection (aliases: create, new)");
    println!("  sshya update <alias> <user>@<host> [-p port] [-i key] [-d remote_path]");
    println!("                                         Update a connection (alias: edit)");
    println!("  sshya remove <alias>                   Remove a connection (aliases: delete, rm)");
    println!("  sshya recent                           Aliases, most recently used first");
    println!("  sshya test <alias>                     Check that a connection works");
    println!("  sshya import <file> [--overwrite]      Import connections from JSON");
    println!("  sshya export [file]                    Export connections (default: sshm-export.json)");
    println!("  sshya ssh [--alias <name>] <ssh args>  Connect from a pasted ssh command");
    println!("  sshya fzf                              Show the fzf launcher snippet");
    println!("  sshya about                            About this CLI");
    println!();
    println!("Environment:");
    println!("  SSHYA_STORE   Connection store path (default ~/.sshya/sshm.json)");
    println!("  SSHYA_LOG     Log filter, e.g. sshya=debug (logs go to the data directory)");
}
