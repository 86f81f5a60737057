use std::io::{self, BufReader, IsTerminal};

use anyhow::Context;
use colored::Colorize;
use crepo_sdk::{ClientConfig, ContentRepoClient, ErrorKind, ListQuery, SdkError};
use tracing::debug;

use crate::cli::*;
use crate::shell::Session;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Demo => cmd_demo(&config, &mut io::stdout().lock()),
        Command::Shell(args) => cmd_shell(&config, cli.format, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading client config");
            ClientConfig::from_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))
        }
        None => Ok(ClientConfig::default()),
    }
}

fn cmd_shell(config: &ClientConfig, format: OutputFormat, args: ShellArgs) -> anyhow::Result<()> {
    let mut session = Session::new(config, format)?;
    let mut out = io::stdout().lock();
    match args.script {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("cannot open script {}", path.display()))?;
            session.run(BufReader::new(file), &mut out, false)
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            session.run(stdin.lock(), &mut out, interactive)
        }
    }
}

/// Create, version and delete one object, showing how "latest" walks back
/// to the newest live version and how reads fail once none is left.
fn cmd_demo(config: &ClientConfig, out: &mut impl io::Write) -> anyhow::Result<()> {
    let client = ContentRepoClient::in_memory(config)?;
    let key = "doc1";

    let v0 = client.put(key, "hello", "text/plain")?;
    writeln!(
        out,
        "{} Created {}#{} ({})",
        "✓".green().bold(),
        key.bold(),
        v0.version.version_number,
        v0.version.version_id.to_string().dimmed()
    )?;

    let v1 = client.version_object(
        client.object(key, "world")?.with_content_type("text/plain"),
    )?;
    writeln!(
        out,
        "{} Versioned {}#{} ({})",
        "✓".green().bold(),
        key.bold(),
        v1.version.version_number,
        v1.version.version_id.to_string().dimmed()
    )?;
    writeln!(out, "  latest: {}", show_latest(&client, key)?)?;

    client.delete(key, 1)?;
    writeln!(out, "{} Deleted {}#1", "✓".green(), key.bold())?;
    writeln!(out, "  latest: {}", show_latest(&client, key)?)?;

    client.delete(key, 0)?;
    writeln!(out, "{} Deleted {}#0", "✓".green(), key.bold())?;
    writeln!(out, "  latest: {}", show_latest(&client, key)?)?;

    let all = client.list(&ListQuery::new(0, 10).include_deleted(true))?;
    writeln!(out, "Versions kept: {}", all.len().to_string().bold())?;
    for meta in &all {
        writeln!(
            out,
            "  #{} {} created {} modified {}",
            meta.version.version_number,
            meta.version.status,
            meta.version.creation_time.format("%H:%M:%S%.3f"),
            meta.version.modification_time.format("%H:%M:%S%.3f"),
        )?;
    }
    Ok(())
}

fn show_latest(client: &ContentRepoClient, key: &str) -> anyhow::Result<String> {
    match client.read_latest(key) {
        Ok(bytes) => Ok(format!("{:?}", String::from_utf8_lossy(&bytes))),
        Err(e @ SdkError::Repo(_)) if e.kind() == Some(ErrorKind::NotFound) => {
            Ok("not found".red().to_string())
        }
        Err(e) => Err(e.into()),
    }
}
