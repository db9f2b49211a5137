use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use storage::{
    backup::{list_backups, BackupSummary},
    Storage,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Catalog database maintenance")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/catalog.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Writes the catalog as a JSON backup document.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Upserts a JSON backup document into the database.
    Import { file: PathBuf },
    /// Database snapshot plus JSON export.
    Full {
        #[arg(long, default_value = "backups")]
        dir: PathBuf,
    },
    List {
        #[arg(long, default_value = "backups")]
        dir: PathBuf,
    },
    Stats,
}

fn format_summary(summary: &BackupSummary) -> String {
    format!(
        "titles={} parts={} groups={} users={}",
        summary.titles, summary.parts, summary.groups, summary.users
    )
}

async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    if let Command::List { dir } = &cli.command {
        let entries = list_backups(dir)
            .await
            .with_context(|| format!("failed to list backups in '{}'", dir.display()))?;
        if entries.is_empty() {
            writeln!(out, "no backups in {}", dir.display())?;
        }
        for entry in entries {
            let summary = entry
                .summary
                .as_ref()
                .map(format_summary)
                .unwrap_or_else(|| "unreadable".into());
            writeln!(
                out,
                "{}\t{} bytes\t{}",
                entry.path.display(),
                entry.size_bytes,
                summary
            )?;
        }
        return Ok(());
    }

    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open database '{}'", cli.database_url))?;

    match cli.command {
        Command::Export { output } => {
            let path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "catalog_backup_{}.json",
                    Utc::now().format("%Y%m%d_%H%M%S")
                ))
            });
            let document = storage
                .export_json_file(&path)
                .await
                .with_context(|| format!("failed to export to '{}'", path.display()))?;
            writeln!(
                out,
                "exported {} ({})",
                path.display(),
                format_summary(&document.summary())
            )?;
        }
        Command::Import { file } => {
            let report = storage
                .import_json_file(&file)
                .await
                .with_context(|| format!("failed to import '{}'", file.display()))?;
            writeln!(
                out,
                "imported titles={} parts={} groups={} users={} channels={} links={}",
                report.titles,
                report.parts,
                report.groups,
                report.users,
                report.channels,
                report.links
            )?;
        }
        Command::Full { dir } => {
            let backup = storage
                .create_full_backup(&dir)
                .await
                .with_context(|| format!("failed to write backup into '{}'", dir.display()))?;
            writeln!(out, "database snapshot: {}", backup.database.display())?;
            writeln!(out, "json export: {}", backup.json.display())?;
        }
        Command::Stats => {
            let stats = storage.stats().await?;
            writeln!(out, "users: {}", stats.users)?;
            writeln!(out, "active users (7d): {}", stats.active_users_7d)?;
            writeln!(out, "titles: {}", stats.titles)?;
            writeln!(out, "parts: {}", stats.parts)?;
            writeln!(out, "groups: {}", stats.groups)?;
            writeln!(out, "mandatory channels: {}", stats.mandatory_channels)?;
        }
        Command::List { .. } => {}
    }

    storage.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli, &mut io::stdout().lock()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tools").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    async fn run_to_string(cli: Cli) -> String {
        let mut out = Vec::new();
        run(cli, &mut out).await.expect("command succeeds");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn parses_subcommands_with_defaults() {
        let parsed = cli(&["--database-url", "sqlite::memory:", "full"]);
        assert!(matches!(parsed.command, Command::Full { ref dir } if dir == &PathBuf::from("backups")));

        let parsed = cli(&["--database-url", "sqlite::memory:", "import", "dump.json"]);
        assert!(matches!(parsed.command, Command::Import { ref file } if file == &PathBuf::from("dump.json")));

        assert!(Cli::try_parse_from(["tools", "import"]).is_err());
    }

    #[tokio::test]
    async fn export_then_import_into_fresh_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = format!("sqlite://{}", dir.path().join("source.db").display());
        let target = format!("sqlite://{}", dir.path().join("target.db").display());
        let dump = dir.path().join("dump.json");

        let storage = Storage::new(&source).await.expect("source db");
        storage
            .create_group(shared::domain::ChatId(-100500), Some("https://t.me/club"), "Club")
            .await
            .expect("group");
        drop(storage);

        let output = run_to_string(cli(&[
            "--database-url",
            &source,
            "export",
            "--output",
            dump.to_str().expect("utf8 path"),
        ]))
        .await;
        assert!(output.contains("groups=1"), "{output}");

        let output = run_to_string(cli(&[
            "--database-url",
            &target,
            "import",
            dump.to_str().expect("utf8 path"),
        ]))
        .await;
        assert!(output.contains("groups=1"), "{output}");

        let output = run_to_string(cli(&["--database-url", &target, "stats"])).await;
        assert!(output.contains("groups: 1"), "{output}");
    }

    #[tokio::test]
    async fn full_backup_shows_up_in_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let backups = dir.path().join("backups");
        let backups_arg = backups.to_str().expect("utf8 path");

        let output = run_to_string(cli(&["--database-url", &database, "full", "--dir", backups_arg])).await;
        assert!(output.contains("database snapshot"), "{output}");

        let output = run_to_string(cli(&["--database-url", &database, "list", "--dir", backups_arg])).await;
        assert_eq!(output.lines().count(), 2, "{output}");
        assert!(output.contains(".db"));
        assert!(output.contains(".json"));
        assert!(!output.contains("unreadable"), "{output}");
    }

    #[tokio::test]
    async fn list_reports_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nothing-here");
        let output = run_to_string(cli(&[
            "list",
            "--dir",
            missing.to_str().expect("utf8 path"),
        ]))
        .await;
        assert!(output.starts_with("no backups"));
    }
}
