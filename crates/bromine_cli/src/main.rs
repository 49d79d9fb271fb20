//! Command-line front end for a local Bromine note store.
//!
//! Link, toggle and follow go through `EditorSession`, so every edit is saved
//! the same way an editor would save it.

use anyhow::{anyhow, bail, Context, Result};
use bromine_core::{
    core_version, init_from_config, open_db, ping, Block, BromineConfig, Document,
    EditorSession, Note, NoteDraft, NoteId, NoteService, SaveOutcome, SqliteNoteRepository,
    StoreGateway,
};
use clap::{Parser, Subcommand};
use log::debug;
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

type Session<'conn> = EditorSession<StoreGateway<SqliteNoteRepository<'conn>>>;

#[derive(Parser)]
#[command(name = "bromine")]
#[command(about = "Manage notes and note links from the terminal")]
struct Cli {
    /// TOML config file (defaults to $BROMINE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level, overriding the config
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,
    /// List notes, newest first
    List,
    /// Create a note
    New {
        #[arg(long)]
        title: Option<String>,
        /// Idempotency key; creating twice with the same key updates the note
        #[arg(long)]
        local_id: Option<String>,
    },
    /// Print a note and its links
    Show { id: NoteId },
    /// Embed a link to <to> inside <from>
    Link {
        from: NoteId,
        to: NoteId,
        /// Block position; defaults to the end of the note
        #[arg(long)]
        at: Option<usize>,
    },
    /// Switch a link between card and link view
    Toggle { note: NoteId, ordinal: usize },
    /// Open the note a link points to
    Follow { note: NoteId, ordinal: usize },
    /// Delete a note
    Delete { id: NoteId },
    /// List the cover palette
    Palette,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config =
        BromineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let config = apply_flags(config, cli.db, cli.log_level);
    init_from_config(&config).map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    match cli.command {
        Commands::Ping => {
            println!("bromine_core ping={}", ping());
            println!("bromine_core version={}", core_version());
        }
        Commands::Palette => {
            for cover in config.cover_palette().entries() {
                println!("{:<9} {}", format!("{:?}", cover.kind()).to_lowercase(), cover);
            }
        }
        command => {
            let conn = open_db(&config.db_path).with_context(|| {
                format!("failed to open database `{}`", config.db_path.display())
            })?;
            debug!(
                "event=cli_store_open module=cli status=ok db_path={}",
                config.db_path.display()
            );
            run_store_command(&conn, command)?;
        }
    }
    Ok(())
}

/// Command-line flags win over every other config source.
fn apply_flags(
    mut config: BromineConfig,
    db: Option<PathBuf>,
    log_level: Option<String>,
) -> BromineConfig {
    if let Some(db) = db {
        config.db_path = db;
    }
    if let Some(level) = log_level {
        config.log_level = level;
    }
    config
}

fn run_store_command(conn: &Connection, command: Commands) -> Result<()> {
    let service = NoteService::new(SqliteNoteRepository::try_new(conn)?);
    match command {
        Commands::List => {
            let cards = service.dashboard()?;
            if cards.is_empty() {
                println!("No notes found.");
            }
            for card in cards {
                println!("{}  {}  {}", card.id, card.title, card.preview);
            }
        }
        Commands::New { title, local_id } => {
            let local_id = local_id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut draft = NoteDraft::untitled(local_id);
            if let Some(title) = title {
                draft.title = Some(title);
            }
            let note = service.create(&draft)?;
            println!("{}", note.id);
        }
        Commands::Show { id } => {
            let note = load(&service, id)?;
            print_note(&note);
        }
        Commands::Delete { id } => {
            service.delete(id)?;
            println!("Note Deleted");
        }
        Commands::Link { from, to, at } => {
            let target = load(&service, to)?;
            let mut session = open_session(service, from)?;
            let at = at.unwrap_or_else(|| {
                session
                    .current()
                    .map_or(0, |open| open.document().len())
            });
            let (ordinal, outcome) = session.insert_link(at, &target)?;
            ensure_saved(outcome)?;
            println!("linked {from} -> {to} as link #{ordinal}");
        }
        Commands::Toggle { note, ordinal } => {
            let mut session = open_session(service, note)?;
            let (mode, outcome) = session.toggle_link_view(ordinal)?;
            ensure_saved(outcome)?;
            println!("link #{ordinal} is now shown as {}", mode.as_str());
        }
        Commands::Follow { note, ordinal } => {
            let mut session = open_session(service, note)?;
            session.follow_link(ordinal)?;
            if let Some(opened) = session.snapshot() {
                print_note(&opened);
            }
        }
        Commands::Ping | Commands::Palette => bail!("command does not use the note store"),
    }
    Ok(())
}

fn load(service: &NoteService<SqliteNoteRepository<'_>>, id: NoteId) -> Result<Note> {
    service.get(id)?.ok_or_else(|| anyhow!("note not found: {id}"))
}

fn open_session<'conn>(
    service: NoteService<SqliteNoteRepository<'conn>>,
    id: NoteId,
) -> Result<Session<'conn>> {
    let note = load(&service, id)?;
    let mut session = EditorSession::new(StoreGateway::new(service));
    session.open(note);
    Ok(session)
}

fn ensure_saved(outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Saved | SaveOutcome::Skipped => Ok(()),
        SaveOutcome::Failed(err) => bail!("edit applied but not saved: {err}"),
    }
}

fn print_note(note: &Note) {
    println!("id:      {}", note.id);
    println!("title:   {}", note.title);
    if !note.cover_image.is_none() {
        println!("cover:   {}", note.cover_image);
    }
    println!("content: {}", note.content);

    let document = Document::parse_html(&note.content);
    for (ordinal, link) in document.note_links().into_iter().enumerate() {
        let target = link
            .target_id
            .map_or_else(|| "<missing>".to_string(), |id| id.to_string());
        println!(
            "link #{ordinal} [{}] {} -> {}",
            link.view_mode.as_str(),
            link.title,
            target
        );
    }
    let blocks = document
        .blocks()
        .iter()
        .filter(|block| !matches!(block, Block::NoteLink(_)))
        .count();
    println!("blocks:  {} text, {} links", blocks, document.note_links().len());
}

#[cfg(test)]
mod tests {
    use super::{apply_flags, Cli};
    use bromine_core::BromineConfig;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn log_settings_come_from_config_unless_flagged() {
        let config = BromineConfig {
            log_level: "error".to_string(),
            log_dir: Some(PathBuf::from("/var/log/bromine")),
            ..BromineConfig::default()
        };

        let cli = Cli::parse_from(["bromine", "list"]);
        let resolved = apply_flags(config.clone(), cli.db, cli.log_level);
        assert_eq!(resolved, config);

        let cli = Cli::parse_from(["bromine", "--log-level", "debug", "--db", "x.db", "list"]);
        let resolved = apply_flags(config.clone(), cli.db, cli.log_level);
        assert_eq!(resolved.log_level, "debug");
        assert_eq!(resolved.db_path, PathBuf::from("x.db"));
        assert_eq!(resolved.log_dir, config.log_dir);
    }
}
