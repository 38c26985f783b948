//! Playgloss - CLI entry point

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use playgloss::cli::{Cli, Commands, ConfigCommands, NoteCommands};
use playgloss::config::Config;
use playgloss::gloss::{BackendKind, GlossOptions, GlossService, RetryPolicy};
use playgloss::parser::outline::{outline, shortest, SceneSummary};
use playgloss::parser::{detect, CharacterRegistry};
use playgloss::store::{GlossStore, SqliteStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gloss {
            file,
            unit,
            backend,
            merge,
            title,
            timeout,
            retries,
            output_dir,
            db,
            dry_run,
            quiet,
        } => cmd_gloss(GlossArgs {
            file,
            unit,
            backend,
            merge,
            title,
            timeout,
            retries,
            output_dir,
            db,
            dry_run,
            quiet,
        }),
        Commands::Scenes { file, shortest } => cmd_scenes(&file, shortest),
        Commands::Cast { file } => cmd_cast(&file),
        Commands::Status { db } => cmd_status(db.as_deref()),
        Commands::Search { term, db } => cmd_search(&term, db.as_deref()),
        Commands::Note(cmd) => match cmd {
            NoteCommands::Add { gloss_id, note } => cmd_note_add(gloss_id, &note),
            NoteCommands::List { gloss_id } => cmd_note_list(gloss_id),
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => cmd_config_show(),
            ConfigCommands::Edit => cmd_config_edit(),
        },
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

/// CLI arguments for the gloss command, bundled so the dispatch stays flat.
struct GlossArgs {
    file: String,
    unit: String,
    backend: Option<String>,
    merge: Option<i64>,
    title: Option<String>,
    timeout: Option<u64>,
    retries: Option<u32>,
    output_dir: Option<String>,
    db: Option<String>,
    dry_run: bool,
    quiet: bool,
}

fn cmd_gloss(args: GlossArgs) -> Result<()> {
    let config = Config::load()?;

    let backend_name = args.backend.unwrap_or_else(|| config.gloss.backend.clone());
    let backend: BackendKind = backend_name.parse().map_err(anyhow::Error::msg)?;

    let retry = RetryPolicy::new(
        args.retries.unwrap_or(config.gloss.retries),
        Duration::from_secs(config.gloss.base_delay_secs),
    );

    let mut options = GlossOptions::with_backend(backend)
        .merge_threshold(args.merge.unwrap_or(config.gloss.merge_threshold))
        .timeout(args.timeout.unwrap_or(config.gloss.timeout_secs))
        .retry(retry)
        .dry_run(args.dry_run)
        .output_dir(
            args.output_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| config.output_directory()),
        )
        .db_path(
            args.db
                .map(PathBuf::from)
                .unwrap_or_else(|| config.database_path()),
        );
    if let Some(title) = args.title {
        options = options.play_title(title);
    }
    if args.quiet {
        options = options.quiet();
    }

    let service = GlossService::new(options)?;

    if !args.dry_run && !service.is_backend_available() {
        eprintln!(
            "Warning: '{}' command not found on PATH. Cached chunks will still render.",
            backend.command_name()
        );
        eprintln!();
    }

    let interrupt = service.interrupt_flag();
    ctrlc::set_handler(move || {
        interrupt.store(true, Ordering::SeqCst);
    })?;

    let report = service.run(&args.file, &args.unit)?;

    if args.dry_run {
        return Ok(());
    }

    println!();
    println!(
        "{}: {} chunks ({} cached, {} generated)",
        report.unit, report.chunks_total, report.cached, report.generated
    );
    if let Some(path) = &report.document_path {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_scenes(file: &str, only_shortest: bool) -> Result<()> {
    let lines = read_lines(file)?;
    let format = detect(&lines);
    let registry = CharacterRegistry::build(&lines);
    let summaries = outline(&lines, &registry);

    if summaries.is_empty() {
        println!("No act or scene markers found ({} format).", format);
        return Ok(());
    }

    if only_shortest {
        if let Some(summary) = shortest(&summaries) {
            print_summary(summary);
        }
        return Ok(());
    }

    println!("Format: {}", format);
    println!();
    for summary in &summaries {
        print_summary(summary);
    }
    Ok(())
}

fn print_summary(summary: &SceneSummary) {
    // 1-based line numbers for humans.
    println!(
        "{:<24} lines {}-{} ({} dialogue)",
        summary.unit.to_string(),
        summary.range.start + 1,
        summary.range.end + 1,
        summary.dialogue_lines
    );
}

fn cmd_cast(file: &str) -> Result<()> {
    let lines = read_lines(file)?;
    let registry = CharacterRegistry::build(&lines);

    let names = registry.names();
    if names.is_empty() {
        println!("No characters detected.");
        return Ok(());
    }

    println!("{} characters detected:", names.len());
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

fn cmd_status(db: Option<&str>) -> Result<()> {
    let store = open_store(db)?;
    let plays = store.plays()?;

    if plays.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }

    for play in plays {
        println!(
            "{}: {} passages, {} glosses",
            play.play, play.passages, play.glosses
        );
    }
    Ok(())
}

fn cmd_search(term: &str, db: Option<&str>) -> Result<()> {
    let store = open_store(db)?;
    let hits = store.search(term)?;

    if hits.is_empty() {
        println!("No glosses match '{}'.", term);
        return Ok(());
    }

    for hit in hits {
        println!(
            "#{} {} - {} ({}) [{}]",
            hit.gloss_id,
            hit.play,
            unit_label(hit.act, hit.scene),
            hit.speakers,
            hit.gloss_type
        );
        println!("  {}", hit.snippet);
    }
    Ok(())
}

fn cmd_note_add(gloss_id: i64, note: &str) -> Result<()> {
    let store = open_store(None)?;
    store.append_note(gloss_id, note)?;
    println!("Note added to gloss #{}.", gloss_id);
    Ok(())
}

fn cmd_note_list(gloss_id: i64) -> Result<()> {
    let store = open_store(None)?;
    let notes = store.notes(gloss_id)?;

    if notes.is_empty() {
        println!("No notes on gloss #{}.", gloss_id);
        return Ok(());
    }

    for (i, note) in notes.iter().enumerate() {
        println!("{}. {}", i + 1, note);
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn cmd_config_edit() -> Result<()> {
    let config_path = Config::config_path()?;

    // Ensure config exists
    if !config_path.exists() {
        let config = Config::default();
        config.save()?;
    }

    // Get editor from environment
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to open editor: {}", e))?;

    Ok(())
}

fn cmd_completions(shell: Option<clap_complete::Shell>) -> Result<()> {
    let shell = shell
        .or_else(clap_complete::Shell::from_env)
        .ok_or_else(|| anyhow::anyhow!("Could not detect shell; pass --shell"))?;
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "playgloss", &mut io::stdout());
    Ok(())
}

fn read_lines(file: &str) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file, e))?;
    Ok(text.lines().map(|l| l.to_string()).collect())
}

fn open_store(db: Option<&str>) -> Result<SqliteStore> {
    let path = match db {
        Some(path) => PathBuf::from(path),
        None => Config::load()?.database_path(),
    };
    Ok(SqliteStore::open(&path)?)
}

/// Human label for a cached passage's address.
fn unit_label(act: u32, scene: i32) -> String {
    match (act, scene) {
        (_, -1) => "Epilogue".to_string(),
        (0, 0) => "Prologue".to_string(),
        (act, 0) => format!("Act {} Prologue", act),
        (act, scene) => format!("Act {}, Scene {}", act, scene),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_label_regular_scene() {
        assert_eq!(unit_label(3, 1), "Act 3, Scene 1");
    }

    #[test]
    fn unit_label_opening_prologue() {
        assert_eq!(unit_label(0, 0), "Prologue");
    }

    #[test]
    fn unit_label_act_prologue() {
        assert_eq!(unit_label(2, 0), "Act 2 Prologue");
    }

    #[test]
    fn unit_label_epilogue() {
        assert_eq!(unit_label(0, -1), "Epilogue");
    }

    #[test]
    fn cli_gloss_parses_positional_args() {
        let cli = Cli::try_parse_from(["playgloss", "gloss", "hamlet.txt", "Act 3, Scene 1"])
            .unwrap();
        match cli.command {
            Commands::Gloss {
                file,
                unit,
                backend,
                dry_run,
                ..
            } => {
                assert_eq!(file, "hamlet.txt");
                assert_eq!(unit, "Act 3, Scene 1");
                assert!(backend.is_none());
                assert!(!dry_run);
            }
            _ => panic!("Expected Gloss command"),
        }
    }

    #[test]
    fn cli_gloss_parses_flags() {
        let cli = Cli::try_parse_from([
            "playgloss",
            "gloss",
            "hamlet.txt",
            "Prologue",
            "--merge",
            "0",
            "--backend",
            "codex",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Gloss {
                merge,
                backend,
                dry_run,
                ..
            } => {
                assert_eq!(merge, Some(0));
                assert_eq!(backend, Some("codex".to_string()));
                assert!(dry_run);
            }
            _ => panic!("Expected Gloss command"),
        }
    }

    #[test]
    fn cli_scenes_parses_with_alias() {
        let cli = Cli::try_parse_from(["playgloss", "ls", "hamlet.txt"]).unwrap();
        match cli.command {
            Commands::Scenes { file, shortest } => {
                assert_eq!(file, "hamlet.txt");
                assert!(!shortest);
            }
            _ => panic!("Expected Scenes command"),
        }
    }

    #[test]
    fn cli_search_parses_term() {
        let cli = Cli::try_parse_from(["playgloss", "search", "mortal coil"]).unwrap();
        match cli.command {
            Commands::Search { term, db } => {
                assert_eq!(term, "mortal coil");
                assert!(db.is_none());
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn cli_note_add_parses() {
        let cli = Cli::try_parse_from(["playgloss", "note", "add", "12", "check this"]).unwrap();
        match cli.command {
            Commands::Note(NoteCommands::Add { gloss_id, note }) => {
                assert_eq!(gloss_id, 12);
                assert_eq!(note, "check this");
            }
            _ => panic!("Expected Note Add command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_backend_later() {
        // Backend validation happens at dispatch, not parse time.
        let cli = Cli::try_parse_from([
            "playgloss",
            "gloss",
            "hamlet.txt",
            "Prologue",
            "--backend",
            "gemini",
        ])
        .unwrap();
        match cli.command {
            Commands::Gloss { backend, .. } => {
                assert_eq!(backend, Some("gemini".to_string()));
                assert!("gemini".parse::<BackendKind>().is_err());
            }
            _ => panic!("Expected Gloss command"),
        }
    }
}
