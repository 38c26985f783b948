//! CLI definitions for playgloss
//!
//! This module contains the clap CLI structure definitions, separated from main.rs
//! so they can be accessed by xtask for documentation generation (man pages, markdown, wiki).

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

/// Build clap styles using our theme colors.
///
/// Maps theme colors to clap's styling system for consistent CLI appearance.
/// - Green: headers, usage, command names (accent color)
/// - White: descriptions, placeholders (renders as light gray on dark terminals)
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default()) // Light gray for descriptions
        .valid(AnsiColor::White.on_default()) // Light gray for valid values
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "playgloss", styles = build_cli_styles())]
#[command(about = "[ Play Gloss ] - locate scenes in play scripts and gloss them line by line with AI!")]
#[command(
    long_about = "Play Gloss - line-by-line AI glosses for play scripts.

playgloss parses a plain-text play (modern or First Folio markup), locates
the act/scene/prologue/epilogue you ask for, splits it into speeches, and
sends them to an AI agent CLI (Claude, Codex) for a line-by-line gloss.
Generated glosses are cached in SQLite by content hash, so reruns and
overlapping requests never pay for the same passage twice.

QUICK START:
    playgloss gloss hamlet.txt \"Act 3, Scene 1\"    Gloss a scene
    playgloss scenes hamlet.txt                     List the play's units
    playgloss cast hamlet.txt                       Show detected characters
    playgloss status                                Show cache statistics

For more information, see the project README."
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Gloss one unit of a play
    #[command(long_about = "Gloss one unit of a play, line by line.

The unit is a free-form string: \"Act IV, Scene VII\", \"act 4 scene 7\",
\"Prologue\", \"Act 2 Prologue\", or \"Epilogue\". Roman and Arabic numerals
are interchangeable. The rendered markdown document is written to the
output directory with a deterministic name (act4_scene7_line-by-line.md).

Cached passages are reused; only uncached chunks call the backend. An
interrupted run keeps everything generated so far and resumes on rerun.

EXAMPLES:
    playgloss gloss hamlet.txt \"Act 3, Scene 1\"
    playgloss gloss hamlet.txt Prologue --merge 0
    playgloss gloss folio.txt \"Act 1, Scene 2\" --backend codex
    playgloss gloss hamlet.txt \"Act 3, Scene 1\" --dry-run")]
    Gloss {
        /// Path to the play text file
        #[arg(help = "Path to the play text file")]
        file: String,
        /// Unit to gloss (e.g., "Act 3, Scene 1", "Prologue")
        #[arg(help = "Unit to gloss (e.g., \"Act 3, Scene 1\", \"Prologue\")")]
        unit: String,
        /// Override the configured backend
        #[arg(long, short, help = "Backend to use (claude, codex)")]
        backend: Option<String>,
        /// Override the merge threshold (0 disables merging)
        #[arg(long, help = "Merge threshold in lines (0 = one chunk per speech)")]
        merge: Option<i64>,
        /// Override the play title used in prompts
        #[arg(long, help = "Play title (default: derived from filename)")]
        title: Option<String>,
        /// Timeout per chunk in seconds
        #[arg(long, help = "Timeout per chunk in seconds")]
        timeout: Option<u64>,
        /// Retries per chunk after the first attempt
        #[arg(long, help = "Retries per chunk after the first attempt")]
        retries: Option<u32>,
        /// Directory for the rendered document
        #[arg(long, help = "Output directory (overrides config)")]
        output_dir: Option<String>,
        /// Cache database path
        #[arg(long, help = "Cache database path (overrides config)")]
        db: Option<String>,
        /// Plan the run without calling the backend
        #[arg(long, help = "Show the chunk plan and cache state, then exit")]
        dry_run: bool,
        /// Suppress progress output
        #[arg(long, short, help = "Suppress progress output")]
        quiet: bool,
    },

    /// List a play's units with line counts
    #[command(
        visible_alias = "ls",
        long_about = "List every marked unit of a play in source order.

Shows act/scene numbers in both numberings, the line range, and the
dialogue line count, so you can size a glossing batch before paying
for it. --shortest prints only the unit with the least dialogue.

EXAMPLES:
    playgloss scenes hamlet.txt
    playgloss scenes hamlet.txt --shortest"
    )]
    Scenes {
        /// Path to the play text file
        #[arg(help = "Path to the play text file")]
        file: String,
        /// Only print the unit with the least dialogue
        #[arg(long, help = "Only print the unit with the least dialogue")]
        shortest: bool,
    },

    /// Show the detected character registry
    #[command(long_about = "Show the characters detected in a play.

Combines the cast list (DRAMATIS PERSONAE and similar headings) with
speaker headings found in the body text and a set of generic stage
roles. The registry is deliberately over-inclusive: an extra name is
harmless, a missed one silently merges two speeches.

EXAMPLE:
    playgloss cast hamlet.txt")]
    Cast {
        /// Path to the play text file
        #[arg(help = "Path to the play text file")]
        file: String,
    },

    /// Show cache statistics
    #[command(long_about = "Display cached passage and gloss counts grouped by play.

EXAMPLE:
    playgloss status

OUTPUT:
    Hamlet: 12 passages, 12 glosses
    Othello: 3 passages, 3 glosses")]
    Status {
        /// Cache database path
        #[arg(long, help = "Cache database path (overrides config)")]
        db: Option<String>,
    },

    /// Search cached glosses
    #[command(long_about = "Search the content of all cached glosses.

Matching is a case-insensitive substring match; each hit shows the
play, unit, speakers, and a snippet around the match.

EXAMPLE:
    playgloss search \"mortal coil\"")]
    Search {
        /// Text to search for
        #[arg(help = "Text to search for in gloss content")]
        term: String,
        /// Cache database path
        #[arg(long, help = "Cache database path (overrides config)")]
        db: Option<String>,
    },

    /// Manage notes attached to cached glosses
    #[command(
        subcommand,
        long_about = "Attach and list free-form notes on cached glosses.

Notes are stored alongside the gloss and survive regeneration of the
document. The gloss id is printed by 'playgloss search'.

EXAMPLES:
    playgloss note add 12 \"Check the Arden footnote on this pun\"
    playgloss note list 12"
    )]
    Note(NoteCommands),

    /// Configuration management
    #[command(
        subcommand,
        long_about = "View and edit the playgloss configuration file.

Configuration is stored in ~/.config/playgloss/config.toml and includes
the default backend, merge threshold, retry schedule, cache database
path, and output directory.

EXAMPLES:
    playgloss config show          Display current configuration
    playgloss config edit          Open config in $EDITOR"
    )]
    Config(ConfigCommands),

    /// Generate shell completions (internal use)
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Option<CompletionShell>,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Attach a note to a cached gloss
    #[command(long_about = "Attach a free-form note to a cached gloss.

EXAMPLE:
    playgloss note add 12 \"Compare Q2 reading here\"")]
    Add {
        /// Gloss id (from 'playgloss search')
        #[arg(help = "Gloss id")]
        gloss_id: i64,
        /// Note text
        #[arg(help = "Note text")]
        note: String,
    },
    /// List notes attached to a cached gloss
    #[command(long_about = "List all notes attached to a cached gloss, oldest first.

EXAMPLE:
    playgloss note list 12")]
    List {
        /// Gloss id (from 'playgloss search')
        #[arg(help = "Gloss id")]
        gloss_id: i64,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration as TOML
    #[command(long_about = "Display the current configuration in TOML format.

Shows all settings including the default backend, merge threshold,
retry schedule, and paths.

EXAMPLE:
    playgloss config show")]
    Show,
    /// Open configuration file in your default editor
    #[command(long_about = "Open the configuration file in your default editor.

Uses the $EDITOR environment variable (defaults to 'vi').
Config file location: ~/.config/playgloss/config.toml

EXAMPLE:
    playgloss config edit
    EDITOR=nano playgloss config edit")]
    Edit,
}
