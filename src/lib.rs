//! Playgloss Library
//!
//! A Rust library for parsing play scripts and generating cached,
//! line-by-line AI glosses through agent CLIs.

pub mod cli;
pub mod config;
pub mod gloss;
pub mod parser;
pub mod store;

pub use config::Config;
pub use gloss::{BackendKind, GlossOptions, GlossReport, GlossService};
pub use parser::{CharacterRegistry, PlayFormat, Speech, UnitRef};
pub use store::{GlossStore, SqliteStore};
