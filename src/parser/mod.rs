//! Structural parsing of play scripts.
//!
//! Turns a raw text file into addressable units (acts, scenes, prologues,
//! epilogues) and speeches. The pipeline is strictly layered: numeral
//! normalization feeds format detection, which feeds the character
//! registry, which feeds unit location and speech segmentation.
//!
//! # Module Structure
//!
//! - [`numerals`] - Arabic/Roman/ordinal-word identifier normalization
//! - [`format`] - markup-convention classification
//! - [`registry`] - speaker-name registry and detector strategies
//! - [`locate`] - unit location, marker-based and inferred
//! - [`segment`] - speaker/speech segmentation
//! - [`outline`] - whole-play unit enumeration

pub mod format;
pub mod locate;
pub mod numerals;
pub mod outline;
pub mod registry;
pub mod segment;

pub use format::{detect, PlayFormat};
pub use locate::{LineRange, SceneBounds, UnitRef};
pub use numerals::{normalize, to_roman, NumberKind};
pub use registry::{CharacterRegistry, SpeakerDetector};
pub use segment::Speech;

use thiserror::Error;

/// Errors from structural parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A token matched none of the known numbering conventions.
    #[error("unrecognized {kind} numeral: '{token}'")]
    UnknownNumeral { token: String, kind: NumberKind },

    /// A free-form unit string could not be understood.
    #[error("cannot parse unit '{input}' (expected e.g. \"Act IV, Scene VII\", \"Prologue\", \"Act 2 Prologue\", \"Epilogue\")")]
    UnknownUnit { input: String },

    /// The requested unit does not exist in the source text.
    #[error("{0} not found in source")]
    UnitNotFound(String),
}

impl ParseError {
    /// Build a not-found error reporting the unit in both numbering systems.
    pub(crate) fn unit_not_found(unit: &UnitRef) -> Self {
        ParseError::UnitNotFound(unit.describe_both())
    }
}
