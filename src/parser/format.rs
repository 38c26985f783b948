//! Play markup classification.
//!
//! Editions mark their divisions differently: modern texts use English
//! "ACT I" / "SCENE II" headings, First Folio transcriptions use Latin
//! "Actus Primus" / "Scena Secunda", and some folio texts mark only the
//! acts (or nothing at all) and leave scene boundaries implicit.

/// How a text marks its structural divisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayFormat {
    /// English "ACT"/"SCENE" markers throughout.
    Modern,
    /// Latin markers for both acts and scenes.
    FolioFull,
    /// Latin act markers only; scene boundaries must be inferred.
    FolioMinimal,
    /// No recognizable markers.
    Unmarked,
}

impl std::fmt::Display for PlayFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayFormat::Modern => write!(f, "modern"),
            PlayFormat::FolioFull => write!(f, "folio (fully marked)"),
            PlayFormat::FolioMinimal => write!(f, "folio (minimally marked)"),
            PlayFormat::Unmarked => write!(f, "unmarked"),
        }
    }
}

/// Latin marker count at or above which a folio text counts as fully marked.
///
/// A fully marked five-act folio play carries at least five "Actus"/"Scena"
/// headings; fewer than that means scene markers are missing and boundaries
/// will need inference. This is a tie-break heuristic, not an exact
/// classification.
pub const FOLIO_FULL_THRESHOLD: usize = 5;

/// Classify a text by counting structural markers.
pub fn detect(lines: &[String]) -> PlayFormat {
    let mut latin = 0usize;
    let mut english = 0usize;

    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.starts_with("Actus")
            || trimmed.starts_with("Scena")
            || trimmed.starts_with("Scoena")
        {
            latin += 1;
        }
        if trimmed.starts_with("ACT ") || trimmed.starts_with("SCENE ") {
            english += 1;
        }
    }

    if latin >= FOLIO_FULL_THRESHOLD {
        PlayFormat::FolioFull
    } else if latin >= 1 {
        PlayFormat::FolioMinimal
    } else if english >= 1 {
        PlayFormat::Modern
    } else {
        PlayFormat::Unmarked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detect_modern_markers() {
        let text = lines(&["ACT I", "SCENE I. A street.", "Some dialogue."]);
        assert_eq!(detect(&text), PlayFormat::Modern);
    }

    #[test]
    fn detect_folio_full_at_threshold() {
        let text = lines(&[
            "Actus Primus. Scoena Prima.",
            "Scena Secunda.",
            "Actus Secundus.",
            "Scena Prima.",
            "Scena Secunda.",
        ]);
        assert_eq!(detect(&text), PlayFormat::FolioFull);
    }

    #[test]
    fn detect_folio_minimal_below_threshold() {
        let text = lines(&["Actus Primus.", "Enter two Gentlemen.", "Exeunt."]);
        assert_eq!(detect(&text), PlayFormat::FolioMinimal);
    }

    #[test]
    fn detect_unmarked() {
        let text = lines(&["Enter a Messenger.", "My lord, the news."]);
        assert_eq!(detect(&text), PlayFormat::Unmarked);
    }

    #[test]
    fn latin_markers_take_precedence_over_english() {
        // A folio transcription with a modern editorial ACT heading mixed in
        // still classifies by its Latin markers.
        let text = lines(&["ACT I", "Actus Primus. Scoena Prima."]);
        assert_eq!(detect(&text), PlayFormat::FolioMinimal);
    }

    #[test]
    fn act_requires_trailing_space() {
        // "ACTION" at line start is dialogue, not a marker.
        let text = lines(&["ACTION is eloquence."]);
        assert_eq!(detect(&text), PlayFormat::Unmarked);
    }
}
