//! Markdown document assembly.
//!
//! Renders the glossed chunks of one unit into a single document, in
//! source order, with the original text alongside each gloss.

use chrono::Local;

use super::chunk::SpeechChunk;
use crate::parser::UnitRef;

/// A chunk paired with its generated or cached gloss.
#[derive(Debug, Clone)]
pub struct GlossedChunk {
    pub chunk: SpeechChunk,
    pub gloss: String,
    /// True when the gloss came from the cache rather than the backend.
    pub from_cache: bool,
}

/// Deterministic output filename for a unit's gloss document.
///
/// "act3_scene2_line-by-line.md", "prologue_line-by-line.md", etc.
pub fn output_filename(unit: &UnitRef) -> String {
    format!("{}_line-by-line.md", unit.file_stem())
}

/// Render the full gloss document for a unit.
///
/// Chunks appear in source order, each under an anchor so external
/// notes can deep-link individual passages.
pub fn render(
    play_title: &str,
    unit: &UnitRef,
    source_name: &str,
    entries: &[GlossedChunk],
) -> String {
    let mut doc = String::new();

    doc.push_str(&format!("# {}: {}\n\n", play_title, unit.describe_both()));
    doc.push_str("Line-by-line gloss of the original text.\n");

    for (i, entry) in entries.iter().enumerate() {
        let n = i + 1;
        doc.push_str("\n---\n\n");
        doc.push_str(&format!("<a name=\"speech-{}\"></a>\n\n", n));
        doc.push_str(&format!(
            "## Passage {}: {}\n\n",
            n,
            entry.chunk.speaker_summary()
        ));
        doc.push_str("### Original Text\n\n");
        doc.push_str("```text\n");
        doc.push_str(&entry.chunk.text);
        doc.push_str("\n```\n\n");
        doc.push_str("### Line-by-Line Analysis\n\n");
        doc.push_str(entry.gloss.trim_end());
        doc.push('\n');
    }

    doc.push_str("\n---\n\n");
    doc.push_str(&format!(
        "_Generated {} from `{}`._\n",
        Local::now().format("%Y-%m-%d %H:%M"),
        source_name
    ));

    doc
}
