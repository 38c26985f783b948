//! Prompt building and response cleanup for gloss generation.
//!
//! Template rendering lives here so the service only deals in finished
//! prompt strings and finished gloss bodies.

use super::chunk::SpeechChunk;

/// Maximum characters of passage text in one prompt (safety net).
/// Chunk assembly keeps passages far below this; truncation only
/// triggers if a single monologue is pathologically large.
const MAX_PASSAGE_CHARS: usize = 100_000;

/// Build the gloss prompt for a chunk.
///
/// Uses the template from `src/gloss/prompts/gloss.txt`. If the passage
/// exceeds the character limit it is truncated with a warning logged.
pub fn build_gloss_prompt(chunk: &SpeechChunk, play_title: &str, unit_label: &str) -> String {
    // Include the template at compile time
    const TEMPLATE: &str = include_str!("prompts/gloss.txt");

    let passage = truncate_passage_if_needed(&chunk.text);
    let speakers: Vec<&str> = {
        let mut seen = Vec::new();
        for speech in &chunk.speeches {
            if !seen.contains(&speech.speaker.as_str()) {
                seen.push(speech.speaker.as_str());
            }
        }
        seen
    };

    TEMPLATE
        .replace("{play_title}", play_title)
        .replace("{unit_label}", unit_label)
        .replace("{speakers}", &speakers.join(", "))
        .replace("{passage}", &passage)
}

/// Truncate the passage if it exceeds the prompt character limit.
fn truncate_passage_if_needed(passage: &str) -> String {
    if passage.len() <= MAX_PASSAGE_CHARS {
        return passage.to_string();
    }

    eprintln!(
        "Warning: Passage size ({} chars) exceeds limit ({}). Truncating.",
        passage.len(),
        MAX_PASSAGE_CHARS
    );

    let truncated: String = passage.chars().take(MAX_PASSAGE_CHARS).collect();
    format!("{}\n\n[Passage truncated due to size limits]", truncated)
}

/// Clean a generated gloss for storage.
///
/// Agents frequently close their answer with a horizontal rule; stored
/// glosses carry their own separators, so trailing rules are stripped
/// along with surrounding whitespace.
pub fn clean_gloss(raw: &str) -> String {
    let mut text = raw.trim();
    loop {
        let trimmed = text.trim_end();
        if let Some(stripped) = trimmed.strip_suffix("---") {
            text = stripped.trim_end();
        } else {
            text = trimmed;
            break;
        }
    }
    text.to_string()
}

/// Ensure a monologue gloss opens with its speaker heading, exactly once.
///
/// Agents usually emit the bold speaker heading the prompt asks for, but
/// not always; readers of a cached single-speech gloss need to know who
/// is speaking without the surrounding document.
pub fn ensure_speaker_heading(gloss: &str, speaker: &str) -> String {
    let first_line = gloss.lines().next().unwrap_or("");
    if first_line.to_uppercase().contains(&speaker.to_uppercase()) {
        gloss.to_string()
    } else {
        format!("**{}**\n\n{}", speaker, gloss)
    }
}
