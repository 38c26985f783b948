//! Speech segmentation.
//!
//! A single forward pass over a located line range, splitting it into
//! speeches at registry-confirmed speaker headings. Blank lines inside a
//! speech are preserved for layout fidelity; bracketed stage directions
//! ride along in the speech text but never open or close one and never
//! count as dialogue.

use tracing::trace;

use super::locate::{is_marker_line, LineRange};
use super::registry::CharacterRegistry;

/// One character's speech: heading plus following lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speech {
    /// Canonical speaker name.
    pub speaker: String,
    /// Body lines, exactly as they appear in the source.
    pub lines: Vec<String>,
    /// Heading plus body joined with newlines.
    pub text: String,
    /// 0-indexed source line of the heading.
    pub line_start: usize,
    /// 0-indexed source line of the last body line.
    pub line_end: usize,
}

impl Speech {
    fn new(speaker: String, heading: &str, lines: Vec<String>, start: usize, end: usize) -> Self {
        let mut text = heading.to_string();
        for line in &lines {
            text.push('\n');
            text.push_str(line);
        }
        Speech {
            speaker,
            lines,
            text,
            line_start: start,
            line_end: end,
        }
    }

    /// Number of source lines this speech covers, heading included.
    pub fn line_count(&self) -> usize {
        self.lines.len() + 1
    }

    /// True iff at least one body line is spoken text rather than a blank
    /// or a stage direction.
    pub fn has_dialogue(&self) -> bool {
        self.lines
            .iter()
            .any(|l| !l.trim().is_empty() && !is_stage_direction(l))
    }
}

/// A line that is only a bracketed stage direction.
pub fn is_stage_direction(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

/// Test whether a line is a speaker heading for a registered character.
///
/// A heading is the name with a trailing period, or the bare name when the
/// line is entirely capitals and spaces. Structural markers and stage
/// directions are never headings.
fn speaker_of(line: &str, registry: &CharacterRegistry) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_stage_direction(trimmed) || is_marker_line(trimmed) {
        return None;
    }

    let candidate = match trimmed.strip_suffix('.') {
        Some(body) => body,
        None => {
            let all_caps = trimmed
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == ' ');
            if !all_caps {
                return None;
            }
            trimmed
        }
    };

    if registry.contains(candidate) {
        Some(super::registry::canonical(candidate))
    } else {
        None
    }
}

/// Segment a line range into speeches.
///
/// Speeches whose body is entirely blanks and stage directions are
/// dropped; they carry nothing to gloss.
pub fn segment(lines: &[String], range: LineRange, registry: &CharacterRegistry) -> Vec<Speech> {
    let mut speeches = Vec::new();

    let mut open: Option<(String, String, usize)> = None; // (speaker, heading, start)
    let mut buffer: Vec<String> = Vec::new();

    let mut close = |open: &mut Option<(String, String, usize)>,
                     buffer: &mut Vec<String>,
                     end: usize,
                     out: &mut Vec<Speech>| {
        if let Some((speaker, heading, start)) = open.take() {
            let body = std::mem::take(buffer);
            out.push(Speech::new(speaker, &heading, body, start, end));
        } else {
            buffer.clear();
        }
    };

    let last = range.end.min(lines.len().saturating_sub(1));
    for idx in range.start..=last {
        let line = &lines[idx];

        if let Some(speaker) = speaker_of(line, registry) {
            close(&mut open, &mut buffer, idx.saturating_sub(1), &mut speeches);
            open = Some((speaker, line.trim().to_string(), idx));
            continue;
        }

        if open.is_some() {
            // Blank lines and stage directions are preserved verbatim
            // inside an open speech.
            buffer.push(line.clone());
        }
    }

    close(&mut open, &mut buffer, last, &mut speeches);

    let before = speeches.len();
    speeches.retain(|s| s.has_dialogue());
    if speeches.len() < before {
        trace!(dropped = before - speeches.len(), "dropped dialogue-free speeches");
    }

    speeches
}
