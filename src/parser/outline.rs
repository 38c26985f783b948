//! Whole-play unit enumeration.
//!
//! Walks the marker structure once and reports every addressable unit with
//! its line range and dialogue-line count. Backs the `scenes` command and
//! lets a user size a glossing batch before paying for it.

use super::locate::{parse_marker, LineRange, Marker, UnitRef};
use super::registry::CharacterRegistry;
use super::segment::is_stage_direction;

/// One unit as seen by the outline walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub unit: UnitRef,
    pub range: LineRange,
    /// All lines in the range, marker line included.
    pub total_lines: usize,
    /// Lines that are spoken text: not blank, not a marker, not a stage
    /// direction, not a registered speaker heading.
    pub dialogue_lines: usize,
}

/// Enumerate every marked unit in the text, in source order.
pub fn outline(lines: &[String], registry: &CharacterRegistry) -> Vec<SceneSummary> {
    let mut starts: Vec<(usize, UnitRef)> = Vec::new();
    let mut marker_lines: Vec<usize> = Vec::new();
    let mut current_act = 0u32;

    for (idx, line) in lines.iter().enumerate() {
        let Some(marker) = parse_marker(line) else {
            continue;
        };
        marker_lines.push(idx);
        match marker {
            Marker::Prologue => starts.push((idx, UnitRef::prologue(current_act))),
            Marker::Epilogue => starts.push((idx, UnitRef::epilogue())),
            Marker::Combined(act, scene) => {
                current_act = act;
                starts.push((idx, UnitRef::scene(act, scene)));
            }
            Marker::Scene(scene) => starts.push((idx, UnitRef::scene(current_act, scene))),
            Marker::Act(act) => {
                current_act = act;
            }
        }
    }

    let mut summaries = Vec::with_capacity(starts.len());
    for (start, unit) in &starts {
        // A unit ends just before the next marker of any kind, or at EOF.
        let end = match marker_lines.iter().find(|&&idx| idx > *start) {
            Some(next) => next.saturating_sub(1),
            None => lines.len().saturating_sub(1),
        };
        let range = LineRange::new(*start, end);
        summaries.push(SceneSummary {
            unit: *unit,
            range,
            total_lines: range.line_count(),
            dialogue_lines: count_dialogue(lines, range, registry),
        });
    }

    summaries
}

/// The marked unit with the fewest dialogue lines.
pub fn shortest<'a>(summaries: &'a [SceneSummary]) -> Option<&'a SceneSummary> {
    summaries.iter().min_by_key(|s| s.dialogue_lines)
}

fn count_dialogue(lines: &[String], range: LineRange, registry: &CharacterRegistry) -> usize {
    lines[range.start..=range.end.min(lines.len().saturating_sub(1))]
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !is_stage_direction(trimmed)
                && parse_marker(trimmed).is_none()
                && !is_heading(trimmed, registry)
        })
        .count()
}

fn is_heading(trimmed: &str, registry: &CharacterRegistry) -> bool {
    let candidate = trimmed.strip_suffix('.').unwrap_or(trimmed);
    registry.contains(candidate)
}
