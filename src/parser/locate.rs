//! Unit location: resolving an act/scene request to a line range.
//!
//! Marker-based location is a single forward scan that tracks the current
//! act and recognizes three line shapes: combined "ACT x SCENE y" (or the
//! folio "Actus Primus. Scoena Prima."), standalone act markers, and
//! standalone scene markers. The first line matching the target opens the
//! range; the next marker after it closes the range; otherwise it runs to
//! end of file.
//!
//! Minimally marked folio texts carry no scene markers at all, so scene
//! boundaries are inferred from stage traffic instead (see
//! [`infer_scene`]). Inferred results are tagged distinctly so callers can
//! surface the lower confidence.

use tracing::trace;

use super::numerals::{normalize, to_roman, NumberKind};
use super::ParseError;

/// Scene number that addresses a prologue.
pub const SCENE_PROLOGUE: i32 = 0;
/// Scene number that addresses the epilogue.
pub const SCENE_EPILOGUE: i32 = -1;

/// How many lines past an "Exeunt." to look for the next scene's "Enter".
const INFER_ENTER_WINDOW: usize = 5;

/// An addressable structural unit of a play.
///
/// `scene == 0` means a prologue (with `act == 0` the opening prologue);
/// `scene == -1` means the epilogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitRef {
    pub act: u32,
    pub scene: i32,
}

impl UnitRef {
    pub fn scene(act: u32, scene: u32) -> Self {
        Self {
            act,
            scene: scene as i32,
        }
    }

    pub fn prologue(act: u32) -> Self {
        Self {
            act,
            scene: SCENE_PROLOGUE,
        }
    }

    pub fn epilogue() -> Self {
        Self {
            act: 0,
            scene: SCENE_EPILOGUE,
        }
    }

    pub fn is_prologue(&self) -> bool {
        self.scene == SCENE_PROLOGUE
    }

    pub fn is_epilogue(&self) -> bool {
        self.scene == SCENE_EPILOGUE
    }

    /// Parse a free-form unit string.
    ///
    /// Accepts the forms users actually type: "Act IV, Scene VII",
    /// "act 4 scene 7", "Prologue", "Act 2 Prologue", "Epilogue".
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let cleaned = input.replace(',', " ");
        let tokens: Vec<String> = cleaned
            .split_whitespace()
            .map(|t| t.to_uppercase())
            .collect();

        // Tolerate a leading "The" as in "The Prologue".
        let tokens: &[String] = match tokens.first() {
            Some(t) if t == "THE" => &tokens[1..],
            _ => &tokens,
        };

        match tokens {
            [only] if only.starts_with("PROLOGUE") => Ok(UnitRef::prologue(0)),
            [only] if only.starts_with("EPILOGUE") => Ok(UnitRef::epilogue()),
            [act_kw, act_tok, rest @ ..] if act_kw == "ACT" => {
                let act = normalize(act_tok, NumberKind::Act)?;
                match rest {
                    [kw] if kw.starts_with("PROLOGUE") => Ok(UnitRef::prologue(act)),
                    [scene_kw, scene_tok] if scene_kw == "SCENE" => {
                        let scene = normalize(scene_tok, NumberKind::Scene)?;
                        Ok(UnitRef::scene(act, scene))
                    }
                    _ => Err(ParseError::UnknownUnit {
                        input: input.to_string(),
                    }),
                }
            }
            _ => Err(ParseError::UnknownUnit {
                input: input.to_string(),
            }),
        }
    }

    /// Deterministic output filename stem for this unit.
    pub fn file_stem(&self) -> String {
        if self.is_epilogue() {
            "epilogue".to_string()
        } else if self.is_prologue() {
            if self.act == 0 {
                "prologue".to_string()
            } else {
                format!("act{}_prologue", self.act)
            }
        } else {
            format!("act{}_scene{}", self.act, self.scene)
        }
    }

    /// Describe the unit in both numbering systems, for error messages.
    pub fn describe_both(&self) -> String {
        if self.is_epilogue() {
            "Epilogue".to_string()
        } else if self.is_prologue() {
            if self.act == 0 {
                "Prologue".to_string()
            } else {
                format!("Act {} ({}) Prologue", self.act, to_roman(self.act))
            }
        } else {
            format!(
                "Act {} ({}), Scene {} ({})",
                self.act,
                to_roman(self.act),
                self.scene,
                to_roman(self.scene as u32)
            )
        }
    }
}

impl std::fmt::Display for UnitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_epilogue() {
            write!(f, "Epilogue")
        } else if self.is_prologue() {
            if self.act == 0 {
                write!(f, "Prologue")
            } else {
                write!(f, "Act {} Prologue", to_roman(self.act))
            }
        } else {
            write!(
                f,
                "Act {}, Scene {}",
                to_roman(self.act),
                to_roman(self.scene as u32)
            )
        }
    }
}

/// An inclusive 0-indexed line range over the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of lines covered; at least 1, the range is inclusive.
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A located unit, tagged by how its boundaries were found.
///
/// `Inferred` ranges come from the Exeunt/Enter heuristic and may be
/// wrong; callers should tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneBounds {
    /// Boundaries came from explicit markers.
    Located(LineRange),
    /// Boundaries were inferred from stage traffic.
    Inferred(LineRange),
}

impl SceneBounds {
    pub fn range(&self) -> LineRange {
        match self {
            SceneBounds::Located(r) | SceneBounds::Inferred(r) => *r,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, SceneBounds::Inferred(_))
    }
}

/// One structural marker line, as recognized by the forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Act(u32),
    Scene(u32),
    Combined(u32, u32),
    Prologue,
    Epilogue,
}

/// Parse a line as a structural marker, if it is one.
pub(crate) fn parse_marker(line: &str) -> Option<Marker> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_uppercase();
    let stripped = upper.strip_prefix("THE ").unwrap_or(&upper);
    if stripped.starts_with("PROLOGUE") {
        return Some(Marker::Prologue);
    }
    if stripped.starts_with("EPILOGUE") {
        return Some(Marker::Epilogue);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let keyword = |t: &str| t.trim_matches(|c: char| !c.is_ascii_alphabetic()).to_uppercase();

    let is_act_kw = |t: &str| {
        let k = keyword(t);
        k == "ACT" || k == "ACTUS"
    };
    let is_scene_kw = |t: &str| {
        let k = keyword(t);
        k == "SCENE" || k == "SCENA" || k == "SCOENA"
    };

    // Combined "ACT x SCENE y" / "Actus Primus. Scoena Prima."
    if tokens.len() >= 4 && is_act_kw(tokens[0]) && is_scene_kw(tokens[2]) {
        let act = normalize(clean_token(tokens[1]), NumberKind::Act).ok()?;
        let scene = normalize(clean_token(tokens[3]), NumberKind::Scene).ok()?;
        return Some(Marker::Combined(act, scene));
    }

    if tokens.len() >= 2 && is_act_kw(tokens[0]) {
        if let Ok(act) = normalize(clean_token(tokens[1]), NumberKind::Act) {
            return Some(Marker::Act(act));
        }
    }

    if tokens.len() >= 2 && is_scene_kw(tokens[0]) {
        if let Ok(scene) = normalize(clean_token(tokens[1]), NumberKind::Scene) {
            return Some(Marker::Scene(scene));
        }
    }

    None
}

/// Strip the punctuation a marker token carries ("II.", "II:", "Prima.").
fn clean_token(token: &str) -> &str {
    token.trim_end_matches(['.', ':', ',', ';'])
}

/// True for any line that reads as a structural marker.
pub(crate) fn is_marker_line(line: &str) -> bool {
    parse_marker(line).is_some()
}

/// Resolve a unit to its line range using explicit markers.
pub fn locate(lines: &[String], unit: &UnitRef) -> Result<SceneBounds, ParseError> {
    if unit.is_epilogue() {
        return locate_epilogue(lines, unit);
    }
    if unit.is_prologue() {
        return locate_prologue(lines, unit);
    }

    let target_act = unit.act;
    let target_scene = unit.scene as u32;

    let mut current_act = 0u32;
    let mut start: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let Some(marker) = parse_marker(line) else {
            continue;
        };

        if start.is_some() {
            // Any subsequent marker closes the open range.
            match marker {
                Marker::Act(_) | Marker::Scene(_) | Marker::Combined(..) => {
                    let range = LineRange::new(start.unwrap_or(0), idx.saturating_sub(1));
                    trace!(?unit, start = range.start, end = range.end, "unit located");
                    return Ok(SceneBounds::Located(range));
                }
                Marker::Prologue | Marker::Epilogue => continue,
            }
        }

        match marker {
            Marker::Combined(act, scene) => {
                current_act = act;
                if act == target_act && scene == target_scene {
                    start = Some(idx);
                }
            }
            Marker::Act(act) => {
                current_act = act;
            }
            Marker::Scene(scene) => {
                if current_act == target_act && scene == target_scene {
                    start = Some(idx);
                }
            }
            Marker::Prologue | Marker::Epilogue => {}
        }
    }

    match start {
        Some(start) => Ok(SceneBounds::Located(LineRange::new(
            start,
            lines.len().saturating_sub(1),
        ))),
        None => Err(ParseError::unit_not_found(unit)),
    }
}

/// Prologue search with current-act tracking.
fn locate_prologue(lines: &[String], unit: &UnitRef) -> Result<SceneBounds, ParseError> {
    let mut current_act = 0u32;
    let mut start: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let Some(marker) = parse_marker(line) else {
            continue;
        };

        if start.is_some() {
            // A later prologue or scene marker closes the range.
            match marker {
                Marker::Prologue | Marker::Scene(_) | Marker::Combined(..) => {
                    return Ok(SceneBounds::Located(LineRange::new(
                        start.unwrap_or(0),
                        idx.saturating_sub(1),
                    )));
                }
                Marker::Act(_) | Marker::Epilogue => continue,
            }
        }

        match marker {
            Marker::Act(act) => current_act = act,
            Marker::Combined(act, _) => current_act = act,
            Marker::Prologue if current_act == unit.act => {
                start = Some(idx);
            }
            _ => {}
        }
    }

    match start {
        Some(start) => Ok(SceneBounds::Located(LineRange::new(
            start,
            lines.len().saturating_sub(1),
        ))),
        None => Err(ParseError::unit_not_found(unit)),
    }
}

/// Epilogue: first EPILOGUE marker to end of file.
fn locate_epilogue(lines: &[String], unit: &UnitRef) -> Result<SceneBounds, ParseError> {
    for (idx, line) in lines.iter().enumerate() {
        if matches!(parse_marker(line), Some(Marker::Epilogue)) {
            return Ok(SceneBounds::Located(LineRange::new(
                idx,
                lines.len().saturating_sub(1),
            )));
        }
    }
    Err(ParseError::unit_not_found(unit))
}

/// Infer scene boundaries for a minimally marked act from stage traffic.
///
/// The heuristic: the first "Enter" line starts scene 1; each "Exeunt." or
/// "Exeunt omnes." line followed within [`INFER_ENTER_WINDOW`] lines by
/// another "Enter" closes the scene and the matched "Enter" opens the
/// next; the final scene runs to the end of the act. This assumes every
/// full-cast exit is a scene boundary and every scene begins with an
/// explicit "Enter", which does not hold universally.
pub fn infer_scene(lines: &[String], unit: &UnitRef) -> Result<SceneBounds, ParseError> {
    if unit.is_prologue() || unit.is_epilogue() {
        return Err(ParseError::unit_not_found(unit));
    }

    let act_range = locate_act_span(lines, unit)?;
    let act_lines = &lines[act_range.start..=act_range.end];
    let scenes = infer_scene_ranges(act_lines);

    let index = unit.scene as usize;
    if index == 0 || index > scenes.len() {
        return Err(ParseError::unit_not_found(unit));
    }

    let local = scenes[index - 1];
    let range = LineRange::new(act_range.start + local.start, act_range.start + local.end);
    trace!(?unit, start = range.start, end = range.end, "scene inferred");
    Ok(SceneBounds::Inferred(range))
}

/// Line range of one act: its act marker to the line before the next act
/// marker, or end of file.
fn locate_act_span(lines: &[String], unit: &UnitRef) -> Result<LineRange, ParseError> {
    let mut start: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let act = match parse_marker(line) {
            Some(Marker::Act(act)) | Some(Marker::Combined(act, _)) => act,
            _ => continue,
        };

        if let Some(start) = start {
            return Ok(LineRange::new(start, idx - 1));
        }
        if act == unit.act {
            start = Some(idx);
        }
    }

    match start {
        Some(start) => Ok(LineRange::new(start, lines.len().saturating_sub(1))),
        None => Err(ParseError::unit_not_found(unit)),
    }
}

/// Split a line slice into inferred scene ranges (local indices).
pub(crate) fn infer_scene_ranges(lines: &[String]) -> Vec<LineRange> {
    let is_enter = |line: &String| line.trim_start().starts_with("Enter");
    let is_exeunt = |line: &String| {
        let t = line.trim();
        t == "Exeunt" || t == "Exeunt." || t.starts_with("Exeunt omnes")
    };

    let Some(first_enter) = lines.iter().position(is_enter) else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut scene_start = first_enter;
    let mut idx = first_enter;

    while idx < lines.len() {
        if is_exeunt(&lines[idx]) {
            let window_end = (idx + 1 + INFER_ENTER_WINDOW).min(lines.len());
            if let Some(offset) = lines[idx + 1..window_end].iter().position(is_enter) {
                ranges.push(LineRange::new(scene_start, idx));
                scene_start = idx + 1 + offset;
                idx = scene_start;
                continue;
            }
        }
        idx += 1;
    }

    ranges.push(LineRange::new(scene_start, lines.len().saturating_sub(1)));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    // ============================================
    // UnitRef Parsing Tests
    // ============================================

    #[test]
    fn parse_act_scene_with_comma() {
        let unit = UnitRef::parse("Act IV, Scene VII").unwrap();
        assert_eq!(unit, UnitRef::scene(4, 7));
    }

    #[test]
    fn parse_act_scene_arabic() {
        let unit = UnitRef::parse("act 3 scene 2").unwrap();
        assert_eq!(unit, UnitRef::scene(3, 2));
    }

    #[test]
    fn parse_prologue() {
        assert_eq!(UnitRef::parse("Prologue").unwrap(), UnitRef::prologue(0));
        assert_eq!(
            UnitRef::parse("The Prologue").unwrap(),
            UnitRef::prologue(0)
        );
    }

    #[test]
    fn parse_act_prologue() {
        assert_eq!(
            UnitRef::parse("Act 2 Prologue").unwrap(),
            UnitRef::prologue(2)
        );
    }

    #[test]
    fn parse_epilogue() {
        assert_eq!(UnitRef::parse("Epilogue").unwrap(), UnitRef::epilogue());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(UnitRef::parse("Interlude 3").is_err());
        assert!(UnitRef::parse("Act").is_err());
        assert!(UnitRef::parse("").is_err());
    }

    #[test]
    fn file_stems() {
        assert_eq!(UnitRef::scene(3, 2).file_stem(), "act3_scene2");
        assert_eq!(UnitRef::prologue(0).file_stem(), "prologue");
        assert_eq!(UnitRef::prologue(2).file_stem(), "act2_prologue");
        assert_eq!(UnitRef::epilogue().file_stem(), "epilogue");
    }

    #[test]
    fn describe_both_reports_both_numberings() {
        let msg = UnitRef::scene(4, 7).describe_both();
        assert!(msg.contains("Act 4 (IV)"));
        assert!(msg.contains("Scene 7 (VII)"));
    }

    // ============================================
    // Marker Parsing Tests
    // ============================================

    #[test]
    fn parse_marker_modern_forms() {
        assert_eq!(parse_marker("ACT III"), Some(Marker::Act(3)));
        assert_eq!(
            parse_marker("SCENE II. A hall in the castle."),
            Some(Marker::Scene(2))
        );
        assert_eq!(
            parse_marker("ACT I SCENE 1"),
            Some(Marker::Combined(1, 1))
        );
    }

    #[test]
    fn parse_marker_folio_forms() {
        assert_eq!(parse_marker("Actus Secundus."), Some(Marker::Act(2)));
        assert_eq!(parse_marker("Scena Tertia."), Some(Marker::Scene(3)));
        assert_eq!(
            parse_marker("Actus Primus. Scoena Prima."),
            Some(Marker::Combined(1, 1))
        );
    }

    #[test]
    fn parse_marker_prologue_epilogue() {
        assert_eq!(parse_marker("PROLOGUE"), Some(Marker::Prologue));
        assert_eq!(parse_marker("THE PROLOGUE."), Some(Marker::Prologue));
        assert_eq!(parse_marker("EPILOGUE"), Some(Marker::Epilogue));
    }

    #[test]
    fn parse_marker_rejects_dialogue() {
        assert_eq!(parse_marker("To be, or not to be."), None);
        assert_eq!(parse_marker("ACTION speaks."), None);
        assert_eq!(parse_marker(""), None);
    }

    // ============================================
    // Location Tests
    // ============================================

    const PLAY: &[&str] = &[
        "PROLOGUE",             // 0
        "Two households.",      // 1
        "ACT I",                // 2
        "SCENE I. A street.",   // 3
        "SAMPSON.",             // 4
        "Gregory, on my word.", // 5
        "SCENE II. A hall.",    // 6
        "CAPULET.",             // 7
        "But Montague is bound.", // 8
        "ACT II",               // 9
        "PROLOGUE",             // 10
        "Now old desire.",      // 11
        "SCENE I. A lane.",     // 12
        "ROMEO.",               // 13
        "Can I go forward?",    // 14
        "EPILOGUE",             // 15
        "A glooming peace.",    // 16
    ];

    #[test]
    fn locate_scene_closed_by_next_marker() {
        let text = lines(PLAY);
        let bounds = locate(&text, &UnitRef::scene(1, 1)).unwrap();
        assert_eq!(bounds, SceneBounds::Located(LineRange::new(3, 5)));
    }

    #[test]
    fn locate_scene_tracks_current_act() {
        let text = lines(PLAY);
        // Act II Scene 1 must not match Act I Scene 1.
        let bounds = locate(&text, &UnitRef::scene(2, 1)).unwrap();
        assert_eq!(bounds.range().start, 12);
    }

    #[test]
    fn locate_range_first_line_contains_heading() {
        let text = lines(PLAY);
        let bounds = locate(&text, &UnitRef::scene(1, 2)).unwrap();
        assert!(text[bounds.range().start].contains("SCENE II"));
    }

    #[test]
    fn locate_last_scene_extends_to_eof_marker() {
        let text = lines(&["ACT I", "SCENE I.", "A line.", "Another line."]);
        let bounds = locate(&text, &UnitRef::scene(1, 1)).unwrap();
        assert_eq!(bounds.range().end, 3);
    }

    #[test]
    fn locate_missing_scene_reports_both_numberings() {
        let text = lines(PLAY);
        let err = locate(&text, &UnitRef::scene(3, 9)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Act 3 (III)"));
        assert!(msg.contains("Scene 9 (IX)"));
    }

    #[test]
    fn locate_opening_prologue() {
        let text = lines(PLAY);
        let bounds = locate(&text, &UnitRef::prologue(0)).unwrap();
        // Closed by SCENE I at line 3 (the ACT marker does not close it).
        assert_eq!(bounds, SceneBounds::Located(LineRange::new(0, 2)));
    }

    #[test]
    fn locate_act_prologue() {
        let text = lines(PLAY);
        let bounds = locate(&text, &UnitRef::prologue(2)).unwrap();
        assert_eq!(bounds, SceneBounds::Located(LineRange::new(10, 11)));
    }

    #[test]
    fn locate_prologue_missing() {
        let text = lines(&["ACT I", "SCENE I.", "Dialogue."]);
        assert!(locate(&text, &UnitRef::prologue(0)).is_err());
    }

    #[test]
    fn locate_epilogue_runs_to_eof() {
        let text = lines(PLAY);
        let bounds = locate(&text, &UnitRef::epilogue()).unwrap();
        assert_eq!(bounds, SceneBounds::Located(LineRange::new(15, 16)));
    }

    #[test]
    fn locate_epilogue_missing() {
        let text = lines(&["ACT I", "SCENE I.", "Dialogue."]);
        assert!(locate(&text, &UnitRef::epilogue()).is_err());
    }

    // ============================================
    // Inference Tests
    // ============================================

    const FOLIO_ACT: &[&str] = &[
        "Actus Primus.",                  // 0
        "Enter Barnardo and Francisco.",  // 1
        "BARNARDO.",                      // 2
        "Who's there?",                   // 3
        "Exeunt.",                        // 4
        "",                               // 5
        "Enter Claudius and Gertrude.",   // 6
        "CLAUDIUS.",                      // 7
        "Though yet of Hamlet.",          // 8
        "Exeunt omnes.",                  // 9
        "Actus Secundus.",                // 10
        "Enter Polonius.",                // 11
    ];

    #[test]
    fn infer_splits_on_exeunt_then_enter() {
        let text = lines(FOLIO_ACT);
        let first = infer_scene(&text, &UnitRef::scene(1, 1)).unwrap();
        assert!(first.is_inferred());
        assert_eq!(first.range(), LineRange::new(1, 4));

        let second = infer_scene(&text, &UnitRef::scene(1, 2)).unwrap();
        assert_eq!(second.range(), LineRange::new(6, 9));
    }

    #[test]
    fn infer_final_scene_runs_to_act_end() {
        let text = lines(FOLIO_ACT);
        let second = infer_scene(&text, &UnitRef::scene(1, 2)).unwrap();
        // Closed by the trailing "Exeunt omnes." with no following Enter
        // inside the act, so the scene runs to the act boundary.
        assert_eq!(second.range().end, 9);
    }

    #[test]
    fn infer_exeunt_without_following_enter_does_not_split() {
        let text = lines(&[
            "Actus Primus.",
            "Enter a Ghost.",
            "Exeunt.",
            "More lines follow here,",
            "none of them entrances,",
            "for quite a while longer,",
            "and still no entrance,",
            "truly none,",
            "the scene just continues.",
        ]);
        let bounds = infer_scene(&text, &UnitRef::scene(1, 1)).unwrap();
        assert_eq!(bounds.range(), LineRange::new(1, 8));
        assert!(infer_scene(&text, &UnitRef::scene(1, 2)).is_err());
    }

    #[test]
    fn infer_missing_act_errors() {
        let text = lines(FOLIO_ACT);
        assert!(infer_scene(&text, &UnitRef::scene(3, 1)).is_err());
    }
}
