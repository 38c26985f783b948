//! Character name registry.
//!
//! Speech segmentation needs to tell speaker headings apart from verse
//! lines that merely look like them ("HAMLET." opens a speech; "O, WOE."
//! does not, unless someone in the play is called O Woe). The registry is
//! the set of names segmentation will accept, built from a cast list when
//! the text has one plus a heuristic full-text scan.
//!
//! # Design
//!
//! Speaker detection is a classification problem with no single correct
//! algorithm, so the full-text scan runs an ordered list of
//! [`SpeakerDetector`] strategies and takes the first confident match per
//! line. New heuristics slot in without touching segmentation.
//!
//! The registry is deliberately over-inclusive: a missed speaker corrupts
//! segmentation silently, while an extra entry is inert unless the exact
//! name appears alone on a line.

use std::collections::HashSet;

use tracing::trace;

/// Cast-list section headers recognized across editions.
const CAST_HEADERS: [&str; 4] = [
    "DRAMATIS PERSONAE",
    "PERSONS REPRESENTED",
    "PERSONS OF THE PLAY",
    "CHARACTERS",
];

/// Words that end the name portion of a cast-list entry.
const DESCRIPTION_WORDS: [&str; 18] = [
    "a", "an", "the", "of", "to", "his", "her", "their", "son", "daughter", "wife", "brother",
    "sister", "friend", "friends", "servant", "attendant", "in",
];

/// Title words that are part of a name even though they also read as
/// descriptions ("LORD POLONIUS"), and that register standalone when they
/// follow a comma ("ORSINO, Duke of Illyria" also speaks as "DUKE").
const TITLE_PREFIXES: [&str; 10] = [
    "LORD", "LADY", "DUKE", "KING", "QUEEN", "PRINCE", "PRINCESS", "SIR", "COUNT", "CAPTAIN",
];

/// Stage-traffic words that read like names but never speak. Folio texts
/// print these unbracketed ("Exeunt.", "Flourish."), so the heading
/// detectors would otherwise register them.
const STAGE_WORDS: [&str; 10] = [
    "ENTER", "EXIT", "EXEUNT", "FLOURISH", "ALARUM", "ALARUMS", "SENNET", "MUSIC", "MUSICKE",
    "EXEUNT OMNES",
];

/// Role names that speak in nearly every play without appearing in a cast
/// list. Added unconditionally as the final build step.
const GENERIC_ROLES: [&str; 22] = [
    "ALL",
    "BOTH",
    "SERVANT",
    "MESSENGER",
    "GENTLEMAN",
    "GENTLEWOMAN",
    "OFFICER",
    "SOLDIER",
    "SAILOR",
    "PRIEST",
    "CLOWN",
    "FOOL",
    "BOY",
    "PAGE",
    "FIRST OFFICER",
    "SECOND OFFICER",
    "FIRST GENTLEMAN",
    "SECOND GENTLEMAN",
    "FIRST LORD",
    "SECOND LORD",
    "FIRST SERVANT",
    "SECOND SERVANT",
];

/// Fold a name to registry form: upper case, single spaces.
pub fn canonical(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A single speaker-heading heuristic.
///
/// `line` is the trimmed candidate line; `next` is the following non-blank
/// line, when one exists, for detectors that need lookahead. Returns the
/// canonical name on a confident match.
pub trait SpeakerDetector {
    /// Short name for trace logging.
    fn name(&self) -> &'static str;

    fn detect(&self, line: &str, next: Option<&str>) -> Option<String>;
}

/// Matches "HAMLET." / "FIRST OFFICER." - all caps with a trailing period.
pub struct AllCapsPeriod;

impl SpeakerDetector for AllCapsPeriod {
    fn name(&self) -> &'static str {
        "all-caps-period"
    }

    fn detect(&self, line: &str, _next: Option<&str>) -> Option<String> {
        let body = line.strip_suffix('.')?;
        if is_all_caps_name(body) {
            Some(canonical(body))
        } else {
            None
        }
    }
}

/// Matches "HAMLET" with no period, as some editions print headings.
///
/// Bare all-caps lines are also how editions print shouted lines and some
/// stage business, so this only matches when the following non-blank line
/// is not a bracketed stage direction.
pub struct AllCapsBare;

impl SpeakerDetector for AllCapsBare {
    fn name(&self) -> &'static str {
        "all-caps-bare"
    }

    fn detect(&self, line: &str, next: Option<&str>) -> Option<String> {
        if !is_all_caps_name(line) {
            return None;
        }
        match next {
            Some(following) if following.trim_start().starts_with('[') => None,
            Some(_) => Some(canonical(line)),
            None => None,
        }
    }
}

/// Matches "Hamlet." - Title-Case words with a trailing period.
pub struct TitleCasePeriod;

impl SpeakerDetector for TitleCasePeriod {
    fn name(&self) -> &'static str {
        "title-case-period"
    }

    fn detect(&self, line: &str, _next: Option<&str>) -> Option<String> {
        let body = line.strip_suffix('.')?;
        let words: Vec<&str> = body.split_whitespace().collect();
        if words.is_empty() || words.len() > 3 {
            return None;
        }
        if words.iter().all(|w| is_title_case_word(w)) {
            Some(canonical(body))
        } else {
            None
        }
    }
}

fn is_all_caps_name(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > 40 {
        return false;
    }
    trimmed.chars().any(|c| c.is_ascii_uppercase())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == ' ')
}

fn is_title_case_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c == '\'')
        }
        _ => false,
    }
}

/// Lines that can never be speaker headings.
fn is_structural_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("ACT ")
        || trimmed.starts_with("SCENE ")
        || trimmed.starts_with("Actus")
        || trimmed.starts_with("Scena")
        || trimmed.starts_with("Scoena")
        || trimmed.starts_with("PROLOGUE")
        || trimmed.starts_with("EPILOGUE")
        || trimmed.starts_with('[')
}

/// The set of recognized speaker names for one text.
///
/// Grows monotonically during construction, then is frozen; lookups are
/// case-insensitive and whitespace-collapsed.
#[derive(Debug, Default)]
pub struct CharacterRegistry {
    names: HashSet<String>,
}

impl CharacterRegistry {
    /// Build a registry with the default detector stack, most precise first.
    pub fn build(lines: &[String]) -> Self {
        let detectors: Vec<Box<dyn SpeakerDetector>> = vec![
            Box::new(AllCapsPeriod),
            Box::new(AllCapsBare),
            Box::new(TitleCasePeriod),
        ];
        Self::build_with_detectors(lines, &detectors)
    }

    /// Build a registry with a caller-supplied detector stack.
    pub fn build_with_detectors(lines: &[String], detectors: &[Box<dyn SpeakerDetector>]) -> Self {
        let mut registry = CharacterRegistry::default();

        registry.parse_cast_list(lines);
        registry.scan_text(lines, detectors);

        for role in GENERIC_ROLES {
            registry.insert(role);
        }

        trace!(entries = registry.len(), "character registry built");
        registry
    }

    /// Build from an explicit name list. Test and tooling convenience.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = CharacterRegistry::default();
        for name in names {
            registry.insert(name.as_ref());
        }
        registry
    }

    pub fn insert(&mut self, name: &str) {
        let folded = canonical(name);
        if !folded.is_empty() {
            self.names.insert(folded);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&canonical(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All registered names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.names.iter().map(|s| s.as_str()).collect();
        out.sort_unstable();
        out
    }

    /// Phase one: parse the cast-list section when the text has one.
    fn parse_cast_list(&mut self, lines: &[String]) {
        let Some(header_idx) = lines.iter().position(|line| {
            let upper = line.trim().to_uppercase();
            CAST_HEADERS.iter().any(|h| upper.contains(h))
        }) else {
            return;
        };

        let mut blank_run = 0usize;
        for line in &lines[header_idx + 1..] {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                blank_run += 1;
                // Two consecutive blanks end the section.
                if blank_run >= 2 {
                    break;
                }
                continue;
            }
            blank_run = 0;

            if is_structural_line(trimmed) {
                break;
            }

            self.parse_cast_entry(trimmed);
        }
    }

    /// Parse one cast-list entry like "ORSINO, Duke of Illyria." or
    /// "SEBASTIAN, brother to Viola".
    fn parse_cast_entry(&mut self, entry: &str) {
        let entry = entry.trim_end_matches('.');
        let (head, tail) = match entry.split_once(',') {
            Some((head, tail)) => (head, Some(tail)),
            None => (entry, None),
        };

        // Leading capitalized words form the name, stopping at the first
        // description word that is not also a title prefix.
        let mut name_words: Vec<&str> = Vec::new();
        for word in head.split_whitespace() {
            let starts_upper = word.chars().next().is_some_and(|c| c.is_ascii_uppercase());
            let is_description = DESCRIPTION_WORDS.contains(&word.to_lowercase().as_str());
            let is_title = TITLE_PREFIXES.contains(&word.to_uppercase().as_str());

            if starts_upper && (is_title || !is_description) {
                name_words.push(word);
            } else {
                break;
            }
        }
        if !name_words.is_empty() {
            self.insert(&name_words.join(" "));
        }

        // A title immediately after the comma speaks standalone:
        // "ORSINO, Duke of Illyria" yields both ORSINO and DUKE.
        if let Some(tail) = tail {
            if let Some(first) = tail.split_whitespace().next() {
                if TITLE_PREFIXES.contains(&first.to_uppercase().as_str()) {
                    self.insert(first);
                }
            }
        }
    }

    /// Phase two: scan every line with the detector stack.
    fn scan_text(&mut self, lines: &[String], detectors: &[Box<dyn SpeakerDetector>]) {
        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || is_structural_line(trimmed) {
                continue;
            }

            let next = lines[idx + 1..]
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty());

            for detector in detectors {
                if let Some(name) = detector.detect(trimmed, next) {
                    if STAGE_WORDS.contains(&name.as_str()) {
                        break;
                    }
                    trace!(detector = detector.name(), %name, line = idx + 1, "speaker candidate");
                    self.insert(&name);
                    break;
                }
            }
        }
    }
}
