//! Act/scene identifier normalization.
//!
//! Play texts number their divisions in at least four conventions:
//! Arabic digits ("SCENE 2"), Roman numerals ("SCENE II"), English ordinal
//! words ("ACT FIRST"), and Latin ordinal words from folio texts
//! ("Actus Secundus", "Scena Prima"). This module folds all of them into
//! plain integers and back.

use super::ParseError;

/// Which kind of identifier a token labels.
///
/// Act and scene ordinals use different Latin word lists (gendered forms),
/// so the caller must say which one it is normalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Act,
    Scene,
}

impl std::fmt::Display for NumberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberKind::Act => write!(f, "act"),
            NumberKind::Scene => write!(f, "scene"),
        }
    }
}

/// English ordinal words used for acts in modern editions ("ACT FIRST").
const ENGLISH_ACT_ORDINALS: [&str; 5] = ["FIRST", "SECOND", "THIRD", "FOURTH", "FIFTH"];

/// Latin masculine ordinals used for acts in folio texts ("Actus Primus").
const LATIN_ACT_ORDINALS: [&str; 5] = ["PRIMUS", "SECUNDUS", "TERTIUS", "QUARTUS", "QUINTUS"];

/// Latin feminine ordinals used for scenes in folio texts ("Scena Prima").
///
/// Kept as literal lookups rather than computed from the masculine forms;
/// the lists only cover 1-10, matching what folio texts actually contain.
const LATIN_SCENE_ORDINALS: [&str; 10] = [
    "PRIMA", "SECUNDA", "TERTIA", "QUARTA", "QUINTA", "SEXTA", "SEPTIMA", "OCTAVA", "NONA",
    "DECIMA",
];

/// Normalize an act or scene token to an integer.
///
/// Precedence on ambiguous input: ordinal word, then digit string, then
/// Roman numeral. Unrecognized tokens fail with [`ParseError::UnknownNumeral`].
pub fn normalize(token: &str, kind: NumberKind) -> Result<u32, ParseError> {
    let upper = token.trim().trim_end_matches('.').to_uppercase();
    if upper.is_empty() {
        return Err(ParseError::UnknownNumeral {
            token: token.to_string(),
            kind,
        });
    }

    if let Some(n) = ordinal_word(&upper, kind) {
        return Ok(n);
    }

    if upper.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = upper.parse::<u32>() {
            return Ok(n);
        }
    }

    if upper.chars().all(is_roman_digit) {
        return Ok(roman_to_int(&upper));
    }

    Err(ParseError::UnknownNumeral {
        token: token.to_string(),
        kind,
    })
}

/// Look up an ordinal word for the given kind.
fn ordinal_word(upper: &str, kind: NumberKind) -> Option<u32> {
    let position = |table: &[&str]| table.iter().position(|w| *w == upper).map(|i| i as u32 + 1);

    match kind {
        NumberKind::Act => {
            position(&ENGLISH_ACT_ORDINALS).or_else(|| position(&LATIN_ACT_ORDINALS))
        }
        NumberKind::Scene => position(&LATIN_SCENE_ORDINALS),
    }
}

fn is_roman_digit(c: char) -> bool {
    matches!(c, 'I' | 'V' | 'X' | 'L' | 'C' | 'D' | 'M')
}

fn roman_digit_value(c: char) -> u32 {
    match c {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => 0,
    }
}

/// Decode a Roman numeral with the standard subtractive scan.
///
/// Scans right to left, subtracting any value that is smaller than the
/// largest value seen so far. Does not validate canonical form: "IIII"
/// decodes to 4 and garbage like "IXI" decodes to a number rather than
/// erroring. Folio texts contain non-canonical numbering, so leniency here
/// is deliberate.
pub fn roman_to_int(roman: &str) -> u32 {
    let mut total: i64 = 0;
    let mut prev = 0u32;

    for c in roman.chars().rev() {
        let value = roman_digit_value(c.to_ascii_uppercase());
        if value < prev {
            total -= value as i64;
        } else {
            total += value as i64;
            prev = value;
        }
    }

    total.max(0) as u32
}

/// Encode an integer as a canonical Roman numeral.
///
/// Used for document titles and for error messages that report a unit in
/// both numbering systems.
pub fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}
