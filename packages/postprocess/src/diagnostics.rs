//! Diagnostic rule tables.
//!
//! Two free-text channels feed the flag engine: the processing notes and
//! the metrics error message. Each channel is scanned by an ordered table
//! of [`Rule`]s, and every rule whose [`Matcher`] accepts the text raises
//! its flag. Text that no rule recognizes raises nothing.

use std::sync::LazyLock;

use flood_events_event_models::{Flag, FlagSet};
use regex::Regex;

static START_DAY_MISSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)start\s+day\s+originally\s+(?:missing|nan)").expect("valid regex")
});

static END_DAY_MISSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)end\s+day\s+originally\s+(?:missing|nan)").expect("valid regex")
});

/// How a rule recognizes its condition in a text channel.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// The pattern occurs anywhere in the text.
    Pattern(&'static LazyLock<Regex>),
    /// The code appears as a whole `;`-separated token.
    Token(u8),
    /// Every fragment occurs in the text.
    AllOf(&'static [&'static str]),
}

impl Matcher {
    /// Tests the matcher against `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Token(code) => has_code_token(text, *code),
            Self::AllOf(fragments) => fragments.iter().all(|f| text.contains(f)),
        }
    }
}

/// A matcher paired with the flag it raises.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Condition to look for.
    pub matcher: Matcher,
    /// Flag raised when the condition holds.
    pub flag: Flag,
}

/// Rules evaluated over the processing notes.
pub static NOTE_RULES: [Rule; 7] = [
    Rule {
        matcher: Matcher::Pattern(&START_DAY_MISSING_RE),
        flag: Flag::StartDayMissing,
    },
    Rule {
        matcher: Matcher::Pattern(&END_DAY_MISSING_RE),
        flag: Flag::EndDayMissing,
    },
    Rule {
        matcher: Matcher::Token(7),
        flag: Flag::Upstream7,
    },
    Rule {
        matcher: Matcher::Token(8),
        flag: Flag::Upstream8,
    },
    Rule {
        matcher: Matcher::Token(13),
        flag: Flag::Upstream13,
    },
    Rule {
        matcher: Matcher::Token(14),
        flag: Flag::Upstream14,
    },
    Rule {
        matcher: Matcher::Token(15),
        flag: Flag::Upstream15,
    },
];

/// Rules evaluated over the metrics error message.
///
/// The no-image rule is unconditional here; the flag engine drops it when
/// the period also predates the sensor cutoff.
pub static ERROR_RULES: [Rule; 3] = [
    Rule {
        matcher: Matcher::AllOf(&["data/GPW_by_adm1/", "FileNotFound"]),
        flag: Flag::PopulationGridMissing,
    },
    Rule {
        matcher: Matcher::AllOf(&["ValueError", "Coordinate", "has mismatched shapes"]),
        flag: Flag::GridShapeMismatch,
    },
    Rule {
        matcher: Matcher::AllOf(&["RasterioIOError", ".tif: No such file or directory"]),
        flag: Flag::NoFloodImage,
    },
];

/// Collects the flags of every rule in `rules` that matches `text`.
#[must_use]
pub fn evaluate(rules: &[Rule], text: &str) -> FlagSet {
    rules
        .iter()
        .filter(|rule| rule.matcher.matches(text))
        .map(|rule| rule.flag)
        .collect()
}

/// Whether `code` occurs as a whole token of `;`-separated text.
///
/// Whitespace after a separator is ignored, so `"13"` matches in
/// `"7; 13"` but never in `"130"` or `"code 13"`.
fn has_code_token(text: &str, code: u8) -> bool {
    let code = code.to_string();
    text.split(';')
        .enumerate()
        .any(|(i, token)| {
            let token = if i == 0 { token } else { token.trim_start() };
            token == code
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(flags: &FlagSet) -> Vec<u8> {
        flags.iter().map(Flag::code).collect()
    }

    #[test]
    fn day_notes_match_both_wordings() {
        assert_eq!(
            codes(&evaluate(
                &NOTE_RULES,
                "Start day originally missing; End day originally missing"
            )),
            vec![1, 2]
        );
        assert_eq!(
            codes(&evaluate(&NOTE_RULES, "start day originally NaN")),
            vec![1]
        );
        assert_eq!(
            codes(&evaluate(&NOTE_RULES, "End day originally NaN")),
            vec![2]
        );
    }

    #[test]
    fn pass_through_codes_are_whole_tokens() {
        assert_eq!(codes(&evaluate(&NOTE_RULES, "7")), vec![7]);
        assert_eq!(codes(&evaluate(&NOTE_RULES, "8;13")), vec![8, 13]);
        assert_eq!(
            codes(&evaluate(&NOTE_RULES, "Start day originally missing; 14; 15")),
            vec![1, 14, 15]
        );
        assert!(evaluate(&NOTE_RULES, "130").is_empty());
        assert!(evaluate(&NOTE_RULES, "17; 70").is_empty());
        assert!(evaluate(&NOTE_RULES, "code 13").is_empty());
        assert!(evaluate(&NOTE_RULES, " 7").is_empty());
    }

    #[test]
    fn every_pass_through_flag_has_a_note_rule() {
        use strum::IntoEnumIterator;

        for flag in Flag::iter().filter(|f| f.is_pass_through()) {
            let text = flag.code().to_string();
            assert!(evaluate(&NOTE_RULES, &text).contains(flag), "{flag}");
        }
    }

    #[test]
    fn population_grid_missing() {
        let error = "FileNotFoundError: data/GPW_by_adm1/1234.tif";
        assert_eq!(codes(&evaluate(&ERROR_RULES, error)), vec![5]);
        assert!(evaluate(&ERROR_RULES, "FileNotFoundError: elsewhere.tif").is_empty());
    }

    #[test]
    fn grid_shape_mismatch_needs_all_fragments() {
        let error = "ValueError: Coordinate 'x' has mismatched shapes";
        assert_eq!(codes(&evaluate(&ERROR_RULES, error)), vec![6]);
        assert!(evaluate(&ERROR_RULES, "ValueError: has mismatched shapes").is_empty());
    }

    #[test]
    fn missing_flood_image() {
        let error = "RasterioIOError: floods/2019-03.tif: No such file or directory";
        assert_eq!(codes(&evaluate(&ERROR_RULES, error)), vec![4]);
    }

    #[test]
    fn unrecognized_text_raises_nothing() {
        assert!(evaluate(&ERROR_RULES, "").is_empty());
        assert!(evaluate(&ERROR_RULES, "KeyError: 'band'").is_empty());
        assert!(evaluate(&NOTE_RULES, "manually reviewed").is_empty());
    }
}
