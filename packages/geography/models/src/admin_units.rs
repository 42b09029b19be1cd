//! Parsing of the registry's raw `admin_units` text.
//!
//! The registry stores region references as a JSON list such as
//! `[{"adm1_code":1234,"adm1_name":"North"},{"adm2_code":5678,"adm2_name":"Lake"}]`.
//! Each entry names either a coarse (level 1) or a fine (level 2) region.
//! Older exports use Python-literal quoting (`'adm2_code'`) or store a
//! single object instead of a list; both are accepted.

use std::fmt;

use serde_json::Value;

use crate::normalize_code;

/// One region reference from an event's admin-unit list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminUnitRef {
    /// Coarse-region code, when the registry names the coarse region
    /// directly.
    pub adm1_code: Option<String>,
    /// Coarse-region name.
    pub adm1_name: Option<String>,
    /// Fine-region code, resolved to its coarse parent via the hierarchy.
    pub adm2_code: Option<String>,
}

impl AdminUnitRef {
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        Self {
            adm1_code: object.get("adm1_code").and_then(code_from_value),
            adm1_name: object.get("adm1_name").and_then(name_from_value),
            adm2_code: object.get("adm2_code").and_then(code_from_value),
        }
    }

    /// Whether the reference carries neither a coarse nor a fine code.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.adm1_code.is_none() && self.adm2_code.is_none()
    }
}

/// Error returned when `admin_units` text cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUnitsParseError {
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for AdminUnitsParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unparsable admin units: {}", self.message)
    }
}

impl std::error::Error for AdminUnitsParseError {}

/// Parses raw `admin_units` text into region references.
///
/// Blank text yields an empty list. Entries without any region code are
/// skipped.
///
/// # Errors
///
/// Returns [`AdminUnitsParseError`] if the text is neither JSON nor a
/// Python-literal list of objects.
pub fn parse_admin_units(raw: &str) -> Result<Vec<AdminUnitRef>, AdminUnitsParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value = serde_json::from_str::<Value>(trimmed)
        .or_else(|_| serde_json::from_str::<Value>(&python_literal_to_json(trimmed)))
        .map_err(|e| AdminUnitsParseError {
            message: e.to_string(),
        })?;

    let objects = match &value {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        Value::Object(_) => vec![&value],
        other => {
            return Err(AdminUnitsParseError {
                message: format!("expected a list of objects, found {other}"),
            });
        }
    };

    let mut units = Vec::with_capacity(objects.len());
    for item in objects {
        let Value::Object(object) = item else {
            return Err(AdminUnitsParseError {
                message: format!("expected an object, found {item}"),
            });
        };
        let unit = AdminUnitRef::from_object(object);
        if unit.is_empty() {
            log::trace!("skipping admin unit without region code: {item}");
            continue;
        }
        units.push(unit);
    }

    Ok(units)
}

/// Rewrites a Python literal (`repr` of a list of dicts) into JSON.
///
/// Only quotes that delimit strings are rewritten, so a double-quoted
/// name such as `"Côte d'Ivoire"` keeps its apostrophe. Bare `None`,
/// `nan`, `True` and `False` become their JSON counterparts.
fn python_literal_to_json(raw: &str) -> String {
    let mut json = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut open_quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match open_quote {
            Some(quote) => match c {
                '\\' => match chars.next() {
                    Some('\'') => json.push('\''),
                    Some(escaped) => {
                        json.push('\\');
                        json.push(escaped);
                    }
                    None => json.push_str("\\\\"),
                },
                '"' if quote == '\'' => json.push_str("\\\""),
                c if c == quote => {
                    json.push('"');
                    open_quote = None;
                }
                c => json.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    json.push('"');
                    open_quote = Some(c);
                }
                c if c.is_ascii_alphabetic() => {
                    let mut word = String::from(c);
                    while let Some(&next) = chars.peek().filter(|n| n.is_ascii_alphanumeric()) {
                        word.push(next);
                        chars.next();
                    }
                    json.push_str(match word.as_str() {
                        "None" | "nan" | "NaN" => "null",
                        "True" => "true",
                        "False" => "false",
                        other => other,
                    });
                }
                c => json.push(c),
            },
        }
    }
    json
}

fn code_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => number.as_i64().map(|n| n.to_string()).or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| format!("{f:.0}"))
        }),
        Value::String(s) => normalize_code(s),
        _ => None,
    }
}

fn name_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_levels() {
        let units = parse_admin_units(
            r#"[{"adm1_code":1234,"adm1_name":"North"},{"adm2_code":5678,"adm2_name":"Lake"}]"#,
        )
        .unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].adm1_code.as_deref(), Some("1234"));
        assert_eq!(units[0].adm1_name.as_deref(), Some("North"));
        assert_eq!(units[1].adm2_code.as_deref(), Some("5678"));
        assert!(units[1].adm1_code.is_none());
    }

    #[test]
    fn accepts_python_literal_quoting() {
        let units = parse_admin_units("[{'adm2_code': 42, 'adm2_name': 'Delta'}]").unwrap();
        assert_eq!(units[0].adm2_code.as_deref(), Some("42"));
    }

    #[test]
    fn python_literal_names_may_contain_quotes() {
        let units =
            parse_admin_units(r#"[{'adm2_code': 42, 'adm2_name': "Côte d'Ivoire"}]"#).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].adm2_code.as_deref(), Some("42"));

        let units = parse_admin_units(r#"[{'adm1_code': 7, 'adm1_name': 'Say "hi"'}]"#).unwrap();
        assert_eq!(units[0].adm1_name.as_deref(), Some("Say \"hi\""));
    }

    #[test]
    fn python_literal_constants_become_null() {
        let units =
            parse_admin_units("[{'adm1_code': None, 'adm2_code': 5, 'adm1_name': nan}]").unwrap();
        assert_eq!(units[0].adm1_code, None);
        assert_eq!(units[0].adm1_name, None);
        assert_eq!(units[0].adm2_code.as_deref(), Some("5"));
    }

    #[test]
    fn accepts_single_object_and_float_codes() {
        let units = parse_admin_units(r#"{"adm2_code": 17.0}"#).unwrap();
        assert_eq!(units[0].adm2_code.as_deref(), Some("17"));
    }

    #[test]
    fn accepts_string_codes() {
        let units = parse_admin_units(r#"[{"adm1_code": " R1 "}]"#).unwrap();
        assert_eq!(units[0].adm1_code.as_deref(), Some("R1"));
    }

    #[test]
    fn blank_text_is_empty_list() {
        assert!(parse_admin_units("  ").unwrap().is_empty());
    }

    #[test]
    fn skips_entries_without_codes() {
        let units = parse_admin_units(r#"[{"adm1_name":"X"},{"adm2_code":3}]"#).unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_admin_units("Northern provinces").is_err());
        assert!(parse_admin_units("[1, 2]").is_err());
        assert!(parse_admin_units("42").is_err());
    }
}
