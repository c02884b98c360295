//! Command translation
//!
//! Converts whatever text the recognizer or the language model produced into
//! the actuator's stringly wire format `<action><degree>` ("open45",
//! "close20"). Upstream text arrives in wildly inconsistent shapes: bare JSON,
//! JSON wrapped in prose or markdown fencing, or plain text with no JSON at
//! all. The translator extracts the first balanced `{...}` span, decodes it,
//! and falls back to the trimmed raw text when no decodable span exists.
//!
//! The sentinel wire string "move0" marks a command that could not be
//! interpreted. It must never be transmitted; callers filter it via
//! [`Command::is_actionable`].

use serde_json::Value;

/// Wire form of the no-op sentinel
pub const SENTINEL_WIRE: &str = "move0";

/// Bounded actuation vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    Close,
    Move,
    /// Absent or unrecognized action; never forwarded to the actuator
    Unknown,
}

impl Action {
    fn from_wire(s: &str) -> Action {
        match s {
            "open" => Action::Open,
            "close" => Action::Close,
            "move" => Action::Move,
            _ => Action::Unknown,
        }
    }

    /// Lowercase wire spelling. Unknown serializes as "move" so the sentinel
    /// keeps its historical form "move0".
    pub fn as_wire(self) -> &'static str {
        match self {
            Action::Open => "open",
            Action::Close => "close",
            Action::Move => "move",
            Action::Unknown => "move",
        }
    }
}

/// A normalized actuator command.
///
/// `Actuate` comes from a decoded JSON intent; `Verbatim` is the documented
/// fallback that carries the trimmed upstream text unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Actuate { action: Action, degree: i32 },
    Verbatim(String),
}

impl Command {
    /// The ASCII string sent over the serial link.
    pub fn wire(&self) -> String {
        match self {
            Command::Actuate { action, degree } => format!("{}{}", action.as_wire(), degree),
            Command::Verbatim(text) => text.clone(),
        }
    }

    /// False for anything that must never reach the actuator: an Unknown
    /// action, the sentinel wire string however it was produced, and empty
    /// verbatim text.
    pub fn is_actionable(&self) -> bool {
        match self {
            Command::Actuate {
                action: Action::Unknown,
                ..
            } => false,
            Command::Verbatim(text) if text.is_empty() => false,
            _ => self.wire() != SENTINEL_WIRE,
        }
    }
}

/// Translate arbitrary upstream text into a [`Command`].
///
/// The first outermost balanced `{...}` span is decoded as a JSON object with
/// keys `action` (string, lower-cased) and `degree` (number, truncated to an
/// integer; numeric strings are tolerated). Absent or unrecognized `action`
/// yields `Action::Unknown`; absent or unparseable `degree` yields 0. The
/// degree is deliberately not range-clamped: out-of-range values pass through
/// to the actuator unmodified. When no span exists, or the span is not a JSON
/// object, the whole trimmed text becomes a `Verbatim` command.
pub fn translate(raw: &str) -> Command {
    let trimmed = raw.trim();

    if let Some(span) = balanced_json_span(trimmed) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(span) {
            let action = obj
                .get("action")
                .and_then(Value::as_str)
                .map(|s| Action::from_wire(&s.to_lowercase()))
                .unwrap_or(Action::Unknown);
            let degree = obj.get("degree").map(parse_degree).unwrap_or(0);

            let command = Command::Actuate { action, degree };
            tracing::debug!("translated {:?} -> '{}'", span, command.wire());
            return command;
        }
        tracing::debug!("JSON span did not decode, falling back to raw text");
    }

    Command::Verbatim(trimmed.to_string())
}

/// Truncating degree extraction: integers pass through, floats truncate,
/// numeric strings are parsed, everything else is 0.
fn parse_degree(value: &Value) -> i32 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0) as i32,
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.trunc() as i32).unwrap_or(0),
        _ => 0,
    }
}

/// Locate the first outermost balanced `{...}` span, respecting JSON string
/// literals so braces inside quoted text do not confuse the depth count.
fn balanced_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_json_translates() {
        let cmd = translate(r#"{"action":"close","degree":20}"#);
        assert_eq!(
            cmd,
            Command::Actuate {
                action: Action::Close,
                degree: 20
            }
        );
        assert_eq!(cmd.wire(), "close20");
        assert!(cmd.is_actionable());
    }

    #[test]
    fn action_is_lowercased() {
        let cmd = translate(r#"{"action":"OPEN","degree":45}"#);
        assert_eq!(cmd.wire(), "open45");
    }

    #[test]
    fn json_embedded_in_markdown_fence() {
        let raw = "Sure:\n```json\n{\"action\":\"close\",\"degree\":10}\n```";
        assert_eq!(translate(raw).wire(), "close10");
    }

    #[test]
    fn json_embedded_in_prose() {
        let raw = "Here you go {\"action\": \"open\", \"degree\": 90} as requested.";
        assert_eq!(translate(raw).wire(), "open90");
    }

    #[test]
    fn plain_prose_falls_back_verbatim() {
        let cmd = translate("  I am not sure  ");
        assert_eq!(cmd, Command::Verbatim("I am not sure".to_string()));
        assert_eq!(cmd.wire(), "I am not sure");
        assert!(cmd.is_actionable());
    }

    #[test]
    fn degree_truncates_floats() {
        assert_eq!(translate(r#"{"action":"open","degree":50.9}"#).wire(), "open50");
    }

    #[test]
    fn numeric_string_degree_is_tolerated() {
        assert_eq!(translate(r#"{"action":"open","degree":"35"}"#).wire(), "open35");
    }

    #[test]
    fn degree_is_not_clamped() {
        assert_eq!(translate(r#"{"action":"open","degree":150}"#).wire(), "open150");
        assert_eq!(translate(r#"{"action":"close","degree":-5}"#).wire(), "close-5");
    }

    #[test]
    fn missing_keys_yield_sentinel() {
        let cmd = translate("{}");
        assert_eq!(cmd.wire(), SENTINEL_WIRE);
        assert!(!cmd.is_actionable());
    }

    #[test]
    fn unrecognized_action_is_never_actionable() {
        let cmd = translate(r#"{"action":"tilt","degree":30}"#);
        assert_eq!(
            cmd,
            Command::Actuate {
                action: Action::Unknown,
                degree: 30
            }
        );
        assert!(!cmd.is_actionable());
    }

    #[test]
    fn explicit_move_zero_is_filtered() {
        // A model answering {"action":"move","degree":0} collapses onto the
        // sentinel wire string and must not be transmitted.
        let cmd = translate(r#"{"action":"move","degree":0}"#);
        assert_eq!(cmd.wire(), SENTINEL_WIRE);
        assert!(!cmd.is_actionable());
    }

    #[test]
    fn verbatim_move0_is_filtered() {
        // "move0" as plain text has no JSON span, so it becomes verbatim text
        // equal to the sentinel and must be filtered.
        let cmd = translate("move0");
        assert_eq!(cmd.wire(), SENTINEL_WIRE);
        assert!(!cmd.is_actionable());
    }

    #[test]
    fn empty_text_is_not_actionable() {
        assert!(!translate("   ").is_actionable());
    }

    #[test]
    fn malformed_span_falls_back_to_raw() {
        let raw = "{action: open, degree: ten}";
        let cmd = translate(raw);
        assert_eq!(cmd, Command::Verbatim(raw.to_string()));
    }

    #[test]
    fn first_balanced_span_wins() {
        let raw = r#"{"action":"open","degree":10} and then {"action":"close","degree":90}"#;
        assert_eq!(translate(raw).wire(), "open10");
    }

    #[test]
    fn braces_inside_strings_do_not_break_balance() {
        let raw = r#"{"action":"open","degree":15,"note":"warn: { unbalanced"}"#;
        assert_eq!(translate(raw).wire(), "open15");
    }

    #[test]
    fn nested_objects_balance() {
        let raw = r#"prefix {"action":"close","degree":5,"meta":{"why":"wind"}} suffix"#;
        assert_eq!(translate(raw).wire(), "close5");
    }

    #[test]
    fn span_scan_handles_unterminated_brace() {
        assert_eq!(balanced_json_span("{never closed"), None);
        let cmd = translate("{never closed");
        assert_eq!(cmd, Command::Verbatim("{never closed".to_string()));
    }
}
