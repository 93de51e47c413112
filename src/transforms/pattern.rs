use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// A regular expression given as `"pattern"` or `["pattern", "flags"]`.
///
/// Flags follow page-script conventions: `g` global, `i` case-insensitive,
/// `m` multi-line, `s` dot matches newline. Others are ignored.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    global: bool,
}

impl Pattern {
    pub fn new(pattern: &str, flags: &str) -> Result<Self, String> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            regex,
            global: flags.contains('g'),
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(pattern) => Self::new(pattern, ""),
            Value::Array(parts) => {
                let pattern = parts
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| "pattern must be a string".to_string())?;
                let flags = parts.get(1).and_then(Value::as_str).unwrap_or("");
                Self::new(pattern, flags)
            }
            other => Err(format!("expected pattern or [pattern, flags], got {}", other)),
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}
