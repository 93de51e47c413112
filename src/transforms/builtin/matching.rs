use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::transforms::pattern::Pattern;
use crate::values::as_text;
use regex::Captures;
use serde_json::Value;

fn pattern(step: &TransformStep) -> Result<Pattern> {
    let re = step
        .option("re")
        .ok_or_else(|| ParserError::invalid_transform(&step.kind, "missing `re`"))?;
    Pattern::from_value(re).map_err(|e| ParserError::invalid_transform(&step.kind, e))
}

pub(super) fn replace(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let pattern = pattern(step)?;
    let to = step.str_option("to").unwrap_or("");
    let text = as_text(&value);
    let regex = pattern.regex();
    let named = regex.capture_names().flatten().next().is_some();
    let expand = |caps: &Captures<'_>| {
        let mut out = String::new();
        expand_template(caps, &text, to, named, &mut out);
        out
    };
    let replaced = if pattern.is_global() {
        regex.replace_all(&text, expand)
    } else {
        regex.replacen(&text, 1, expand)
    };
    Ok(Value::String(replaced.into_owned()))
}

/// Expand a page-script replacement template: `$$`, `$&`, `` $` ``, `$'`,
/// `$n`/`$nn` and `$<name>`. Anything else after `$` is literal.
fn expand_template(caps: &Captures<'_>, text: &str, to: &str, named: bool, out: &mut String) {
    let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
    let groups = caps.len() - 1;
    let mut rest = to;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        rest = match tail.chars().next() {
            Some('$') => {
                out.push('$');
                &tail[1..]
            }
            Some('&') => {
                out.push_str(&text[start..end]);
                &tail[1..]
            }
            Some('`') => {
                out.push_str(&text[..start]);
                &tail[1..]
            }
            Some('\'') => {
                out.push_str(&text[end..]);
                &tail[1..]
            }
            Some('<') if named => match tail.find('>') {
                Some(close) => {
                    if let Some(m) = caps.name(&tail[1..close]) {
                        out.push_str(m.as_str());
                    }
                    &tail[close + 1..]
                }
                None => {
                    out.push('$');
                    tail
                }
            },
            Some(c) if c.is_ascii_digit() => {
                let two = tail
                    .get(..2)
                    .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
                    .and_then(|d| d.parse::<usize>().ok())
                    .filter(|n| (1..=groups).contains(n));
                let one = c
                    .to_digit(10)
                    .map(|n| n as usize)
                    .filter(|n| (1..=groups).contains(n));
                match (two, one) {
                    (Some(n), _) => {
                        out.push_str(caps.get(n).map_or("", |m| m.as_str()));
                        &tail[2..]
                    }
                    (None, Some(n)) => {
                        out.push_str(caps.get(n).map_or("", |m| m.as_str()));
                        &tail[1..]
                    }
                    (None, None) => {
                        out.push('$');
                        tail
                    }
                }
            }
            _ => {
                out.push('$');
                tail
            }
        };
    }
    out.push_str(rest);
}

/// `index`: a group number, `"any"`, `"all"`, or a list of group numbers
/// of which the first matched one wins.
pub(super) fn match_pattern(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let pattern = pattern(step)?;
    let text = as_text(&value);
    let regex = pattern.regex();

    match step.option("index") {
        Some(Value::String(mode)) if mode == "any" => Ok(Value::Bool(regex.is_match(&text))),
        Some(Value::String(mode)) if mode == "all" => {
            if pattern.is_global() {
                Ok(Value::Array(
                    regex
                        .find_iter(&text)
                        .map(|m| Value::String(m.as_str().to_string()))
                        .collect(),
                ))
            } else {
                Ok(regex
                    .captures(&text)
                    .map(|caps| {
                        Value::Array(
                            caps.iter()
                                .map(|group| {
                                    group
                                        .map(|m| Value::String(m.as_str().to_string()))
                                        .unwrap_or(Value::Null)
                                })
                                .collect(),
                        )
                    })
                    .unwrap_or(Value::Null))
            }
        }
        Some(Value::Array(indices)) => {
            let caps = match regex.captures(&text) {
                Some(caps) => caps,
                None => return Ok(Value::Null),
            };
            Ok(indices
                .iter()
                .filter_map(Value::as_u64)
                .find_map(|i| group(&caps, i as usize))
                .unwrap_or(Value::Null))
        }
        Some(Value::Number(n)) => {
            let index = n.as_u64().ok_or_else(|| {
                ParserError::invalid_transform(&step.kind, "index must be a non-negative integer")
            })?;
            Ok(regex
                .captures(&text)
                .and_then(|caps| group(&caps, index as usize))
                .unwrap_or(Value::Null))
        }
        None => Ok(regex
            .captures(&text)
            .and_then(|caps| group(&caps, 0))
            .unwrap_or(Value::Null)),
        Some(other) => Err(ParserError::invalid_transform(
            &step.kind,
            format!("unsupported index {}", other),
        )),
    }
}

fn group(caps: &Captures<'_>, index: usize) -> Option<Value> {
    caps.get(index).map(|m| Value::String(m.as_str().to_string()))
}
