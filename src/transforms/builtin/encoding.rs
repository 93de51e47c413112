use crate::errors::{ParserError, Result};
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::values::as_text;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use scraper::Html;
use serde_json::Value;

/// Characters `encodeURI` leaves untouched besides alphanumerics.
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

pub(super) fn encode_uri(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    Ok(Value::String(utf8_percent_encode(&text, URI_RESERVED).to_string()))
}

pub(super) fn decode_uri(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    Ok(Value::String(
        percent_decode_str(&text).decode_utf8_lossy().into_owned(),
    ))
}

/// Decode character references. Markup in the input is dropped.
pub(super) fn decode_html(value: Value, _step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    let fragment = Html::parse_fragment(&text);
    let decoded: String = fragment.root_element().text().collect();
    Ok(Value::String(decoded))
}

pub(super) fn decode_base64(value: Value, step: &TransformStep, _storage: &Storage) -> Result<Value> {
    let text = as_text(&value);
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| ParserError::invalid_transform(&step.kind, e.to_string()))?;
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(f: fn(Value, &TransformStep, &Storage) -> Result<Value>, input: &str) -> Value {
        f(json!(input), &TransformStep::new("t"), &Storage::new()).unwrap()
    }

    #[test]
    fn uri_round_trip_keeps_reserved() {
        let encoded = run(encode_uri, "https://x.io/a b?q=é");
        assert_eq!(encoded, json!("https://x.io/a%20b?q=%C3%A9"));
        assert_eq!(run(decode_uri, "a%20b%C3%A9"), json!("a bé"));
    }

    #[test]
    fn html_entities_are_decoded() {
        assert_eq!(run(decode_html, "Tom &amp; Jerry &lt;3"), json!("Tom & Jerry <3"));
    }

    #[test]
    fn base64_is_decoded() {
        assert_eq!(run(decode_base64, "aGVsbG8="), json!("hello"));
        assert!(decode_base64(json!("***"), &TransformStep::new("decodeBase64"), &Storage::new()).is_err());
    }
}
