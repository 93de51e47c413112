mod compare;
mod date;
mod encoding;
mod matching;
mod shape;
mod text;

use crate::errors::Result;
use crate::storage::Storage;
use crate::transforms::base::TransformStep;
use crate::transforms::registry::TransformRegistry;
use serde_json::Value;

type BuiltinTransform = fn(Value, &TransformStep, &Storage) -> Result<Value>;

pub(crate) fn register_all(registry: &mut TransformRegistry) {
    let builtins: &[(&str, BuiltinTransform)] = &[
        ("date", date::date),
        ("replace", matching::replace),
        ("match", matching::match_pattern),
        ("split", text::split),
        ("join", text::join),
        ("trim", text::trim),
        ("toLowerCase", text::to_lower_case),
        ("toUpperCase", text::to_upper_case),
        ("prefix", text::prefix),
        ("postfix", text::postfix),
        ("pick", shape::pick),
        ("pluck", shape::pluck),
        ("get", shape::get),
        ("encodeURI", encoding::encode_uri),
        ("decodeURI", encoding::decode_uri),
        ("encodeUri", encoding::encode_uri),
        ("decodeUri", encoding::decode_uri),
        ("decodeHTML", encoding::decode_html),
        ("decodeBase64", encoding::decode_base64),
        ("combine", compare::combine),
        ("compare", compare::compare),
        ("equal", compare::equal),
    ];

    for &(kind, transform) in builtins {
        // Names are static and non-empty.
        let _ = registry.register(kind, transform);
    }
}
