//! The canonical output schema of a generated talk.
//!
//! The document is derived from [`EpisodeResult`] and turned into strict form
//! once, when an [`OutputSchema`] is built. The completion request embeds it as a
//! strict `json_schema` response format and the response validator walks the very
//! same document.

use schemars::generate::SchemaSettings;
use serde_json::{Map, Value, json};

use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::core::model::EpisodeResult;

/// Name given to the schema in the completion request.
pub const SCHEMA_NAME: &str = "EpisodeOut";

/// Version of the output schema (bump on any structural change).
pub const SCHEMA_VERSION: u16 = 2;

/// Minimum beats per episode.
pub const MIN_BEATS: usize = 6;
/// Minimum script lines per episode.
pub const MIN_SCRIPT_LINES: usize = 6;
/// Minimum slides per episode.
pub const MIN_SLIDES: usize = 3;
/// Maximum slides per episode.
pub const MAX_SLIDES: usize = 6;
/// Maximum bullets per slide.
pub const MAX_BULLETS: usize = 5;
/// Highest anonymization level.
pub const MAX_ANONYMIZATION_LEVEL: u8 = 2;

/// Location of the per-line alternatives array inside the document.
const ALTERNATIVES_POINTER: &str = "/properties/script/items/properties/alternatives";

/// Strict JSON schema describing an `EpisodeResult`.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    document: Value,
    max_alternatives: usize,
}

impl OutputSchema {
    /// Build the schema, allowing at most `max_alternatives` phrasings per script line.
    #[must_use]
    pub fn new(max_alternatives: usize) -> Self {
        Self {
            document: derive_document(max_alternatives),
            max_alternatives,
        }
    }

    /// The schema document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.document
    }

    /// Maximum alternative phrasings per script line.
    #[must_use]
    pub const fn max_alternatives(&self) -> usize {
        self.max_alternatives
    }

    /// The `response_format` object of a chat-completion request.
    #[must_use]
    pub fn response_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "schema": self.document,
                "strict": true,
            }
        })
    }

    /// Check that every object node is closed and lists all its properties as required.
    ///
    /// # Errors
    /// Returns [`TalkError::Configuration`] naming the first non-strict node.
    pub fn ensure_strict(&self) -> TalkResult<()> {
        audit_strict(&self.document, "")
            .map_err(|reason| TalkError::Configuration(format!("output schema is not strict: {reason}")))
    }

    /// Check a parsed payload against the schema.
    ///
    /// # Errors
    /// Returns [`TalkError::SchemaViolation`] for the first node that does not conform.
    pub fn check(&self, instance: &Value) -> TalkResult<()> {
        check_node(&self.document, instance, "")
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self::new(2)
    }
}

fn derive_document(max_alternatives: usize) -> Value {
    let generator = SchemaSettings::draft2020_12()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let mut document = generator.into_root_schema_for::<EpisodeResult>().to_value();

    if let Some(root) = document.as_object_mut() {
        root.remove("$schema");
        root.remove("title");
    }
    make_strict(&mut document);

    if let Some(Value::Object(alternatives)) = document.pointer_mut(ALTERNATIVES_POINTER) {
        alternatives.insert("maxItems".to_string(), Value::from(max_alternatives));
    }

    document
}

/// Rewrite a derived node into the subset strict structured output accepts:
/// every property required, closed enums as plain string enums, no numeric formats.
fn make_strict(node: &mut Value) {
    let Some(map) = node.as_object_mut() else {
        return;
    };

    collapse_variants(map);
    if map.get("type").and_then(Value::as_str) != Some("string") {
        map.remove("format");
    }

    let required: Option<Vec<Value>> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().map(Value::from).collect());
    if let Some(required) = required {
        map.insert("required".to_string(), Value::Array(required));
    }

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        properties.values_mut().for_each(make_strict);
    }
    if let Some(items) = map.get_mut("items") {
        make_strict(items);
    }
}

/// Replace a `oneOf`/`anyOf` made only of string constants with one `enum`.
fn collapse_variants(map: &mut Map<String, Value>) {
    for key in ["oneOf", "anyOf"] {
        let labels: Option<Vec<Value>> = map
            .get(key)
            .and_then(Value::as_array)
            .filter(|branches| !branches.is_empty())
            .and_then(|branches| branches.iter().map(variant_label).collect());

        if let Some(labels) = labels {
            map.remove(key);
            map.insert("type".to_string(), Value::from("string"));
            map.insert("enum".to_string(), Value::Array(labels));
        }
    }
}

fn variant_label(branch: &Value) -> Option<Value> {
    branch
        .get("const")
        .or_else(|| {
            branch
                .get("enum")
                .and_then(Value::as_array)
                .filter(|values| values.len() == 1)
                .and_then(|values| values.first())
        })
        .filter(|label| label.is_string())
        .cloned()
}

const fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

fn declares_type(node: &Value, name: &str) -> bool {
    match node.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}

fn audit_strict(node: &Value, path: &str) -> Result<(), String> {
    if node.get("$ref").is_some() || node.get("$defs").is_some() {
        return Err(format!("{} holds an unresolved reference", display_path(path)));
    }

    if declares_type(node, "object") {
        if node.get("additionalProperties") != Some(&Value::Bool(false)) {
            return Err(format!("{} must set additionalProperties to false", display_path(path)));
        }

        let empty = Map::new();
        let properties = node
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let required: Vec<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for key in properties.keys() {
            if !required.contains(&key.as_str()) {
                return Err(format!("{} must list {key} as required", display_path(path)));
            }
        }
        for key in &required {
            if !properties.contains_key(*key) {
                return Err(format!("{} requires undeclared property {key}", display_path(path)));
            }
        }

        for (key, child) in properties {
            audit_strict(child, &format!("{path}/{key}"))?;
        }
    }

    if let Some(items) = node.get("items") {
        audit_strict(items, &format!("{path}/items"))?;
    }

    Ok(())
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_node(schema: &Value, value: &Value, path: &str) -> TalkResult<()> {
    match schema.get("type") {
        Some(Value::String(expected)) if !type_matches(expected, value) => {
            return Err(TalkError::schema(
                display_path(path),
                format!("expected {expected}, found {}", kind_of(value)),
            ));
        }
        Some(Value::Array(expected))
            if !expected
                .iter()
                .filter_map(Value::as_str)
                .any(|t| type_matches(t, value)) =>
        {
            return Err(TalkError::schema(
                display_path(path),
                format!("unexpected {}", kind_of(value)),
            ));
        }
        _ => {}
    }

    let disallowed = schema
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|allowed| !allowed.contains(value));
    if disallowed {
        return Err(TalkError::schema(
            display_path(path),
            format!("{value} is not an allowed value"),
        ));
    }

    match value {
        Value::Number(number) => check_number(schema, number.as_f64(), path),
        Value::Array(items) => check_array(schema, items, path),
        Value::Object(fields) => check_object(schema, fields, path),
        _ => Ok(()),
    }
}

fn check_number(schema: &Value, number: Option<f64>, path: &str) -> TalkResult<()> {
    let Some(number) = number else {
        return Ok(());
    };

    if let Some(minimum) = bound(schema, "minimum").filter(|minimum| number < *minimum) {
        return Err(TalkError::schema(
            display_path(path),
            format!("{number} is below the minimum {minimum}"),
        ));
    }

    if let Some(maximum) = bound(schema, "maximum").filter(|maximum| number > *maximum) {
        return Err(TalkError::schema(
            display_path(path),
            format!("{number} is above the maximum {maximum}"),
        ));
    }

    Ok(())
}

fn bound(schema: &Value, keyword: &str) -> Option<f64> {
    schema.get(keyword).and_then(Value::as_f64)
}

fn count(schema: &Value, keyword: &str) -> Option<u64> {
    schema.get(keyword).and_then(Value::as_u64)
}

fn check_array(schema: &Value, items: &[Value], path: &str) -> TalkResult<()> {
    let len = u64::try_from(items.len()).unwrap_or(u64::MAX);

    if let Some(min) = count(schema, "minItems").filter(|min| len < *min) {
        return Err(TalkError::schema(
            display_path(path),
            format!("expected at least {min} items, found {len}"),
        ));
    }

    if let Some(max) = count(schema, "maxItems").filter(|max| len > *max) {
        return Err(TalkError::schema(
            display_path(path),
            format!("expected at most {max} items, found {len}"),
        ));
    }

    if let Some(item_schema) = schema.get("items") {
        for (index, item) in items.iter().enumerate() {
            check_node(item_schema, item, &format!("{path}/{index}"))?;
        }
    }

    Ok(())
}

fn check_object(schema: &Value, fields: &Map<String, Value>, path: &str) -> TalkResult<()> {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !fields.contains_key(key) {
                return Err(TalkError::schema(
                    display_path(path),
                    format!("missing required property {key}"),
                ));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
    if let Some(extra) = fields
        .keys()
        .find(|key| closed && !properties.contains_key(*key))
    {
        return Err(TalkError::schema(
            display_path(path),
            format!("unexpected property {extra}"),
        ));
    }

    for (key, child_schema) in properties {
        if let Some(child) = fields.get(key) {
            check_node(child_schema, child, &format!("{path}/{key}"))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talk::core::model::{BeatName, SlideKind};

    fn valid_payload() -> Value {
        let beats: Vec<Value> = BeatName::ALL
            .iter()
            .enumerate()
            .map(|(i, name)| {
                json!({ "id": format!("b{}", i + 1), "name": name.as_str(), "seconds": 20, "summary": "要約" })
            })
            .collect();
        let script: Vec<Value> = (1..=6)
            .map(|i| {
                json!({ "beat_id": format!("b{i}"), "seconds": 20, "text": "セリフ", "pause": 0.5, "alternatives": [] })
            })
            .collect();
        json!({
            "anonymization_level": 1,
            "warnings": [],
            "beats": beats,
            "script": script,
            "slides": [
                { "kind": "TITLE", "title": "財布", "bullets": [], "note": null },
                { "kind": "BULLETS", "title": "経緯", "bullets": ["a", "b"], "note": "メモ" },
                { "kind": "PUNCHLINE", "title": "オチ", "bullets": [], "note": null }
            ]
        })
    }

    #[test]
    fn test_schema_is_strict() {
        assert!(OutputSchema::default().ensure_strict().is_ok());
        assert!(OutputSchema::new(0).ensure_strict().is_ok());
    }

    #[test]
    fn test_audit_flags_open_object() {
        let open = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "required": ["a"]
        });
        assert!(audit_strict(&open, "").is_err());

        let partial = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": { "a": { "type": "string" }, "b": { "type": "string" } },
            "required": ["a"]
        });
        let reason = audit_strict(&partial, "").unwrap_err();
        assert!(reason.contains('b'));
    }

    #[test]
    fn test_audit_flags_unresolved_reference() {
        let node = json!({ "$ref": "#/$defs/Beat" });
        let reason = audit_strict(&node, "/beats/items").unwrap_err();
        assert!(reason.contains("/beats/items"));
    }

    #[test]
    fn test_bounds_follow_model_attributes() {
        let schema = OutputSchema::default();
        let doc = schema.as_value();
        let at = |pointer: &str| doc.pointer(pointer).and_then(Value::as_u64);

        assert_eq!(at("/properties/beats/minItems"), Some(MIN_BEATS as u64));
        assert_eq!(at("/properties/script/minItems"), Some(MIN_SCRIPT_LINES as u64));
        assert_eq!(at("/properties/slides/minItems"), Some(MIN_SLIDES as u64));
        assert_eq!(at("/properties/slides/maxItems"), Some(MAX_SLIDES as u64));
        assert_eq!(
            at("/properties/slides/items/properties/bullets/maxItems"),
            Some(MAX_BULLETS as u64)
        );
        assert_eq!(
            at("/properties/anonymization_level/maximum"),
            Some(u64::from(MAX_ANONYMIZATION_LEVEL))
        );
        assert_eq!(at("/properties/beats/items/properties/seconds/minimum"), Some(1));
        assert_eq!(at(&format!("{ALTERNATIVES_POINTER}/maxItems")), Some(2));
        assert_eq!(
            OutputSchema::new(0)
                .as_value()
                .pointer(&format!("{ALTERNATIVES_POINTER}/maxItems"))
                .and_then(Value::as_u64),
            Some(0)
        );
    }

    #[test]
    fn test_enum_labels_are_wire_values() {
        let schema = OutputSchema::default();
        let doc = schema.as_value();

        let beat_names: Vec<Value> = BeatName::ALL.iter().map(|b| Value::from(b.as_str())).collect();
        assert_eq!(
            doc.pointer("/properties/beats/items/properties/name/enum"),
            Some(&Value::Array(beat_names))
        );

        let kinds: Vec<Value> = SlideKind::ALL.iter().map(|k| Value::from(k.as_str())).collect();
        assert_eq!(
            doc.pointer("/properties/slides/items/properties/kind/enum"),
            Some(&Value::Array(kinds))
        );
    }

    #[test]
    fn test_derived_document_is_self_contained() {
        let text = OutputSchema::default().as_value().to_string();
        assert!(!text.contains("$ref"));
        assert!(!text.contains("$defs"));
        assert!(!text.contains("\"format\""));
        assert!(!text.contains("oneOf"));
    }

    #[test]
    fn test_make_strict_requires_every_property_and_collapses_constants() {
        let mut node = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "mood": {
                    "oneOf": [
                        { "type": "string", "const": "happy", "description": "Happy." },
                        { "type": "string", "const": "sad", "description": "Sad." }
                    ]
                },
                "score": { "type": "integer", "format": "uint8", "minimum": 0 }
            }
        });
        make_strict(&mut node);

        assert_eq!(node["required"], json!(["mood", "score"]));
        assert_eq!(node["properties"]["mood"]["enum"], json!(["happy", "sad"]));
        assert_eq!(node["properties"]["mood"]["type"], "string");
        assert!(node["properties"]["score"].get("format").is_none());
        assert!(audit_strict(&node, "").is_ok());
    }

    #[test]
    fn test_response_format_carries_schema_and_strict_flag() {
        let schema = OutputSchema::default();
        let format = schema.response_format();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], SCHEMA_NAME);
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(&format["json_schema"]["schema"], schema.as_value());
    }

    #[test]
    fn test_accepts_valid_payload() {
        assert!(OutputSchema::default().check(&valid_payload()).is_ok());
    }

    #[test]
    fn test_rejects_short_script() {
        let mut payload = valid_payload();
        payload["script"].as_array_mut().unwrap().pop();
        let err = OutputSchema::default().check(&payload).unwrap_err();
        match err {
            TalkError::SchemaViolation { path, reason } => {
                assert_eq!(path, "/script");
                assert!(reason.contains("at least 6"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_extra_root_property() {
        let mut payload = valid_payload();
        payload["mood"] = json!("happy");
        let err = OutputSchema::default().check(&payload).unwrap_err();
        assert!(matches!(err, TalkError::SchemaViolation { .. }));
    }

    #[test]
    fn test_rejects_unknown_beat_name() {
        let mut payload = valid_payload();
        payload["beats"][2]["name"] = json!("Twist");
        let err = OutputSchema::default().check(&payload).unwrap_err();
        match err {
            TalkError::SchemaViolation { path, .. } => assert_eq!(path, "/beats/2/name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_negative_pause_and_high_anonymization() {
        let mut payload = valid_payload();
        payload["script"][0]["pause"] = json!(-0.5);
        assert!(OutputSchema::default().check(&payload).is_err());

        let mut payload = valid_payload();
        payload["anonymization_level"] = json!(3);
        assert!(OutputSchema::default().check(&payload).is_err());
    }

    #[test]
    fn test_alternatives_limit_follows_profile() {
        let mut payload = valid_payload();
        payload["script"][0]["alternatives"] = json!(["別案"]);
        assert!(OutputSchema::new(2).check(&payload).is_ok());
        assert!(OutputSchema::new(0).check(&payload).is_err());
    }

    #[test]
    fn test_rejects_too_many_slides_and_bullets() {
        let mut payload = valid_payload();
        let slide = payload["slides"][1].clone();
        for _ in 0..4 {
            payload["slides"].as_array_mut().unwrap().push(slide.clone());
        }
        assert!(OutputSchema::default().check(&payload).is_err());

        let mut payload = valid_payload();
        payload["slides"][1]["bullets"] = json!(["1", "2", "3", "4", "5", "6"]);
        assert!(OutputSchema::default().check(&payload).is_err());
    }

    #[test]
    fn test_integer_fields_reject_fractions() {
        let mut payload = valid_payload();
        payload["beats"][0]["seconds"] = json!(1.5);
        assert!(OutputSchema::default().check(&payload).is_err());
    }
}
