//! Turn raw completion text into a validated `EpisodeResult`.

use std::collections::HashSet;

use serde_json::Value;

use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::core::model::EpisodeResult;
use crate::talk::schema::OutputSchema;

/// Parse and validate a completion payload.
///
/// All-or-nothing: the payload must be JSON, conform to `schema`, map onto
/// [`EpisodeResult`] without leftovers, and give every beat a distinct id.
///
/// # Errors
/// Returns [`TalkError::MalformedResponse`] if `raw` is not JSON and
/// [`TalkError::SchemaViolation`] if it does not match the schema.
pub fn validate_response(raw: &str, schema: &OutputSchema) -> TalkResult<EpisodeResult> {
    let value: Value = serde_json::from_str(raw)?;
    schema.check(&value)?;
    let result: EpisodeResult =
        serde_json::from_value(value).map_err(|e| TalkError::schema("/", e.to_string()))?;
    ensure_unique_beat_ids(&result)?;
    Ok(result)
}

fn ensure_unique_beat_ids(result: &EpisodeResult) -> TalkResult<()> {
    let mut seen = HashSet::with_capacity(result.beats.len());
    for (index, beat) in result.beats.iter().enumerate() {
        if !seen.insert(beat.id.as_str()) {
            return Err(TalkError::schema(
                format!("/beats/{index}/id"),
                format!("duplicate beat id {}", beat.id),
            ));
        }
    }
    Ok(())
}
