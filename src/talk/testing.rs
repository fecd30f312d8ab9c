//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::core::model::{BeatName, EpisodeInput, Target, Tone};
use crate::talk::generation::{ChatMessage, CompletionBackend};
use crate::talk::schema::OutputSchema;

/// Two-minute drinking-party anecdote.
pub fn sample_input() -> EpisodeInput {
    EpisodeInput {
        when: "去年の冬".to_string(),
        place: "駅前の居酒屋".to_string(),
        who: "大学の友人".to_string(),
        what: "会計で財布がないことに気づいた".to_string(),
        emotion: "焦り".to_string(),
        target: Target::DrinkingParty,
        tone: Tone::SelfDeprecating,
        duration_sec: 120,
        ng: Vec::new(),
        embellishment_rate: 20,
    }
}

/// A schema-conforming payload whose script has `lines` lines, each saying `text`.
pub fn episode_json(lines: usize, text: &str) -> String {
    let beats: Vec<Value> = BeatName::ALL
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({ "id": format!("b{}", i + 1), "name": name.as_str(), "seconds": 20, "summary": "要約" })
        })
        .collect();
    let script: Vec<Value> = (0..lines)
        .map(|i| {
            json!({
                "beat_id": format!("b{}", i % 6 + 1),
                "seconds": 20,
                "text": text,
                "pause": 0.5,
                "alternatives": []
            })
        })
        .collect();

    json!({
        "anonymization_level": 1,
        "warnings": [],
        "beats": beats,
        "script": script,
        "slides": [
            { "kind": "TITLE", "title": "財布がない", "bullets": [], "note": null },
            { "kind": "BULLETS", "title": "経緯", "bullets": ["居酒屋", "会計"], "note": "メモ" },
            { "kind": "PUNCHLINE", "title": "オチ", "bullets": [], "note": null }
        ]
    })
    .to_string()
}

/// A payload whose six lines add up to exactly `total_chars` characters.
pub fn episode_with_total(total_chars: usize) -> String {
    let per_line = total_chars / 6;
    let remainder = total_chars % 6;
    let mut value: Value = serde_json::from_str(&episode_json(6, "")).unwrap_or(Value::Null);
    if let Some(script) = value["script"].as_array_mut() {
        for (i, line) in script.iter_mut().enumerate() {
            let len = per_line + usize::from(i < remainder);
            line["text"] = Value::from("あ".repeat(len));
        }
    }
    value.to_string()
}

/// Backend replaying canned replies and recording every request.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<TalkResult<String>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    /// Backend answering with `replies`, in order.
    pub fn new(replies: Vec<TalkResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Messages of every call made so far.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage], _schema: &OutputSchema) -> TalkResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or(Err(TalkError::Generation("no scripted reply left".to_string())))
    }
}
