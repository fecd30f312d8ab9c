//! Request and result types of the talk pipeline.
//!
//! Closed enumerations serialize to the Japanese labels used by the product
//! (`"飲み会"`, `"フック"`, ...). English aliases are accepted on input.
//!
//! The result types derive [`JsonSchema`]: their field attributes are the one
//! place the output bounds (counts, ranges, closed key sets) are declared.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::talk::core::errors::{TalkError, TalkResult};

/// Shortest talk accepted, in seconds.
pub const MIN_DURATION_SEC: u32 = 30;
/// Longest talk accepted, in seconds.
pub const MAX_DURATION_SEC: u32 = 600;
/// Default embellishment rate (percent).
pub const DEFAULT_EMBELLISHMENT_RATE: u8 = 20;
/// Highest embellishment rate (percent).
pub const MAX_EMBELLISHMENT_RATE: u8 = 100;

/// Audience or venue the talk is written for.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Drinking party.
    #[default]
    #[serde(rename = "飲み会", alias = "drinking_party")]
    DrinkingParty,
    /// Job interview.
    #[serde(rename = "面接", alias = "interview")]
    Interview,
    /// Self introduction.
    #[serde(rename = "自己紹介", alias = "self_introduction")]
    SelfIntroduction,
    /// `YouTube` video.
    #[serde(rename = "YouTube", alias = "youtube")]
    YouTube,
    /// Master of ceremonies.
    #[serde(rename = "司会", alias = "master_of_ceremonies")]
    MasterOfCeremonies,
    /// Live stream.
    #[serde(rename = "配信", alias = "livestream")]
    Livestream,
    /// Anything else.
    #[serde(rename = "その他", alias = "other")]
    Other,
}

impl Target {
    /// Label used on the wire and in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DrinkingParty => "飲み会",
            Self::Interview => "面接",
            Self::SelfIntroduction => "自己紹介",
            Self::YouTube => "YouTube",
            Self::MasterOfCeremonies => "司会",
            Self::Livestream => "配信",
            Self::Other => "その他",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall tone of the talk.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Tone {
    /// Light and refreshing.
    #[serde(rename = "爽やか", alias = "fresh")]
    Fresh,
    /// Self-deprecating.
    #[serde(rename = "自虐", alias = "self_deprecating")]
    SelfDeprecating,
    /// Slightly biting, never hurtful.
    #[serde(rename = "毒弱め", alias = "mildly_biting")]
    MildlyBiting,
    /// Plain.
    #[default]
    #[serde(rename = "ノーマル", alias = "normal")]
    Normal,
}

impl Tone {
    /// Label used on the wire and in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "爽やか",
            Self::SelfDeprecating => "自虐",
            Self::MildlyBiting => "毒弱め",
            Self::Normal => "ノーマル",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_embellishment_rate() -> u8 {
    DEFAULT_EMBELLISHMENT_RATE
}

/// Structured description of the anecdote to turn into a talk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInput {
    /// When it happened.
    pub when: String,
    /// Where it happened.
    #[serde(rename = "where")]
    pub place: String,
    /// Who was there.
    pub who: String,
    /// What happened.
    pub what: String,
    /// How it felt.
    pub emotion: String,
    /// Audience or venue.
    #[serde(default)]
    pub target: Target,
    /// Tone of the talk.
    #[serde(default)]
    pub tone: Tone,
    /// Requested duration in seconds, within [`MIN_DURATION_SEC`, `MAX_DURATION_SEC`].
    pub duration_sec: u32,
    /// Words or phrases that must not appear in the output.
    #[serde(default)]
    pub ng: Vec<String>,
    /// How much the script may exaggerate the facts, 0 to 100.
    #[serde(default = "default_embellishment_rate")]
    pub embellishment_rate: u8,
}

impl EpisodeInput {
    /// Check the numeric bounds of the request.
    ///
    /// # Errors
    /// Returns [`TalkError::InvalidInput`] if the duration or embellishment rate is out of range.
    pub fn validate(&self) -> TalkResult<()> {
        if !(MIN_DURATION_SEC..=MAX_DURATION_SEC).contains(&self.duration_sec) {
            return Err(TalkError::InvalidInput(format!(
                "duration_sec must be within [{MIN_DURATION_SEC}, {MAX_DURATION_SEC}], got {}",
                self.duration_sec
            )));
        }

        if self.embellishment_rate > MAX_EMBELLISHMENT_RATE {
            return Err(TalkError::InvalidInput(format!(
                "embellishment_rate must be within [0, {MAX_EMBELLISHMENT_RATE}], got {}",
                self.embellishment_rate
            )));
        }

        Ok(())
    }
}

/// Position of a beat in the fixed six-part narrative arc.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum BeatName {
    /// Opening hook.
    #[serde(rename = "フック")]
    Hook,
    /// The plain facts.
    #[serde(rename = "事実")]
    Fact,
    /// Where things started to go sideways.
    #[serde(rename = "ズレ")]
    Deviation,
    /// Escalation.
    #[serde(rename = "展開")]
    Development,
    /// Punchline.
    #[serde(rename = "オチ")]
    Punchline,
    /// Closing afterglow.
    #[serde(rename = "余韻")]
    Afterglow,
}

impl BeatName {
    /// Every beat, in arc order.
    pub const ALL: [Self; 6] = [
        Self::Hook,
        Self::Fact,
        Self::Deviation,
        Self::Development,
        Self::Punchline,
        Self::Afterglow,
    ];

    /// Label used on the wire and in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hook => "フック",
            Self::Fact => "事実",
            Self::Deviation => "ズレ",
            Self::Development => "展開",
            Self::Punchline => "オチ",
            Self::Afterglow => "余韻",
        }
    }
}

impl fmt::Display for BeatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One narrative unit of the talk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Beat {
    /// Identifier referenced by script lines, unique within the episode.
    pub id: String,
    /// Arc position.
    pub name: BeatName,
    /// Seconds allotted to this beat.
    #[schemars(range(min = 1))]
    pub seconds: u32,
    /// Short summary.
    pub summary: String,
}

/// One spoken line, tied to a beat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScriptLine {
    /// Identifier of the beat this line belongs to.
    pub beat_id: String,
    /// Estimated seconds for this line.
    #[schemars(range(min = 1))]
    pub seconds: u32,
    /// Spoken text.
    pub text: String,
    /// Pause after the line, in seconds.
    #[schemars(range(min = 0))]
    pub pause: f64,
    /// Alternative phrasings. The upper bound depends on the schema profile.
    pub alternatives: Vec<String>,
}

/// Role of a slide in the deck.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlideKind {
    /// Title slide.
    Title,
    /// Bullet list.
    Bullets,
    /// Punchline reveal.
    Punchline,
}

impl SlideKind {
    /// Every slide kind.
    pub const ALL: [Self; 3] = [Self::Title, Self::Bullets, Self::Punchline];

    /// Label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Bullets => "BULLETS",
            Self::Punchline => "PUNCHLINE",
        }
    }
}

/// One presentation slide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Slide {
    /// Slide role.
    pub kind: SlideKind,
    /// Slide title.
    pub title: String,
    /// Bullet points.
    #[schemars(length(max = 5))]
    pub bullets: Vec<String>,
    /// Speaker note, or null.
    pub note: Option<String>,
}

/// The talk package returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EpisodeResult {
    /// How strongly names were anonymized, 0 to 2, as reported by the generator.
    #[schemars(range(max = 2))]
    pub anonymization_level: u8,
    /// Generator warnings (e.g. possible forbidden words).
    pub warnings: Vec<String>,
    /// Narrative beats, one per arc position.
    #[schemars(length(min = 6))]
    pub beats: Vec<Beat>,
    /// Spoken script.
    #[schemars(length(min = 6))]
    pub script: Vec<ScriptLine>,
    /// Slides.
    #[schemars(length(min = 3, max = 6))]
    pub slides: Vec<Slide>,
}

impl EpisodeResult {
    /// Spoken texts of the script, in order.
    #[must_use]
    pub fn line_texts(&self) -> Vec<&str> {
        self.script.iter().map(|line| line.text.as_str()).collect()
    }

    /// Total character count of the script texts.
    #[must_use]
    pub fn script_char_count(&self) -> usize {
        self.script.iter().map(|line| line.text.chars().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_json() -> serde_json::Value {
        serde_json::json!({
            "when": "去年の冬",
            "where": "駅前の居酒屋",
            "who": "大学の友人",
            "what": "財布を忘れた",
            "emotion": "焦り",
            "duration_sec": 120
        })
    }

    #[test]
    fn test_input_defaults() {
        let input: EpisodeInput = serde_json::from_value(input_json()).unwrap();
        assert_eq!(input.place, "駅前の居酒屋");
        assert_eq!(input.target, Target::DrinkingParty);
        assert_eq!(input.tone, Tone::Normal);
        assert!(input.ng.is_empty());
        assert_eq!(input.embellishment_rate, DEFAULT_EMBELLISHMENT_RATE);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_accepts_english_aliases() {
        let mut value = input_json();
        value["target"] = "interview".into();
        value["tone"] = "self_deprecating".into();
        let input: EpisodeInput = serde_json::from_value(value).unwrap();
        assert_eq!(input.target, Target::Interview);
        assert_eq!(input.tone, Tone::SelfDeprecating);
    }

    #[test]
    fn test_input_rejects_unknown_target() {
        let mut value = input_json();
        value["target"] = "結婚式".into();
        assert!(serde_json::from_value::<EpisodeInput>(value).is_err());
    }

    #[test]
    fn test_input_bounds() {
        let mut input: EpisodeInput = serde_json::from_value(input_json()).unwrap();
        input.duration_sec = 29;
        assert!(matches!(input.validate(), Err(TalkError::InvalidInput(_))));
        input.duration_sec = 600;
        assert!(input.validate().is_ok());
        input.embellishment_rate = 101;
        assert!(matches!(input.validate(), Err(TalkError::InvalidInput(_))));
    }

    #[test]
    fn test_script_char_count_counts_characters_not_bytes() {
        let result = EpisodeResult {
            anonymization_level: 0,
            warnings: Vec::new(),
            beats: Vec::new(),
            script: vec![
                ScriptLine {
                    beat_id: "b1".to_string(),
                    seconds: 3,
                    text: "財布がない".to_string(),
                    pause: 0.5,
                    alternatives: Vec::new(),
                },
                ScriptLine {
                    beat_id: "b2".to_string(),
                    seconds: 2,
                    text: "abc".to_string(),
                    pause: 0.0,
                    alternatives: Vec::new(),
                },
            ],
            slides: Vec::new(),
        };
        assert_eq!(result.script_char_count(), 8);
        assert_eq!(result.line_texts(), vec!["財布がない", "abc"]);
    }

    #[test]
    fn test_beat_labels_match_wire_values() {
        for name in BeatName::ALL {
            let json = serde_json::to_value(name).unwrap();
            assert_eq!(json, serde_json::Value::from(name.as_str()));
        }
    }
}
