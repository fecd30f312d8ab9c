//! Core talk types: configuration, errors, and the request/result model.

pub mod config;
pub mod errors;
pub mod model;

pub use config::{LlmConfig, PromptConfig, TalkConfig, DEFAULT_CHARS_PER_SEC, DEFAULT_PORT};
pub use errors::{TalkError, TalkResult};
pub use model::{
    Beat, BeatName, EpisodeInput, EpisodeResult, ScriptLine, Slide, SlideKind, Target, Tone,
};
