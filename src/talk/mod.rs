//! Talk generation pipeline.
//!
//! Organized bottom-up:
//! - `core`: configuration, errors, request/result model
//! - `schema`: the one canonical output schema, shared by request and validation
//! - `prompt`: length budget and prompt construction
//! - `generation`: completion backend trait and the OpenAI chat client
//! - `validation`: raw completion text to `EpisodeResult`
//! - `correction`: the two-attempt length-correction controller

pub mod core;
pub mod correction;
pub mod generation;
pub mod prompt;
pub mod schema;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use self::core::{
    Beat, BeatName, EpisodeInput, EpisodeResult, LlmConfig, PromptConfig, ScriptLine, Slide,
    SlideKind, TalkConfig, TalkError, TalkResult, Target, Tone,
};
pub use correction::{
    AttemptOutcome, CandidateSource, Correction, CorrectionState, Decision, LengthCorrector,
    decide,
};
pub use generation::{ChatMessage, ChatRole, CompletionBackend, OpenAiChatClient};
pub use prompt::{
    LengthBudget, PromptSet, build_adjustment_prompt, build_system_prompt, build_user_prompt,
};
pub use schema::{OutputSchema, SCHEMA_NAME, SCHEMA_VERSION};
pub use validation::validate_response;
