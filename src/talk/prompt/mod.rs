//! Length budget and prompt construction.

pub mod length_budget;
pub mod prompt_builder;

pub use length_budget::LengthBudget;
pub use prompt_builder::{
    EmbellishmentTier, PromptSet, build_adjustment_prompt, build_system_prompt, build_user_prompt,
};
