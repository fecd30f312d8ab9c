//! Driver of the two-attempt length-correction loop.

use tracing::{debug, info, warn};

use crate::talk::core::config::PromptConfig;
use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::core::model::{EpisodeInput, EpisodeResult};
use crate::talk::correction::state::{AttemptOutcome, CorrectionState, Decision, decide};
use crate::talk::generation::{ChatMessage, CompletionBackend};
use crate::talk::prompt::{LengthBudget, PromptSet, build_adjustment_prompt};
use crate::talk::schema::OutputSchema;
use crate::talk::validation::validate_response;

/// Which draft was returned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CandidateSource {
    /// The first draft.
    First,
    /// The corrective draft.
    Second,
}

/// Outcome of a correction run.
#[derive(Clone, Debug, PartialEq)]
pub struct Correction {
    /// The chosen result.
    pub result: EpisodeResult,
    /// Script length of the chosen result, in characters.
    pub total_chars: usize,
    /// Budget the script was measured against.
    pub budget: LengthBudget,
    /// Number of completion calls made (1 or 2).
    pub attempts: u8,
    /// Which draft was chosen.
    pub source: CandidateSource,
}

impl Correction {
    /// Whether the chosen script fits its budget.
    #[must_use]
    pub const fn in_range(&self) -> bool {
        self.budget.contains(self.total_chars)
    }
}

/// Generates a talk and, if its script length misses the budget, asks once for a corrected draft.
pub struct LengthCorrector<'a> {
    backend: &'a dyn CompletionBackend,
    schema: &'a OutputSchema,
    prompt: &'a PromptConfig,
}

impl<'a> LengthCorrector<'a> {
    /// Create a corrector over `backend`, validating against `schema`.
    #[must_use]
    pub const fn new(
        backend: &'a dyn CompletionBackend,
        schema: &'a OutputSchema,
        prompt: &'a PromptConfig,
    ) -> Self {
        Self {
            backend,
            schema,
            prompt,
        }
    }

    /// Run the loop for `input`.
    ///
    /// Calls are strictly sequential and there are at most two of them. Any
    /// failure of the first attempt is returned; any failure of the second
    /// attempt falls back to the first draft.
    ///
    /// # Errors
    /// Returns the first attempt's generation or validation error.
    pub async fn run(&self, input: &EpisodeInput) -> TalkResult<Correction> {
        let prompts = PromptSet::prepare(input, self.prompt);
        let budget = prompts.budget;
        debug!(
            "Prepared prompts: system {} chars, user {} chars, budget {budget}",
            prompts.system.chars().count(),
            prompts.user.chars().count()
        );

        let mut messages = vec![
            ChatMessage::system(prompts.system),
            ChatMessage::user(prompts.user),
        ];

        let mut state = CorrectionState::Initial;
        // Nothing to fall back on yet: a failed first draft fails the request.
        let first = self.attempt(&messages).await?;
        let first_total = first.script_char_count();
        let decision = decide(state, AttemptOutcome::Produced { total_chars: first_total }, &budget);
        debug!("Attempt 1 ({state}): {first_total} chars against {budget} -> {decision:?}");

        if decision == Decision::Accept {
            return Ok(Correction {
                result: first,
                total_chars: first_total,
                budget,
                attempts: 1,
                source: CandidateSource::First,
            });
        }

        state = decision.next_state();
        messages.push(ChatMessage::user(build_adjustment_prompt(
            &first.line_texts(),
            &budget,
        )));

        let second = self.attempt(&messages).await;
        let outcome = match &second {
            Ok(result) => AttemptOutcome::Produced {
                total_chars: result.script_char_count(),
            },
            Err(err) => {
                warn!("Corrective attempt failed, keeping first draft: {err}");
                AttemptOutcome::Failed
            }
        };
        let decision = decide(state, outcome, &budget);
        debug!("Attempt 2 ({state}): {outcome:?} against {budget} -> {decision:?}");

        match (decision, second) {
            (Decision::Accept, Ok(result)) => {
                let total_chars = result.script_char_count();
                info!("Corrective draft accepted at {total_chars} chars");
                Ok(Correction {
                    result,
                    total_chars,
                    budget,
                    attempts: 2,
                    source: CandidateSource::Second,
                })
            }
            _ => {
                if let AttemptOutcome::Produced { total_chars } = outcome {
                    warn!(
                        "Corrective draft still out of range ({total_chars} chars, budget {budget}), keeping first draft"
                    );
                }
                Ok(Correction {
                    result: first,
                    total_chars: first_total,
                    budget,
                    attempts: 2,
                    source: CandidateSource::First,
                })
            }
        }
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> TalkResult<EpisodeResult> {
        let raw = self.backend.complete(messages, self.schema).await?;
        validate_response(&raw, self.schema).inspect_err(|err: &TalkError| {
            debug!("Rejected completion payload: {err}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talk::generation::ChatRole;
    use crate::talk::testing::{ScriptedBackend, episode_json, episode_with_total, sample_input};

    async fn run_with(replies: Vec<TalkResult<String>>) -> (TalkResult<Correction>, Vec<Vec<ChatMessage>>) {
        let backend = ScriptedBackend::new(replies);
        let schema = OutputSchema::default();
        let prompt = PromptConfig::default();
        let outcome = LengthCorrector::new(&backend, &schema, &prompt)
            .run(&sample_input())
            .await;
        (outcome, backend.calls())
    }

    #[tokio::test]
    async fn test_in_range_first_draft_needs_one_call() {
        let (outcome, calls) = run_with(vec![Ok(episode_with_total(700))]).await;
        let correction = outcome.unwrap();
        assert_eq!(correction.total_chars, 700);
        assert_eq!(correction.attempts, 1);
        assert_eq!(correction.source, CandidateSource::First);
        assert!(correction.in_range());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
    }

    #[tokio::test]
    async fn test_short_first_draft_is_replaced_by_in_range_second() {
        let (outcome, calls) =
            run_with(vec![Ok(episode_with_total(400)), Ok(episode_with_total(750))]).await;
        let correction = outcome.unwrap();
        assert_eq!(correction.total_chars, 750);
        assert_eq!(correction.attempts, 2);
        assert_eq!(correction.source, CandidateSource::Second);

        assert_eq!(calls.len(), 2);
        let second = &calls[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].role, ChatRole::System);
        assert_eq!(second[1], calls[0][1]);
        assert_eq!(second[2].role, ChatRole::User);
        assert!(second[2].content.contains("合計400字"));
    }

    #[tokio::test]
    async fn test_both_out_of_range_keeps_first() {
        let (outcome, calls) =
            run_with(vec![Ok(episode_with_total(400)), Ok(episode_with_total(1200))]).await;
        let correction = outcome.unwrap();
        assert_eq!(correction.total_chars, 400);
        assert_eq!(correction.source, CandidateSource::First);
        assert!(!correction.in_range());
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_second_completion_keeps_first() {
        let (outcome, _) =
            run_with(vec![Ok(episode_with_total(400)), Err(TalkError::EmptyCompletion)]).await;
        let correction = outcome.unwrap();
        assert_eq!(correction.total_chars, 400);
        assert_eq!(correction.source, CandidateSource::First);
    }

    #[tokio::test]
    async fn test_invalid_second_payload_keeps_first() {
        let (outcome, _) =
            run_with(vec![Ok(episode_with_total(400)), Ok(episode_json(5, "あ"))]).await;
        let correction = outcome.unwrap();
        assert_eq!(correction.source, CandidateSource::First);
    }

    #[tokio::test]
    async fn test_failed_second_call_keeps_first() {
        let (outcome, _) = run_with(vec![
            Ok(episode_with_total(900)),
            Err(TalkError::Generation("timeout".to_string())),
        ])
        .await;
        assert_eq!(outcome.unwrap().total_chars, 900);
    }

    #[tokio::test]
    async fn test_invalid_first_payload_is_fatal() {
        let (outcome, calls) = run_with(vec![Ok(episode_json(5, "あ"))]).await;
        assert!(matches!(outcome, Err(TalkError::SchemaViolation { .. })));
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_first_completion_is_fatal() {
        let (outcome, _) = run_with(vec![Err(TalkError::EmptyCompletion)]).await;
        assert!(matches!(outcome, Err(TalkError::EmptyCompletion)));
    }

    #[tokio::test]
    async fn test_never_more_than_two_calls() {
        let (outcome, calls) = run_with(vec![
            Ok(episode_with_total(100)),
            Ok(episode_with_total(100)),
            Ok(episode_with_total(744)),
        ])
        .await;
        assert_eq!(outcome.unwrap().total_chars, 100);
        assert_eq!(calls.len(), 2);
    }
}
