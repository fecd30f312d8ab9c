//! States and the pure decision rule of the length-correction loop.
//!
//! The driver ([`super::LengthCorrector`]) performs the network calls; this
//! module only decides what to do with each attempt, so the policy can be
//! exercised without a backend.

use std::fmt;

use crate::talk::prompt::LengthBudget;

/// Where the correction loop stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CorrectionState {
    /// First draft requested.
    Initial,
    /// First draft was out of range, corrective draft requested.
    Adjusting,
    /// A result has been chosen.
    Done,
}

impl CorrectionState {
    /// Stable string representation (for logs).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Adjusting => "adjusting",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CorrectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an attempt produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttemptOutcome {
    /// A validated result whose script totals `total_chars` characters.
    Produced {
        /// Total script length in characters.
        total_chars: usize,
    },
    /// No usable result (call failed, empty content, or invalid payload).
    Failed,
}

/// What the driver should do next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Return the result of the current attempt.
    Accept,
    /// Request one corrective draft.
    Retry,
    /// Return the first draft.
    KeepFirst,
    /// Fail the request with the current attempt's error.
    Fail,
}

impl Decision {
    /// State reached after applying this decision.
    #[must_use]
    pub const fn next_state(self) -> CorrectionState {
        match self {
            Self::Retry => CorrectionState::Adjusting,
            Self::Accept | Self::KeepFirst | Self::Fail => CorrectionState::Done,
        }
    }
}

/// Decide the next step from the current state and the attempt it produced.
///
/// Only one corrective round exists: `Adjusting` never yields `Retry`, and `Done`
/// is terminal.
#[must_use]
pub const fn decide(state: CorrectionState, outcome: AttemptOutcome, budget: &LengthBudget) -> Decision {
    match (state, outcome) {
        (CorrectionState::Initial, AttemptOutcome::Produced { total_chars }) => {
            if budget.contains(total_chars) {
                Decision::Accept
            } else {
                Decision::Retry
            }
        }
        (CorrectionState::Initial, AttemptOutcome::Failed) => Decision::Fail,
        (CorrectionState::Adjusting, AttemptOutcome::Produced { total_chars }) => {
            if budget.contains(total_chars) {
                Decision::Accept
            } else {
                Decision::KeepFirst
            }
        }
        (CorrectionState::Adjusting | CorrectionState::Done, _) => Decision::KeepFirst,
    }
}
