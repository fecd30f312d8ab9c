//! Length correction: one draft, at most one corrective draft.

pub mod length_corrector;
pub mod state;

pub use length_corrector::{CandidateSource, Correction, LengthCorrector};
pub use state::{AttemptOutcome, CorrectionState, Decision, decide};
