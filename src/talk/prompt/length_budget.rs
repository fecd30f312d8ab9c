//! Duration to script-length conversion.

use std::fmt;

/// Lower tolerance applied to the target length.
pub const MIN_RATIO: f64 = 0.85;
/// Upper tolerance applied to the target length.
pub const MAX_RATIO: f64 = 1.15;

/// Acceptable script length, in characters, for a requested duration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LengthBudget {
    /// Ideal total character count.
    pub target_chars: usize,
    /// Smallest accepted total (inclusive).
    pub min_chars: usize,
    /// Largest accepted total (inclusive).
    pub max_chars: usize,
}

impl LengthBudget {
    /// Compute the budget for `duration_sec` at `chars_per_sec`.
    ///
    /// `target = floor(duration * cps)`, `min = floor(target * 0.85)`,
    /// `max = floor(target * 1.15)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_duration(duration_sec: u32, chars_per_sec: f64) -> Self {
        let target = (f64::from(duration_sec) * chars_per_sec).floor().max(0.0);
        let target_chars = target as usize;
        let min_chars = (target_chars as f64 * MIN_RATIO).floor() as usize;
        let max_chars = (target_chars as f64 * MAX_RATIO).floor() as usize;

        Self {
            target_chars,
            min_chars,
            max_chars,
        }
    }

    /// Whether `total_chars` falls within `[min_chars, max_chars]`.
    #[must_use]
    pub const fn contains(&self, total_chars: usize) -> bool {
        self.min_chars <= total_chars && total_chars <= self.max_chars
    }
}

impl fmt::Display for LengthBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chars ({}..={})",
            self.target_chars, self.min_chars, self.max_chars
        )
    }
}
