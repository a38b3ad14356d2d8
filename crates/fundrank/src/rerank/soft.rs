//! Soft numeric matching.
//!
//! Every numeric constraint uses the same partial-credit helper with one
//! well-defined tolerance band, so "3 year returns above 15%" and "expense
//! ratio under 1%" degrade identically near their thresholds.

/// Which side of the threshold satisfies the constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Value must be at least the threshold (returns, AUM).
    AtLeast,
    /// Value must be at most the threshold (expense ratio).
    AtMost,
}

/// Partial-credit indicator in [0, 1].
///
/// Full credit on the satisfying side of the threshold; inside the
/// relative tolerance band the credit decays as the ratio of value to
/// threshold; outside the band the indicator is 0.
///
/// For `AtLeast` with threshold t and band β: 1 for `value >= t`,
/// `value / t` for `value ∈ [(1-β)·t, t)`, else 0. `AtMost` mirrors this
/// with `t / value` over `(t, (1+β)·t]`.
pub fn partial_credit(value: f32, threshold: f32, direction: Direction, band: f32) -> f32 {
    if !value.is_finite() || !threshold.is_finite() || threshold <= 0.0 {
        return 0.0;
    }
    match direction {
        Direction::AtLeast => {
            if value >= threshold {
                1.0
            } else if value >= (1.0 - band) * threshold {
                (value / threshold).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        Direction::AtMost => {
            if value <= threshold {
                1.0
            } else if value <= (1.0 + band) * threshold {
                (threshold / value).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
    }
}
