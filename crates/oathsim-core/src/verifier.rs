//! Replay verification with bounded counter/time-step drift.
//!
//! Wraps the response calculator in an outward search from the caller's
//! nominal counter or time-step. All expected failures come back as data in
//! the [`VerificationResult`]; nothing here returns `Err`, so the CLI/REST
//! layers can render a deterministic outcome without unwinding.

use serde::{Deserialize, Serialize};

use crate::calculator;
use crate::credential::OcraCredentialDescriptor;
use crate::data_input::{ExecutionContext, Timestamp};
use crate::oath::constant_time_eq;

/// Overall verification outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Supplied OTP matched within the drift window.
    Match,
    /// Search exhausted without a match.
    Mismatch,
    /// Request was malformed; no search was performed.
    Invalid,
}

/// Stable reason code accompanying the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    /// OTP matched.
    Match,
    /// OTP did not match any candidate in the window.
    StrictMismatch,
    /// Context, OTP, or drift bounds failed validation.
    ValidationFailure,
}

impl VerificationReason {
    /// Telemetry-stable string form.
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::StrictMismatch => "strict_mismatch",
            Self::ValidationFailure => "validation_failure",
        }
    }
}

/// Result of a replay verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Outcome class.
    pub outcome: VerificationOutcome,
    /// Signed drift of the matching candidate; `Some(0)` means no drift.
    /// `None` unless the outcome is [`VerificationOutcome::Match`].
    pub matched_delta: Option<i64>,
    /// Reason code for rendering.
    pub reason: VerificationReason,
}

impl VerificationResult {
    const fn matched(delta: i64) -> Self {
        Self {
            outcome: VerificationOutcome::Match,
            matched_delta: Some(delta),
            reason: VerificationReason::Match,
        }
    }

    const fn mismatch() -> Self {
        Self {
            outcome: VerificationOutcome::Mismatch,
            matched_delta: None,
            reason: VerificationReason::StrictMismatch,
        }
    }

    const fn invalid() -> Self {
        Self {
            outcome: VerificationOutcome::Invalid,
            matched_delta: None,
            reason: VerificationReason::ValidationFailure,
        }
    }
}

/// The dimension the drift search varies, fixed by the suite.
enum SearchDimension {
    Counter(u64),
    TimeStep(u64),
    SingleShot,
}

/// Verify `supplied_otp` against the credential, tolerating bounded drift.
///
/// The search varies the counter for `C` suites and the time-step for `T`
/// suites; for suites with neither, both bounds must be 0 and the search
/// degenerates to a single comparison. Candidates are tried closest-first:
/// `0, -1, +1, -2, +2, …`, so `matched_delta` reports the smallest drift
/// that satisfies the comparison. At most
/// `drift_backward + drift_forward + 1` responses are computed.
#[must_use = "validation result should be checked"]
pub fn verify(
    descriptor: &OcraCredentialDescriptor,
    context: &ExecutionContext,
    supplied_otp: &str,
    drift_backward: u32,
    drift_forward: u32,
) -> VerificationResult {
    let otp = supplied_otp.trim();
    if otp.is_empty() || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return VerificationResult::invalid();
    }

    let data_input = descriptor.suite().data_input();
    let dimension = if data_input.counter {
        match context.counter.or_else(|| descriptor.counter_value()) {
            Some(counter) => SearchDimension::Counter(counter),
            None => return VerificationResult::invalid(),
        }
    } else if let Some(spec) = data_input.timestamp {
        match context.timestamp {
            Some(timestamp) => SearchDimension::TimeStep(timestamp.resolve_step(spec.step_seconds)),
            None => return VerificationResult::invalid(),
        }
    } else {
        if drift_backward != 0 || drift_forward != 0 {
            return VerificationResult::invalid();
        }
        SearchDimension::SingleShot
    };

    for delta in delta_sequence(drift_backward, drift_forward) {
        let candidate = match shifted_context(context, &dimension, delta) {
            Some(candidate) => candidate,
            // Shift left u64 range; the next candidate is still worth trying.
            None => continue,
        };
        match calculator::generate(descriptor, &candidate) {
            Ok(expected) => {
                if constant_time_eq(expected.as_bytes(), otp.as_bytes()) {
                    return VerificationResult::matched(delta);
                }
            }
            // Context-shape errors are delta-independent: fail fast.
            Err(_) => return VerificationResult::invalid(),
        }
    }

    VerificationResult::mismatch()
}

/// Candidate deltas, closest drift first: `0, -1, +1, -2, +2, …`.
///
/// Bounds fit in i64, so stepping and negation cannot overflow.
#[allow(clippy::arithmetic_side_effects)]
fn delta_sequence(backward: u32, forward: u32) -> Vec<i64> {
    let backward = i64::from(backward);
    let forward = i64::from(forward);
    let mut deltas = Vec::with_capacity((backward + forward + 1) as usize);
    deltas.push(0);
    for step in 1..=backward.max(forward) {
        if step <= backward {
            deltas.push(-step);
        }
        if step <= forward {
            deltas.push(step);
        }
    }
    deltas
}

/// Clone the context with the search dimension shifted by `delta`. Returns
/// `None` when the shift leaves the `u64` domain.
fn shifted_context(
    context: &ExecutionContext,
    dimension: &SearchDimension,
    delta: i64,
) -> Option<ExecutionContext> {
    match dimension {
        SearchDimension::SingleShot => Some(context.clone()),
        SearchDimension::Counter(nominal) => {
            let shifted = nominal.checked_add_signed(delta)?;
            let mut candidate = context.clone();
            candidate.counter = Some(shifted);
            Some(candidate)
        }
        SearchDimension::TimeStep(nominal) => {
            let shifted = nominal.checked_add_signed(delta)?;
            let mut candidate = context.clone();
            candidate.timestamp = Some(Timestamp::Step(shifted));
            Some(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_sequence_walks_outward() {
        assert_eq!(delta_sequence(0, 0), vec![0]);
        assert_eq!(delta_sequence(2, 3), vec![0, -1, 1, -2, 2, 3]);
        assert_eq!(delta_sequence(3, 1), vec![0, -1, 1, -2, -3]);
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(VerificationReason::Match.reason_code(), "match");
        assert_eq!(
            VerificationReason::StrictMismatch.reason_code(),
            "strict_mismatch"
        );
        assert_eq!(
            VerificationReason::ValidationFailure.reason_code(),
            "validation_failure"
        );
    }
}
