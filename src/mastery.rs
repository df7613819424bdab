//! Bayesian update of a learner's mastery-odds vector given one new score.

use crate::error::EngineError;
use crate::numeric::EPSILON;

fn x0_mult(guess: f64, slip: f64) -> f64 {
    slip * (1.0 + guess) / (1.0 + slip)
}

fn x1_0_mult(guess: f64, slip: f64) -> f64 {
    ((1.0 + guess) / (guess * (1.0 + slip))) / x0_mult(guess, slip)
}

/// Applies one Bayesian Knowledge Tracing update to `mastery`, given a new
/// `score` on an activity whose guess/slip/transit odds against each KC are
/// given by the equal-length vectors `guess`, `slip`, and `transit`.
///
/// Returns the updated mastery-odds vector. Entries that would overflow to
/// `+Inf` are clamped to `1 / epsilon`; entries that would underflow to
/// exactly `0.0` are clamped to `epsilon`, matching the regularization
/// already used elsewhere to keep mastery strictly positive and finite.
///
/// # Errors
///
/// Returns `Err` if `mastery`, `guess`, `slip`, and `transit` do not all
/// have the same length, or if `score` is outside `[0, 1]`.
pub fn update_mastery<E>(
    mastery: &[f64],
    score: f64,
    guess: &[f64],
    slip: &[f64],
    transit: &[f64],
) -> Result<Vec<f64>, EngineError<E>> {
    let k = mastery.len();
    if guess.len() != k || slip.len() != k || transit.len() != k {
        return Err(EngineError::validation(format!(
            "mastery update shape mismatch: mastery={}, guess={}, slip={}, transit={}",
            k,
            guess.len(),
            slip.len(),
            transit.len()
        )));
    }
    if !(0.0..=1.0).contains(&score) {
        return Err(EngineError::validation(format!(
            "score {score} is outside [0, 1]"
        )));
    }

    let mut updated = Vec::with_capacity(k);
    for i in 0..k {
        let x = x0_mult(guess[i], slip[i]) * x1_0_mult(guess[i], slip[i]).powf(score);
        let mut l = mastery[i] * x;
        l += transit[i] * (l + 1.0);
        if l.is_infinite() && l.is_sign_positive() {
            l = 1.0 / EPSILON;
        } else if l == 0.0 {
            l = EPSILON;
        }
        updated.push(l);
    }
    Ok(updated)
}
