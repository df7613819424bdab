//! Empirical knowledge inference for a single learner's chronological score
//! history: the "which attempt is the mastery transition point" hypothesis
//! test that underlies batch parameter re-estimation.

use crate::error::EngineError;

/// Infers, for each of a learner's `N` chronologically ordered attempts and
/// each of the `K` knowledge components, the posterior probability that the
/// KC was already mastered at the time of that attempt.
///
/// `activity_guess_log` and `activity_slip_log` are `N x K`: row `n` holds
/// `-ln(guess[q_n, k])` and `-ln(slip[q_n, k])` for the activity `q_n`
/// attempted at step `n`. `scores` holds the per-attempt correctness in
/// `[0, 1]`, same order.
///
/// Returns an `N x K` matrix. When more than one mastery-transition
/// hypothesis minimizes the cost for a KC, the result is the uniform average
/// of their indicator vectors.
///
/// # Errors
///
/// Returns `Err` if `scores`, `activity_guess_log`, and `activity_slip_log`
/// do not all describe the same number of attempts, or if `scores` is
/// empty.
pub fn infer_knowledge<E>(
    scores: &[f64],
    activity_guess_log: &[Vec<f64>],
    activity_slip_log: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, EngineError<E>> {
    let n = scores.len();
    if n == 0 {
        return Err(EngineError::validation(
            "infer_knowledge requires at least one attempt",
        ));
    }
    if activity_guess_log.len() != n || activity_slip_log.len() != n {
        return Err(EngineError::validation(format!(
            "infer_knowledge shape mismatch: {n} scores, {} guess rows, {} slip rows",
            activity_guess_log.len(),
            activity_slip_log.len()
        )));
    }
    let k = activity_guess_log[0].len();
    if activity_guess_log.iter().any(|row| row.len() != k)
        || activity_slip_log.iter().any(|row| row.len() != k)
    {
        return Err(EngineError::validation(
            "infer_knowledge requires uniform row length across all attempts",
        ));
    }

    // z has N+1 rows: hypothesis i means "mastered from attempt i onward".
    let mut z = vec![vec![0.0_f64; k]; n + 1];

    for kc in 0..k {
        let mut z0 = 0.0;
        let mut zn = 0.0;
        for i in 0..n {
            z0 += (1.0 - scores[i]) * activity_slip_log[i][kc];
            zn += scores[i] * activity_guess_log[i][kc];
        }
        z[0][kc] = z0;
        z[n][kc] = zn;

        for mid in 1..n {
            let mut acc = 0.0;
            for i in 0..mid {
                acc += scores[i] * activity_guess_log[i][kc];
            }
            for i in mid..n {
                acc += (1.0 - scores[i]) * activity_slip_log[i][kc];
            }
            z[mid][kc] = acc;
        }
    }

    let mut knowl = vec![vec![0.0_f64; k]; n];
    for kc in 0..k {
        let min_val = (0..=n).fold(f64::INFINITY, |acc, i| acc.min(z[i][kc]));
        let minimizers: Vec<usize> = (0..=n).filter(|&i| z[i][kc] == min_val).collect();
        let count = minimizers.len() as f64;
        for attempt in 0..n {
            let votes = minimizers
                .iter()
                .filter(|&&i| if i == 0 { true } else { attempt >= i })
                .count() as f64;
            knowl[attempt][kc] = votes / count;
        }
    }

    Ok(knowl)
}
