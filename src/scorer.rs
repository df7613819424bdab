//! Recommendation scoring: the four weighted sub-strategies (Readiness,
//! Remediation, Continuity, Difficulty) and their combination into a single
//! per-activity score.

use crate::config::Thresholds;
use crate::config::Weights;
use crate::error::EngineError;
use tracing::debug;

/// Readiness (P): rewards activities relevant to KCs whose prerequisites
/// are already met, penalizes those whose prerequisites are not.
///
/// `prereqs` is a K×K matrix; `NaN` entries are treated as `0` (no edge).
pub fn score_p<E>(
    relevance: &[Vec<f64>],
    mastery_odds: &[f64],
    prereqs: &[Vec<f64>],
    thresholds: &Thresholds,
) -> Result<Vec<f64>, EngineError<E>> {
    let k = mastery_odds.len();
    if prereqs.len() != k || prereqs.iter().any(|row| row.len() != k) {
        return Err(EngineError::validation(format!(
            "prereqs must be {k}x{k}, got {} rows",
            prereqs.len()
        )));
    }
    for row in relevance {
        if row.len() != k {
            return Err(EngineError::validation(format!(
                "relevance row length {} does not match mastery length {k}",
                row.len()
            )));
        }
    }

    // m_r[j] = sum_i min(mastery[i] - L_star, 0) * prereqs[i][j]
    let mut m_r = vec![0.0; k];
    for (i, &l_i) in mastery_odds.iter().enumerate() {
        let deficit = (l_i - thresholds.l_star).min(0.0);
        for (j, m_r_j) in m_r.iter_mut().enumerate() {
            let w = prereqs[i][j];
            let w = if w.is_nan() { 0.0 } else { w };
            *m_r_j += deficit * w;
        }
    }

    let p = relevance
        .iter()
        .map(|row| {
            row.iter()
                .zip(&m_r)
                .map(|(&r, &m)| r * (m + thresholds.r_star).min(0.0))
                .sum()
        })
        .collect();
    Ok(p)
}

/// Remediation (R): rewards activities relevant to KCs the learner has not
/// yet reached `L_star` mastery on.
#[must_use]
pub fn score_r(relevance: &[Vec<f64>], mastery_odds: &[f64], thresholds: &Thresholds) -> Vec<f64> {
    let gaps: Vec<f64> = mastery_odds
        .iter()
        .map(|&l| (thresholds.l_star - l).max(0.0))
        .collect();
    relevance
        .iter()
        .map(|row| row.iter().zip(&gaps).map(|(&r, &g)| r * g).sum())
        .collect()
}

/// Continuity (C): rewards activities relevant to the same KCs as the
/// learner's most recently attempted activity. Zero vector when there is no
/// prior attempt.
#[must_use]
pub fn score_c(relevance: &[Vec<f64>], last_attempted_relevance: Option<&[f64]>) -> Vec<f64> {
    match last_attempted_relevance {
        None => vec![0.0; relevance.len()],
        Some(r_last) => relevance
            .iter()
            .map(|row| {
                let dot: f64 = row.iter().zip(r_last).map(|(&r, &l)| r * l).sum();
                dot.sqrt()
            })
            .collect(),
    }
}

/// Difficulty (D): penalizes activities whose difficulty is far from the
/// learner's mastery level on the KCs the activity is relevant to.
///
/// # Errors
///
/// Returns `Err` if `difficulty` does not have one entry per activity row of
/// `relevance`.
pub fn score_d<E>(
    relevance: &[Vec<f64>],
    mastery_odds: &[f64],
    difficulty: &[f64],
) -> Result<Vec<f64>, EngineError<E>> {
    if difficulty.len() != relevance.len() {
        return Err(EngineError::validation(format!(
            "difficulty has {} entries but relevance has {} rows",
            difficulty.len(),
            relevance.len()
        )));
    }
    Ok(relevance
        .iter()
        .zip(difficulty)
        .map(|(row, &d_q)| {
            let penalty: f64 = row
                .iter()
                .zip(mastery_odds)
                .map(|(&r, &l)| r * (l - d_q).abs())
                .sum();
            -penalty
        })
        .collect())
}

/// Computes the combined recommendation score for each activity: a weighted
/// sum of the four sub-strategies, paired positionally rather than by name —
/// `W_p` scales `P`, `W_r` scales `R`, `W_d` scales `C`, and `W_c` scales
/// `D`. This mirrors the weight/substrategy pairing in the reference
/// implementation's `recommendation_score` (`np.dot([W_p, W_r, W_d, W_c],
/// [P, R, C, D])`), which is ground truth for this ambiguity; the weight
/// names are conventional labels, not a promise that `W_c` scales `C`.
///
/// # Errors
///
/// Propagates shape-validation errors from the sub-strategy computations.
pub fn recommend_scores<E>(
    relevance: &[Vec<f64>],
    mastery_odds: &[f64],
    prereqs: &[Vec<f64>],
    difficulty: &[f64],
    last_attempted_relevance: Option<&[f64]>,
    thresholds: &Thresholds,
    weights: &Weights,
) -> Result<Vec<f64>, EngineError<E>> {
    let p = score_p(relevance, mastery_odds, prereqs, thresholds)?;
    let r = score_r(relevance, mastery_odds, thresholds);
    let c = score_c(relevance, last_attempted_relevance);
    let d = score_d(relevance, mastery_odds, difficulty)?;

    debug!(substrategy = "P", scores = ?p);
    debug!(substrategy = "R", scores = ?r);
    debug!(substrategy = "C", scores = ?c);
    debug!(substrategy = "D", scores = ?d);

    let combined: Vec<f64> = (0..relevance.len())
        .map(|q| {
            weights.w_p * p[q] + weights.w_r * r[q] + weights.w_d * c[q] + weights.w_c * d[q]
        })
        .collect();
    debug!(combined_scores = ?combined);
    Ok(combined)
}

/// Returns the index of the largest value in `scores`, breaking ties by
/// preferring the lowest index.
///
/// # Errors
///
/// Returns `Err` if `scores` is empty.
pub fn argmax_with_tiebreak<E>(scores: &[f64]) -> Result<usize, EngineError<E>> {
    if scores.is_empty() {
        return Err(EngineError::validation(
            "cannot take argmax of an empty score vector",
        ));
    }
    let mut best_idx = 0;
    let mut best_val = scores[0];
    for (idx, &val) in scores.iter().enumerate().skip(1) {
        if val > best_val {
            best_val = val;
            best_idx = idx;
        }
    }
    Ok(best_idx)
}
