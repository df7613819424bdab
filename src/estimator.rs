//! Batch re-estimation of the guess/slip/transit matrices and the mastery
//! prior from accumulated score records.

use crate::config::TrainConfig;
use crate::error::EngineError;
use crate::knowledge::infer_knowledge;
use crate::numeric::{fillna_with, odds_clipped, EPSILON};
use crate::relevance::relevance_from_odds;
use std::collections::BTreeMap;
use tracing::debug;

/// One (learner, activity, score) observation, in the chronological order
/// they were recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub learner: u64,
    pub activity: usize,
    pub score: f64,
}

/// The result of a training pass: fresh parameter matrices ready to write
/// back, plus the pre-fallback views with `NaN` left in place for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedParameters {
    pub mastery_prior: Vec<f64>,
    pub guess: Vec<Vec<f64>>,
    pub slip: Vec<Vec<f64>>,
    pub transit: Vec<Vec<f64>>,
    pub mastery_prior_with_nan: Vec<f64>,
    pub guess_with_nan: Vec<Vec<f64>>,
    pub slip_with_nan: Vec<Vec<f64>>,
    pub transit_with_nan: Vec<Vec<f64>>,
}

struct Accumulator {
    num: Vec<Vec<f64>>,
    denom: Vec<Vec<f64>>,
}

impl Accumulator {
    fn zeros(q: usize, k: usize) -> Self {
        Self {
            num: vec![vec![0.0; k]; q],
            denom: vec![vec![0.0; k]; q],
        }
    }
}

/// Re-estimates guess, slip, transit, and the mastery prior from
/// `score_records` using the current parameter matrices as both the
/// relevance basis and the fallback for under-informed cells.
///
/// Learners with no score records contribute nothing. `score_records` need
/// not be sorted by learner, but each learner's own records must already be
/// in chronological order.
///
/// # Errors
///
/// Returns `Err` if the current parameter matrices are not all `Q x K`, or
/// `mastery_prior` is not length `K`, or any score record's `activity`
/// index is out of bounds.
pub fn train_parameters<E>(
    score_records: &[ScoreRecord],
    current_guess: &[Vec<f64>],
    current_slip: &[Vec<f64>],
    current_transit: &[Vec<f64>],
    mastery_prior: &[f64],
    config: &TrainConfig,
) -> Result<TrainedParameters, EngineError<E>> {
    let q = current_guess.len();
    let k = mastery_prior.len();
    if current_slip.len() != q || current_transit.len() != q {
        return Err(EngineError::validation(
            "guess, slip, and transit must have the same number of activity rows",
        ));
    }
    for row in current_guess
        .iter()
        .chain(current_slip.iter())
        .chain(current_transit.iter())
    {
        if row.len() != k {
            return Err(EngineError::validation(format!(
                "parameter row length {} does not match mastery_prior length {k}",
                row.len()
            )));
        }
    }
    for record in score_records {
        if record.activity >= q {
            return Err(EngineError::validation(format!(
                "score record references activity {} but only {q} activities are known",
                record.activity
            )));
        }
    }

    let relevance = relevance_from_odds::<E>(current_guess, current_slip)?;

    let mut guess_acc = Accumulator::zeros(q, k);
    let mut slip_acc = Accumulator::zeros(q, k);
    let mut transit_acc = Accumulator::zeros(q, k);
    let mut prior_num = vec![0.0; k];
    let mut prior_denom = vec![0.0; k];

    let mut by_learner: BTreeMap<u64, Vec<&ScoreRecord>> = BTreeMap::new();
    for record in score_records {
        by_learner.entry(record.learner).or_default().push(record);
    }

    let mut learners_folded = 0usize;
    for (_learner, records) in &by_learner {
        if records.is_empty() {
            continue;
        }
        learners_folded += 1;

        let n = records.len();
        let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
        let activity_idxs: Vec<usize> = records.iter().map(|r| r.activity).collect();

        let m_k_u: Vec<Vec<f64>> = activity_idxs.iter().map(|&q_idx| relevance[q_idx].clone()).collect();

        let mut u_r = vec![0.0; k];
        for row in &m_k_u {
            for (kc, &v) in row.iter().enumerate() {
                u_r[kc] += v;
            }
        }
        let u_r_mask: Vec<bool> = u_r.iter().map(|&v| v > config.relevance_threshold).collect();
        let m_k_u_mask: Vec<Vec<bool>> = m_k_u
            .iter()
            .map(|row| row.iter().map(|&v| v > config.relevance_threshold).collect())
            .collect();

        let guess_log: Vec<Vec<f64>> = activity_idxs
            .iter()
            .map(|&q_idx| current_guess[q_idx].iter().map(|&g| -g.ln()).collect())
            .collect();
        let slip_log: Vec<Vec<f64>> = activity_idxs
            .iter()
            .map(|&q_idx| current_slip[q_idx].iter().map(|&s| -s.ln()).collect())
            .collect();
        let u_knowledge = infer_knowledge::<E>(&scores, &guess_log, &slip_log)?;

        for kc in 0..k {
            if u_r_mask[kc] {
                prior_num[kc] += u_knowledge[0][kc];
            }
            prior_denom[kc] += if u_r_mask[kc] { 1.0 } else { 0.0 };
        }

        for j in 0..n {
            let q_idx = activity_idxs[j];
            for kc in 0..k {
                let relevant = if m_k_u_mask[j][kc] { 1.0 } else { 0.0 };
                let not_mastered = 1.0 - u_knowledge[j][kc];
                let mastered = u_knowledge[j][kc];

                let guess_w = relevant * not_mastered;
                guess_acc.num[q_idx][kc] += guess_w * scores[j];
                guess_acc.denom[q_idx][kc] += guess_w;

                let slip_w = relevant * mastered;
                slip_acc.num[q_idx][kc] += slip_w * (1.0 - scores[j]);
                slip_acc.denom[q_idx][kc] += slip_w;

                if j < n - 1 {
                    let transit_w = relevant * not_mastered;
                    transit_acc.num[q_idx][kc] += transit_w * u_knowledge[j + 1][kc];
                    transit_acc.denom[q_idx][kc] += transit_w;
                }
            }
        }
    }

    let info_threshold = config.information_threshold;

    let mut prior_est = vec![f64::NAN; k];
    for kc in 0..k {
        if prior_denom[kc] > 0.0 {
            prior_est[kc] = prior_num[kc] / prior_denom[kc];
        }
        if prior_denom[kc] < info_threshold || prior_denom[kc] == 0.0 {
            prior_est[kc] = f64::NAN;
        }
    }

    let mut guess_est = normalize_and_threshold(&guess_acc, info_threshold);
    let mut slip_est = normalize_and_threshold(&slip_acc, info_threshold);
    let transit_est = normalize_and_threshold(&transit_acc, info_threshold);

    let mut degenerate_cells = 0usize;
    if config.remove_degeneracy {
        for qi in 0..q {
            for kc in 0..k {
                let g = guess_est[qi][kc];
                let s = slip_est[qi][kc];
                let sum_degenerate = !g.is_nan() && !s.is_nan() && (g + s) >= 1.0;
                if (!g.is_nan() && g >= 0.5) || sum_degenerate {
                    guess_est[qi][kc] = f64::NAN;
                    degenerate_cells += 1;
                }
                if (!s.is_nan() && s >= 0.5) || sum_degenerate {
                    slip_est[qi][kc] = f64::NAN;
                    degenerate_cells += 1;
                }
            }
        }
    }

    let prior_odds: Vec<f64> = prior_est.iter().map(|&p| to_odds_or_nan(p)).collect();
    let guess_odds = to_odds_matrix(&guess_est);
    let slip_odds = to_odds_matrix(&slip_est);
    let transit_odds = to_odds_matrix(&transit_est);

    let prior_with_nan = prior_odds.clone();
    let guess_with_nan = guess_odds.clone();
    let slip_with_nan = slip_odds.clone();
    let transit_with_nan = transit_odds.clone();

    let mastery_prior_final = fillna_with(&prior_odds, mastery_prior);
    let guess_final = fillna_matrix(&guess_odds, current_guess);
    let slip_final = fillna_matrix(&slip_odds, current_slip);
    let transit_final = fillna_matrix(&transit_odds, current_transit);

    let fallback_cells = count_nan_matrix(&guess_with_nan)
        + count_nan_matrix(&slip_with_nan)
        + count_nan_matrix(&transit_with_nan)
        + prior_with_nan.iter().filter(|v| v.is_nan()).count();
    debug!(
        learners_folded,
        fallback_cells, degenerate_cells, "training pass complete"
    );

    Ok(TrainedParameters {
        mastery_prior: mastery_prior_final,
        guess: guess_final,
        slip: slip_final,
        transit: transit_final,
        mastery_prior_with_nan: prior_with_nan,
        guess_with_nan,
        slip_with_nan,
        transit_with_nan,
    })
}

fn normalize_and_threshold(acc: &Accumulator, info_threshold: f64) -> Vec<Vec<f64>> {
    acc.num
        .iter()
        .zip(&acc.denom)
        .map(|(num_row, denom_row)| {
            num_row
                .iter()
                .zip(denom_row)
                .map(|(&n, &d)| {
                    if d == 0.0 || d < info_threshold {
                        f64::NAN
                    } else {
                        n / d
                    }
                })
                .collect()
        })
        .collect()
}

fn to_odds_or_nan(p: f64) -> f64 {
    if p.is_nan() {
        f64::NAN
    } else {
        odds_clipped(p, EPSILON)
    }
}

fn to_odds_matrix(m: &[Vec<f64>]) -> Vec<Vec<f64>> {
    m.iter()
        .map(|row| row.iter().map(|&p| to_odds_or_nan(p)).collect())
        .collect()
}

fn fillna_matrix(m: &[Vec<f64>], fallback: &[Vec<f64>]) -> Vec<Vec<f64>> {
    m.iter()
        .zip(fallback)
        .map(|(row, fb_row)| fillna_with(row, fb_row))
        .collect()
}

fn count_nan_matrix(m: &[Vec<f64>]) -> usize {
    m.iter().flatten().filter(|v| v.is_nan()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn uniform(q: usize, k: usize, value: f64) -> Vec<Vec<f64>> {
        vec![vec![value; k]; q]
    }

    #[test]
    fn insufficient_data_falls_back_to_current_matrices() {
        // S5: a single score record is far below the information threshold,
        // so every output equals the corresponding current matrix exactly,
        // and the NaN views expose the untouched cells.
        let guess = uniform(1, 1, 0.2);
        let slip = uniform(1, 1, 0.1);
        let transit = uniform(1, 1, 0.05);
        let prior = vec![1.0];
        let records = vec![ScoreRecord {
            learner: 0,
            activity: 0,
            score: 1.0,
        }];
        let config = TrainConfig::default();
        let result = train_parameters::<std::convert::Infallible>(
            &records, &guess, &slip, &transit, &prior, &config,
        )
        .unwrap();
        assert_eq!(result.guess, guess);
        assert_eq!(result.slip, slip);
        assert_eq!(result.transit, transit);
        assert_eq!(result.mastery_prior, prior);
        assert!(result.guess_with_nan[0][0].is_nan());
    }

    #[test]
    fn idempotent_on_empty_score_set() {
        let guess = uniform(2, 1, 0.3);
        let slip = uniform(2, 1, 0.2);
        let transit = uniform(2, 1, 0.1);
        let prior = vec![2.0];
        let config = TrainConfig::default();
        let result = train_parameters::<std::convert::Infallible>(
            &[], &guess, &slip, &transit, &prior, &config,
        )
        .unwrap();
        assert_eq!(result.guess, guess);
        assert_eq!(result.slip, slip);
        assert_eq!(result.transit, transit);
        assert_eq!(result.mastery_prior, prior);
    }

    #[test]
    fn rejects_activity_index_out_of_range() {
        let guess = uniform(1, 1, 0.3);
        let slip = uniform(1, 1, 0.2);
        let transit = uniform(1, 1, 0.1);
        let prior = vec![1.0];
        let records = vec![ScoreRecord {
            learner: 0,
            activity: 5,
            score: 1.0,
        }];
        let config = TrainConfig::default();
        let result = train_parameters::<std::convert::Infallible>(
            &records, &guess, &slip, &transit, &prior, &config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn output_matrices_are_always_finite() {
        let guess = uniform(2, 2, 0.3);
        let slip = uniform(2, 2, 0.2);
        let transit = uniform(2, 2, 0.05);
        let prior = vec![1.0, 1.0];
        let mut config = TrainConfig::default();
        config.information_threshold = 0.0;
        let records: Vec<ScoreRecord> = (0..40)
            .map(|i| ScoreRecord {
                learner: (i % 5) as u64,
                activity: (i % 2) as usize,
                score: if i % 3 == 0 { 1.0 } else { 0.0 },
            })
            .collect();
        let result = train_parameters::<std::convert::Infallible>(
            &records, &guess, &slip, &transit, &prior, &config,
        )
        .unwrap();
        for row in result.guess.iter().chain(&result.slip).chain(&result.transit) {
            for &v in row {
                assert!(v.is_finite());
                assert!(v > 0.0);
            }
        }
        for &v in &result.mastery_prior {
            assert!(v.is_finite());
            assert!(v > 0.0);
        }
    }
}
