//! Engine facade: the three user-facing operations, orchestrating the pure
//! computations in [`crate::scorer`], [`crate::mastery`], and
//! [`crate::estimator`] against a caller-supplied [`Storage`] backend.

use crate::config::TrainConfig;
use crate::error::EngineError;
use crate::estimator::{train_parameters, TrainedParameters};
use crate::mastery::update_mastery;
use crate::relevance::relevance_from_odds;
use crate::scorer::{argmax_with_tiebreak, recommend_scores};
use crate::storage::Storage;

/// Chooses the next activity to present to `learner` from the full
/// `Q x K` parameter matrices the backend exposes.
///
/// # Example
///
/// ```
/// use adaptive_engine::config::{Thresholds, Weights};
/// use adaptive_engine::engine::recommend;
/// use adaptive_engine::storage::MemoryStorage;
///
/// let store = MemoryStorage::new(
///     vec![vec![0.3, 0.3], vec![0.8, 0.1]],
///     vec![vec![0.2, 0.2], vec![0.1, 0.1]],
///     vec![vec![0.1, 0.1], vec![0.1, 0.1]],
///     vec![0.0, 0.0],
///     vec![vec![0.0, 0.0], vec![0.0, 0.0]],
///     vec![1.0, 1.0],
///     Weights::default(),
///     Thresholds::default(),
/// );
/// let activity = recommend(&store, 1).unwrap();
/// assert!(activity < 2);
/// ```
///
/// Takes `store` by shared reference: `recommend` only reads backend state,
/// so calls for different learners may run concurrently against the same
/// backend.
///
/// # Errors
///
/// Propagates a [`EngineError::Storage`] on backend failure, or
/// [`EngineError::Validation`] if the backend's matrices are malformed.
pub fn recommend<S: Storage>(store: &S, learner: u64) -> Result<usize, EngineError<S::Error>> {
    let guess = store.guess().map_err(EngineError::Storage)?;
    let slip = store.slip().map_err(EngineError::Storage)?;
    let difficulty = store.difficulty().map_err(EngineError::Storage)?;
    let prereqs = store.prereqs().map_err(EngineError::Storage)?;
    let mastery_odds = store.mastery(learner).map_err(EngineError::Storage)?;
    let last_attempted = store
        .last_attempted_relevance(learner)
        .map_err(EngineError::Storage)?;
    let weights = store.weights().map_err(EngineError::Storage)?;
    let thresholds = store.thresholds().map_err(EngineError::Storage)?;

    let relevance = relevance_from_odds(&guess, &slip)?;
    let scores = recommend_scores(
        &relevance,
        &mastery_odds,
        &prereqs,
        &difficulty,
        last_attempted.as_deref(),
        &thresholds,
        &weights,
    )?;
    argmax_with_tiebreak(&scores)
}

/// Records a new score for `learner` on `activity`, applying the Bayesian
/// mastery update before appending the score, so that the Nth score record
/// always reflects mastery as it stood prior to that attempt.
///
/// # Errors
///
/// Propagates storage errors and validation errors from the mastery update.
pub fn update_from_score<S: Storage>(
    store: &mut S,
    learner: u64,
    activity: usize,
    score: f64,
) -> Result<(), EngineError<S::Error>> {
    let mastery_odds = store.mastery(learner).map_err(EngineError::Storage)?;
    let guess = store.guess().map_err(EngineError::Storage)?;
    let slip = store.slip().map_err(EngineError::Storage)?;
    let transit = store.transit().map_err(EngineError::Storage)?;

    let guess_row = row(&guess, activity)?;
    let slip_row = row(&slip, activity)?;
    let transit_row = row(&transit, activity)?;

    let updated = update_mastery(&mastery_odds, score, guess_row, slip_row, transit_row)?;

    store
        .write_mastery(learner, &updated)
        .map_err(EngineError::Storage)?;
    store
        .append_score(learner, activity, score)
        .map_err(EngineError::Storage)?;
    Ok(())
}

fn row<E>(matrix: &[Vec<f64>], activity: usize) -> Result<&[f64], EngineError<E>> {
    matrix
        .get(activity)
        .map(Vec::as_slice)
        .ok_or_else(|| EngineError::validation(format!("activity index {activity} out of bounds")))
}

/// Re-estimates guess, slip, transit, and the mastery prior from all
/// accumulated score records and writes the results back atomically: all
/// four matrices are computed in memory first, and only written if every
/// computation succeeds.
///
/// # Errors
///
/// Propagates storage errors and validation errors from the estimator. On
/// error, no writeback occurs.
pub fn train<S: Storage>(
    store: &mut S,
    config: &TrainConfig,
) -> Result<TrainedParameters, EngineError<S::Error>> {
    let mastery_prior = store.mastery_prior().map_err(EngineError::Storage)?;
    let records = store.scores().map_err(EngineError::Storage)?;
    let guess = store.guess().map_err(EngineError::Storage)?;
    let slip = store.slip().map_err(EngineError::Storage)?;
    let transit = store.transit().map_err(EngineError::Storage)?;

    let result = train_parameters(&records, &guess, &slip, &transit, &mastery_prior, config)?;

    store
        .write_guess(&result.guess)
        .map_err(EngineError::Storage)?;
    store
        .write_slip(&result.slip)
        .map_err(EngineError::Storage)?;
    store
        .write_transit(&result.transit)
        .map_err(EngineError::Storage)?;
    store
        .write_mastery_prior(&result.mastery_prior)
        .map_err(EngineError::Storage)?;

    Ok(result)
}
