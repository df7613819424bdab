//! The storage capability: the injected collaborator that owns persistence
//! of BKT parameters, learner mastery, and score history. This crate's
//! engine facade is generic over any implementation of [`Storage`], so a
//! caller can back it with an in-memory store, a database, or a remote
//! service without this crate depending on any of those directly.

use crate::config::{Thresholds, Weights};

/// Read/write access to everything the engine facade needs.
///
/// Implementors decide concurrency and durability; the facade assumes only
/// that a `write_mastery` call for learner `u` completes before any
/// subsequent `mastery(u)` call observes it, and that the writeback
/// performed by `train` is atomic across the four `write_*` calls it makes.
pub trait Storage {
    /// Error type surfaced by this backend.
    type Error;

    /// Full `Q x K` guess-odds matrix.
    fn guess(&self) -> Result<Vec<Vec<f64>>, Self::Error>;
    /// Full `Q x K` slip-odds matrix.
    fn slip(&self) -> Result<Vec<Vec<f64>>, Self::Error>;
    /// Full `Q x K` transit-odds matrix.
    fn transit(&self) -> Result<Vec<Vec<f64>>, Self::Error>;
    /// Per-activity difficulty, length `Q`.
    fn difficulty(&self) -> Result<Vec<f64>, Self::Error>;
    /// `K x K` prerequisite matrix.
    fn prereqs(&self) -> Result<Vec<Vec<f64>>, Self::Error>;
    /// `K`-length mastery prior, in odds.
    fn mastery_prior(&self) -> Result<Vec<f64>, Self::Error>;
    /// Current mastery-odds vector for `learner`, length `K`.
    fn mastery(&self, learner: u64) -> Result<Vec<f64>, Self::Error>;
    /// Relevance vector (length `K`) of the activity `learner` most recently
    /// attempted, or `None` if they have no prior attempts.
    fn last_attempted_relevance(&self, learner: u64) -> Result<Option<Vec<f64>>, Self::Error>;
    /// All recorded scores, across all learners, each learner's own records
    /// in chronological order.
    fn scores(&self) -> Result<Vec<crate::estimator::ScoreRecord>, Self::Error>;
    /// Sub-strategy weights for recommendation scoring.
    fn weights(&self) -> Result<Weights, Self::Error>;
    /// Readiness/remediation thresholds for recommendation scoring.
    fn thresholds(&self) -> Result<Thresholds, Self::Error>;

    /// Overwrites `learner`'s mastery-odds vector.
    fn write_mastery(&mut self, learner: u64, new_mastery: &[f64]) -> Result<(), Self::Error>;
    /// Appends one score record.
    fn append_score(&mut self, learner: u64, activity: usize, score: f64) -> Result<(), Self::Error>;
    /// Overwrites the guess-odds matrix.
    fn write_guess(&mut self, new_guess: &[Vec<f64>]) -> Result<(), Self::Error>;
    /// Overwrites the slip-odds matrix.
    fn write_slip(&mut self, new_slip: &[Vec<f64>]) -> Result<(), Self::Error>;
    /// Overwrites the transit-odds matrix.
    fn write_transit(&mut self, new_transit: &[Vec<f64>]) -> Result<(), Self::Error>;
    /// Overwrites the mastery prior.
    fn write_mastery_prior(&mut self, new_prior: &[f64]) -> Result<(), Self::Error>;
}

/// An in-memory [`Storage`] implementation, suitable for tests and for
/// embedding this crate in a caller that has no durability requirements of
/// its own.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    guess: Vec<Vec<f64>>,
    slip: Vec<Vec<f64>>,
    transit: Vec<Vec<f64>>,
    difficulty: Vec<f64>,
    prereqs: Vec<Vec<f64>>,
    mastery_prior: Vec<f64>,
    mastery: std::collections::BTreeMap<u64, Vec<f64>>,
    scores: Vec<crate::estimator::ScoreRecord>,
    weights: Weights,
    thresholds: Thresholds,
}

impl MemoryStorage {
    /// Builds a new in-memory store from the given `Q x K` guess/slip/transit
    /// matrices, per-activity difficulty, `K x K` prereq matrix, and
    /// `K`-length mastery prior (in odds). Learner mastery is seeded lazily
    /// from the prior on first access.
    #[must_use]
    pub fn new(
        guess: Vec<Vec<f64>>,
        slip: Vec<Vec<f64>>,
        transit: Vec<Vec<f64>>,
        difficulty: Vec<f64>,
        prereqs: Vec<Vec<f64>>,
        mastery_prior: Vec<f64>,
        weights: Weights,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            guess,
            slip,
            transit,
            difficulty,
            prereqs,
            mastery_prior,
            mastery: std::collections::BTreeMap::new(),
            scores: Vec::new(),
            weights,
            thresholds,
        }
    }
}

impl Storage for MemoryStorage {
    type Error = std::convert::Infallible;

    fn guess(&self) -> Result<Vec<Vec<f64>>, Self::Error> {
        Ok(self.guess.clone())
    }

    fn slip(&self) -> Result<Vec<Vec<f64>>, Self::Error> {
        Ok(self.slip.clone())
    }

    fn transit(&self) -> Result<Vec<Vec<f64>>, Self::Error> {
        Ok(self.transit.clone())
    }

    fn difficulty(&self) -> Result<Vec<f64>, Self::Error> {
        Ok(self.difficulty.clone())
    }

    fn prereqs(&self) -> Result<Vec<Vec<f64>>, Self::Error> {
        Ok(self.prereqs.clone())
    }

    fn mastery_prior(&self) -> Result<Vec<f64>, Self::Error> {
        Ok(self.mastery_prior.clone())
    }

    fn mastery(&self, learner: u64) -> Result<Vec<f64>, Self::Error> {
        Ok(self
            .mastery
            .get(&learner)
            .cloned()
            .unwrap_or_else(|| self.mastery_prior.clone()))
    }

    fn last_attempted_relevance(&self, learner: u64) -> Result<Option<Vec<f64>>, Self::Error> {
        let last = self
            .scores
            .iter()
            .rev()
            .find(|r| r.learner == learner)
            .map(|r| (self.guess[r.activity].clone(), self.slip[r.activity].clone()));
        Ok(last.map(|(g, s)| {
            g.iter()
                .zip(&s)
                .map(|(&gi, &si)| -gi.ln() - si.ln())
                .collect()
        }))
    }

    fn scores(&self) -> Result<Vec<crate::estimator::ScoreRecord>, Self::Error> {
        Ok(self.scores.clone())
    }

    fn weights(&self) -> Result<Weights, Self::Error> {
        Ok(self.weights)
    }

    fn thresholds(&self) -> Result<Thresholds, Self::Error> {
        Ok(self.thresholds)
    }

    fn write_mastery(&mut self, learner: u64, new_mastery: &[f64]) -> Result<(), Self::Error> {
        self.mastery.insert(learner, new_mastery.to_vec());
        Ok(())
    }

    fn append_score(&mut self, learner: u64, activity: usize, score: f64) -> Result<(), Self::Error> {
        self.scores.push(crate::estimator::ScoreRecord {
            learner,
            activity,
            score,
        });
        Ok(())
    }

    fn write_guess(&mut self, new_guess: &[Vec<f64>]) -> Result<(), Self::Error> {
        self.guess = new_guess.to_vec();
        Ok(())
    }

    fn write_slip(&mut self, new_slip: &[Vec<f64>]) -> Result<(), Self::Error> {
        self.slip = new_slip.to_vec();
        Ok(())
    }

    fn write_transit(&mut self, new_transit: &[Vec<f64>]) -> Result<(), Self::Error> {
        self.transit = new_transit.to_vec();
        Ok(())
    }

    fn write_mastery_prior(&mut self, new_prior: &[f64]) -> Result<(), Self::Error> {
        self.mastery_prior = new_prior.to_vec();
        Ok(())
    }
}
