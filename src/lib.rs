//! A Bayesian Knowledge Tracing core for adaptive learning systems.
//!
//! This crate maintains per-learner mastery estimates over knowledge
//! components, selects the next activity to present via a four-part
//! weighted recommendation score, and re-estimates the global BKT
//! parameter matrices (guess, slip, transit odds, and the mastery prior)
//! from accumulated score records. It has no opinion on where those
//! matrices live: callers inject a [`storage::Storage`] implementation.
//!
//! # Example
//!
//! ```
//! use adaptive_engine::config::TrainConfig;
//! use adaptive_engine::engine::{recommend, train, update_from_score};
//! use adaptive_engine::storage::MemoryStorage;
//! use adaptive_engine::config::{Thresholds, Weights};
//!
//! let mut store = MemoryStorage::new(
//!     vec![vec![0.3, 0.3], vec![0.2, 0.2]],
//!     vec![vec![0.2, 0.2], vec![0.15, 0.15]],
//!     vec![vec![0.1, 0.1], vec![0.1, 0.1]],
//!     vec![0.0, 0.2],
//!     vec![vec![0.0, 0.0], vec![0.0, 0.0]],
//!     vec![1.0, 1.0],
//!     Weights::default(),
//!     Thresholds::default(),
//! );
//!
//! let activity = recommend(&store, 1).unwrap();
//! update_from_score(&mut store, 1, activity, 1.0).unwrap();
//! train(&mut store, &TrainConfig::default()).unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod knowledge;
pub mod mastery;
pub mod numeric;
pub mod relevance;
pub mod scorer;
pub mod storage;

pub use config::{Thresholds, TrainConfig, Weights};
pub use error::EngineError;
pub use estimator::{ScoreRecord, TrainedParameters};
pub use storage::{MemoryStorage, Storage};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::engine::{recommend, train, update_from_score};
    use pretty_assertions::assert_eq;

    fn two_kc_store() -> MemoryStorage {
        MemoryStorage::new(
            vec![vec![0.3, 0.3], vec![0.9, 0.05]],
            vec![vec![0.2, 0.2], vec![0.1, 0.1]],
            vec![vec![0.1, 0.1], vec![0.1, 0.1]],
            vec![0.0, 0.5],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            vec![1.0, 1.0],
            Weights::default(),
            Thresholds::default(),
        )
    }

    #[test]
    fn s1_mastery_update_perfect_score() {
        let mastery = vec![1.0, 1.0];
        let guess = vec![0.1, 0.2];
        let slip = vec![0.1, 0.1];
        let transit = vec![0.0, 0.0];
        let updated = mastery::update_mastery::<std::convert::Infallible>(
            &mastery, 1.0, &guess, &slip, &transit,
        )
        .unwrap();
        assert!((updated[0] - 10.0).abs() < 1e-6);
        assert!((updated[1] - 60.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn s2_continuity_without_history_is_zero() {
        let relevance = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let c = scorer::score_c(&relevance, None);
        assert_eq!(c, vec![0.0, 0.0]);
    }

    #[test]
    fn s3_readiness_zero_when_prereqs_all_mastered() {
        let relevance = vec![vec![1.0, 1.0]];
        let mastery = vec![5.0, 5.0];
        let prereqs = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let thresholds = Thresholds {
            r_star: 0.0,
            l_star: 1.0,
        };
        let p = scorer::score_p::<std::convert::Infallible>(
            &relevance, &mastery, &prereqs, &thresholds,
        )
        .unwrap();
        assert_eq!(p, vec![0.0]);
    }

    #[test]
    fn s4_remediation_zero_above_threshold() {
        let relevance = vec![vec![1.0, 2.0]];
        let mastery = vec![3.0, 3.0];
        let thresholds = Thresholds {
            r_star: 0.0,
            l_star: 1.0,
        };
        let r = scorer::score_r(&relevance, &mastery, &thresholds);
        assert_eq!(r, vec![0.0]);
    }

    #[test]
    fn s5_training_with_insufficient_data_falls_back() {
        let mut store = two_kc_store();
        update_from_score(&mut store, 0, 0, 1.0).unwrap();
        let guess_before = store.guess().unwrap();
        let slip_before = store.slip().unwrap();
        let transit_before = store.transit().unwrap();
        let result = train(&mut store, &TrainConfig::default()).unwrap();
        assert_eq!(result.guess, guess_before);
        assert_eq!(result.slip, slip_before);
        assert_eq!(result.transit, transit_before);
    }

    #[test]
    fn s6_recommend_argmax_tie_prefers_lowest_index() {
        let store = MemoryStorage::new(
            vec![vec![0.3], vec![0.3]],
            vec![vec![0.2], vec![0.2]],
            vec![vec![0.1], vec![0.1]],
            vec![0.0, 0.0],
            vec![vec![0.0]],
            vec![1.0],
            Weights::default(),
            Thresholds::default(),
        );
        assert_eq!(recommend(&store, 1).unwrap(), 0);
    }

    #[test]
    fn end_to_end_recommend_then_score_then_train() {
        let mut store = two_kc_store();
        for learner in 0..25u64 {
            let activity = recommend(&store, learner).unwrap();
            let score = if learner % 3 == 0 { 0.0 } else { 1.0 };
            update_from_score(&mut store, learner, activity, score).unwrap();
        }
        let mut config = TrainConfig::default();
        config.information_threshold = 1.0;
        let result = train(&mut store, &config).unwrap();
        for row in result.guess.iter().chain(&result.slip).chain(&result.transit) {
            for &v in row {
                assert!(v.is_finite() && v > 0.0);
            }
        }
    }

    #[test]
    fn invariant_mastery_stays_bounded_after_many_updates() {
        let mut store = two_kc_store();
        for i in 0..200 {
            let score = if i % 2 == 0 { 1.0 } else { 0.0 };
            update_from_score(&mut store, 1, i % 2, score).unwrap();
        }
        let mastery = store.mastery(1).unwrap();
        for &m in &mastery {
            assert!(m >= numeric::EPSILON);
            assert!(m <= 1.0 / numeric::EPSILON);
        }
    }

    #[test]
    fn invariant_odds_roundtrip_sweep() {
        for i in 1..500 {
            let p = numeric::EPSILON + (i as f64 / 500.0) * (1.0 - 2.0 * numeric::EPSILON);
            let x = numeric::odds_clipped(p, numeric::EPSILON);
            let back = numeric::p_from_odds(x);
            assert!((back - p).abs() < 1e-9);
        }
    }
}
