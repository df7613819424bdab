//! Typed configuration surfaces for scoring and training.

/// Weights on the four recommendation sub-strategies.
///
/// These pair with the sub-strategies positionally, not by name: in
/// [`crate::scorer::recommend_scores`], `w_p` scales Readiness, `w_r` scales
/// Remediation, `w_d` scales Continuity, and `w_c` scales Difficulty. This
/// mirrors the reference implementation's weight/substrategy pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Weight on substrategy P (Readiness). Default: 1.0.
    pub w_p: f64,
    /// Weight on substrategy R (Remediation). Default: 1.0.
    pub w_r: f64,
    /// Weight on substrategy D (Continuity) — note the positional, not
    /// nominal, pairing. Default: 1.0.
    pub w_c: f64,
    /// Weight on substrategy C (Difficulty) — note the positional, not
    /// nominal, pairing. Default: 1.0.
    pub w_d: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            w_p: 1.0,
            w_r: 1.0,
            w_c: 1.0,
            w_d: 1.0,
        }
    }
}

/// Thresholds used by the Readiness and Remediation sub-strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Forgiveness threshold (in log-odds space) for prerequisite KCs whose
    /// mastery falls short of `L_star`. Default: 0.0.
    pub r_star: f64,
    /// Mastery log-odds cutoff: a KC with mastery odds at or above this is
    /// considered mastered. Must be finite.
    pub l_star: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            r_star: 0.0,
            l_star: 0.0,
        }
    }
}

/// Knobs controlling batch parameter re-estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Per-attempt relevance values at or below this are treated as zero
    /// when deciding which KCs an attempt is evidence for. Default: 0.01.
    pub relevance_threshold: f64,
    /// Minimum accumulated evidence weight required to emit a new estimate
    /// for a cell; cells below this fall back to their current value.
    /// Default: 20.0.
    pub information_threshold: f64,
    /// Whether to suppress degenerate guess/slip estimates
    /// (`guess >= 0.5` or `guess + slip >= 1`, applied symmetrically to
    /// both matrices). Default: true.
    pub remove_degeneracy: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.01,
            information_threshold: 20.0,
            remove_degeneracy: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_default_is_uniform() {
        let w = Weights::default();
        assert_eq!(w.w_p, 1.0);
        assert_eq!(w.w_r, 1.0);
        assert_eq!(w.w_c, 1.0);
        assert_eq!(w.w_d, 1.0);
    }

    #[test]
    fn train_config_default_matches_documented_values() {
        let c = TrainConfig::default();
        assert!((c.relevance_threshold - 0.01).abs() < 1e-12);
        assert!((c.information_threshold - 20.0).abs() < 1e-12);
        assert!(c.remove_degeneracy);
    }
}
