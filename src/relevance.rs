//! Relevance kernel: how informative an activity is about a knowledge
//! component, derived from that activity's guess/slip odds.

use crate::error::EngineError;

/// Computes the Q×K relevance matrix from guess and slip odds matrices of
/// the same shape: `relevance[q][k] = -ln(guess[q][k]) - ln(slip[q][k])`.
///
/// # Errors
///
/// Returns `Err` if `guess` and `slip` do not have the same number of rows,
/// or if any corresponding row pair has mismatched length.
pub fn relevance_from_odds<E>(
    guess_odds: &[Vec<f64>],
    slip_odds: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, EngineError<E>> {
    if guess_odds.len() != slip_odds.len() {
        return Err(EngineError::validation(format!(
            "guess has {} rows but slip has {} rows",
            guess_odds.len(),
            slip_odds.len()
        )));
    }
    guess_odds
        .iter()
        .zip(slip_odds)
        .map(|(g_row, s_row)| relevance_row(g_row, s_row))
        .collect()
}

fn relevance_row<E>(guess_row: &[f64], slip_row: &[f64]) -> Result<Vec<f64>, EngineError<E>> {
    if guess_row.len() != slip_row.len() {
        return Err(EngineError::validation(format!(
            "guess row has {} entries but slip row has {}",
            guess_row.len(),
            slip_row.len()
        )));
    }
    Ok(guess_row
        .iter()
        .zip(slip_row)
        .map(|(&g, &s)| -g.ln() - s.ln())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_matches_closed_form() {
        let guess = vec![vec![0.5, 2.0]];
        let slip = vec![vec![0.25, 1.0]];
        let r = relevance_from_odds::<std::convert::Infallible>(&guess, &slip).unwrap();
        assert!((r[0][0] - (-(0.5_f64.ln()) - 0.25_f64.ln())).abs() < 1e-12);
        assert!((r[0][1] - (-(2.0_f64.ln()) - 0.0_f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn relevance_rejects_row_count_mismatch() {
        let guess = vec![vec![1.0]];
        let slip = vec![vec![1.0], vec![1.0]];
        assert!(relevance_from_odds::<std::convert::Infallible>(&guess, &slip).is_err());
    }

    #[test]
    fn relevance_rejects_row_length_mismatch() {
        let guess = vec![vec![1.0, 1.0]];
        let slip = vec![vec![1.0]];
        assert!(relevance_from_odds::<std::convert::Infallible>(&guess, &slip).is_err());
    }

    #[test]
    fn relevance_of_odds_one_is_zero() {
        let guess = vec![vec![1.0]];
        let slip = vec![vec![1.0]];
        let r = relevance_from_odds::<std::convert::Infallible>(&guess, &slip).unwrap();
        assert!((r[0][0]).abs() < 1e-12);
    }
}
