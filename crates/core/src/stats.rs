//! Aggregate statistics math for the stats endpoint.

/// Success rate as a whole percentage, 0 when there are no runs.
pub fn success_rate(total_runs: i64, completed_runs: i64) -> i64 {
    if total_runs <= 0 {
        return 0;
    }
    ((completed_runs as f64 / total_runs as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_runs_is_zero_percent() {
        assert_eq!(success_rate(0, 0), 0);
    }

    #[test]
    fn rate_is_rounded() {
        assert_eq!(success_rate(3, 2), 67);
        assert_eq!(success_rate(3, 1), 33);
        assert_eq!(success_rate(4, 4), 100);
    }
}
