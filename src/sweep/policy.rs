use super::stats::Moments;

/// The converged replicates a grid point needs before its stragglers can be told apart.
pub const MIN_CONVERGED_FOR_OUTLIERS: usize = 2;

/// Decides which workers to hold back so the sweep advances in lock step.
///
/// # Arguments
/// * `reported` - The last reported epoch of every worker still training, `None` for the ones
///   that haven't reported yet.
///
/// # Returns
/// Whether each worker should be paused, workers at the minimum or without reports run.
pub fn pace(reported: &[Option<usize>]) -> Vec<bool> {
    let Some(minimum) = reported.iter().flatten().copied().min() else {
        return vec![false; reported.len()];
    };

    reported
        .iter()
        .map(|epoch| epoch.is_some_and(|epoch| epoch > minimum))
        .collect()
}

/// Finds the replicates of a grid point that lag too far behind the converged ones.
///
/// # Arguments
/// * `converged` - The final epochs of the replicates that converged.
/// * `reported` - The last reported epoch of every replicate still training.
///
/// # Returns
/// The positions in `reported` of the outliers, none until at least
/// `MIN_CONVERGED_FOR_OUTLIERS` replicates converged with some spread between them.
pub fn outliers(converged: &[f64], reported: &[Option<usize>]) -> Vec<usize> {
    if converged.len() < MIN_CONVERGED_FOR_OUTLIERS {
        return Vec::new();
    }

    let Some(moments) = Moments::of(converged).filter(|m| m.stddev > 0.) else {
        return Vec::new();
    };
    let bound = moments.outlier_bound();

    reported
        .iter()
        .enumerate()
        .filter(|(_, epoch)| epoch.is_some_and(|epoch| epoch as f64 > bound))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_workers_above_minimum() {
        let held = pace(&[Some(3000), Some(2000), None, Some(2000), Some(4000)]);
        assert_eq!(held, [true, false, false, false, true]);
    }

    #[test]
    fn runs_everyone_without_reports() {
        assert_eq!(pace(&[None, None]), [false, false]);
        assert!(pace(&[]).is_empty());
    }

    #[test]
    fn cancels_straggler() {
        let converged = [100., 102., 98., 105.];
        assert_eq!(outliers(&converged, &[Some(10_000)]), [0]);
        assert!(outliers(&converged, &[Some(106), None]).is_empty());
    }

    #[test]
    fn nothing_to_compare_without_convergence() {
        assert!(outliers(&[], &[Some(1_000_000)]).is_empty());
    }

    #[test]
    fn waits_for_a_spread() {
        // A lone converged replicate would put the bound right at its own epoch.
        let reported = [Some(1300), Some(1100), Some(1100), Some(1100)];
        assert!(outliers(&[1053.], &reported).is_empty());

        assert!(outliers(&[500., 500.], &[Some(600)]).is_empty());
        assert_eq!(outliers(&[500., 510.], &[Some(600), Some(510)]), [0]);
    }
}
