use serde::Serialize;

/// Converged finals further than this many standard deviations from the raw mean are left out
/// of the trimmed statistic.
pub const TRIM_SIGMAS: f64 = 2.;

/// Replicates lagging further than this many standard deviations behind the converged mean
/// are cancelled.
pub const OUTLIER_SIGMAS: f64 = 3.;

/// The mean and population standard deviation of a set of epochs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f64,
    pub stddev: f64,
    pub count: usize,
}

impl Moments {
    /// Computes the moments of `samples`, `None` when there are none.
    pub fn of(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            stddev: var.sqrt(),
            count: samples.len(),
        })
    }

    /// Recomputes the moments of `samples` leaving out every sample further than
    /// `TRIM_SIGMAS` standard deviations from `self.mean`.
    pub fn trim(&self, samples: &[f64]) -> Option<Self> {
        let bound = TRIM_SIGMAS * self.stddev;
        let kept: Vec<f64> = samples
            .iter()
            .copied()
            .filter(|x| (x - self.mean).abs() <= bound)
            .collect();

        Self::of(&kept)
    }

    /// The epoch past which a still running replicate counts as an outlier.
    pub fn outlier_bound(&self) -> f64 {
        self.mean + OUTLIER_SIGMAS * self.stddev
    }
}

/// The convergence statistics of a grid point, computed once every replicate is done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridStatistics {
    /// Over every final epoch, cancelled replicates included.
    pub raw: Option<Moments>,
    /// Over the converged finals within `TRIM_SIGMAS` of the raw mean, only computed for
    /// highlighted grid points.
    pub trimmed: Option<Moments>,
    pub converged: usize,
    pub cancelled: usize,
}

impl GridStatistics {
    /// # Arguments
    /// * `finals` - The final epoch of every replicate, converged or cancelled.
    /// * `converged` - The final epochs of the converged replicates.
    /// * `trim` - Whether to compute the trimmed pair too.
    pub fn compute(finals: &[f64], converged: &[f64], trim: bool) -> Self {
        let raw = Moments::of(finals);
        let trimmed = match raw {
            Some(raw) if trim => raw.trim(converged),
            _ => None,
        };

        Self {
            raw,
            trimmed,
            converged: converged.len(),
            cancelled: finals.len() - converged.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn population_moments() {
        let m = Moments::of(&[2., 4., 4., 4., 5., 5., 7., 9.]).unwrap();

        assert!(close(m.mean, 5.));
        assert!(close(m.stddev, 2.));
        assert_eq!(m.count, 8);
        assert!(Moments::of(&[]).is_none());
    }

    #[test]
    fn single_sample_has_no_spread() {
        let m = Moments::of(&[1234.]).unwrap();

        assert!(close(m.stddev, 0.));
        assert!(close(m.outlier_bound(), 1234.));
    }

    #[test]
    fn trim_drops_far_samples() {
        let mut samples = vec![10.; 9];
        samples.push(100.);

        let raw = Moments::of(&samples).unwrap();
        assert!(close(raw.mean, 19.));
        assert!(close(raw.stddev, 27.));

        let trimmed = raw.trim(&samples).unwrap();
        assert!(close(trimmed.mean, 10.));
        assert!(close(trimmed.stddev, 0.));
        assert_eq!(trimmed.count, 9);
    }

    #[test]
    fn straggler_is_past_the_bound() {
        let m = Moments::of(&[100., 102., 98., 105.]).unwrap();

        assert!(close(m.mean, 101.25));
        assert!(m.outlier_bound() < 110.);
        assert!(10_000. > m.outlier_bound());
    }

    #[test]
    fn trimmed_only_when_asked() {
        let converged = [100., 102., 98., 105.];

        let stats = GridStatistics::compute(&converged, &converged, false);
        assert!(stats.raw.is_some());
        assert!(stats.trimmed.is_none());
        assert_eq!(stats.cancelled, 0);

        let stats = GridStatistics::compute(&converged, &converged, true);
        assert_eq!(stats.trimmed, stats.raw);

        let stats = GridStatistics::compute(&[], &[], true);
        assert!(stats.raw.is_none() && stats.trimmed.is_none());
    }

    #[test]
    fn raw_counts_cancelled_finals() {
        let finals = [100., 102., 98., 105., 10_000.];
        let stats = GridStatistics::compute(&finals, &finals[..4], true);

        let raw = stats.raw.unwrap();
        assert_eq!(raw.count, 5);
        assert!(close(raw.mean, 2081.));

        let trimmed = stats.trimmed.unwrap();
        assert_eq!(trimmed.count, 4);
        assert!(close(trimmed.mean, 101.25));
        assert_eq!((stats.converged, stats.cancelled), (4, 1));
    }

    #[test]
    fn every_replicate_cancelled() {
        let stats = GridStatistics::compute(&[700., 800.], &[], true);

        assert_eq!(stats.raw.unwrap().count, 2);
        assert!(stats.trimmed.is_none());
        assert_eq!(stats.cancelled, 2);
    }
}
