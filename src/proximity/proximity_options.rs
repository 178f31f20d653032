/// Hyperparameters for nearest point queries.
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityOptions {
    /// Number of samples per parametric axis of the seed grid.
    /// The grid is built on first access and kept for the lifetime of the spline.
    pub samples_per_axis: usize,
    /// Maximum number of iterations for the Newton method.
    pub max_iters: u64,
    /// Step length below which the Newton method is considered converged.
    pub step_tolerance: f64,
    /// Step size scale of the Newton method, in `(0, 1]`.
    pub gamma: f64,
}

impl Default for ProximityOptions {
    fn default() -> Self {
        Self {
            samples_per_axis: 16,
            max_iters: 32,
            step_tolerance: 1e-12,
            gamma: 1.,
        }
    }
}

impl ProximityOptions {
    pub fn with_samples_per_axis(mut self, samples_per_axis: usize) -> Self {
        self.samples_per_axis = samples_per_axis;
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_step_tolerance(mut self, step_tolerance: f64) -> Self {
        self.step_tolerance = step_tolerance;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }
}
