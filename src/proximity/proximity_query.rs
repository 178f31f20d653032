use argmin::core::{Executor, State};
use nalgebra::DVector;

use super::{
    squared_distance, ProximityNewton, ProximityOptions, ProximityProblem, ProximitySamples,
};
use crate::error::{Result, SplineError};
use crate::spline::Spline;

/// Nearest point of a spline to a query point
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityResult {
    pub parameter: Vec<f64>,
    pub point: Vec<f64>,
    pub distance: f64,
}

/// Nearest point queries against one spline, seeded by its cached sample grid
pub struct Proximity<'a> {
    spline: &'a dyn Spline,
    samples: &'a ProximitySamples,
    options: ProximityOptions,
}

impl<'a> Proximity<'a> {
    pub(crate) fn try_new(spline: &'a dyn Spline, options: ProximityOptions) -> Result<Self> {
        if !(options.gamma > 0. && options.gamma <= 1.) {
            return Err(SplineError::InvalidParameter(format!(
                "Newton step scale must be in (0, 1], got {}",
                options.gamma
            )));
        }
        let samples = spline
            .proximity_cache()
            .get_or_try_init(|| ProximitySamples::try_new(spline, options.samples_per_axis))?;
        Ok(Self {
            spline,
            samples,
            options,
        })
    }

    pub fn samples(&self) -> &ProximitySamples {
        self.samples
    }

    /// Find the parameter whose image is closest to `query`
    pub fn nearest(&self, query: &[f64]) -> Result<ProximityResult> {
        if query.len() != self.spline.dim() {
            return Err(SplineError::InvalidParameter(format!(
                "query point has {} coordinates, expected {}",
                query.len(),
                self.spline.dim()
            )));
        }

        let seed = self.samples.parameters[self.samples.closest(query)].clone();
        let para_dim = self.spline.para_dim();
        let bounds = self.spline.parametric_bounds();
        let bounds = (0..para_dim)
            .map(|axis| (bounds[axis], bounds[para_dim + axis]))
            .collect();

        let solver = ProximityNewton::new(bounds, self.options.gamma, self.options.step_tolerance);
        let res = Executor::new(ProximityProblem::new(self.spline, query), solver)
            .configure(|state| {
                state
                    .param(DVector::from_vec(seed))
                    .max_iters(self.options.max_iters)
            })
            .run()?;
        log::trace!(
            "proximity search terminated after {} iterations: {:?}",
            res.state().get_iter(),
            res.state().get_termination_status()
        );
        let parameter = res
            .state()
            .get_best_param()
            .cloned()
            .ok_or(anyhow::anyhow!("No best parameter found"))?;

        let point = self.spline.evaluate(parameter.as_slice())?;
        let distance = squared_distance(&point, query).sqrt();
        Ok(ProximityResult {
            parameter: parameter.as_slice().to_vec(),
            point,
            distance,
        })
    }
}
