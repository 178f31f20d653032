use std::sync::OnceLock;

use crate::error::{Result, SplineError};
use crate::spline::Spline;

/// Regular grid of parameters and the points they map to
#[derive(Clone, Debug)]
pub struct ProximitySamples {
    pub parameters: Vec<Vec<f64>>,
    pub points: Vec<Vec<f64>>,
}

impl ProximitySamples {
    /// Sample `samples_per_axis` parameters per axis across the bounds, axis 0 running fastest.
    /// Parameters where the spline can not be evaluated are skipped.
    pub fn try_new(spline: &dyn Spline, samples_per_axis: usize) -> Result<Self> {
        let para_dim = spline.para_dim();
        let bounds = spline.parametric_bounds();
        let k = samples_per_axis.max(2);
        let total = k.pow(para_dim as u32);

        let mut parameters = Vec::with_capacity(total);
        let mut points = Vec::with_capacity(total);
        for flat in 0..total {
            let mut rest = flat;
            let parameter: Vec<f64> = (0..para_dim)
                .map(|axis| {
                    let i = rest % k;
                    rest /= k;
                    let (lo, hi) = (bounds[axis], bounds[para_dim + axis]);
                    lo + (hi - lo) * i as f64 / (k - 1) as f64
                })
                .collect();
            match spline.evaluate(&parameter) {
                Ok(point) => {
                    parameters.push(parameter);
                    points.push(point);
                }
                Err(e) => log::trace!("skipping proximity sample {parameter:?}: {e}"),
            }
        }

        if points.is_empty() {
            return Err(SplineError::DegenerateGeometry(format!(
                "{} can not be evaluated anywhere on the sample grid",
                spline.what_am_i()
            )));
        }
        log::debug!(
            "built {} proximity samples for {}",
            points.len(),
            spline.what_am_i()
        );
        Ok(Self { parameters, points })
    }

    /// Index of the sample closest to `query`
    pub fn closest(&self, query: &[f64]) -> usize {
        self.points
            .iter()
            .map(|p| squared_distance(p, query))
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
            .0
    }
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Lazily built proximity samples owned by a spline.
/// Clones start empty and refinement resets the cache.
#[derive(Debug, Default)]
pub struct ProximityCache(OnceLock<ProximitySamples>);

impl Clone for ProximityCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl ProximityCache {
    pub fn is_initialized(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn reset(&mut self) {
        self.0 = OnceLock::new();
    }

    pub(crate) fn get_or_try_init(
        &self,
        init: impl FnOnce() -> Result<ProximitySamples>,
    ) -> Result<&ProximitySamples> {
        if let Some(samples) = self.0.get() {
            return Ok(samples);
        }
        let samples = init()?;
        Ok(self.0.get_or_init(|| samples))
    }
}
