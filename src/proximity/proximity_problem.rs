use argmin::core::{CostFunction, Gradient, Hessian};
use nalgebra::{DMatrix, DVector};

use crate::spline::Spline;

/// Squared distance between a spline and a query point with its first and second derivatives
pub struct ProximityProblem<'a> {
    spline: &'a dyn Spline,
    query: &'a [f64],
}

impl<'a> ProximityProblem<'a> {
    pub fn new(spline: &'a dyn Spline, query: &'a [f64]) -> Self {
        ProximityProblem { spline, query }
    }

    fn residual(&self, param: &DVector<f64>) -> Result<DVector<f64>, anyhow::Error> {
        let point = self.spline.evaluate(param.as_slice())?;
        Ok(DVector::from_vec(point) - DVector::from_column_slice(self.query))
    }

    fn partial(&self, param: &DVector<f64>, orders: &[usize]) -> Result<DVector<f64>, anyhow::Error> {
        Ok(DVector::from_vec(
            self.spline.derivative(param.as_slice(), orders)?,
        ))
    }

    fn unit_orders(&self, axes: &[usize]) -> Vec<usize> {
        let mut orders = vec![0; self.spline.para_dim()];
        axes.iter().for_each(|axis| orders[*axis] += 1);
        orders
    }
}

impl CostFunction for ProximityProblem<'_> {
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        Ok(0.5 * self.residual(param)?.norm_squared())
    }
}

impl Gradient for ProximityProblem<'_> {
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let residual = self.residual(param)?;
        let para_dim = self.spline.para_dim();
        let mut gradient = DVector::zeros(para_dim);
        for axis in 0..para_dim {
            gradient[axis] = residual.dot(&self.partial(param, &self.unit_orders(&[axis]))?);
        }
        Ok(gradient)
    }
}

impl Hessian for ProximityProblem<'_> {
    type Param = DVector<f64>;
    type Hessian = DMatrix<f64>;

    fn hessian(&self, param: &Self::Param) -> Result<Self::Hessian, anyhow::Error> {
        let residual = self.residual(param)?;
        let para_dim = self.spline.para_dim();
        let firsts = (0..para_dim)
            .map(|axis| self.partial(param, &self.unit_orders(&[axis])))
            .collect::<Result<Vec<_>, _>>()?;
        let mut hessian = DMatrix::zeros(para_dim, para_dim);
        for a in 0..para_dim {
            for b in a..para_dim {
                let second = self.partial(param, &self.unit_orders(&[a, b]))?;
                let value = firsts[a].dot(&firsts[b]) + residual.dot(&second);
                hessian[(a, b)] = value;
                hessian[(b, a)] = value;
            }
        }
        Ok(hessian)
    }
}
