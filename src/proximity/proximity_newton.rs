use argmin::{argmin_error_closure, core::*};
use nalgebra::{DMatrix, DVector};

type NewtonState = IterState<DVector<f64>, DVector<f64>, (), (), (), f64>;

/// Newton's method on the squared distance, constrained to the parametric bounds
/// Follows argmin's Newton solver: https://argmin-rs.github.io/argmin/argmin/solver/newton/struct.Newton.html
#[derive(Clone, Debug)]
pub struct ProximityNewton {
    /// gamma
    gamma: f64,
    /// parametric bounds per axis
    bounds: Vec<(f64, f64)>,
    /// step length treated as converged
    step_tolerance: f64,
}

impl ProximityNewton {
    pub fn new(bounds: Vec<(f64, f64)>, gamma: f64, step_tolerance: f64) -> Self {
        ProximityNewton {
            gamma,
            bounds,
            step_tolerance,
        }
    }

    fn constrain(&self, mut param: DVector<f64>) -> DVector<f64> {
        param
            .iter_mut()
            .zip(self.bounds.iter())
            .for_each(|(u, (lo, hi))| *u = u.clamp(*lo, *hi));
        param
    }
}

impl<O> Solver<O, NewtonState> for ProximityNewton
where
    O: CostFunction<Param = DVector<f64>, Output = f64>
        + Gradient<Param = DVector<f64>, Gradient = DVector<f64>>
        + Hessian<Param = DVector<f64>, Hessian = DMatrix<f64>>,
{
    const NAME: &'static str = "Proximity newton method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState,
    ) -> Result<(NewtonState, Option<KV>), Error> {
        let x0 = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`ProximityNewton` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let cost = problem.cost(x0)?;
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState,
    ) -> Result<(NewtonState, Option<KV>), Error> {
        let param = state
            .get_param()
            .ok_or_else(argmin_error_closure!(
                NotInitialized,
                "`ProximityNewton` lost its parameter vector."
            ))?
            .clone();

        let grad = problem.gradient(&param)?;
        let hessian = problem.hessian(&param)?;

        // fall back to steepest descent where the Hessian is singular
        let step = hessian
            .lu()
            .solve(&-&grad)
            .filter(|step| step.iter().all(|v| v.is_finite()))
            .unwrap_or_else(|| -&grad);

        let new_param = self.constrain(&param + step * self.gamma);
        let new_cost = problem.cost(&new_param)?;

        // halt if cost is not decreasing
        if state.get_cost() < new_cost {
            Ok((state.param(param), None))
        } else {
            Ok((state.cost(new_cost).param(new_param), None))
        }
    }

    fn terminate(&mut self, state: &NewtonState) -> TerminationStatus {
        if state.iter > state.max_iters {
            return TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        }

        match (state.get_param(), state.get_prev_param()) {
            (Some(current_param), Some(prev_param)) => {
                let delta = (current_param - prev_param).norm();
                if delta < self.step_tolerance {
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                } else {
                    TerminationStatus::NotTerminated
                }
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}
