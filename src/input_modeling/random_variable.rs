//! Random variables underpin both stochastic and deterministic model
//! behaviors, in that deterministic operation is a random variable with a
//! single value of probability 1.  Common distributions, with their
//! common parameterizations, are wrapped in the `Continuous` and
//! `Boolean` enums.

use rand::distributions::Distribution;
use serde::{Deserialize, Serialize};

use rand_distr::{Bernoulli, Exp, Normal, Triangular, Uniform};

use super::dynamic_rng::DynRng;
use crate::utils::errors::SimulationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Continuous {
    Exp { lambda: f64 },
    Normal { mean: f64, std_dev: f64 },
    /// A degenerate distribution - every draw yields `value`
    Point { value: f64 },
    Triangular { min: f64, max: f64, mode: f64 },
    Uniform { min: f64, max: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Boolean {
    Bernoulli { p: f64 },
}

impl Continuous {
    /// The generation of random variates drives stochastic behaviors
    /// during simulation execution.  This function requires the random
    /// number generator of the simulation, and produces a f64 random
    /// variate.
    pub fn random_variate(&mut self, rng: DynRng) -> Result<f64, SimulationError> {
        let mut rng = rng.borrow_mut();
        match self {
            Continuous::Exp { lambda } => Ok(Exp::new(*lambda)?.sample(&mut *rng)),
            Continuous::Normal { mean, std_dev } => {
                Ok(Normal::new(*mean, *std_dev)?.sample(&mut *rng))
            }
            Continuous::Point { value } => Ok(*value),
            Continuous::Triangular { min, max, mode } => {
                Ok(Triangular::new(*min, *max, *mode)?.sample(&mut *rng))
            }
            Continuous::Uniform { min, max } => Ok(Uniform::new(*min, *max).sample(&mut *rng)),
        }
    }
}

impl Boolean {
    /// The generation of random variates drives stochastic behaviors
    /// during simulation execution.  This function requires the random
    /// number generator of the simulation, and produces a boolean random
    /// variate.
    pub fn random_variate(&mut self, rng: DynRng) -> Result<bool, SimulationError> {
        let mut rng = rng.borrow_mut();
        match self {
            Boolean::Bernoulli { p } => Ok(Bernoulli::new(*p)?.sample(&mut *rng)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_modeling::dynamic_rng::default_rng;

    #[test]
    fn point_draws_are_constant() {
        let mut variable = Continuous::Point { value: 3.5 };
        let rng = default_rng();
        for _ in 0..4 {
            assert_eq!(variable.random_variate(rng.clone()).unwrap(), 3.5);
        }
    }

    #[test]
    fn uniform_draws_stay_in_support() {
        let mut variable = Continuous::Uniform { min: 1.0, max: 2.0 };
        let rng = default_rng();
        for _ in 0..100 {
            let variate = variable.random_variate(rng.clone()).unwrap();
            assert!((1.0..2.0).contains(&variate));
        }
    }
}
