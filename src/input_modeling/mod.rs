//! The input modeling module provides a foundation for configurable model
//! behaviors, whether deterministic or stochastic.  The module includes
//! random variable distributions for use in atomic models and a structure
//! around shared random number generation.

pub mod dynamic_rng;
pub mod random_variable;

pub use self::dynamic_rng::{dyn_rng, DynRng, SimulationRng};
pub use self::random_variable::Boolean as BooleanRandomVariable;
pub use self::random_variable::Continuous as ContinuousRandomVariable;
