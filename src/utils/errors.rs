//! The `SimulationError` taxonomy covers construction-time validation,
//! run-time lifecycle/livelock guards, and model-level failures, plus
//! conversions from the distribution and serialization crates used by
//! the engine.
//!
//! `Display`/`Error`/`From` are implemented by hand rather than via
//! `thiserror` because the `InvalidCoupling` variant carries a
//! descriptive field named `source` (the coupling's source endpoint),
//! which `thiserror` would otherwise treat as the error's cause.

use std::error::Error;
use std::fmt;

/// `SimulationError` enumerates all errors returned by the simulation
/// engine.
#[derive(Debug)]
pub enum SimulationError {
    /// Two components in the same parent share an identifier.
    DuplicateName { parent: String, name: String },

    /// A coupled model declares the same port twice.
    DuplicatePort { component: String, port: String },

    /// A coupling references missing ports/models or mismatched directions.
    InvalidCoupling {
        source: String,
        target: String,
        reason: String,
    },

    /// An operation was requested in a lifecycle state that forbids it.
    InvalidLifecycle {
        operation: &'static str,
        state: &'static str,
    },

    /// Same-instant transitions exceeded the livelock cap.
    Livelock { time: f64, iterations: usize },

    /// An operation referenced a model that does not exist.
    ModelNotFound { id: String },

    /// An operation referenced a port that does not exist.
    PortNotFound { port: String },

    /// A model transition failed, wrapping the underlying cause.
    TransitionFailed {
        id: String,
        time: f64,
        phase: String,
        source: Box<SimulationError>,
    },

    /// An invalid inter-model message was encountered.
    InvalidMessage,

    /// An invalid model configuration was encountered.
    InvalidModelConfiguration,

    /// An invalid model state was encountered.
    InvalidModelState,

    /// A JSON serialization/deserialization operation failed.
    JSONError(serde_json::Error),

    /// A YAML serialization/deserialization operation failed.
    YAMLError(serde_yaml::Error),

    /// An Exponential distribution was misconfigured.
    ExpError(rand_distr::ExpError),

    /// A Normal distribution was misconfigured.
    NormalError(rand_distr::NormalError),

    /// A Triangular distribution was misconfigured.
    TriangularError(rand_distr::TriangularError),

    /// A Bernoulli distribution was misconfigured.
    BernoulliError(rand_distr::BernoulliError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::DuplicateName { parent, name } => {
                write!(f, "duplicate component name `{}` in `{}`", name, parent)
            }
            SimulationError::DuplicatePort { component, port } => {
                write!(f, "duplicate port `{}` on component `{}`", port, component)
            }
            SimulationError::InvalidCoupling {
                source,
                target,
                reason,
            } => write!(
                f,
                "invalid coupling from `{}` to `{}`: {}",
                source, target, reason
            ),
            SimulationError::InvalidLifecycle { operation, state } => write!(
                f,
                "operation `{}` is invalid in lifecycle state `{}`",
                operation, state
            ),
            SimulationError::Livelock { time, iterations } => write!(
                f,
                "livelock: {} same-instant iterations exceeded at t={}",
                iterations, time
            ),
            SimulationError::ModelNotFound { id } => {
                write!(f, "model `{}` cannot be found in the simulation", id)
            }
            SimulationError::PortNotFound { port } => {
                write!(f, "port `{}` cannot be found", port)
            }
            SimulationError::TransitionFailed {
                id,
                time,
                phase,
                source,
            } => write!(
                f,
                "transition failed for model `{}` in phase `{}` at t={}: {}",
                id, phase, time, source
            ),
            SimulationError::InvalidMessage => {
                write!(f, "an invalid inter-model message was encountered")
            }
            SimulationError::InvalidModelConfiguration => {
                write!(f, "an invalid model configuration was encountered")
            }
            SimulationError::InvalidModelState => {
                write!(f, "an invalid model state was encountered")
            }
            SimulationError::JSONError(err) => write!(f, "{}", err),
            SimulationError::YAMLError(err) => write!(f, "{}", err),
            SimulationError::ExpError(err) => write!(f, "{}", err),
            SimulationError::NormalError(err) => write!(f, "{}", err),
            SimulationError::TriangularError(err) => write!(f, "{}", err),
            SimulationError::BernoulliError(err) => write!(f, "{}", err),
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimulationError::TransitionFailed { source, .. } => Some(&**source),
            SimulationError::JSONError(err) => Some(err),
            SimulationError::YAMLError(err) => Some(err),
            SimulationError::ExpError(err) => Some(err),
            SimulationError::NormalError(err) => Some(err),
            SimulationError::TriangularError(err) => Some(err),
            SimulationError::BernoulliError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::JSONError(err)
    }
}

impl From<serde_yaml::Error> for SimulationError {
    fn from(err: serde_yaml::Error) -> Self {
        SimulationError::YAMLError(err)
    }
}

impl From<rand_distr::ExpError> for SimulationError {
    fn from(err: rand_distr::ExpError) -> Self {
        SimulationError::ExpError(err)
    }
}

impl From<rand_distr::NormalError> for SimulationError {
    fn from(err: rand_distr::NormalError) -> Self {
        SimulationError::NormalError(err)
    }
}

impl From<rand_distr::TriangularError> for SimulationError {
    fn from(err: rand_distr::TriangularError) -> Self {
        SimulationError::TriangularError(err)
    }
}

impl From<rand_distr::BernoulliError> for SimulationError {
    fn from(err: rand_distr::BernoulliError) -> Self {
        SimulationError::BernoulliError(err)
    }
}
