//! The models module provides the contract between the simulator and any
//! atomic model, the coupled-model composition structures, and a set of
//! prebuilt pipeline models for easy reuse in simulation products and
//! projects.  Custom models implement the `DevsModel` and `Reportable`
//! traits, and may register with the model factory for config-driven
//! construction.

use serde::{Deserialize, Serialize};

pub mod atomic;
pub mod commander;
pub mod coupled;
pub mod generator;
pub mod model;
pub mod ports;
pub mod sensor;
pub mod storage;

pub mod model_factory;
pub mod model_repr;

pub use self::atomic::{
    AtomicState, DevsModel, Reportable, ReportableModel, SerializableModel, PHASE_ACTIVE,
    PHASE_PASSIVE,
};
pub use self::commander::{Commander, ScheduledCommand};
pub use self::coupled::{
    Component, Coupled, ExternalInputCoupling, ExternalOutputCoupling, InternalCoupling, PortRef,
};
pub use self::generator::{Generator, Waypoint};
pub use self::model::Model;
pub use self::ports::{Bag, Port, PortDirection};
pub use self::sensor::{FieldSeries, PowerProfile, Sensor, SensorProfile};
pub use self::storage::Storage;

pub use self::model_repr::ModelRepr;

/// The records of a model's notable actions, kept for simulation
/// reasoning, reporting, and debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub time: f64,
    pub action: String,
    pub subject: String,
}
