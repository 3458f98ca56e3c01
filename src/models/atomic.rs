//! The atomic module specifies the contract between the simulator and any
//! atomic model, per the Discrete Event System Specification: a
//! time-advance countdown, an internal transition, an external
//! transition, a confluent transition, and a non-mutating output
//! function.  Models embed a flat `AtomicState` (phase label plus sigma)
//! by composition; behavior differences are composed strategies, never
//! inheritance chains.

use serde::{Deserialize, Serialize};

use super::ports::Bag;
use super::ModelRecord;
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// The conventional label of a model waiting for external input.
pub const PHASE_PASSIVE: &str = "passive";
/// The conventional label of a model scheduled to act immediately.
pub const PHASE_ACTIVE: &str = "active";

/// The engine-visible state of an atomic model: an application-chosen
/// phase label and `sigma`, the remaining time to the model's next
/// internal event.  After any transition function returns, the pair fully
/// determines the model's next absolute event time as
/// `current time + sigma`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicState {
    phase: String,
    sigma: f64,
}

impl Default for AtomicState {
    fn default() -> Self {
        Self {
            phase: PHASE_PASSIVE.to_string(),
            sigma: f64::INFINITY,
        }
    }
}

impl AtomicState {
    pub fn new() -> Self {
        Default::default()
    }

    /// This accessor method returns the current phase label.
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// This accessor method returns the remaining time to the next
    /// internal event; infinity means passive.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Schedule the next internal event `sigma` time units from now,
    /// under the given phase label.
    pub fn hold_in(&mut self, phase: &str, sigma: f64) {
        debug_assert!(sigma >= 0.0, "sigma must be non-negative");
        self.phase = phase.to_string();
        self.sigma = sigma;
    }

    /// Renounce any further self-scheduled event.  Only an external event
    /// can wake a passive model.
    pub fn passivate(&mut self) {
        self.hold_in(PHASE_PASSIVE, f64::INFINITY);
    }

    /// Schedule an immediate internal event.
    pub fn activate(&mut self) {
        self.hold_in(PHASE_ACTIVE, 0.0);
    }

    pub fn is_passive(&self) -> bool {
        !self.sigma.is_finite()
    }

    pub(crate) fn advance(&mut self, time_delta: f64) {
        if self.sigma.is_finite() {
            self.sigma -= time_delta;
        }
    }
}

pub trait ModelClone {
    fn clone_box(&self) -> Box<dyn ReportableModel>;
}

impl<T> ModelClone for T
where
    T: 'static + ReportableModel + Clone,
{
    fn clone_box(&self) -> Box<dyn ReportableModel> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ReportableModel> {
    fn clone(&self) -> Box<dyn ReportableModel> {
        self.clone_box()
    }
}

pub trait SerializableModel {
    fn get_type(&self) -> &'static str {
        "Model"
    }
    fn serialize(&self) -> serde_yaml::Value {
        serde_yaml::Value::Null
    }
}

/// The `DevsModel` trait defines everything required for a model to
/// operate within the discrete event simulation.
///
/// The simulator reads `until_next_event` and drives `time_advance` on
/// every model each step, so a model's countdown is already "continued"
/// by the time `events_ext` runs; `elapsed` reports the time since the
/// model's last transition of any kind.
///
/// A transition function that returns an error aborts the whole run - the
/// engine performs no recovery, since transition functions are assumed
/// deterministic and total.
pub trait DevsModel: ModelClone + SerializableModel {
    /// The engine-visible phase/sigma state.
    fn state(&self) -> &AtomicState;
    fn state_mut(&mut self) -> &mut AtomicState;

    /// The input port names this model declares.
    fn ports_in(&self) -> Vec<String>;
    /// The output port names this model declares.
    fn ports_out(&self) -> Vec<String>;

    /// Establish the initial phase/sigma and any derived state.  Runs
    /// once, before the first scheduling decision.
    fn initialize(&mut self, services: &mut Services) -> Result<(), SimulationError>;

    /// The external transition, invoked when one or more input ports
    /// received events before sigma fully elapsed.  Ports are bags: a
    /// port may carry more than one event in the same instant.
    fn events_ext(
        &mut self,
        elapsed: f64,
        inputs: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError>;

    /// The internal transition, invoked when sigma has elapsed with no
    /// intervening external event.  Input ports are guaranteed empty.
    fn events_int(&mut self, services: &mut Services) -> Result<(), SimulationError>;

    /// The confluent transition, invoked when the model is imminent and
    /// receiving in the same instant.  The default policy is internal
    /// transition first, then external transition with zero elapsed time,
    /// so the external transition observes the post-internal state.
    fn events_conf(&mut self, inputs: &Bag, services: &mut Services) -> Result<(), SimulationError> {
        self.events_int(services)?;
        self.events_ext(0.0, inputs, services)
    }

    /// The output function, invoked immediately before the internal (or
    /// confluent) transition when the model is imminent.  Reads state and
    /// deposits zero or more events on output ports; must not mutate
    /// model state.
    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError>;

    /// Flush buffered side effects.  Runs exactly once, after the run
    /// loop ends.
    fn exit(&mut self, _services: &mut Services) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Time remaining until this model's next scheduled internal event,
    /// absent external interference.
    fn until_next_event(&self) -> f64 {
        self.state().sigma()
    }

    /// Continue the countdown by `time_delta`.  Driven by the simulator;
    /// models do not normally override this.
    fn time_advance(&mut self, time_delta: f64) {
        self.state_mut().advance(time_delta);
    }
}

/// The additional status and record-keeping methods of `Reportable`
/// provide improved simulation reasoning, reporting, and debugging, but
/// do not impact simulation execution or results.
pub trait Reportable {
    fn status(&self) -> String;
    fn records(&self) -> &Vec<ModelRecord>;
}

/// A `ReportableModel` has the required Discrete Event System
/// Specification methods of trait `DevsModel` and the status reporting
/// and record keeping mechanisms of trait `Reportable`.
pub trait ReportableModel: DevsModel + Reportable {}
