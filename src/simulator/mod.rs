//! The simulator module provides the mechanics to orchestrate the models
//! and connectors via discrete event simulation.  The specific formalism
//! for simulation execution is the Discrete Event System Specification.
//! User interaction is also captured in this module - simulation stepping
//! and input injection.
//!
//! Each simulation step processes one instant completely, in three
//! batched phases: every imminent model's output function runs and its
//! events are routed, then every imminent model transitions internally
//! (or confluently, if it also received events), then every other
//! receiving model transitions externally.  This batching is the central
//! causality invariant: a downstream model always observes fully-emitted
//! upstream output, never a partially-updated neighbor.  Zero-duration
//! chains of follow-on events are worked off inside the same step, under
//! a configurable livelock cap, before the clock advances.
//!
//! Most simulation analysis will involve the collection, transformation,
//! and analysis of messages.  The `step`, `step_n`, and `step_until`
//! methods return the messages generated during the execution of the
//! simulation step(s), for use in message analysis.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::models::{Coupled, Model, ModelRecord, Reportable};
use crate::utils::errors::SimulationError;

pub mod coupling;
pub mod services;

pub use self::coupling::{Connector, Message};
pub use self::services::Services;

/// The lifecycle of a simulation.  Driving calls are valid only in the
/// states the lifecycle prescribes: `initialize` from `Created`, stepping
/// from `Initialized` or `Running`, `exit` any time after initialization
/// (and exactly once against the models).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Created,
    Initialized,
    Running,
    Terminated,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Created
    }
}

impl Lifecycle {
    fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Running => "running",
            Lifecycle::Terminated => "terminated",
        }
    }
}

fn default_livelock_cap() -> usize {
    1000
}

/// The `Simulation` struct is the core of bloomsim, and includes
/// everything needed to run a simulation - models, connectors, and the
/// clock/RNG services.  It is the coordinator of the Discrete Event
/// System Specification: it owns every model's state for the duration of
/// the run, computes the global next-event time, and drives the
/// three-phase step loop.
///
/// Ties between simultaneously imminent models are broken in model
/// registration order (for hierarchies, the depth-first flattening
/// order); models should not depend on sibling evaluation order within an
/// instant.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    models: Vec<Model>,
    connectors: Vec<Connector>,
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    injections: Vec<Message>,
    #[serde(default)]
    services: Services,
    #[serde(default = "default_livelock_cap")]
    livelock_cap: usize,
    #[serde(default)]
    lifecycle: Lifecycle,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            connectors: Vec::new(),
            root: None,
            messages: Vec::new(),
            injections: Vec::new(),
            services: Services::default(),
            livelock_cap: default_livelock_cap(),
            lifecycle: Lifecycle::default(),
        }
    }
}

impl Simulation {
    /// This constructor method creates a simulation from a supplied flat
    /// configuration (models and connectors).  Model IDs must be unique
    /// and every connector endpoint must name an existing model port of
    /// the right direction.
    pub fn post(
        models: Vec<Model>,
        connectors: Vec<Connector>,
    ) -> Result<Self, SimulationError> {
        validate_model_ids(&models)?;
        for connector in &connectors {
            validate_connector(&models, connector)?;
        }
        Ok(Self {
            models,
            connectors,
            ..Self::default()
        })
    }

    /// This constructor method creates a simulation from a hierarchical
    /// coupled model, flattening its nested couplings into direct
    /// connectors between leaf atomic ports.
    pub fn from_coupled(root: Coupled) -> Result<Self, SimulationError> {
        let flattened = coupling::flatten(root)?;
        validate_model_ids(&flattened.models)?;
        Ok(Self {
            models: flattened.models,
            connectors: flattened.connectors,
            root: Some(flattened.root),
            ..Self::default()
        })
    }

    /// Simulation steps generate messages, which may then trigger further
    /// transitions on subsequent instants.  This accessor method provides
    /// the list of messages routed during the most recent step.  Message
    /// history is not retained, so simulation products and projects
    /// should collect messages as needed throughout the simulation
    /// execution.
    pub fn get_messages(&self) -> &Vec<Message> {
        &self.messages
    }

    /// An accessor method for the simulation global time.
    pub fn get_global_time(&self) -> f64 {
        self.services.global_time()
    }

    /// An accessor method for the simulation lifecycle state.
    pub fn get_lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The cap on same-instant iterations within one step, after which
    /// the step fails with `Livelock`.
    pub fn set_livelock_cap(&mut self, cap: usize) {
        self.livelock_cap = cap;
    }

    /// This method provides a mechanism for getting the status of any
    /// model in a simulation.  The method takes the model ID as an
    /// argument, and returns the current status string for that model.
    pub fn get_status(&self, model_id: &str) -> Result<String, SimulationError> {
        Ok(self
            .models
            .iter()
            .find(|model| model.id() == model_id)
            .ok_or_else(|| SimulationError::ModelNotFound {
                id: model_id.to_string(),
            })?
            .status())
    }

    /// This method provides a mechanism for getting the records of any
    /// model in a simulation.  The method takes the model ID as an
    /// argument, and returns the records for that model.
    pub fn get_records(&self, model_id: &str) -> Result<&Vec<ModelRecord>, SimulationError> {
        Ok(self
            .models
            .iter()
            .find(|model| model.id() == model_id)
            .ok_or_else(|| SimulationError::ModelNotFound {
                id: model_id.to_string(),
            })?
            .records())
    }

    /// This method provides a convenient foundation for operating on the
    /// full set of models in the simulation.
    pub fn models(&mut self) -> Vec<&mut Model> {
        self.models.iter_mut().collect()
    }

    /// The absolute time of the next scheduled event, if any model has
    /// one (or an injected input is waiting).  `None` means the
    /// simulation is deadlocked: every model is passive and no input is
    /// pending.
    pub fn next_event_time(&self) -> Option<f64> {
        if !self.injections.is_empty() {
            return Some(self.services.global_time());
        }
        let until_next_event = self
            .models
            .iter()
            .fold(f64::INFINITY, |min, model| {
                f64::min(min, model.until_next_event())
            });
        if until_next_event.is_finite() {
            Some(self.services.global_time() + until_next_event)
        } else {
            None
        }
    }

    /// Input injection creates a message during simulation execution,
    /// without needing to create that message through the standard
    /// simulation constructs.  This enables live simulation interaction,
    /// disruption, and manipulation - all through the standard simulation
    /// message system.  The injected message is delivered at the current
    /// global time on the next step; a message targeting a boundary input
    /// port of the root coupled model fans out along its flattened
    /// couplings.
    pub fn inject_input(&mut self, message: Message) {
        self.injections.push(message);
    }

    /// This method calls `initialize` on every model, establishing each
    /// one's first scheduled event.  Runs once, before any stepping.
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        if self.lifecycle != Lifecycle::Created {
            return Err(SimulationError::InvalidLifecycle {
                operation: "initialize",
                state: self.lifecycle.as_str(),
            });
        }
        info!("initializing {} models", self.models.len());
        for index in 0..self.models.len() {
            self.models[index]
                .initialize(&mut self.services)
                .map_err(|source| self.transition_error(index, source))?;
        }
        self.lifecycle = Lifecycle::Initialized;
        Ok(())
    }

    /// The simulation step is foundational for a discrete event
    /// simulation.  This method advances the clock to the next event
    /// time and executes that complete instant: output collection and
    /// routing for all imminent models, then internal, confluent, and
    /// external transitions, repeating for zero-duration follow-ons up
    /// to the livelock cap.  Returns the messages routed during the
    /// step.  A step with every model passive and no injected input is a
    /// no-op returning no messages.
    pub fn step(&mut self) -> Result<Vec<Message>, SimulationError> {
        match self.lifecycle {
            Lifecycle::Initialized | Lifecycle::Running => {}
            _ => {
                return Err(SimulationError::InvalidLifecycle {
                    operation: "step",
                    state: self.lifecycle.as_str(),
                });
            }
        }
        self.lifecycle = Lifecycle::Running;
        self.messages.clear();
        let until_next_event = if self.injections.is_empty() {
            self.models.iter().fold(f64::INFINITY, |min, model| {
                f64::min(min, model.until_next_event())
            })
        } else {
            0.0
        };
        if !until_next_event.is_finite() {
            debug!("every model is passive; nothing to step");
            return Ok(Vec::new());
        }
        self.advance_clock(until_next_event);
        let now = self.services.global_time();
        debug!("stepping instant t={}", now);

        let injections = std::mem::replace(&mut self.injections, Vec::new());
        for message in injections {
            self.deliver(message)?;
        }

        let mut iterations: usize = 0;
        loop {
            let imminent: Vec<usize> = (0..self.models.len())
                .filter(|index| self.models[*index].until_next_event() == 0.0)
                .collect();
            let receiving = (0..self.models.len())
                .any(|index| self.models[index].has_pending_input());
            if imminent.is_empty() && !receiving {
                break;
            }
            iterations += 1;
            if iterations > self.livelock_cap {
                warn!(
                    "livelock cap of {} same-instant iterations exceeded at t={}",
                    self.livelock_cap, now
                );
                return Err(SimulationError::Livelock {
                    time: now,
                    iterations: self.livelock_cap,
                });
            }
            // Phase 1: output functions for all imminent models, and
            // event routing along the flattened connectors
            for &index in &imminent {
                let outputs = self.models[index]
                    .collect_outputs()
                    .map_err(|source| self.transition_error(index, source))?;
                for (port, events) in outputs {
                    for event in events {
                        self.route(index, &port, event)?;
                    }
                }
            }
            // Phase 2: internal transitions for imminent models that
            // received nothing
            for &index in &imminent {
                if !self.models[index].has_pending_input() {
                    self.models[index]
                        .transition_int(&mut self.services)
                        .map_err(|source| self.transition_error(index, source))?;
                }
            }
            // Phase 3: confluent transitions for models both imminent and
            // receiving
            for &index in &imminent {
                if self.models[index].has_pending_input() {
                    self.models[index]
                        .transition_conf(&mut self.services)
                        .map_err(|source| self.transition_error(index, source))?;
                }
            }
            // Phase 4: external transitions for the remaining receivers
            for index in 0..self.models.len() {
                if self.models[index].has_pending_input() {
                    self.models[index]
                        .transition_ext(&mut self.services)
                        .map_err(|source| self.transition_error(index, source))?;
                }
            }
        }
        Ok(self.messages.clone())
    }

    /// This method executes the specified number of simulation steps,
    /// `n`, stopping early if the simulation deadlocks.  Upon execution
    /// of the steps, the messages from all the steps are returned.
    pub fn step_n(&mut self, n: usize) -> Result<Vec<Message>, SimulationError> {
        match self.lifecycle {
            Lifecycle::Initialized | Lifecycle::Running => {}
            _ => {
                return Err(SimulationError::InvalidLifecycle {
                    operation: "step",
                    state: self.lifecycle.as_str(),
                });
            }
        }
        let mut message_records: Vec<Message> = Vec::new();
        for _ in 0..n {
            if self.next_event_time().is_none() {
                break;
            }
            message_records.extend(self.step()?);
        }
        Ok(message_records)
    }

    /// This method executes simulation steps until the global clock
    /// reaches `until`, or the simulation deadlocks, whichever comes
    /// first.  Events scheduled exactly at the horizon still fire; a
    /// model scheduled beyond it is simply never triggered.  The clock
    /// lands exactly on the horizon, so a later resume stays consistent.
    /// The messages from all the steps are returned.
    pub fn step_until(&mut self, until: f64) -> Result<Vec<Message>, SimulationError> {
        match self.lifecycle {
            Lifecycle::Initialized | Lifecycle::Running => {}
            _ => {
                return Err(SimulationError::InvalidLifecycle {
                    operation: "step",
                    state: self.lifecycle.as_str(),
                });
            }
        }
        let mut message_records: Vec<Message> = Vec::new();
        loop {
            match self.next_event_time() {
                Some(next) if next <= until => {
                    message_records.extend(self.step()?);
                }
                _ => break,
            }
        }
        let remaining = until - self.services.global_time();
        if remaining > 0.0 {
            self.advance_clock(remaining);
        }
        Ok(message_records)
    }

    /// This method calls `exit` on every model, exactly once, after the
    /// run loop ends - however it ended.  Models use it to flush
    /// accumulated side effects.  Calling `exit` again is a no-op.
    pub fn exit(&mut self) -> Result<(), SimulationError> {
        match self.lifecycle {
            Lifecycle::Terminated => return Ok(()),
            Lifecycle::Created => {
                return Err(SimulationError::InvalidLifecycle {
                    operation: "exit",
                    state: self.lifecycle.as_str(),
                });
            }
            _ => {}
        }
        info!(
            "terminating simulation at simulated time {}",
            self.services.global_time()
        );
        for index in 0..self.models.len() {
            self.models[index]
                .exit(&mut self.services)
                .map_err(|source| self.transition_error(index, source))?;
        }
        self.lifecycle = Lifecycle::Terminated;
        Ok(())
    }

    fn advance_clock(&mut self, time_delta: f64) {
        self.models
            .iter_mut()
            .for_each(|model| model.time_advance(time_delta));
        self.services
            .set_global_time(self.services.global_time() + time_delta);
    }

    /// Route one emitted event to every connector target, copying the
    /// event per delivery.  An event emitted on an uncoupled port is
    /// dropped.
    fn route(
        &mut self,
        source_index: usize,
        source_port: &str,
        event: Event,
    ) -> Result<(), SimulationError> {
        let source_id = self.models[source_index].id().to_string();
        let time = self.services.global_time();
        let targets: Vec<(String, String)> = self
            .connectors
            .iter()
            .filter(|connector| {
                connector.source_id() == source_id && connector.source_port() == source_port
            })
            .map(|connector| {
                (
                    connector.target_id().to_string(),
                    connector.target_port().to_string(),
                )
            })
            .collect();
        if targets.is_empty() {
            debug!(
                "dropping event from uncoupled port {}.{}",
                source_id, source_port
            );
            return Ok(());
        }
        for (target_id, target_port) in targets {
            self.deliver(Message::new(
                source_id.clone(),
                source_port.to_string(),
                target_id,
                target_port,
                time,
                event.clone(),
            ))?;
        }
        Ok(())
    }

    /// Deliver one message: deposit the event into the target model's
    /// input port, or - for a root boundary target - fan out along the
    /// flattened couplings (inputs) or record the message as observable
    /// output (outputs).
    fn deliver(&mut self, message: Message) -> Result<(), SimulationError> {
        if self.root.as_deref() == Some(message.target_id()) {
            let targets: Vec<(String, String)> = self
                .connectors
                .iter()
                .filter(|connector| {
                    connector.source_id() == message.target_id()
                        && connector.source_port() == message.target_port()
                })
                .map(|connector| {
                    (
                        connector.target_id().to_string(),
                        connector.target_port().to_string(),
                    )
                })
                .collect();
            if targets.is_empty() {
                // A boundary output of the root: observable, undelivered
                self.messages.push(message);
                return Ok(());
            }
            for (target_id, target_port) in targets {
                self.deliver(Message::new(
                    message.source_id().to_string(),
                    message.source_port().to_string(),
                    target_id,
                    target_port,
                    message.time(),
                    message.event().clone(),
                ))?;
            }
            return Ok(());
        }
        let target_index = self
            .models
            .iter()
            .position(|model| model.id() == message.target_id())
            .ok_or_else(|| SimulationError::ModelNotFound {
                id: message.target_id().to_string(),
            })?;
        self.models[target_index]
            .deposit(message.target_port(), message.event().clone())
            .map_err(|source| self.transition_error(target_index, source))?;
        self.messages.push(message);
        Ok(())
    }

    fn transition_error(&self, index: usize, source: SimulationError) -> SimulationError {
        SimulationError::TransitionFailed {
            id: self.models[index].id().to_string(),
            time: self.services.global_time(),
            phase: self.models[index].phase().to_string(),
            source: Box::new(source),
        }
    }
}

fn validate_model_ids(models: &[Model]) -> Result<(), SimulationError> {
    for (index, model) in models.iter().enumerate() {
        if models
            .iter()
            .skip(index + 1)
            .any(|other| other.id() == model.id())
        {
            return Err(SimulationError::DuplicateName {
                parent: String::from("simulation"),
                name: model.id().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_connector(models: &[Model], connector: &Connector) -> Result<(), SimulationError> {
    let describe = || -> (String, String) {
        (
            format!["{}.{}", connector.source_id(), connector.source_port()],
            format!["{}.{}", connector.target_id(), connector.target_port()],
        )
    };
    let source = models
        .iter()
        .find(|model| model.id() == connector.source_id());
    let target = models
        .iter()
        .find(|model| model.id() == connector.target_id());
    match (source, target) {
        (Some(source), Some(target)) => {
            if !source.has_output_port(connector.source_port()) {
                let (source, target) = describe();
                return Err(SimulationError::InvalidCoupling {
                    source,
                    target,
                    reason: String::from("no such output port on the source model"),
                });
            }
            if !target.has_input_port(connector.target_port()) {
                let (source, target) = describe();
                return Err(SimulationError::InvalidCoupling {
                    source,
                    target,
                    reason: String::from("no such input port on the target model"),
                });
            }
            Ok(())
        }
        _ => {
            let (source, target) = describe();
            Err(SimulationError::InvalidCoupling {
                source,
                target,
                reason: String::from("connector endpoint names a missing model"),
            })
        }
    }
}
