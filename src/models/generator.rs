use serde::{Deserialize, Serialize};

use super::atomic::{AtomicState, DevsModel, Reportable, ReportableModel, SerializableModel};
use super::ports::Bag;
use super::ModelRecord;
use crate::event::{CommandId, Event, Payload, SensorVariable};
use crate::input_modeling::ContinuousRandomVariable;
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

use bloomsim_derive::SerializableModel;

/// The generator walks a sampling route through the water body, releasing
/// one measurement request per waypoint, with the time between releases
/// drawn from a configured interarrival distribution.  For non-stochastic
/// sampling, a `Point` random variable yields a constant period.  The
/// generator starts releasing at initialization, STOP_SIM suspends it,
/// START_SIM resumes it, and it passivates for good once the route is
/// exhausted.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableModel)]
#[serde(rename_all = "camelCase")]
pub struct Generator {
    // Time between sampling requests
    interarrival: ContinuousRandomVariable,
    variable: SensorVariable,
    route: Vec<Waypoint>,
    ports_in: PortsIn,
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

/// A georeferenced sampling point on the route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsIn {
    cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsOut {
    request: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    atomic: AtomicState,
    next_waypoint: usize,
    release_time: f64,
    records: Vec<ModelRecord>,
}

impl Generator {
    pub fn new(
        interarrival: ContinuousRandomVariable,
        variable: SensorVariable,
        route: Vec<Waypoint>,
        cmd_port: String,
        request_port: String,
    ) -> Self {
        Self {
            interarrival,
            variable,
            route,
            ports_in: PortsIn { cmd: cmd_port },
            ports_out: PortsOut {
                request: request_port,
            },
            state: State::default(),
        }
    }

    fn schedule_release(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        let interarrival = self.interarrival.random_variate(services.global_rng())?;
        if !interarrival.is_finite() || interarrival < 0.0 {
            return Err(SimulationError::InvalidModelConfiguration);
        }
        self.state.atomic.hold_in("generating", interarrival);
        self.state.release_time = services.global_time() + interarrival;
        Ok(())
    }

    fn suspend(&mut self, services: &mut Services) {
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("suspend"),
            subject: self.variable.to_string(),
        });
        self.state.atomic.passivate();
    }
}

impl DevsModel for Generator {
    fn state(&self) -> &AtomicState {
        &self.state.atomic
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state.atomic
    }

    fn ports_in(&self) -> Vec<String> {
        vec![self.ports_in.cmd.clone()]
    }

    fn ports_out(&self) -> Vec<String> {
        vec![self.ports_out.request.clone()]
    }

    fn initialize(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        if self.route.is_empty() {
            self.state.atomic.passivate();
            Ok(())
        } else {
            self.schedule_release(services)
        }
    }

    fn events_ext(
        &mut self,
        _elapsed: f64,
        inputs: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        let commands: Vec<CommandId> = inputs
            .events(&self.ports_in.cmd)
            .iter()
            .map(|event| match event.payload() {
                Payload::Command { command, .. } => Ok(*command),
                _ => Err(SimulationError::InvalidMessage),
            })
            .collect::<Result<_, _>>()?;
        for command in commands {
            match command {
                CommandId::StartSim => {
                    if self.state.atomic.is_passive() && self.state.next_waypoint < self.route.len()
                    {
                        self.schedule_release(services)?;
                    }
                }
                CommandId::StopSim => self.suspend(services),
                // Data-plane commands are not for the generator
                _ => {}
            }
        }
        Ok(())
    }

    fn events_int(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("release"),
            subject: self.variable.to_string(),
        });
        self.state.next_waypoint += 1;
        if self.state.next_waypoint < self.route.len() {
            self.schedule_release(services)
        } else {
            self.state.atomic.passivate();
            Ok(())
        }
    }

    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError> {
        let waypoint = self
            .route
            .get(self.state.next_waypoint)
            .ok_or(SimulationError::InvalidModelState)?;
        outputs.add(
            &self.ports_out.request,
            Event::anonymous(
                self.state.release_time,
                Payload::Request {
                    variable: self.variable,
                    lat: waypoint.lat,
                    lon: waypoint.lon,
                    depth: waypoint.depth,
                },
            ),
        )
    }
}

impl Reportable for Generator {
    fn status(&self) -> String {
        if self.state.atomic.is_passive() {
            String::from("Suspended")
        } else {
            format![
                "Requesting {} at waypoint {} of {}",
                self.variable,
                self.state.next_waypoint,
                self.route.len()
            ]
        }
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

impl ReportableModel for Generator {}
