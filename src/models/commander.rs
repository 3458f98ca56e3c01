use serde::{Deserialize, Serialize};

use super::atomic::{AtomicState, DevsModel, Reportable, ReportableModel, SerializableModel};
use super::ports::Bag;
use super::ModelRecord;
use crate::event::{CommandId, Event, Payload};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

use bloomsim_derive::SerializableModel;

/// The commander replays a preloaded, time-ordered command schedule into
/// the pipeline - start and stop orders, data saves, report requests.
/// Commands scheduled at the same instant are dispatched in the same
/// instant, as a zero-duration chain of internal events.  The commander
/// passivates once the schedule is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableModel)]
#[serde(rename_all = "camelCase")]
pub struct Commander {
    schedule: Vec<ScheduledCommand>,
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

/// One entry of the command schedule, at an absolute simulated time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCommand {
    pub time: f64,
    pub command: CommandId,
    #[serde(default)]
    pub args: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsOut {
    cmd: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    atomic: AtomicState,
    next_index: usize,
    records: Vec<ModelRecord>,
}

impl Commander {
    pub fn new(schedule: Vec<ScheduledCommand>, cmd_port: String) -> Self {
        Self {
            schedule,
            ports_out: PortsOut { cmd: cmd_port },
            state: State::default(),
        }
    }
}

impl DevsModel for Commander {
    fn state(&self) -> &AtomicState {
        &self.state.atomic
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state.atomic
    }

    fn ports_in(&self) -> Vec<String> {
        Vec::new()
    }

    fn ports_out(&self) -> Vec<String> {
        vec![self.ports_out.cmd.clone()]
    }

    fn initialize(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        if self
            .schedule
            .windows(2)
            .any(|pair| pair[0].time > pair[1].time)
        {
            return Err(SimulationError::InvalidModelConfiguration);
        }
        match self.schedule.first() {
            Some(first) if first.time >= services.global_time() => {
                self.state
                    .atomic
                    .hold_in("commanding", first.time - services.global_time());
                Ok(())
            }
            Some(_) => Err(SimulationError::InvalidModelConfiguration),
            None => {
                self.state.atomic.passivate();
                Ok(())
            }
        }
    }

    fn events_ext(
        &mut self,
        _elapsed: f64,
        _inputs: &Bag,
        _services: &mut Services,
    ) -> Result<(), SimulationError> {
        // No input ports are declared, so nothing can arrive here
        Ok(())
    }

    fn events_int(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        let dispatched = self
            .schedule
            .get(self.state.next_index)
            .ok_or(SimulationError::InvalidModelState)?;
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("dispatch"),
            subject: dispatched.command.to_string(),
        });
        self.state.next_index += 1;
        match self.schedule.get(self.state.next_index) {
            Some(next) => {
                self.state
                    .atomic
                    .hold_in("commanding", next.time - services.global_time());
            }
            None => self.state.atomic.passivate(),
        }
        Ok(())
    }

    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError> {
        let scheduled = self
            .schedule
            .get(self.state.next_index)
            .ok_or(SimulationError::InvalidModelState)?;
        outputs.add(
            &self.ports_out.cmd,
            Event::anonymous(
                scheduled.time,
                Payload::Command {
                    command: scheduled.command,
                    args: scheduled.args.clone(),
                },
            ),
        )
    }
}

impl Reportable for Commander {
    fn status(&self) -> String {
        format![
            "Dispatched {} of {} commands",
            self.state.next_index,
            self.schedule.len()
        ]
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

impl ReportableModel for Commander {}
