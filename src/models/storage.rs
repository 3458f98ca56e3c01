use log::info;
use serde::{Deserialize, Serialize};

use super::atomic::{AtomicState, DevsModel, Reportable, ReportableModel, SerializableModel};
use super::ports::Bag;
use super::ModelRecord;
use crate::event::{CommandId, Event, Payload};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

use bloomsim_derive::SerializableModel;

/// The storage model is the fog/cloud tier of the pipeline: it appends
/// arriving events to an in-memory store instantaneously, answers
/// SAVE_DATA and FOG_REPORT commands with a report of the accumulated
/// data, and flushes the store when the simulation ends.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableModel)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    ports_in: PortsIn,
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsIn {
    data: String,
    cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsOut {
    report: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    atomic: AtomicState,
    stored: Vec<Event>,
    pending_report: Option<Event>,
    flushed: bool,
    records: Vec<ModelRecord>,
}

impl Storage {
    pub fn new(data_port: String, cmd_port: String, report_port: String) -> Self {
        Self {
            ports_in: PortsIn {
                data: data_port,
                cmd: cmd_port,
            },
            ports_out: PortsOut {
                report: report_port,
            },
            state: State::default(),
        }
    }

    /// The events accumulated so far.
    pub fn stored(&self) -> &[Event] {
        &self.state.stored
    }

    fn save(&mut self, event: &Event, services: &mut Services) {
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("store"),
            subject: event.kind().to_string(),
        });
        self.state.stored.push(event.clone());
    }

    fn prepare_report(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        let content = serde_json::to_string(&self.state.stored)?;
        self.state.pending_report = Some(Event::anonymous(
            services.global_time(),
            Payload::Report {
                entries: self.state.stored.len(),
                content,
            },
        ));
        self.state.atomic.hold_in("reporting", 0.0);
        Ok(())
    }
}

impl DevsModel for Storage {
    fn state(&self) -> &AtomicState {
        &self.state.atomic
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state.atomic
    }

    fn ports_in(&self) -> Vec<String> {
        vec![self.ports_in.data.clone(), self.ports_in.cmd.clone()]
    }

    fn ports_out(&self) -> Vec<String> {
        vec![self.ports_out.report.clone()]
    }

    fn initialize(&mut self, _services: &mut Services) -> Result<(), SimulationError> {
        self.state.atomic.passivate();
        Ok(())
    }

    fn events_ext(
        &mut self,
        _elapsed: f64,
        inputs: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        let data: Vec<Event> = inputs.events(&self.ports_in.data).to_vec();
        for event in &data {
            self.save(event, services);
        }
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
                CommandId::SaveData | CommandId::FogReport => self.prepare_report(services)?,
                // Control-plane commands carry no data to store
                _ => {}
            }
        }
        Ok(())
    }

    fn events_int(&mut self, _services: &mut Services) -> Result<(), SimulationError> {
        self.state.pending_report = None;
        self.state.atomic.passivate();
        Ok(())
    }

    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError> {
        if let Some(report) = &self.state.pending_report {
            outputs.add(&self.ports_out.report, report.clone())?;
        }
        Ok(())
    }

    fn exit(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        info!(
            "storage flushing {} stored events at simulated time {}",
            self.state.stored.len(),
            services.global_time()
        );
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("flush"),
            subject: format!["{} events", self.state.stored.len()],
        });
        self.state.flushed = true;
        Ok(())
    }
}

impl Reportable for Storage {
    fn status(&self) -> String {
        if self.state.flushed {
            format!["Flushed {} events", self.state.stored.len()]
        } else {
            format!["Storing {} events", self.state.stored.len()]
        }
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

impl ReportableModel for Storage {}
