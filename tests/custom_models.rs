//! Custom model registration: a user-defined relay model, registered
//! with the model factory and loaded from a YAML configuration alongside
//! the prebuilt models.

use serde::{Deserialize, Serialize};

use bloomsim::event::Event;
use bloomsim::models::{
    AtomicState, Bag, DevsModel, ModelRecord, Reportable, ReportableModel, SerializableModel,
};
use bloomsim::simulator::{Services, Simulation};
use bloomsim::utils::errors::SimulationError;
use bloomsim_derive::{register, SerializableModel};

/// The relay forwards everything it receives, a fixed delay later -
/// a stand-in for a store-and-forward comms hop.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableModel)]
#[serde(rename_all = "camelCase")]
pub struct Relay {
    delay: f64,
    ports_in: PortsIn,
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsIn {
    receive: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsOut {
    send: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    atomic: AtomicState,
    pending: Vec<Event>,
    records: Vec<ModelRecord>,
}

impl DevsModel for Relay {
    fn state(&self) -> &AtomicState {
        &self.state.atomic
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state.atomic
    }

    fn ports_in(&self) -> Vec<String> {
        vec![self.ports_in.receive.clone()]
    }

    fn ports_out(&self) -> Vec<String> {
        vec![self.ports_out.send.clone()]
    }

    fn initialize(&mut self, _services: &mut Services) -> Result<(), SimulationError> {
        self.state.atomic.passivate();
        Ok(())
    }

    fn events_ext(
        &mut self,
        _elapsed: f64,
        inputs: &Bag,
        _services: &mut Services,
    ) -> Result<(), SimulationError> {
        self.state
            .pending
            .extend(inputs.events(&self.ports_in.receive).to_vec());
        if self.state.atomic.phase() != "relaying" {
            self.state.atomic.hold_in("relaying", self.delay);
        }
        Ok(())
    }

    fn events_int(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.state.records.push(ModelRecord {
            time: services.global_time(),
            action: String::from("forward"),
            subject: format!["{} events", self.state.pending.len()],
        });
        self.state.pending.clear();
        self.state.atomic.passivate();
        Ok(())
    }

    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError> {
        for event in &self.state.pending {
            outputs.add(&self.ports_out.send, event.clone())?;
        }
        Ok(())
    }
}

impl Reportable for Relay {
    fn status(&self) -> String {
        format!["Relaying {} events", self.state.pending.len()]
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

impl ReportableModel for Relay {}

#[test]
fn registered_custom_models_load_from_yaml() -> Result<(), SimulationError> {
    let config = r#"
models:
  - id: "commander-01"
    type: "Commander"
    schedule:
      - time: 0.0
        command: "START_SIM"
    portsOut:
      cmd: "o_cmd"
  - id: "relay-01"
    type: "Relay"
    delay: 10.0
    portsIn:
      receive: "i_in"
    portsOut:
      send: "o_out"
  - id: "storage-01"
    type: "Storage"
    portsIn:
      data: "i_data"
      cmd: "i_cmd"
    portsOut:
      report: "o_report"
connectors:
  - id: "connector-01"
    sourceID: "commander-01"
    targetID: "relay-01"
    sourcePort: "o_cmd"
    targetPort: "i_in"
  - id: "connector-02"
    sourceID: "relay-01"
    targetID: "storage-01"
    sourcePort: "o_out"
    targetPort: "i_data"
"#;
    register![Relay];
    let mut simulation: Simulation = serde_yaml::from_str(config)?;
    simulation.initialize()?;
    let messages = simulation.step_n(4)?;
    // The command reaches the relay at t=0 and the store at t=10
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].time(), 0.0);
    assert_eq!(messages[1].time(), 10.0);
    assert_eq!(messages[1].source_id(), "relay-01");
    assert_eq!(messages[1].target_id(), "storage-01");
    assert_eq!(simulation.get_status("storage-01")?, "Storing 1 events");
    let records = simulation.get_records("relay-01")?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subject, "1 events");
    simulation.exit()?;
    Ok(())
}
