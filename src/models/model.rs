use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::atomic::{DevsModel, Reportable, ReportableModel, SerializableModel};
use super::ports::{Bag, Port};
use super::ModelRecord;
use crate::event::Event;
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// `Model` wraps a boxed atomic model and provides what the simulator
/// needs around it: an ID, the materialized input/output port bags the
/// model declared, and elapsed-time bookkeeping for external transitions.
/// The simulator requires all models to have an ID; under a coupled
/// hierarchy, flattening rewrites the ID to the path-qualified form
/// (for example `"edge.sensor-n"`).
#[derive(Clone)]
pub struct Model {
    id: String,
    ports_in: Vec<Port>,
    ports_out: Vec<Port>,
    last_transition: f64,
    inner: Box<dyn ReportableModel>,
}

impl Model {
    pub fn new(id: String, inner: Box<dyn ReportableModel>) -> Self {
        let ports_in = inner.ports_in().into_iter().map(Port::new_input).collect();
        let ports_out = inner
            .ports_out()
            .into_iter()
            .map(Port::new_output)
            .collect();
        Self {
            id,
            ports_in,
            ports_out,
            last_transition: 0.0,
            inner,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// The current phase label, for diagnostics and failure context.
    pub fn phase(&self) -> &str {
        self.inner.state().phase()
    }

    /// Whether the model has renounced further self-scheduled events.
    pub fn is_passive(&self) -> bool {
        self.inner.state().is_passive()
    }

    pub fn input_port_names(&self) -> Vec<String> {
        self.ports_in.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn output_port_names(&self) -> Vec<String> {
        self.ports_out
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub(crate) fn has_input_port(&self, port: &str) -> bool {
        self.ports_in.iter().any(|p| p.name() == port)
    }

    pub(crate) fn has_output_port(&self, port: &str) -> bool {
        self.ports_out.iter().any(|p| p.name() == port)
    }

    pub fn until_next_event(&self) -> f64 {
        self.inner.until_next_event()
    }

    pub(crate) fn time_advance(&mut self, time_delta: f64) {
        self.inner.time_advance(time_delta);
    }

    pub(crate) fn initialize(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.last_transition = services.global_time();
        self.inner.initialize(services)
    }

    pub(crate) fn exit(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.inner.exit(services)
    }

    /// Run the output function and drain the resulting output bags.
    /// Anonymous events are stamped with this model's qualified ID at
    /// this point - the emission boundary.
    pub(crate) fn collect_outputs(
        &mut self,
    ) -> Result<Vec<(String, Vec<Event>)>, SimulationError> {
        self.inner.lambda(&mut Bag::new(&mut self.ports_out))?;
        let id = self.id.clone();
        Ok(self
            .ports_out
            .iter_mut()
            .filter(|port| !port.is_empty())
            .map(|port| {
                let name = port.name().to_string();
                let mut events = port.drain();
                events.iter_mut().for_each(|event| event.stamp_source(&id));
                (name, events)
            })
            .collect())
    }

    pub(crate) fn deposit(&mut self, port: &str, event: Event) -> Result<(), SimulationError> {
        match self.ports_in.iter_mut().find(|p| p.name() == port) {
            Some(port) => {
                port.deposit(event);
                Ok(())
            }
            None => Err(SimulationError::PortNotFound {
                port: port.to_string(),
            }),
        }
    }

    pub(crate) fn has_pending_input(&self) -> bool {
        self.ports_in.iter().any(|p| !p.is_empty())
    }

    pub(crate) fn transition_int(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        self.inner.events_int(services)?;
        self.last_transition = services.global_time();
        Ok(())
    }

    pub(crate) fn transition_ext(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        let elapsed = services.global_time() - self.last_transition;
        self.inner
            .events_ext(elapsed, &Bag::new(&mut self.ports_in), services)?;
        self.ports_in.iter_mut().for_each(Port::clear);
        self.last_transition = services.global_time();
        Ok(())
    }

    pub(crate) fn transition_conf(
        &mut self,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        self.inner
            .events_conf(&Bag::new(&mut self.ports_in), services)?;
        self.ports_in.iter_mut().for_each(Port::clear);
        self.last_transition = services.global_time();
        Ok(())
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra_fields: serde_yaml::Value = self.inner.serialize();
        let mut model = serializer.serialize_map(None)?;
        model.serialize_entry("id", &self.id)?;
        model.serialize_entry("type", self.inner.get_type())?;
        if let serde_yaml::Value::Mapping(map) = extra_fields {
            for (key, value) in map.iter() {
                model.serialize_entry(&key, &value)?;
            }
        }
        model.end()
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let model_repr = super::ModelRepr::deserialize(deserializer)?;
        let concrete_model =
            super::model_factory::create::<D>(&model_repr.model_type[..], model_repr.extra)?;
        Ok(Model::new(model_repr.id, concrete_model))
    }
}

impl Reportable for Model {
    fn status(&self) -> String {
        self.inner.status()
    }

    fn records(&self) -> &Vec<ModelRecord> {
        self.inner.records()
    }
}
