//! Coupled models compose child components - atomic models or further
//! coupled models, forming a strict tree - and declare directed couplings
//! between their ports.  A coupled model exposes boundary input/output
//! ports of its own, so it can be nested arbitrarily deep.  Coupled
//! models are pure structure: before simulation the coordinator flattens
//! the tree into direct connectors between leaf atomic ports, and only
//! atomic models execute transitions.

use serde::{Deserialize, Serialize};

use super::Model;
use crate::utils::errors::SimulationError;

/// A coupling from a boundary input port of a coupled model down to an
/// input port of one of its children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInputCoupling {
    pub source_port: String,
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub target_port: String,
}

/// A coupling from an output port of a child up to a boundary output
/// port of its parent coupled model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOutputCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// A coupling between two children of the same coupled model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// One endpoint of a coupling, as visible from the declaring coupled
/// model: either one of its own boundary ports, or a port of a direct
/// child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    component: Option<String>,
    port: String,
}

impl PortRef {
    /// A boundary port of the declaring coupled model.
    pub fn boundary(port: &str) -> Self {
        Self {
            component: None,
            port: port.to_string(),
        }
    }

    /// A port of a direct child component.
    pub fn child(component: &str, port: &str) -> Self {
        Self {
            component: Some(component.to_string()),
            port: port.to_string(),
        }
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    fn describe(&self) -> String {
        match &self.component {
            Some(component) => format!["{}.{}", component, self.port],
            None => format!["self.{}", self.port],
        }
    }
}

/// A child of a coupled model - a leaf atomic model or a nested coupled
/// model.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Atomic(Model),
    Coupled(Coupled),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Atomic(model) => model.id(),
            Component::Coupled(coupled) => coupled.name(),
        }
    }

    pub fn input_port_names(&self) -> Vec<String> {
        match self {
            Component::Atomic(model) => model.input_port_names(),
            Component::Coupled(coupled) => coupled.ports_in.clone(),
        }
    }

    pub fn output_port_names(&self) -> Vec<String> {
        match self {
            Component::Atomic(model) => model.output_port_names(),
            Component::Coupled(coupled) => coupled.ports_out.clone(),
        }
    }

    fn has_input_port(&self, port: &str) -> bool {
        self.input_port_names().iter().any(|p| p == port)
    }

    fn has_output_port(&self, port: &str) -> bool {
        self.output_port_names().iter().any(|p| p == port)
    }
}

impl From<Model> for Component {
    fn from(model: Model) -> Self {
        Component::Atomic(model)
    }
}

impl From<Coupled> for Component {
    fn from(coupled: Coupled) -> Self {
        Component::Coupled(coupled)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupled {
    name: String,
    ports_in: Vec<String>,
    ports_out: Vec<String>,
    components: Vec<Component>,
    external_input_couplings: Vec<ExternalInputCoupling>,
    external_output_couplings: Vec<ExternalOutputCoupling>,
    internal_couplings: Vec<InternalCoupling>,
}

impl Coupled {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ports_in: Vec::new(),
            ports_out: Vec::new(),
            components: Vec::new(),
            external_input_couplings: Vec::new(),
            external_output_couplings: Vec::new(),
            internal_couplings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn input_port_names(&self) -> &[String] {
        &self.ports_in
    }

    pub fn output_port_names(&self) -> &[String] {
        &self.ports_out
    }

    /// Declare a boundary input port, for use when this coupled model is
    /// nested inside another.
    pub fn add_input_port(&mut self, port: &str) -> Result<(), SimulationError> {
        if self.ports_in.iter().any(|p| p == port) {
            return Err(SimulationError::DuplicatePort {
                component: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.ports_in.push(port.to_string());
        Ok(())
    }

    /// Declare a boundary output port, for use when this coupled model is
    /// nested inside another.
    pub fn add_output_port(&mut self, port: &str) -> Result<(), SimulationError> {
        if self.ports_out.iter().any(|p| p == port) {
            return Err(SimulationError::DuplicatePort {
                component: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.ports_out.push(port.to_string());
        Ok(())
    }

    /// Register a child component.  Names must be unique within this
    /// coupled model, non-empty, and free of the `.` path separator used
    /// by flattening.
    pub fn add_component(&mut self, component: impl Into<Component>) -> Result<(), SimulationError> {
        let component = component.into();
        let name = component.name();
        if name.is_empty() || name.contains('.') {
            return Err(SimulationError::InvalidModelConfiguration);
        }
        if self.components.iter().any(|c| c.name() == name) {
            return Err(SimulationError::DuplicateName {
                parent: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.components.push(component);
        Ok(())
    }

    /// Declare a directed coupling between two ports visible at this
    /// nesting level.  The coupling is classified from its endpoints:
    /// boundary-in to child-in (external input), child-out to child-in
    /// (internal), and child-out to boundary-out (external output).  Any
    /// other combination, unknown endpoint, or direction mismatch fails
    /// with `InvalidCoupling`.
    pub fn add_coupling(&mut self, source: PortRef, target: PortRef) -> Result<(), SimulationError> {
        let reject = |reason: &str| -> SimulationError {
            SimulationError::InvalidCoupling {
                source: source.describe(),
                target: target.describe(),
                reason: reason.to_string(),
            }
        };
        match (source.component(), target.component()) {
            (None, Some(target_id)) => {
                if !self.ports_in.iter().any(|p| p == source.port()) {
                    return Err(reject("no such boundary input port"));
                }
                let child = self
                    .components
                    .iter()
                    .find(|c| c.name() == target_id)
                    .ok_or_else(|| reject("no such child component"))?;
                if !child.has_input_port(target.port()) {
                    return Err(reject("no such input port on the child"));
                }
                self.external_input_couplings.push(ExternalInputCoupling {
                    source_port: source.port().to_string(),
                    target_id: target_id.to_string(),
                    target_port: target.port().to_string(),
                });
                Ok(())
            }
            (Some(source_id), Some(target_id)) => {
                if source_id == target_id {
                    return Err(reject("direct self-loops are not permitted"));
                }
                let source_child = self
                    .components
                    .iter()
                    .find(|c| c.name() == source_id)
                    .ok_or_else(|| reject("no such source component"))?;
                if !source_child.has_output_port(source.port()) {
                    return Err(reject("no such output port on the source child"));
                }
                let target_child = self
                    .components
                    .iter()
                    .find(|c| c.name() == target_id)
                    .ok_or_else(|| reject("no such target component"))?;
                if !target_child.has_input_port(target.port()) {
                    return Err(reject("no such input port on the target child"));
                }
                self.internal_couplings.push(InternalCoupling {
                    source_id: source_id.to_string(),
                    target_id: target_id.to_string(),
                    source_port: source.port().to_string(),
                    target_port: target.port().to_string(),
                });
                Ok(())
            }
            (Some(source_id), None) => {
                let child = self
                    .components
                    .iter()
                    .find(|c| c.name() == source_id)
                    .ok_or_else(|| reject("no such source component"))?;
                if !child.has_output_port(source.port()) {
                    return Err(reject("no such output port on the source child"));
                }
                if !self.ports_out.iter().any(|p| p == target.port()) {
                    return Err(reject("no such boundary output port"));
                }
                self.external_output_couplings.push(ExternalOutputCoupling {
                    source_id: source_id.to_string(),
                    source_port: source.port().to_string(),
                    target_port: target.port().to_string(),
                });
                Ok(())
            }
            (None, None) => Err(reject(
                "a coupling cannot pass straight through the boundary",
            )),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        String,
        Vec<String>,
        Vec<String>,
        Vec<Component>,
        Vec<ExternalInputCoupling>,
        Vec<ExternalOutputCoupling>,
        Vec<InternalCoupling>,
    ) {
        (
            self.name,
            self.ports_in,
            self.ports_out,
            self.components,
            self.external_input_couplings,
            self.external_output_couplings,
            self.internal_couplings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Storage;

    fn storage(id: &str) -> Model {
        Model::new(
            String::from(id),
            Box::new(Storage::new(
                String::from("i_data"),
                String::from("i_cmd"),
                String::from("o_report"),
            )),
        )
    }

    #[test]
    fn duplicate_child_names_are_rejected() {
        let mut coupled = Coupled::new(String::from("fog"));
        coupled.add_component(storage("db")).unwrap();
        assert!(matches!(
            coupled.add_component(storage("db")),
            Err(SimulationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn couplings_are_classified_by_endpoint() {
        let mut coupled = Coupled::new(String::from("fog"));
        coupled.add_input_port("i_data").unwrap();
        coupled.add_output_port("o_report").unwrap();
        coupled.add_component(storage("db")).unwrap();
        coupled
            .add_coupling(PortRef::boundary("i_data"), PortRef::child("db", "i_data"))
            .unwrap();
        coupled
            .add_coupling(
                PortRef::child("db", "o_report"),
                PortRef::boundary("o_report"),
            )
            .unwrap();
        assert_eq!(coupled.external_input_couplings.len(), 1);
        assert_eq!(coupled.external_output_couplings.len(), 1);
        assert!(coupled.internal_couplings.is_empty());
    }

    #[test]
    fn invalid_couplings_are_rejected_at_declaration() {
        let mut coupled = Coupled::new(String::from("fog"));
        coupled.add_component(storage("db")).unwrap();
        // unknown boundary port
        assert!(matches!(
            coupled.add_coupling(PortRef::boundary("i_data"), PortRef::child("db", "i_data")),
            Err(SimulationError::InvalidCoupling { .. })
        ));
        // direction mismatch: i_data is an input port, not an output
        coupled.add_component(storage("db2")).unwrap();
        assert!(matches!(
            coupled.add_coupling(PortRef::child("db", "i_data"), PortRef::child("db2", "i_data")),
            Err(SimulationError::InvalidCoupling { .. })
        ));
        // self-loop
        assert!(matches!(
            coupled.add_coupling(
                PortRef::child("db", "o_report"),
                PortRef::child("db", "i_data")
            ),
            Err(SimulationError::InvalidCoupling { .. })
        ));
    }
}
