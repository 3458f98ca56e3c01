//! Connectors, messages, and the hierarchy flattener.  A coupled-model
//! tree declares couplings level by level; before simulation the
//! flattener resolves every multi-hop chain - external input, internal,
//! and external output couplings - into direct connectors between leaf
//! atomic ports, so that routing during simulation is a scan of one flat
//! edge list rather than a tree traversal.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::models::ports::PortDirection;
use crate::models::{Component, Coupled, Model};
use crate::utils::errors::SimulationError;

/// Connectors join model ports.  During simulation, models exchange
/// events (as per the Discrete Event System Specification) via these
/// connectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    id: String,
    #[serde(rename = "sourceID")]
    source_id: String,
    #[serde(rename = "targetID")]
    target_id: String,
    source_port: String,
    target_port: String,
}

impl Connector {
    pub fn new(
        id: String,
        source_id: String,
        target_id: String,
        source_port: String,
        target_port: String,
    ) -> Self {
        Self {
            id,
            source_id,
            target_id,
            source_port,
            target_port,
        }
    }

    /// This accessor method returns the model ID of the connector source model.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// This accessor method returns the source port of the connector.
    pub fn source_port(&self) -> &str {
        &self.source_port
    }

    /// This accessor method returns the model ID of the connector target model.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// This accessor method returns the target port of the connector.
    pub fn target_port(&self) -> &str {
        &self.target_port
    }
}

/// Messages record one delivery of an event across a connector: origin
/// information (source model ID and port), destination information
/// (target model ID and port), the delivery time, and the event itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    source_id: String,
    source_port: String,
    target_id: String,
    target_port: String,
    time: f64,
    event: Event,
}

impl Message {
    /// This constructor method builds a `Message`, which records one
    /// event delivery between simulation models.
    pub fn new(
        source_id: String,
        source_port: String,
        target_id: String,
        target_port: String,
        time: f64,
        event: Event,
    ) -> Self {
        Self {
            source_id,
            source_port,
            target_id,
            target_port,
            time,
            event,
        }
    }

    /// This accessor method returns the model ID of a message source.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// This accessor method returns the source port of a message.
    pub fn source_port(&self) -> &str {
        &self.source_port
    }

    /// This accessor method returns the model ID of a message target.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// This accessor method returns the target port of a message.
    pub fn target_port(&self) -> &str {
        &self.target_port
    }

    /// This accessor method returns the delivery time of a message.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// This accessor method returns the event a message carries.
    pub fn event(&self) -> &Event {
        &self.event
    }
}

/// The product of flattening a coupled-model tree: the leaf atomic
/// models under path-qualified IDs, the direct connectors between their
/// ports (plus root-boundary endpoints), and the root model's name.
pub(crate) struct Flattened {
    pub models: Vec<Model>,
    pub connectors: Vec<Connector>,
    pub root: String,
}

/// A coupling endpoint during flattening: a port of a component at a
/// hierarchy path, on a given side.  The root's boundary ports live at
/// the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    path: String,
    port: String,
    side: PortDirection,
}

fn qualify(path: &str, child: &str) -> String {
    if path.is_empty() {
        child.to_string()
    } else {
        format!["{}.{}", path, child]
    }
}

/// Resolve a coupled-model tree into `Flattened` form.  Leaf IDs are the
/// `.`-joined component paths from the root (the root's own name
/// excluded); chains through any number of nested boundary ports become
/// single direct connectors, so nesting depth cannot change observable
/// event delivery.
pub(crate) fn flatten(root: Coupled) -> Result<Flattened, SimulationError> {
    let root_name = root.name().to_string();
    if root
        .components()
        .iter()
        .any(|component| component.name() == root_name)
    {
        return Err(SimulationError::DuplicateName {
            parent: root_name.clone(),
            name: root_name,
        });
    }

    let mut models: Vec<Model> = Vec::new();
    let mut edges: HashMap<Node, Vec<Node>> = HashMap::new();
    let mut atomic_inputs: HashSet<(String, String)> = HashSet::new();
    let mut atomic_outputs: Vec<(String, String)> = Vec::new();
    let root_inputs: Vec<String> = root.input_port_names().to_vec();
    walk(
        root,
        "",
        &mut models,
        &mut edges,
        &mut atomic_inputs,
        &mut atomic_outputs,
    );

    let mut connectors: Vec<Connector> = Vec::new();
    let mut sources: Vec<Node> = atomic_outputs
        .iter()
        .map(|(path, port)| Node {
            path: path.clone(),
            port: port.clone(),
            side: PortDirection::Out,
        })
        .collect();
    sources.extend(root_inputs.iter().map(|port| Node {
        path: String::new(),
        port: port.clone(),
        side: PortDirection::In,
    }));
    for source in sources {
        for target in resolve(&source, &edges, &atomic_inputs) {
            let source_id = if source.path.is_empty() {
                root_name.clone()
            } else {
                source.path.clone()
            };
            let target_id = if target.path.is_empty() {
                root_name.clone()
            } else {
                target.path.clone()
            };
            connectors.push(Connector::new(
                format!["connector-{}", connectors.len() + 1],
                source_id,
                target_id,
                source.port.clone(),
                target.port.clone(),
            ));
        }
    }

    Ok(Flattened {
        models,
        connectors,
        root: root_name,
    })
}

fn walk(
    coupled: Coupled,
    path: &str,
    models: &mut Vec<Model>,
    edges: &mut HashMap<Node, Vec<Node>>,
    atomic_inputs: &mut HashSet<(String, String)>,
    atomic_outputs: &mut Vec<(String, String)>,
) {
    let (_, _, _, components, eic, eoc, ic) = coupled.into_parts();
    for component in components {
        let child_path = qualify(path, component.name());
        match component {
            Component::Atomic(mut model) => {
                for port in model.input_port_names() {
                    atomic_inputs.insert((child_path.clone(), port));
                }
                for port in model.output_port_names() {
                    atomic_outputs.push((child_path.clone(), port));
                }
                model.set_id(child_path);
                models.push(model);
            }
            Component::Coupled(nested) => {
                walk(
                    nested,
                    &child_path,
                    models,
                    edges,
                    atomic_inputs,
                    atomic_outputs,
                );
            }
        }
    }
    for coupling in eic {
        edges
            .entry(Node {
                path: path.to_string(),
                port: coupling.source_port,
                side: PortDirection::In,
            })
            .or_insert_with(Vec::new)
            .push(Node {
                path: qualify(path, &coupling.target_id),
                port: coupling.target_port,
                side: PortDirection::In,
            });
    }
    for coupling in ic {
        edges
            .entry(Node {
                path: qualify(path, &coupling.source_id),
                port: coupling.source_port,
                side: PortDirection::Out,
            })
            .or_insert_with(Vec::new)
            .push(Node {
                path: qualify(path, &coupling.target_id),
                port: coupling.target_port,
                side: PortDirection::In,
            });
    }
    for coupling in eoc {
        edges
            .entry(Node {
                path: qualify(path, &coupling.source_id),
                port: coupling.source_port,
                side: PortDirection::Out,
            })
            .or_insert_with(Vec::new)
            .push(Node {
                path: path.to_string(),
                port: coupling.target_port,
                side: PortDirection::Out,
            });
    }
}

/// Depth-first search from one source endpoint through intermediate
/// boundary nodes, collecting the terminal endpoints: leaf atomic input
/// ports, and root boundary output ports (path empty, side out).  The
/// visited set guards against malformed cycles.
fn resolve(
    source: &Node,
    edges: &HashMap<Node, Vec<Node>>,
    atomic_inputs: &HashSet<(String, String)>,
) -> Vec<Node> {
    let mut targets: Vec<Node> = Vec::new();
    let mut visited: HashSet<Node> = HashSet::new();
    let mut stack: Vec<Node> = edges.get(source).cloned().unwrap_or_default();
    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        let terminal_atomic = node.side == PortDirection::In
            && atomic_inputs.contains(&(node.path.clone(), node.port.clone()));
        let terminal_boundary = node.side == PortDirection::Out && node.path.is_empty();
        if terminal_atomic || terminal_boundary {
            targets.push(node);
        } else if let Some(next) = edges.get(&node) {
            stack.extend(next.iter().cloned());
        }
    }
    targets
}
