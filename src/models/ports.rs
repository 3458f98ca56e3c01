//! Ports are the interaction surface of a model.  A port is a named,
//! directed buffer of pending events - a bag, not a queue: within one
//! simulation instant a port may accumulate any number of events, in no
//! guaranteed order.  A port's bag is non-empty only between the instant
//! an event is deposited and the instant its owner's external or
//! confluent transition has run; only the simulator clears bags.

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::utils::errors::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortDirection {
    In,
    Out,
}

/// A port belongs to exactly one component.  Input ports receive events
/// routed by the simulator; output ports receive events deposited by
/// their owner's output function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    name: String,
    direction: PortDirection,
    #[serde(skip)]
    bag: Vec<Event>,
}

impl Port {
    pub fn new_input(name: String) -> Self {
        Self {
            name,
            direction: PortDirection::In,
            bag: Vec::new(),
        }
    }

    pub fn new_output(name: String) -> Self {
        Self {
            name,
            direction: PortDirection::Out,
            bag: Vec::new(),
        }
    }

    /// This accessor method returns the name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This accessor method returns the direction of the port.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// The events pending on this port during the current instant.
    pub fn events(&self) -> &[Event] {
        &self.bag
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    pub(crate) fn deposit(&mut self, event: Event) {
        self.bag.push(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.bag)
    }

    pub(crate) fn clear(&mut self) {
        self.bag.clear();
    }
}

/// The view over a model's ports handed to its transition and output
/// functions.  External and confluent transitions read input bags through
/// it; the output function deposits events through it.
pub struct Bag<'a> {
    ports: &'a mut [Port],
}

impl<'a> Bag<'a> {
    pub(crate) fn new(ports: &'a mut [Port]) -> Self {
        Self { ports }
    }

    /// Deposit an event on a named port.  Used by output functions; the
    /// port must be one the model declared.
    pub fn add(&mut self, port: &str, event: Event) -> Result<(), SimulationError> {
        match self.ports.iter_mut().find(|p| p.name() == port) {
            Some(port) => {
                port.deposit(event);
                Ok(())
            }
            None => Err(SimulationError::PortNotFound {
                port: port.to_string(),
            }),
        }
    }

    /// The events pending on a named port this instant.  A port may carry
    /// more than one event in the same instant; an undeclared or empty
    /// port yields an empty slice.
    pub fn events(&self, port: &str) -> &[Event] {
        self.ports
            .iter()
            .find(|p| p.name() == port)
            .map(|p| p.events())
            .unwrap_or(&[])
    }

    /// All pending events across ports, in deposit order per port.
    pub fn all(&self) -> impl Iterator<Item = &Event> + '_ {
        self.ports.iter().flat_map(|p| p.events().iter())
    }

    pub fn is_empty(&self) -> bool {
        self.ports.iter().all(Port::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CommandId, Payload};

    fn command(args: &str) -> Event {
        Event::anonymous(
            0.0,
            Payload::Command {
                command: CommandId::StartSim,
                args: args.to_string(),
            },
        )
    }

    #[test]
    fn ports_accumulate_bags_within_an_instant() {
        let mut port = Port::new_input(String::from("i_cmd"));
        port.deposit(command("first"));
        port.deposit(command("second"));
        assert_eq!(port.events().len(), 2);
        port.clear();
        assert!(port.is_empty());
    }

    #[test]
    fn bags_reject_undeclared_ports() {
        let mut ports = vec![Port::new_output(String::from("o_out"))];
        let mut bag = Bag::new(&mut ports);
        assert!(bag.add("o_out", command("ok")).is_ok());
        assert!(matches!(
            bag.add("o_typo", command("nope")),
            Err(SimulationError::PortNotFound { .. })
        ));
        assert_eq!(bag.events("o_out").len(), 1);
        assert!(bag.events("o_missing").is_empty());
    }
}
