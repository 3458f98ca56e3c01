//! The event module provides the typed event envelope exchanged between
//! simulation models.  Every event carries an origin, a simulated
//! timestamp, and a payload.  Payloads are tagged variants - one variant
//! per event kind - so receivers pattern-match exhaustively instead of
//! probing free-form mappings.
//!
//! Events are value types.  The simulator copies an event for every
//! destination port on delivery, so a receiver mutating its copy can
//! never affect a sibling receiver.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of an event, derived from its payload variant.  The kind is
/// the routing-visible identity of an event; the payload carries the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Position,
    Request,
    Measurement,
    Bloom,
    Command,
    Power,
    Report,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            EventKind::Position => "position",
            EventKind::Request => "request",
            EventKind::Measurement => "measurement",
            EventKind::Bloom => "bloom",
            EventKind::Command => "command",
            EventKind::Power => "power",
            EventKind::Report => "report",
        };
        write!(f, "{}", label)
    }
}

/// Water-quality signals observable by the simulated sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorVariable {
    /// Nitrate nitrogen
    Nox,
    /// Dissolved oxygen
    Dox,
    /// Algae concentration
    Alg,
    /// Sun radiation
    Sun,
    /// Water temperature
    Wte,
    /// East water flow
    Wfu,
    /// North water flow
    Wfv,
    /// East wind flow
    Wfx,
    /// North wind flow
    Wfy,
}

impl SensorVariable {
    /// A human-readable description of the signal, with units.
    pub fn description(&self) -> &'static str {
        match self {
            SensorVariable::Nox => "Nitrate nitrogen (mg/L)",
            SensorVariable::Dox => "Dissolved oxygen (mg/L)",
            SensorVariable::Alg => "Algae concentration (mg/L)",
            SensorVariable::Sun => "Sun radiation (n.u.)",
            SensorVariable::Wte => "Water temperature (deg C)",
            SensorVariable::Wfu => "East water flow (m/s)",
            SensorVariable::Wfv => "North water flow (m/s)",
            SensorVariable::Wfx => "East wind flow (m/s)",
            SensorVariable::Wfy => "North wind flow (m/s)",
        }
    }
}

impl fmt::Display for SensorVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            SensorVariable::Nox => "NOX",
            SensorVariable::Dox => "DOX",
            SensorVariable::Alg => "ALG",
            SensorVariable::Sun => "SUN",
            SensorVariable::Wte => "WTE",
            SensorVariable::Wfu => "WFU",
            SensorVariable::Wfv => "WFV",
            SensorVariable::Wfx => "WFX",
            SensorVariable::Wfy => "WFY",
        };
        write!(f, "{}", code)
    }
}

/// Commands understood by the pipeline models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandId {
    StartSim,
    StopSim,
    FixOutliers,
    SaveData,
    FogReport,
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            CommandId::StartSim => "START_SIM",
            CommandId::StopSim => "STOP_SIM",
            CommandId::FixOutliers => "FIX_OUTLIERS",
            CommandId::SaveData => "SAVE_DATA",
            CommandId::FogReport => "FOG_REPORT",
        };
        write!(f, "{}", label)
    }
}

/// The event payload - one variant per event kind, each with an explicit
/// schema.  Receivers match on the variant they understand and reject or
/// ignore the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Payload {
    /// A georeferenced point in the water body
    Position { lat: f64, lon: f64, depth: f64 },
    /// A request to measure one signal at a point
    Request {
        variable: SensorVariable,
        lat: f64,
        lon: f64,
        depth: f64,
    },
    /// A completed sensor reading
    Measurement {
        variable: SensorVariable,
        value: f64,
        lat: f64,
        lon: f64,
        depth: f64,
    },
    /// A bloom detection result at a point
    Bloom {
        density: f64,
        detected: bool,
        lat: f64,
        lon: f64,
    },
    /// A pipeline control command
    Command { command: CommandId, args: String },
    /// A power state or demand notification
    Power { powered: bool, demand: f64 },
    /// A summary of accumulated data, typically answering SAVE_DATA or
    /// FOG_REPORT
    Report { entries: usize, content: String },
}

impl Payload {
    /// The event kind this payload belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::Position { .. } => EventKind::Position,
            Payload::Request { .. } => EventKind::Request,
            Payload::Measurement { .. } => EventKind::Measurement,
            Payload::Bloom { .. } => EventKind::Bloom,
            Payload::Command { .. } => EventKind::Command,
            Payload::Power { .. } => EventKind::Power,
            Payload::Report { .. } => EventKind::Report,
        }
    }
}

/// Events are the mechanism of information exchange between simulation
/// models.  An event records its source model, the simulated time it was
/// produced, and a typed payload.  Events are immutable by convention
/// once emitted: models build them during transitions and deposit them on
/// output ports from the output function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    source: String,
    timestamp: f64,
    payload: Payload,
}

impl Event {
    /// This constructor method builds an `Event` with an explicit source.
    pub fn new(source: String, timestamp: f64, payload: Payload) -> Self {
        Self {
            source,
            timestamp,
            payload,
        }
    }

    /// This constructor method builds an `Event` whose source is stamped
    /// by the simulator at emission, with the emitting model's qualified
    /// id.  Models normally use this form, since a model does not know
    /// the id it was registered under.
    pub fn anonymous(timestamp: f64, payload: Payload) -> Self {
        Self {
            source: String::new(),
            timestamp,
            payload,
        }
    }

    /// This accessor method returns the kind of the event.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// This accessor method returns the id of the model that emitted the
    /// event.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// This accessor method returns the simulated time the event was
    /// produced.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// This accessor method returns the payload of the event.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn stamp_source(&mut self, source: &str) {
        if self.source.is_empty() {
            self.source = source.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kinds_match_variants() {
        let payload = Payload::Request {
            variable: SensorVariable::Dox,
            lat: 41.1,
            lon: -8.7,
            depth: 2.0,
        };
        assert_eq!(payload.kind(), EventKind::Request);
        assert_eq!(
            Payload::Command {
                command: CommandId::SaveData,
                args: String::new(),
            }
            .kind(),
            EventKind::Command
        );
    }

    #[test]
    fn events_serialize_with_tagged_payloads() {
        let event = Event::new(
            String::from("edge.sensor-n"),
            360.0,
            Payload::Measurement {
                variable: SensorVariable::Nox,
                value: 0.25,
                lat: 41.1,
                lon: -8.7,
                depth: 2.0,
            },
        );
        let serialized = serde_json::to_string(&event).unwrap();
        assert!(serialized.contains("\"kind\":\"measurement\""));
        assert!(serialized.contains("\"NOX\""));
        let deserialized: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn anonymous_events_accept_a_source_stamp_once() {
        let mut event = Event::anonymous(
            0.0,
            Payload::Command {
                command: CommandId::StartSim,
                args: String::new(),
            },
        );
        event.stamp_source("commander");
        event.stamp_source("impostor");
        assert_eq!(event.source(), "commander");
    }
}
