use serde::{Deserialize, Serialize};

use super::atomic::{AtomicState, DevsModel, Reportable, ReportableModel, SerializableModel};
use super::ports::Bag;
use super::ModelRecord;
use crate::event::{Event, Payload, SensorVariable};
use crate::input_modeling::{BooleanRandomVariable, ContinuousRandomVariable};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

use bloomsim_derive::SerializableModel;

/// The sensor waits passively for measurement requests, reads the
/// simulated water body after its configured latency, and responds with a
/// biased, noisy, quantized, range-limited reading - the signal chain of
/// a real probe.  Requests arriving while a measurement is in flight
/// share its completion instant.  An optional power profile accumulates
/// energy use and announces demand; an optional loss variable models
/// readings dropped on the comms path.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableModel)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    profile: SensorProfile,
    field: FieldSeries,
    #[serde(default)]
    power: Option<PowerProfile>,
    #[serde(default)]
    loss: Option<BooleanRandomVariable>,
    ports_in: PortsIn,
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

/// The signal characteristics of one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorProfile {
    pub variable: SensorVariable,
    /// Measurement latency, in simulated seconds
    pub delay: f64,
    pub max: f64,
    pub min: f64,
    pub precision: f64,
    pub noise_bias: f64,
    pub noise_sigma: f64,
}

/// A time-indexed series of ground-truth values for one signal,
/// standing in for the simulated water body.  Lookups take the first
/// sample at or after the requested time, clamped to the series end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl FieldSeries {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Self {
        Self { times, values }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.times.is_empty()
            || self.times.len() != self.values.len()
            || self.times.windows(2).any(|pair| pair[0] > pair[1])
        {
            return Err(SimulationError::InvalidModelConfiguration);
        }
        Ok(())
    }

    fn value_at(&self, time: f64) -> f64 {
        let index = self
            .times
            .iter()
            .position(|&t| t >= time)
            .unwrap_or(self.times.len() - 1);
        self.values[index]
    }
}

/// Power characteristics composed into a sensor, rather than inherited
/// from a "powered component" base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerProfile {
    pub idle_watts: f64,
    pub measure_watts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsIn {
    request: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PortsOut {
    out: String,
    power: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    atomic: AtomicState,
    pending: Vec<Event>,
    energy_used: f64,
    records: Vec<ModelRecord>,
}

impl Sensor {
    pub fn new(
        profile: SensorProfile,
        field: FieldSeries,
        power: Option<PowerProfile>,
        loss: Option<BooleanRandomVariable>,
        request_port: String,
        out_port: String,
        power_port: String,
    ) -> Self {
        Self {
            profile,
            field,
            power,
            loss,
            ports_in: PortsIn {
                request: request_port,
            },
            ports_out: PortsOut {
                out: out_port,
                power: power_port,
            },
            state: State::default(),
        }
    }

    /// Raw field value at `time`, pushed through the probe's signal
    /// chain: additive Gaussian bias/noise, quantization to the probe's
    /// precision, and clamping to its measurable range.
    fn read(&mut self, time: f64, services: &mut Services) -> Result<f64, SimulationError> {
        let raw = self.field.value_at(time);
        let mut noise = ContinuousRandomVariable::Normal {
            mean: self.profile.noise_bias,
            std_dev: self.profile.noise_sigma,
        };
        let disturbed = raw + noise.random_variate(services.global_rng())?;
        let quantized = (disturbed / self.profile.precision).round() * self.profile.precision;
        Ok(quantized.max(self.profile.min).min(self.profile.max))
    }

    fn lost(&mut self, services: &mut Services) -> Result<bool, SimulationError> {
        match &mut self.loss {
            Some(loss) => loss.random_variate(services.global_rng()),
            None => Ok(false),
        }
    }
}

impl DevsModel for Sensor {
    fn state(&self) -> &AtomicState {
        &self.state.atomic
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state.atomic
    }

    fn ports_in(&self) -> Vec<String> {
        vec![self.ports_in.request.clone()]
    }

    fn ports_out(&self) -> Vec<String> {
        vec![self.ports_out.out.clone(), self.ports_out.power.clone()]
    }

    fn initialize(&mut self, _services: &mut Services) -> Result<(), SimulationError> {
        self.field.validate()?;
        if self.profile.delay < 0.0
            || self.profile.min > self.profile.max
            || self.profile.precision <= 0.0
        {
            return Err(SimulationError::InvalidModelConfiguration);
        }
        // Wait for a request
        self.state.atomic.passivate();
        Ok(())
    }

    fn events_ext(
        &mut self,
        elapsed: f64,
        inputs: &Bag,
        services: &mut Services,
    ) -> Result<(), SimulationError> {
        if let Some(power) = &self.power {
            self.state.energy_used += power.idle_watts * elapsed;
        }
        let requests: Vec<(SensorVariable, f64, f64, f64)> = inputs
            .events(&self.ports_in.request)
            .iter()
            .map(|event| match *event.payload() {
                Payload::Request {
                    variable,
                    lat,
                    lon,
                    depth,
                } => Ok((variable, lat, lon, depth)),
                _ => Err(SimulationError::InvalidMessage),
            })
            .collect::<Result<_, _>>()?;
        let now = services.global_time();
        // Requests arriving mid-measurement ride on the running countdown
        let completion = if self.state.atomic.phase() == "measuring" {
            now + self.state.atomic.sigma()
        } else {
            now + self.profile.delay
        };
        for (variable, lat, lon, depth) in requests {
            if variable != self.profile.variable {
                return Err(SimulationError::InvalidMessage);
            }
            let value = self.read(now, services)?;
            if let Some(power) = &self.power {
                self.state.energy_used += power.measure_watts * self.profile.delay;
            }
            if self.lost(services)? {
                self.state.records.push(ModelRecord {
                    time: now,
                    action: String::from("lost"),
                    subject: variable.to_string(),
                });
                continue;
            }
            self.state.pending.push(Event::anonymous(
                completion,
                Payload::Measurement {
                    variable,
                    value,
                    lat,
                    lon,
                    depth,
                },
            ));
        }
        if !self.state.pending.is_empty() && self.state.atomic.phase() != "measuring" {
            self.state.atomic.hold_in("measuring", self.profile.delay);
        }
        Ok(())
    }

    fn events_int(&mut self, services: &mut Services) -> Result<(), SimulationError> {
        for _ in 0..self.state.pending.len() {
            self.state.records.push(ModelRecord {
                time: services.global_time(),
                action: String::from("measure"),
                subject: self.profile.variable.to_string(),
            });
        }
        self.state.pending.clear();
        self.state.atomic.passivate();
        Ok(())
    }

    fn lambda(&self, outputs: &mut Bag) -> Result<(), SimulationError> {
        for event in &self.state.pending {
            outputs.add(&self.ports_out.out, event.clone())?;
        }
        if let (Some(power), Some(event)) = (&self.power, self.state.pending.first()) {
            outputs.add(
                &self.ports_out.power,
                Event::anonymous(
                    event.timestamp(),
                    Payload::Power {
                        powered: true,
                        demand: power.measure_watts,
                    },
                ),
            )?;
        }
        Ok(())
    }
}

impl Reportable for Sensor {
    fn status(&self) -> String {
        let mut status = if self.state.atomic.phase() == "measuring" {
            format![
                "Measuring {} ({} pending)",
                self.profile.variable,
                self.state.pending.len()
            ]
        } else {
            format!["Idle {}", self.profile.variable]
        };
        if self.power.is_some() {
            status.push_str(&format![", {:.1} J used", self.state.energy_used]);
        }
        status
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

impl ReportableModel for Sensor {}
