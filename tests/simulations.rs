//! End-to-end sensing pipeline simulations: a commander replaying a
//! schedule, a request generator walking a sampling route, a simulated
//! sensor with latency and a signal chain, and a fog-tier store, wired
//! hierarchically and driven to a time horizon.

use bloomsim::event::{CommandId, EventKind, Payload, SensorVariable};
use bloomsim::input_modeling::ContinuousRandomVariable;
use bloomsim::models::{
    Commander, Coupled, FieldSeries, Generator, Model, PortRef, PowerProfile, ScheduledCommand,
    Sensor, SensorProfile, Storage, Waypoint,
};
use bloomsim::simulator::{Connector, Message, Simulation};
use bloomsim::utils::errors::SimulationError;

fn schedule() -> Vec<ScheduledCommand> {
    vec![
        ScheduledCommand {
            time: 0.0,
            command: CommandId::StartSim,
            args: String::new(),
        },
        ScheduledCommand {
            time: 600.0,
            command: CommandId::SaveData,
            args: String::new(),
        },
        ScheduledCommand {
            time: 900.0,
            command: CommandId::StopSim,
            args: String::new(),
        },
    ]
}

fn route() -> Vec<Waypoint> {
    (0..5)
        .map(|index| Waypoint {
            lat: 41.1 + 0.01 * index as f64,
            lon: -8.7,
            depth: 2.0,
        })
        .collect()
}

fn dox_profile() -> SensorProfile {
    SensorProfile {
        variable: SensorVariable::Dox,
        delay: 5.0,
        max: 30.0,
        min: 0.0,
        precision: 0.5,
        noise_bias: 0.0,
        noise_sigma: 0.0,
    }
}

fn dox_field() -> FieldSeries {
    FieldSeries::new(vec![0.0, 3600.0], vec![7.0, 7.0])
}

fn commander() -> Model {
    Model::new(
        String::from("commander"),
        Box::new(Commander::new(schedule(), String::from("o_cmd"))),
    )
}

fn asker() -> Model {
    Model::new(
        String::from("asker"),
        Box::new(Generator::new(
            ContinuousRandomVariable::Point { value: 60.0 },
            SensorVariable::Dox,
            route(),
            String::from("i_cmd"),
            String::from("o_request"),
        )),
    )
}

fn sensor() -> Model {
    Model::new(
        String::from("sensor-dox"),
        Box::new(Sensor::new(
            dox_profile(),
            dox_field(),
            Some(PowerProfile {
                idle_watts: 0.5,
                measure_watts: 2.0,
            }),
            None,
            String::from("i_request"),
            String::from("o_out"),
            String::from("o_power"),
        )),
    )
}

fn db() -> Model {
    Model::new(
        String::from("db"),
        Box::new(Storage::new(
            String::from("i_data"),
            String::from("i_cmd"),
            String::from("o_report"),
        )),
    )
}

fn nested_pipeline() -> Result<Simulation, SimulationError> {
    let mut edge = Coupled::new(String::from("edge"));
    edge.add_input_port("i_cmd")?;
    edge.add_output_port("o_data")?;
    edge.add_component(asker())?;
    edge.add_component(sensor())?;
    edge.add_coupling(PortRef::boundary("i_cmd"), PortRef::child("asker", "i_cmd"))?;
    edge.add_coupling(
        PortRef::child("asker", "o_request"),
        PortRef::child("sensor-dox", "i_request"),
    )?;
    edge.add_coupling(
        PortRef::child("sensor-dox", "o_out"),
        PortRef::boundary("o_data"),
    )?;

    let mut fog = Coupled::new(String::from("fog"));
    fog.add_input_port("i_cmd")?;
    fog.add_input_port("i_data")?;
    fog.add_output_port("o_report")?;
    fog.add_component(db())?;
    fog.add_coupling(PortRef::boundary("i_cmd"), PortRef::child("db", "i_cmd"))?;
    fog.add_coupling(PortRef::boundary("i_data"), PortRef::child("db", "i_data"))?;
    fog.add_coupling(PortRef::child("db", "o_report"), PortRef::boundary("o_report"))?;

    let mut pipeline = Coupled::new(String::from("pipeline"));
    pipeline.add_output_port("o_report")?;
    pipeline.add_component(commander())?;
    pipeline.add_component(edge)?;
    pipeline.add_component(fog)?;
    pipeline.add_coupling(
        PortRef::child("commander", "o_cmd"),
        PortRef::child("edge", "i_cmd"),
    )?;
    pipeline.add_coupling(
        PortRef::child("commander", "o_cmd"),
        PortRef::child("fog", "i_cmd"),
    )?;
    pipeline.add_coupling(
        PortRef::child("edge", "o_data"),
        PortRef::child("fog", "i_data"),
    )?;
    pipeline.add_coupling(
        PortRef::child("fog", "o_report"),
        PortRef::boundary("o_report"),
    )?;
    Simulation::from_coupled(pipeline)
}

#[test]
fn hierarchical_pipeline_runs_to_horizon() -> Result<(), SimulationError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut simulation = nested_pipeline()?;
    simulation.initialize()?;
    let messages: Vec<Message> = simulation.step_until(1000.0)?;

    // Two command fan-outs at t=0 and t=900, two plus the report at
    // t=600, five sampling requests, five measurement deliveries
    assert_eq!(messages.len(), 17);

    let measurements: Vec<&Message> = messages
        .iter()
        .filter(|message| message.event().kind() == EventKind::Measurement)
        .collect();
    assert_eq!(measurements.len(), 5);
    let times: Vec<f64> = measurements.iter().map(|message| message.time()).collect();
    assert_eq!(times, vec![65.0, 125.0, 185.0, 245.0, 305.0]);
    for message in &measurements {
        assert_eq!(message.source_id(), "edge.sensor-dox");
        assert_eq!(message.target_id(), "fog.db");
        match message.event().payload() {
            Payload::Measurement {
                variable, value, ..
            } => {
                assert_eq!(*variable, SensorVariable::Dox);
                assert_eq!(*value, 7.0);
            }
            other => panic!("expected a measurement, got {:?}", other),
        }
    }

    // The SAVE_DATA command surfaces a report on the root boundary
    let report = messages
        .iter()
        .find(|message| message.event().kind() == EventKind::Report)
        .expect("no report was emitted");
    assert_eq!(report.time(), 600.0);
    assert_eq!(report.target_id(), "pipeline");
    assert_eq!(report.target_port(), "o_report");
    match report.event().payload() {
        Payload::Report { entries, .. } => assert_eq!(*entries, 5),
        other => panic!("expected a report, got {:?}", other),
    }

    assert_eq!(
        simulation.get_status("commander")?,
        "Dispatched 3 of 3 commands"
    );
    assert_eq!(simulation.get_status("edge.asker")?, "Suspended");
    assert_eq!(simulation.get_status("fog.db")?, "Storing 5 events");
    assert_eq!(
        simulation.get_status("edge.sensor-dox")?,
        "Idle DOX, 190.0 J used"
    );
    assert_eq!(
        simulation
            .get_records("edge.sensor-dox")?
            .iter()
            .filter(|record| record.action == "measure")
            .count(),
        5
    );
    assert_eq!(simulation.get_global_time(), 1000.0);

    // Exit flushes the store, exactly once
    simulation.exit()?;
    assert_eq!(simulation.get_status("fog.db")?, "Flushed 5 events");
    let flushes = simulation
        .get_records("fog.db")?
        .iter()
        .filter(|record| record.action == "flush")
        .count();
    assert_eq!(flushes, 1);
    simulation.exit()?;
    let flushes = simulation
        .get_records("fog.db")?
        .iter()
        .filter(|record| record.action == "flush")
        .count();
    assert_eq!(flushes, 1);
    Ok(())
}

#[test]
fn flat_wiring_matches_the_hierarchy() -> Result<(), SimulationError> {
    let models = vec![commander(), asker(), sensor(), db()];
    let connectors = vec![
        Connector::new(
            String::from("connector-1"),
            String::from("commander"),
            String::from("asker"),
            String::from("o_cmd"),
            String::from("i_cmd"),
        ),
        Connector::new(
            String::from("connector-2"),
            String::from("commander"),
            String::from("db"),
            String::from("o_cmd"),
            String::from("i_cmd"),
        ),
        Connector::new(
            String::from("connector-3"),
            String::from("asker"),
            String::from("sensor-dox"),
            String::from("o_request"),
            String::from("i_request"),
        ),
        Connector::new(
            String::from("connector-4"),
            String::from("sensor-dox"),
            String::from("db"),
            String::from("o_out"),
            String::from("i_data"),
        ),
    ];
    let mut flat = Simulation::post(models, connectors)?;
    let mut nested = nested_pipeline()?;
    flat.initialize()?;
    nested.initialize()?;
    let flat_messages = flat.step_until(1000.0)?;
    let nested_messages = nested.step_until(1000.0)?;

    let deliveries = |messages: &[Message]| -> Vec<(f64, EventKind)> {
        messages
            .iter()
            .filter(|message| message.event().kind() == EventKind::Measurement)
            .map(|message| (message.time(), message.event().kind()))
            .collect()
    };
    assert_eq!(deliveries(&flat_messages), deliveries(&nested_messages));
    assert_eq!(flat.get_status("db")?, nested.get_status("fog.db")?);
    Ok(())
}

#[test]
fn pipelines_load_from_yaml_configurations() -> Result<(), SimulationError> {
    let config = r#"
models:
  - id: "commander-01"
    type: "Commander"
    schedule:
      - time: 0.0
        command: "SAVE_DATA"
    portsOut:
      cmd: "o_cmd"
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
    targetID: "storage-01"
    sourcePort: "o_cmd"
    targetPort: "i_cmd"
"#;
    let mut simulation: Simulation = serde_yaml::from_str(config)?;
    simulation.initialize()?;
    let messages = simulation.step_n(3)?;
    // One command delivery; the resulting report leaves an uncoupled
    // port and is dropped
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].time(), 0.0);
    assert_eq!(
        simulation.get_status("commander-01")?,
        "Dispatched 1 of 1 commands"
    );
    assert_eq!(simulation.get_status("storage-01")?, "Storing 0 events");

    let serialized = serde_yaml::to_string(&simulation).unwrap();
    assert!(serialized.contains("Commander"));
    assert!(serialized.contains("Storage"));
    Ok(())
}
