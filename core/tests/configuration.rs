//! Configuration errors surface before anything touches the server.

mod common;

use autopilot_core::{
    agent::AgentSpec,
    config::{BehaviorProfile, ConfigFile, Resolution},
    controller::SimulationController,
    error::SimError,
    time_stepping::TimeSteppingMode,
};
use common::ScriptedPlatform;

/// Resolve then init, the way the runner does.
fn launch(file: ConfigFile, platform: &mut ScriptedPlatform) -> Result<SimulationController, SimError> {
    let config = file.resolve()?;
    SimulationController::init(&config, platform)
}

#[test]
fn unknown_agent_fails_before_connecting() {
    let mut platform = ScriptedPlatform::new();
    let file = ConfigFile { agent: Some("Foo".into()), ..Default::default() };

    let result = launch(file, &mut platform);
    assert!(matches!(result, Err(SimError::Configuration(_))));
    assert!(platform.calls().is_empty());
    assert_eq!(platform.probe.borrow().open_connections, 0);
}

#[test]
fn malformed_resolution_fails_before_connecting() {
    let mut platform = ScriptedPlatform::new();
    let file = ConfigFile { res: Some("abcx600".into()), ..Default::default() };

    let result = launch(file, &mut platform);
    match result {
        Err(SimError::Configuration(msg)) => assert!(msg.contains("abcx600"), "{msg}"),
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("expected a configuration error"),
    }
    assert!(platform.calls().is_empty());
}

#[test]
fn scenario_config_resolves_to_typed_values() {
    let file: ConfigFile = serde_json::from_str(
        r#"{
            "host": "localhost", "port": 2000, "sync": true, "fixed_step": 0.05,
            "agent": "Basic", "seed": 42, "res": "800x600"
        }"#,
    )
    .unwrap();
    let config = file.resolve().unwrap();

    assert_eq!(config.resolution, Resolution { width: 800, height: 600 });
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.time_stepping, TimeSteppingMode::Synchronous { fixed_delta: 0.05 });
    assert!(matches!(
        config.agent,
        AgentSpec::Basic { target_speed, follow_speed_limits: true } if target_speed == 30.0
    ));
}

#[test]
fn behavior_agent_carries_its_profile() {
    let file = ConfigFile {
        agent:    Some("Behavior".into()),
        behavior: Some("aggressive".into()),
        ..Default::default()
    };
    assert_eq!(
        file.resolve().unwrap().agent,
        AgentSpec::Behavior { profile: BehaviorProfile::Aggressive }
    );
}

#[test]
fn unknown_config_keys_are_rejected() {
    let parsed: Result<ConfigFile, _> = serde_json::from_str(r#"{ "hots": "localhost" }"#);
    assert!(parsed.is_err());
}

#[test]
fn config_file_loads_from_disk() {
    let path = std::env::temp_dir().join(format!("autopilot-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "map": "Town05", "sync": true }"#).unwrap();

    let file = ConfigFile::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let config = file.resolve().unwrap();
    assert_eq!(config.map, "Town05");
    assert!(config.time_stepping.is_synchronous());
}
