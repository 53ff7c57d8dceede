use std::fs;

use aerosim::{
    engine::Engine,
    scenario::{ScenarioError, ScenarioLoader},
    tower::SchedulerPolicy,
    weather::WeatherRegime,
};
use tempfile::tempdir;

fn fixtures() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn bundled_scenarios_resolve() {
    for file in [
        "scenarios/balanced.yaml",
        "scenarios/overload.yaml",
        "scenarios/storm_fixed.yaml",
        "scenarios/microburst.yaml",
    ] {
        let scenario = fixtures().load(file).unwrap();
        let config = scenario
            .resolve()
            .unwrap_or_else(|err| panic!("{file}: {err}"));
        assert!(!config.airlines.is_empty(), "{file}");
    }
}

#[test]
fn storm_fixture_overrides_the_preset() {
    let scenario = fixtures().load("scenarios/storm_fixed.yaml").unwrap();
    let config = scenario.resolve().unwrap();
    assert_eq!(config.policy, SchedulerPolicy::Fixed);
    assert_eq!(config.weather.override_regime, Some(WeatherRegime::Storm));
    assert_eq!(config.ground_capacity, 5);
    assert_eq!(config.max_release_per_tick, 2);
    assert_eq!(config.takeoff_time, 5);
    assert_eq!(scenario.ticks(None), 144);
    assert_eq!(scenario.ticks(Some(10)), 10);
}

#[test]
fn microburst_fixture_keeps_the_airport_closed() {
    let scenario = fixtures().load("scenarios/microburst.yaml").unwrap();
    let mut engine = Engine::from_scenario(&scenario).unwrap();
    engine.advance(scenario.ticks(None)).unwrap();

    let snapshot = engine.snapshot();
    assert!(snapshot.weather.closed);
    assert!(snapshot.weather.demand_factor.is_none());
    assert_eq!(snapshot.metrics.total_spawned, 0);
    assert!(snapshot.runways.iter().all(|r| r.busy));
}

#[test]
fn loader_reads_files_relative_to_its_base() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("custom.yaml"),
        "name: tiny\npreset: custom\noverrides:\n  arrival_rate: 0.25\n  ground_capacity: 2\nrunways: 1\n",
    )
    .unwrap();

    let scenario = ScenarioLoader::new(dir.path()).load("custom.yaml").unwrap();
    let config = scenario.resolve().unwrap();
    assert_eq!(config.name, "tiny");
    assert_eq!(config.arrival_rate, 0.25);
    assert_eq!(config.ground_capacity, 2);
    assert_eq!(config.runways, 1);
    assert_eq!(config.turn_time, 3);
}

#[test]
fn loader_errors_name_the_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.yaml"), "seed: [not a number\n").unwrap();
    let loader = ScenarioLoader::new(dir.path());

    let err = loader.load("broken.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("broken.yaml"));

    let missing = loader.load("missing.yaml").unwrap_err();
    assert!(missing.to_string().contains("missing.yaml"));
}

#[test]
fn invalid_values_fail_at_construction() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("bad.yaml"),
        "preset: normal\noverrides:\n  max_release_per_tick: 0\n",
    )
    .unwrap();
    let scenario = ScenarioLoader::new(dir.path()).load("bad.yaml").unwrap();
    assert_eq!(
        Engine::from_scenario(&scenario).err(),
        Some(ScenarioError::Zero("max_release_per_tick"))
    );
}
