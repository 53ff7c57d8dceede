use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, debug_span, info};

use crate::{
    rng::{RngManager, SystemRng},
    scenario::{Scenario, ScenarioError, SimulationConfig},
    snapshot::Snapshot,
    systems::{
        AircraftSystem, AirlineSystem, RunwaySystem, TowerSystem, TrafficSystem, WeatherSystem,
    },
    weather::{WeatherModel, WeatherRegime},
    world::{TickRecord, World},
};

pub struct EngineBuilder {
    config: SimulationConfig,
    systems: Vec<Box<dyn System + Send>>,
}

impl EngineBuilder {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + Send + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + Send + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        let mut world = World::new(self.config);
        world.weather = WeatherModel::new(&world.config.weather).current();
        Engine {
            rng: RngManager::new(world.config.seed),
            systems: self.systems,
            world,
        }
    }
}

/// Owns the world and runs the phase pipeline once per tick.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System + Send>>,
    world: World,
}

impl Engine {
    /// Engine with the standard phase order: weather, traffic, runways,
    /// tower, aircraft, airlines.
    pub fn new(config: SimulationConfig) -> Self {
        let weather = WeatherSystem::new(&config.weather);
        EngineBuilder::new(config)
            .with_system(weather)
            .with_system(TrafficSystem::new())
            .with_system(RunwaySystem::new())
            .with_system(TowerSystem::new())
            .with_system(AircraftSystem::new())
            .with_system(AirlineSystem::new())
            .build()
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        Ok(Self::new(scenario.resolve()?))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Runs one tick. While the airport is closed only systems that opt in
    /// run; the time-series sample and the clock always advance.
    pub fn step(&mut self) -> Result<TickSummary> {
        let tick = self.world.tick();
        let span = debug_span!(target: "sim.engine", "tick", tick);
        let _guard = span.enter();

        let mut system_reports = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            if self.world.weather.is_closed() && !system.runs_while_closed() {
                continue;
            }
            let ctx = SystemContext {
                tick,
                minutes_per_tick: self.world.config.minutes_per_tick,
            };
            let mut rng_stream = self.rng.stream(system.name());
            let start = Instant::now();
            system
                .run(&ctx, &mut self.world, &mut rng_stream)
                .with_context(|| format!("system '{}' failed at tick {tick}", system.name()))?;
            system_reports.push(SystemRunReport {
                name: system.name().to_string(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }

        self.world.record_sample();
        self.world.clock.advance();

        let summary = TickSummary {
            tick,
            weather: self.world.weather.regime,
            closed: self.world.weather.is_closed(),
            active_aircraft: self.world.aircraft.len(),
            holding: self.world.holding.len(),
            system_reports,
        };
        debug!(
            target: "sim.engine",
            tick,
            weather = %summary.weather,
            aircraft = summary.active_aircraft,
            holding = summary.holding,
            "tick complete"
        );
        Ok(summary)
    }

    /// Runs `ticks` ticks and returns the summary of the last one, if any ran.
    pub fn advance(&mut self, ticks: u64) -> Result<Option<TickSummary>> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(self.step()?);
        }
        if ticks > 0 {
            info!(
                target: "sim.engine",
                scenario = %self.world.config.name,
                ticks,
                now = self.world.tick(),
                arrivals = self.world.counters.arrivals,
                departures = self.world.counters.departures,
                diverted = self.world.counters.diverted,
                "advanced simulation"
            );
        }
        Ok(last)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.world.snapshot()
    }

    pub fn history(&self) -> &[TickRecord] {
        &self.world.history
    }
}

pub struct SystemContext {
    pub tick: u64,
    pub minutes_per_tick: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    pub weather: WeatherRegime,
    pub closed: bool,
    pub active_aircraft: usize,
    pub holding: usize,
    pub system_reports: Vec<SystemRunReport>,
}

pub trait System {
    fn name(&self) -> &str;

    /// Whether the system still runs while a microburst has closed the airport.
    fn runs_while_closed(&self) -> bool {
        false
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::tests::test_aircraft;
    use crate::aircraft::{AircraftId, AircraftState};
    use crate::weather::CLOSED_RUNWAY_TICKS;

    fn quiet_scenario() -> Scenario {
        let mut scenario = Scenario::from_preset("balanced");
        scenario.overrides.arrival_rate = Some(0.0);
        scenario.weather.probabilistic = false;
        scenario.go_around_probability = 0.0;
        scenario
    }

    #[test]
    fn diversion_fires_on_the_pass_after_reaching_the_threshold() {
        let mut scenario = quiet_scenario();
        scenario.overrides.ground_capacity = Some(0);
        scenario.diversion.enabled = true;
        scenario.diversion.max_holding_ticks = 5;
        let mut engine = Engine::from_scenario(&scenario).unwrap();

        let mut aircraft = test_aircraft(1);
        aircraft.state = AircraftState::Holding;
        aircraft.holding_ticks = 5;
        let position = aircraft.position;
        engine.world_mut().insert_aircraft(aircraft);

        engine.step().unwrap();

        let world = engine.world();
        assert_eq!(world.aircraft[&AircraftId(1)].state, AircraftState::Diverted);
        assert_eq!(world.aircraft[&AircraftId(1)].position, position);
        assert!(world.holding.is_empty());
        assert_eq!(world.counters.diverted, 1);
        assert_eq!(world.airlines[0].diversions, 1);
        assert_eq!(world.tower.stats().diversions_authorized, 1);
    }

    #[test]
    fn microburst_diverts_airborne_and_closes_every_runway() {
        let mut scenario = quiet_scenario();
        scenario.weather.override_regime = Some("microburst".to_string());
        let mut engine = Engine::from_scenario(&scenario).unwrap();

        let mut holding = test_aircraft(1);
        holding.state = AircraftState::Holding;
        let arriving = test_aircraft(2);
        let mut queued = test_aircraft(3);
        queued.state = AircraftState::QueuedDeparture;
        for aircraft in [holding, arriving, queued] {
            engine.world_mut().insert_aircraft(aircraft);
        }
        engine.world_mut().departure_queue.push_back(AircraftId(3));

        let summary = engine.step().unwrap();

        assert!(summary.closed);
        assert_eq!(summary.system_reports.len(), 1);
        assert_eq!(summary.system_reports[0].name, "weather");
        let world = engine.world();
        assert_eq!(world.counters.diverted, 2);
        assert_eq!(world.aircraft[&AircraftId(1)].state, AircraftState::Diverted);
        assert_eq!(world.aircraft[&AircraftId(2)].state, AircraftState::Diverted);
        assert_eq!(
            world.aircraft[&AircraftId(3)].state,
            AircraftState::QueuedDeparture
        );
        assert!(world
            .runways
            .slots()
            .iter()
            .all(|slot| slot.busy && slot.remaining_ticks == CLOSED_RUNWAY_TICKS));
        assert_eq!(world.history.len(), 1);
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn closed_ticks_still_move_the_clock() {
        let mut scenario = quiet_scenario();
        scenario.weather.override_regime = Some("microburst".to_string());
        let mut engine = Engine::from_scenario(&scenario).unwrap();

        engine.advance(12).unwrap();

        assert_eq!(engine.world().tick(), 12);
        assert_eq!(engine.world().clock.elapsed_minutes(), 60);
        assert_eq!(engine.history().len(), 12);
        assert_eq!(engine.world().counters.spawned, 0);
    }

    #[test]
    fn emergency_in_holding_is_counted_once() {
        let mut scenario = quiet_scenario();
        scenario.overrides.ground_capacity = Some(0);
        let mut engine = Engine::from_scenario(&scenario).unwrap();
        let mut aircraft = test_aircraft(1);
        aircraft.state = AircraftState::Holding;
        aircraft.fuel_remaining = 11;
        engine.world_mut().insert_aircraft(aircraft);

        engine.step().unwrap();
        {
            let plane = &engine.world().aircraft[&AircraftId(1)];
            assert!(plane.is_emergency);
            assert_eq!(plane.priority.level(), 2);
            assert_eq!(plane.fuel_remaining, 10);
        }

        engine.advance(15).unwrap();
        assert_eq!(engine.world().counters.emergency_events, 1);
        assert_eq!(engine.world().aircraft[&AircraftId(1)].fuel_remaining, 0);
    }

    #[test]
    fn advance_reports_only_the_last_tick() {
        let mut engine = Engine::from_scenario(&quiet_scenario()).unwrap();
        assert!(engine.advance(0).unwrap().is_none());
        assert_eq!(engine.world().tick(), 0);

        let last = engine.advance(3).unwrap().unwrap();
        assert_eq!(last.tick, 2);
        assert_eq!(engine.world().tick(), 3);
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn system_reports_follow_the_phase_order() {
        let mut engine = Engine::from_scenario(&quiet_scenario()).unwrap();
        let summary = engine.step().unwrap();
        let names: Vec<_> = summary
            .system_reports
            .iter()
            .map(|report| report.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["weather", "traffic", "runways", "tower", "aircraft", "airlines"]
        );
    }
}
