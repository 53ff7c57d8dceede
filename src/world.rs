use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::aircraft::{Aircraft, AircraftId, AircraftState, Priority};
use crate::airline::{Airline, AirlineId};
use crate::airspace::Airspace;
use crate::clock::SimClock;
use crate::runway::RunwayPool;
use crate::scenario::SimulationConfig;
use crate::snapshot::Snapshot;
use crate::tower::LandingScheduler;
use crate::weather::{WeatherRegime, WeatherState};

/// Running totals over the whole simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counters {
    pub spawned: u64,
    pub arrivals: u64,
    pub departures: u64,
    pub diverted: u64,
    pub emergency_events: u64,
    pub go_arounds: u64,
    pub fuel_burned: u64,
    pub holding_fuel_burned: u64,
}

/// One row of the per-tick time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub time: String,
    pub arrivals: u64,
    pub departures: u64,
    pub delayed: usize,
    pub active_emergencies: usize,
    pub diverted: u64,
    pub holding: usize,
    pub weather: WeatherRegime,
}

/// Canonical simulation state. Systems borrow it mutably one at a time.
#[derive(Debug)]
pub struct World {
    pub config: SimulationConfig,
    pub airspace: Airspace,
    pub clock: SimClock,
    pub weather: WeatherState,
    pub aircraft: BTreeMap<AircraftId, Aircraft>,
    pub holding: Vec<AircraftId>,
    pub departure_queue: VecDeque<AircraftId>,
    pub runways: RunwayPool,
    pub airlines: Vec<Airline>,
    pub tower: LandingScheduler,
    pub counters: Counters,
    pub history: Vec<TickRecord>,
    next_id: u64,
}

impl World {
    pub fn new(config: SimulationConfig) -> Self {
        let airlines = config
            .airlines
            .iter()
            .enumerate()
            .map(|(index, airline)| Airline::new(AirlineId(index), &airline.name, &airline.code))
            .collect();
        Self {
            airspace: Airspace::new(config.grid_size),
            clock: SimClock::new(config.start_hour, config.minutes_per_tick),
            weather: WeatherState::default(),
            aircraft: BTreeMap::new(),
            holding: Vec::new(),
            departure_queue: VecDeque::new(),
            runways: RunwayPool::new(config.runways),
            airlines,
            tower: LandingScheduler::new(config.policy),
            counters: Counters::default(),
            history: Vec::new(),
            next_id: 1,
            config,
        }
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    pub fn allocate_id(&mut self) -> AircraftId {
        let id = AircraftId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Puts an aircraft into the world and its airline's fleet.
    pub fn insert_aircraft(&mut self, aircraft: Aircraft) {
        if let Some(airline) = self.airlines.get_mut(aircraft.airline.0) {
            airline.register_aircraft(aircraft.id);
        }
        if aircraft.state == AircraftState::Holding && !self.holding.contains(&aircraft.id) {
            self.holding.push(aircraft.id);
        }
        self.next_id = self.next_id.max(aircraft.id.raw() + 1);
        self.aircraft.insert(aircraft.id, aircraft);
    }

    pub fn on_ground_count(&self) -> usize {
        self.aircraft
            .values()
            .filter(|a| a.state.is_on_ground())
            .count()
    }

    pub fn ground_saturated(&self) -> bool {
        self.on_ground_count() >= self.config.ground_capacity as usize
    }

    pub fn airline_mut(&mut self, id: AirlineId) -> Option<&mut Airline> {
        self.airlines.get_mut(id.0)
    }

    /// Drops an aircraft from every collection that may reference it.
    pub fn remove_aircraft(&mut self, id: AircraftId) -> Option<Aircraft> {
        let aircraft = self.aircraft.remove(&id)?;
        self.holding.retain(|held| *held != id);
        self.departure_queue.retain(|queued| *queued != id);
        self.runways.forget(id);
        if let Some(airline) = self.airlines.get_mut(aircraft.airline.0) {
            airline.release_aircraft(id);
        }
        debug!(target: "sim.world", aircraft = %id, "aircraft removed");
        Some(aircraft)
    }

    /// Books a diversion against the totals, the airline and the tower.
    pub fn record_diversion(&mut self, id: AircraftId) {
        self.counters.diverted += 1;
        self.tower.record_diversion();
        self.holding.retain(|held| *held != id);
        if let Some(airline) = self
            .aircraft
            .get(&id)
            .map(|a| a.airline)
            .and_then(|airline| self.airlines.get_mut(airline.0))
        {
            airline.register_diversion();
        }
    }

    /// Microburst: divert everything still airborne and block every runway.
    pub fn close_airport(&mut self) {
        let airborne: Vec<AircraftId> = self
            .aircraft
            .values()
            .filter(|a| a.state.is_airborne())
            .map(|a| a.id)
            .collect();
        for id in &airborne {
            if let Some(aircraft) = self.aircraft.get_mut(id) {
                aircraft.state = AircraftState::Diverted;
            }
            self.record_diversion(*id);
        }
        self.runways.close();
        warn!(
            target: "sim.weather",
            tick = self.tick(),
            diverted = airborne.len(),
            "microburst closed the airport"
        );
    }

    pub fn record_sample(&mut self) {
        let delayed = self
            .aircraft
            .values()
            .filter(|a| a.priority == Priority::Delayed)
            .count();
        let active_emergencies = self.aircraft.values().filter(|a| a.is_emergency).count();
        self.history.push(TickRecord {
            tick: self.tick(),
            time: self.clock.time_of_day().format("%H:%M").to_string(),
            arrivals: self.counters.arrivals,
            departures: self.counters.departures,
            delayed,
            active_emergencies,
            diverted: self.counters.diverted,
            holding: self.holding.len(),
            weather: self.weather.regime,
        });
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_world(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::tests::test_aircraft;
    use crate::scenario::Scenario;
    use crate::weather::CLOSED_RUNWAY_TICKS;

    fn world() -> World {
        let config = Scenario::default().resolve().expect("default scenario resolves");
        World::new(config)
    }

    #[test]
    fn removal_clears_every_reference() {
        let mut world = world();
        let mut aircraft = test_aircraft(4);
        aircraft.state = AircraftState::Holding;
        world.insert_aircraft(aircraft);
        world.departure_queue.push_back(AircraftId(4));
        world.runways.assign(0, AircraftId(4), 3);

        let removed = world.remove_aircraft(AircraftId(4));

        assert!(removed.is_some());
        assert!(world.holding.is_empty());
        assert!(world.departure_queue.is_empty());
        assert!(world.airlines[0].fleet.is_empty());
        assert!(world.runways.slots()[0].busy);
        assert!(world.runways.slots()[0].occupant.is_none());
        assert!(world.remove_aircraft(AircraftId(4)).is_none());
    }

    #[test]
    fn closing_diverts_airborne_and_blocks_runways() {
        let mut world = world();
        let mut holding = test_aircraft(1);
        holding.state = AircraftState::Holding;
        let arriving = test_aircraft(2);
        let mut waiting = test_aircraft(3);
        waiting.state = AircraftState::Waiting;
        for aircraft in [holding, arriving, waiting] {
            world.insert_aircraft(aircraft);
        }

        world.close_airport();

        assert_eq!(world.aircraft[&AircraftId(1)].state, AircraftState::Diverted);
        assert_eq!(world.aircraft[&AircraftId(2)].state, AircraftState::Diverted);
        assert_eq!(world.aircraft[&AircraftId(3)].state, AircraftState::Waiting);
        assert_eq!(world.counters.diverted, 2);
        assert_eq!(world.airlines[0].diversions, 2);
        assert!(world.holding.is_empty());
        assert!(world
            .runways
            .slots()
            .iter()
            .all(|slot| slot.busy && slot.remaining_ticks == CLOSED_RUNWAY_TICKS));
    }

    #[test]
    fn ids_continue_after_inserted_aircraft() {
        let mut world = world();
        world.insert_aircraft(test_aircraft(9));
        assert_eq!(world.allocate_id(), AircraftId(10));
    }
}
