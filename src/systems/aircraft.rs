use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    aircraft::{AircraftEvent, AircraftId, StepContext},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Steps every aircraft in id order and books what each one reports.
pub struct AircraftSystem {
    events: Vec<AircraftEvent>,
}

impl AircraftSystem {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }
}

impl Default for AircraftSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AircraftSystem {
    fn name(&self) -> &str {
        "aircraft"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let ids: Vec<AircraftId> = world.aircraft.keys().copied().collect();
        for id in ids {
            let step_ctx = StepContext {
                airspace: world.airspace,
                ground_saturated: world.ground_saturated(),
                allow_diversion: world.config.allow_diversion,
                max_holding_ticks: world.config.max_holding_ticks,
                go_around_probability: world.config.go_around_probability,
                now_minute: world.clock.elapsed_minutes(),
                minutes_per_tick: ctx.minutes_per_tick,
            };
            let Some(aircraft) = world.aircraft.get_mut(&id) else {
                continue;
            };
            let fuel_before = (aircraft.fuel_burned, aircraft.holding_fuel_burned);
            self.events.clear();
            aircraft.step(&step_ctx, rng, &mut self.events);
            world.counters.fuel_burned += u64::from(aircraft.fuel_burned - fuel_before.0);
            world.counters.holding_fuel_burned +=
                u64::from(aircraft.holding_fuel_burned - fuel_before.1);

            for event in self.events.drain(..) {
                apply_event(world, id, event, ctx.tick);
            }
        }
        Ok(())
    }
}

fn apply_event(world: &mut World, id: AircraftId, event: AircraftEvent, tick: u64) {
    match event {
        AircraftEvent::EmergencyDeclared => {
            world.counters.emergency_events += 1;
            let fuel = world.aircraft.get(&id).map(|a| a.fuel_remaining);
            warn!(target: "sim.aircraft", tick, aircraft = %id, ?fuel, "emergency declared");
        }
        AircraftEvent::GoAround { fuel_lost } => {
            world.counters.go_arounds += 1;
            info!(target: "sim.aircraft", tick, aircraft = %id, fuel_lost, "go-around");
        }
        AircraftEvent::EnteredHolding => {
            if !world.holding.contains(&id) {
                world.holding.push(id);
            }
        }
        AircraftEvent::Landed => {
            world.holding.retain(|held| *held != id);
            world.counters.arrivals += 1;
            debug!(target: "sim.aircraft", tick, aircraft = %id, "landed");
        }
        AircraftEvent::Diverted => {
            world.record_diversion(id);
            info!(target: "sim.aircraft", tick, aircraft = %id, "diverted after holding limit");
        }
        AircraftEvent::QueuedForDeparture => world.departure_queue.push_back(id),
        AircraftEvent::Departed => {
            world.counters.departures += 1;
            if let Some(aircraft) = world.remove_aircraft(id) {
                if let Some(airline) = world.airline_mut(aircraft.airline) {
                    airline.register_completed_flight(&aircraft);
                }
            }
            debug!(target: "sim.aircraft", tick, aircraft = %id, "departed");
        }
        AircraftEvent::LeftAirspace => {
            world.remove_aircraft(id);
        }
    }
}
