use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::{
    aircraft::{Aircraft, SpawnParams},
    airline::AirlineId,
    engine::{System, SystemContext},
    rng::SystemRng,
    weather::arrival_probability,
    world::World,
};

/// Spawns at most one arrival per tick.
pub struct TrafficSystem;

impl TrafficSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TrafficSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TrafficSystem {
    fn name(&self) -> &str {
        "traffic"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let probability =
            arrival_probability(world.config.arrival_rate, world.clock.period(), &world.weather);
        if world.airlines.is_empty() || !rng.gen_bool(probability) {
            return Ok(());
        }

        let airline = AirlineId(rng.gen_range(0..world.airlines.len()));
        let airline_code = world.airlines[airline.0].code.clone();
        let id = world.allocate_id();
        let aircraft = Aircraft::spawn(
            SpawnParams {
                id,
                airline,
                airline_code: &airline_code,
                airspace: world.airspace,
                turn_time: world.config.turn_time,
                now_minute: world.clock.elapsed_minutes(),
                minutes_per_tick: ctx.minutes_per_tick,
            },
            rng,
        );
        debug!(
            target: "sim.traffic",
            tick = ctx.tick,
            flight = %aircraft.flight_code,
            class = ?aircraft.class,
            fuel = aircraft.fuel_remaining,
            "aircraft spawned"
        );
        world.insert_aircraft(aircraft);
        world.counters.spawned += 1;
        Ok(())
    }
}
