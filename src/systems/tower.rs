use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    tower::ArrivalContext,
    world::World,
};

/// Arrival release then departure grants.
pub struct TowerSystem;

impl TowerSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TowerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TowerSystem {
    fn name(&self) -> &str {
        "tower"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let arrivals = ArrivalContext {
            ground_capacity: world.config.ground_capacity,
            on_ground: world.on_ground_count(),
            max_release_per_tick: world.config.max_release_per_tick,
            weather: world.weather.regime,
        };
        let released =
            world
                .tower
                .manage_arrivals(&arrivals, &mut world.holding, &mut world.aircraft);
        if !released.is_empty() {
            debug!(
                target: "sim.tower",
                tick = ctx.tick,
                released = ?released,
                still_holding = world.holding.len(),
                "released holding aircraft"
            );
        }

        let cleared = world.tower.manage_departures(
            &mut world.departure_queue,
            &mut world.runways,
            &mut world.aircraft,
            world.config.takeoff_time,
        );
        if !cleared.is_empty() {
            debug!(
                target: "sim.tower",
                tick = ctx.tick,
                cleared = ?cleared,
                queued = world.departure_queue.len(),
                "cleared departures"
            );
        }
        Ok(())
    }
}
