use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Books one tick of running costs per airline.
pub struct AirlineSystem;

impl AirlineSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AirlineSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AirlineSystem {
    fn name(&self) -> &str {
        "airlines"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for airline in world.airlines.iter_mut() {
            airline.accrue(world.aircraft.values());
        }
        Ok(())
    }
}
