use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct RunwaySystem;

impl RunwaySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RunwaySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for RunwaySystem {
    fn name(&self) -> &str {
        "runways"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.runways.advance();
        Ok(())
    }
}
