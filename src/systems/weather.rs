use anyhow::Result;
use tracing::info;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    scenario::WeatherConfig,
    weather::WeatherModel,
    world::World,
};

/// Updates the weather and applies or lifts a microburst closure.
pub struct WeatherSystem {
    model: WeatherModel,
}

impl WeatherSystem {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            model: WeatherModel::new(config),
        }
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &str {
        "weather"
    }

    fn runs_while_closed(&self) -> bool {
        true
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let previous = world.weather;
        let next = self.model.advance(&world.clock, rng);
        world.weather = next;
        if next.regime != previous.regime {
            info!(
                target: "sim.weather",
                tick = ctx.tick,
                from = %previous.regime,
                to = %next.regime,
                "weather changed"
            );
        }

        if next.is_closed() {
            world.close_airport();
        } else if world.runways.is_closed() {
            world.runways.reopen();
            info!(target: "sim.weather", tick = ctx.tick, "airport reopened");
        }
        Ok(())
    }
}
