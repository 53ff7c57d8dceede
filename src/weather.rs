use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::{SimClock, TimePeriod};
use crate::scenario::WeatherConfig;

/// Countdown placed on every runway slot while the airport is closed.
pub const CLOSED_RUNWAY_TICKS: u32 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherRegime {
    Normal,
    Rain,
    Storm,
    StrongWind,
    Fog,
    Microburst,
}

impl WeatherRegime {
    pub const ALL: [WeatherRegime; 6] = [
        WeatherRegime::Normal,
        WeatherRegime::Rain,
        WeatherRegime::Storm,
        WeatherRegime::StrongWind,
        WeatherRegime::Fog,
        WeatherRegime::Microburst,
    ];

    pub fn probability(self) -> f64 {
        match self {
            WeatherRegime::Normal => 0.54,
            WeatherRegime::Rain => 0.20,
            WeatherRegime::Storm => 0.10,
            WeatherRegime::StrongWind => 0.10,
            WeatherRegime::Fog => 0.05,
            WeatherRegime::Microburst => 0.01,
        }
    }

    pub fn demand_factor(self) -> DemandFactor {
        match self {
            WeatherRegime::Normal => DemandFactor::Open(1.0),
            WeatherRegime::Rain => DemandFactor::Open(1.4),
            WeatherRegime::Fog => DemandFactor::Open(1.6),
            WeatherRegime::StrongWind => DemandFactor::Open(1.7),
            WeatherRegime::Storm => DemandFactor::Open(2.0),
            WeatherRegime::Microburst => DemandFactor::Closed,
        }
    }

    /// Storm and microburst push the tower towards priority and fuel.
    pub fn is_extreme(self) -> bool {
        matches!(self, WeatherRegime::Storm | WeatherRegime::Microburst)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherRegime::Normal => "normal",
            WeatherRegime::Rain => "rain",
            WeatherRegime::Storm => "storm",
            WeatherRegime::StrongWind => "strong_wind",
            WeatherRegime::Fog => "fog",
            WeatherRegime::Microburst => "microburst",
        }
    }
}

impl fmt::Display for WeatherRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherRegime {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WeatherRegime::ALL
            .into_iter()
            .find(|regime| regime.as_str() == value)
            .ok_or_else(|| format!("unknown weather regime '{value}'"))
    }
}

/// How strongly the weather suppresses arrival demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandFactor {
    Open(f64),
    Closed,
}

impl DemandFactor {
    pub fn dampen(self, probability: f64) -> f64 {
        match self {
            DemandFactor::Open(factor) if factor > 0.0 => probability / factor,
            DemandFactor::Open(_) => probability,
            DemandFactor::Closed => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherState {
    pub regime: WeatherRegime,
    pub demand_factor: DemandFactor,
}

impl WeatherState {
    pub fn of(regime: WeatherRegime) -> Self {
        Self {
            regime,
            demand_factor: regime.demand_factor(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.demand_factor, DemandFactor::Closed)
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::of(WeatherRegime::Normal)
    }
}

/// Probability that an arrival spawns during one tick.
pub fn arrival_probability(base_rate: f64, period: TimePeriod, weather: &WeatherState) -> f64 {
    weather
        .demand_factor
        .dampen(base_rate * period.demand_multiplier())
        .clamp(0.0, 1.0)
}

pub struct WeatherModel {
    override_regime: Option<WeatherRegime>,
    probabilistic: bool,
    min_hours: f64,
    max_hours: f64,
    current: WeatherRegime,
    last_change_hours: f64,
    next_change_after: Option<f64>,
}

impl WeatherModel {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            override_regime: config.override_regime,
            probabilistic: config.probabilistic,
            min_hours: config.min_change_hours,
            max_hours: config.max_change_hours,
            current: config.override_regime.unwrap_or(WeatherRegime::Normal),
            last_change_hours: 0.0,
            next_change_after: None,
        }
    }

    pub fn current(&self) -> WeatherState {
        WeatherState::of(self.current)
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, clock: &SimClock, rng: &mut R) -> WeatherState {
        if let Some(regime) = self.override_regime {
            self.current = regime;
            return self.current();
        }
        if !self.probabilistic {
            return self.current();
        }

        let now = clock.elapsed_hours();
        match self.next_change_after {
            None => self.next_change_after = Some(self.draw_threshold(rng)),
            Some(threshold) if now - self.last_change_hours >= threshold => {
                self.current = WeatherRegime::ALL
                    .choose_weighted(rng, |regime| regime.probability())
                    .copied()
                    .unwrap_or(WeatherRegime::Normal);
                self.last_change_hours = now;
                self.next_change_after = Some(self.draw_threshold(rng));
            }
            Some(_) => {}
        }
        self.current()
    }

    fn draw_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_hours > self.min_hours {
            rng.gen_range(self.min_hours..=self.max_hours)
        } else {
            self.min_hours
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config(override_regime: Option<WeatherRegime>, probabilistic: bool) -> WeatherConfig {
        WeatherConfig {
            override_regime,
            probabilistic,
            min_change_hours: 4.0,
            max_change_hours: 8.0,
        }
    }

    #[test]
    fn regime_probabilities_sum_to_one() {
        let total: f64 = WeatherRegime::ALL.iter().map(|r| r.probability()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn override_is_always_returned() {
        let mut model = WeatherModel::new(&config(Some(WeatherRegime::Fog), true));
        let mut clock = SimClock::new(6, 60);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(model.advance(&clock, &mut rng).regime, WeatherRegime::Fog);
            clock.advance();
        }
    }

    #[test]
    fn regime_holds_for_at_least_the_minimum_cadence() {
        let mut model = WeatherModel::new(&config(None, true));
        let mut clock = SimClock::new(6, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        // 4 hours at 5 minutes per tick is 48 ticks.
        for _ in 0..48 {
            assert_eq!(model.advance(&clock, &mut rng).regime, WeatherRegime::Normal);
            clock.advance();
        }
    }

    #[test]
    fn static_mode_keeps_the_last_regime() {
        let mut model = WeatherModel::new(&config(None, false));
        let mut clock = SimClock::new(6, 60);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            assert_eq!(model.advance(&clock, &mut rng).regime, WeatherRegime::Normal);
            clock.advance();
        }
    }

    #[test]
    fn microburst_closes_the_airport() {
        let state = WeatherState::of(WeatherRegime::Microburst);
        assert!(state.is_closed());
        assert_eq!(arrival_probability(1.0, TimePeriod::Daytime, &state), 0.0);
    }

    #[test]
    fn arrival_probability_is_dampened_by_weather_and_scaled_by_time() {
        let storm = WeatherState::of(WeatherRegime::Storm);
        let p = arrival_probability(0.5, TimePeriod::MorningPeak, &storm);
        assert!((p - 0.375).abs() < 1e-12);
        let normal = WeatherState::default();
        let p = arrival_probability(0.5, TimePeriod::Overnight, &normal);
        assert!((p - 0.15).abs() < 1e-12);
    }

    #[test]
    fn regime_names_parse() {
        assert_eq!("strong_wind".parse::<WeatherRegime>(), Ok(WeatherRegime::StrongWind));
        assert!("hail".parse::<WeatherRegime>().is_err());
    }
}
