//! Simulated time of day.
//!
//! The tick counter is the canonical time unit. The time of day is derived
//! from it as `start + tick * minutes_per_tick`, wrapping at midnight.

use chrono::{Duration, NaiveTime, Timelike};
use serde::Serialize;

const MINUTES_PER_DAY: u64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Overnight,
    MorningPeak,
    Daytime,
    EveningPeak,
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimePeriod::Overnight,
            7..=9 => TimePeriod::MorningPeak,
            17..=19 => TimePeriod::EveningPeak,
            _ => TimePeriod::Daytime,
        }
    }

    /// Scales the base arrival rate for this part of the day.
    pub fn demand_multiplier(self) -> f64 {
        match self {
            TimePeriod::MorningPeak | TimePeriod::EveningPeak => 1.5,
            TimePeriod::Overnight => 0.3,
            TimePeriod::Daytime => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    start: NaiveTime,
    minutes_per_tick: u32,
}

impl SimClock {
    pub fn new(start_hour: u32, minutes_per_tick: u32) -> Self {
        let start = NaiveTime::from_hms_opt(start_hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            tick: 0,
            start,
            minutes_per_tick,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn minutes_per_tick(&self) -> u32 {
        self.minutes_per_tick
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }

    pub fn elapsed_minutes(&self) -> u64 {
        self.tick * self.minutes_per_tick as u64
    }

    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed_minutes() as f64 / 60.0
    }

    pub fn time_of_day(&self) -> NaiveTime {
        let offset = (self.elapsed_minutes() % MINUTES_PER_DAY) as i64;
        let (time, _) = self.start.overflowing_add_signed(Duration::minutes(offset));
        time
    }

    pub fn hour(&self) -> u32 {
        self.time_of_day().hour()
    }

    pub fn minute(&self) -> u32 {
        self.time_of_day().minute()
    }

    pub fn period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_wraps_at_midnight() {
        let mut clock = SimClock::new(23, 30);
        assert_eq!((clock.hour(), clock.minute()), (23, 0));
        clock.advance();
        clock.advance();
        clock.advance();
        assert_eq!((clock.hour(), clock.minute()), (0, 30));
        assert_eq!(clock.elapsed_minutes(), 90);
    }

    #[test]
    fn periods_follow_the_daily_profile() {
        assert_eq!(TimePeriod::from_hour(3), TimePeriod::Overnight);
        assert_eq!(TimePeriod::from_hour(6), TimePeriod::Daytime);
        assert_eq!(TimePeriod::from_hour(8), TimePeriod::MorningPeak);
        assert_eq!(TimePeriod::from_hour(18), TimePeriod::EveningPeak);
        assert_eq!(TimePeriod::from_hour(22), TimePeriod::Daytime);
        assert_eq!(TimePeriod::MorningPeak.demand_multiplier(), 1.5);
        assert_eq!(TimePeriod::Overnight.demand_multiplier(), 0.3);
    }
}
