use serde::Serialize;

use crate::aircraft::{Aircraft, AircraftId, AircraftState, Priority};

pub const HOLDING_FUEL_COST_PER_TICK: f64 = 50.0;
pub const DELAY_PENALTY_PER_TICK: f64 = 100.0;
pub const EMERGENCY_COST_PER_TICK: f64 = 200.0;
pub const DIVERSION_COST: f64 = 5_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AirlineId(pub usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub fuel: f64,
    pub delays: f64,
    pub diversions: f64,
    pub emergencies: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.fuel + self.delays + self.diversions + self.emergencies
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub avg_holding_time: f64,
    pub diversion_rate: f64,
    pub cost_per_flight: f64,
    pub completed_flights: u32,
    pub efficiency_score: f64,
}

#[derive(Debug, Clone)]
pub struct Airline {
    pub id: AirlineId,
    pub name: String,
    pub code: String,
    pub fleet: Vec<AircraftId>,
    pub costs: CostBreakdown,
    pub completed_flights: u32,
    pub diversions: u32,
    pub active_emergencies: u32,
    pub total_holding_ticks: u64,
    pub holding_samples: Vec<u32>,
}

impl Airline {
    pub fn new(id: AirlineId, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: code.into(),
            fleet: Vec::new(),
            costs: CostBreakdown::default(),
            completed_flights: 0,
            diversions: 0,
            active_emergencies: 0,
            total_holding_ticks: 0,
            holding_samples: Vec::new(),
        }
    }

    pub fn register_aircraft(&mut self, id: AircraftId) {
        self.fleet.push(id);
    }

    pub fn release_aircraft(&mut self, id: AircraftId) {
        self.fleet.retain(|owned| *owned != id);
    }

    /// Books one tick of running costs for the aircraft this airline owns.
    pub fn accrue<'a>(&mut self, fleet: impl IntoIterator<Item = &'a Aircraft>) {
        let mut emergencies = 0;
        for aircraft in fleet.into_iter().filter(|a| a.airline == self.id) {
            if aircraft.state == AircraftState::Holding {
                self.costs.fuel += HOLDING_FUEL_COST_PER_TICK;
                self.total_holding_ticks += 1;
            }
            if aircraft.priority == Priority::Delayed {
                self.costs.delays += DELAY_PENALTY_PER_TICK;
            }
            if aircraft.is_emergency {
                self.costs.emergencies += EMERGENCY_COST_PER_TICK;
                emergencies += 1;
            }
        }
        self.active_emergencies = emergencies;
    }

    pub fn register_diversion(&mut self) {
        self.diversions += 1;
        self.costs.diversions += DIVERSION_COST;
    }

    pub fn register_completed_flight(&mut self, aircraft: &Aircraft) {
        self.completed_flights += 1;
        if aircraft.total_holding_ticks > 0 {
            self.holding_samples.push(aircraft.total_holding_ticks);
        }
    }

    pub fn average_holding_time(&self) -> f64 {
        if self.holding_samples.is_empty() {
            return 0.0;
        }
        self.holding_samples.iter().map(|t| *t as f64).sum::<f64>()
            / self.holding_samples.len() as f64
    }

    pub fn efficiency_score(&self) -> f64 {
        if self.completed_flights == 0 {
            return 0.0;
        }
        let score = 100.0
            - self.diversions as f64 * 10.0
            - (self.average_holding_time() * 2.0).min(30.0)
            - self.active_emergencies as f64 * 5.0;
        score.clamp(0.0, 100.0)
    }

    pub fn performance(&self) -> PerformanceMetrics {
        let finished = self.completed_flights + self.diversions;
        let diversion_rate = if finished > 0 {
            self.diversions as f64 / finished as f64 * 100.0
        } else {
            0.0
        };
        let cost_per_flight = if self.completed_flights > 0 {
            self.costs.total() / self.completed_flights as f64
        } else {
            0.0
        };
        PerformanceMetrics {
            avg_holding_time: self.average_holding_time(),
            diversion_rate,
            cost_per_flight,
            completed_flights: self.completed_flights,
            efficiency_score: self.efficiency_score(),
        }
    }
}
