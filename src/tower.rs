//! Control tower: landing sequencing and runway grants.
//!
//! The tower never owns aircraft or queues. The engine hands it the holding
//! set, the departure queue and the runway pool for the duration of a call.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::aircraft::{Aircraft, AircraftId, AircraftState, Priority, Punctuality};
use crate::runway::RunwayPool;
use crate::weather::WeatherRegime;

/// Fuel level treated as a full tank when normalising the fuel signal.
pub const FUEL_REFERENCE: f64 = 120.0;
/// Holding ticks at which the holding-time signal saturates.
pub const HOLDING_REFERENCE: f64 = 30.0;
pub const CONGESTION_THRESHOLD: f64 = 0.7;
const DELAYED_BONUS: f64 = 0.1;
const EARLY_PENALTY: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPolicy {
    /// First come, first served by spawn order.
    Fixed,
    /// Lowest fuel first, emergencies ahead of everyone.
    FuelPriority,
    /// Adaptive weighted multi-criteria score.
    Dynamic,
}

impl SchedulerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerPolicy::Fixed => "fixed",
            SchedulerPolicy::FuelPriority => "fuel_priority",
            SchedulerPolicy::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for SchedulerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fcfs" => Ok(SchedulerPolicy::Fixed),
            "fuel_priority" => Ok(SchedulerPolicy::FuelPriority),
            "dynamic" => Ok(SchedulerPolicy::Dynamic),
            other => Err(format!("unknown scheduler policy '{other}'")),
        }
    }
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        SchedulerPolicy::Dynamic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub priority: f64,
    pub fuel: f64,
    pub holding: f64,
    pub fifo: f64,
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.priority + self.fuel + self.holding + self.fifo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightProfile {
    ExtremeWeather,
    Emergency,
    Congested,
    Balanced,
}

impl WeightProfile {
    pub const ALL: [WeightProfile; 4] = [
        WeightProfile::ExtremeWeather,
        WeightProfile::Emergency,
        WeightProfile::Congested,
        WeightProfile::Balanced,
    ];

    pub fn weights(self) -> Weights {
        match self {
            WeightProfile::ExtremeWeather => Weights {
                priority: 0.45,
                fuel: 0.35,
                holding: 0.15,
                fifo: 0.05,
            },
            WeightProfile::Emergency => Weights {
                priority: 0.40,
                fuel: 0.35,
                holding: 0.20,
                fifo: 0.05,
            },
            WeightProfile::Congested => Weights {
                priority: 0.25,
                fuel: 0.25,
                holding: 0.40,
                fifo: 0.10,
            },
            WeightProfile::Balanced => Weights {
                priority: 0.30,
                fuel: 0.30,
                holding: 0.30,
                fifo: 0.10,
            },
        }
    }

    /// Picks the profile for the current system state, most severe first.
    pub fn select(
        weather: WeatherRegime,
        holding: &[&Aircraft],
        ground_capacity: u32,
    ) -> WeightProfile {
        if weather.is_extreme() {
            return WeightProfile::ExtremeWeather;
        }
        if holding.iter().any(|a| a.is_emergency) {
            return WeightProfile::Emergency;
        }
        if ground_capacity == 0 {
            return WeightProfile::Congested;
        }
        let congestion = holding.len() as f64 / (2.0 * ground_capacity as f64);
        if congestion > CONGESTION_THRESHOLD {
            WeightProfile::Congested
        } else {
            WeightProfile::Balanced
        }
    }
}

/// Sequencing score of one holding aircraft; higher lands first.
pub fn dynamic_score(aircraft: &Aircraft, weights: &Weights, max_id: u64) -> f64 {
    let priority = aircraft.priority.level() as f64 / 2.0;
    let fuel = (1.0 - aircraft.fuel_remaining as f64 / FUEL_REFERENCE).clamp(0.0, 1.0);
    let holding = (aircraft.holding_ticks as f64 / HOLDING_REFERENCE).min(1.0);
    let fifo = if max_id > 0 {
        aircraft.id.raw() as f64 / max_id as f64
    } else {
        0.0
    };
    let base = priority * weights.priority
        + fuel * weights.fuel
        + holding * weights.holding
        + fifo * weights.fifo;
    let punctuality = match aircraft.punctuality {
        Punctuality::Delayed => DELAYED_BONUS,
        Punctuality::Early => EARLY_PENALTY,
        Punctuality::OnTime => 0.0,
    };
    base * aircraft.class.priority_weight() + punctuality
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TowerStats {
    pub reorders: u64,
    pub emergencies_handled: u64,
    pub diversions_authorized: u64,
    pub last_profile: Option<WeightProfile>,
}

/// Inputs for one arrival pass that the tower does not own.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalContext {
    pub ground_capacity: u32,
    pub on_ground: usize,
    pub max_release_per_tick: u32,
    pub weather: WeatherRegime,
}

impl ArrivalContext {
    pub fn free_capacity(&self) -> usize {
        (self.ground_capacity as usize).saturating_sub(self.on_ground)
    }
}

#[derive(Debug, Clone)]
pub struct LandingScheduler {
    policy: SchedulerPolicy,
    stats: TowerStats,
}

impl LandingScheduler {
    pub fn new(policy: SchedulerPolicy) -> Self {
        Self {
            policy,
            stats: TowerStats::default(),
        }
    }

    pub fn policy(&self) -> SchedulerPolicy {
        self.policy
    }

    pub fn stats(&self) -> &TowerStats {
        &self.stats
    }

    pub fn record_diversion(&mut self) {
        self.stats.diversions_authorized += 1;
    }

    /// Returns the holding set in landing order according to the policy.
    pub fn sequence(
        &mut self,
        holding: &[AircraftId],
        fleet: &BTreeMap<AircraftId, Aircraft>,
        weather: WeatherRegime,
        ground_capacity: u32,
    ) -> Vec<AircraftId> {
        let mut queue: Vec<&Aircraft> = holding.iter().filter_map(|id| fleet.get(id)).collect();
        if queue.is_empty() {
            return Vec::new();
        }

        match self.policy {
            SchedulerPolicy::Fixed => queue.sort_by_key(|a| a.id),
            SchedulerPolicy::FuelPriority => {
                queue.sort_by_key(|a| (!a.is_emergency, a.fuel_remaining))
            }
            SchedulerPolicy::Dynamic => {
                let profile = WeightProfile::select(weather, &queue, ground_capacity);
                let weights = profile.weights();
                let max_id = queue.iter().map(|a| a.id.raw()).max().unwrap_or(0);
                let mut scored: Vec<(f64, &Aircraft)> = queue
                    .iter()
                    .map(|a| (dynamic_score(a, &weights, max_id), *a))
                    .collect();
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                let reordered = scored
                    .iter()
                    .zip(queue.iter())
                    .any(|((_, sorted), original)| sorted.id != original.id);
                if reordered {
                    self.stats.reorders += 1;
                }
                self.stats.last_profile = Some(profile);
                queue = scored.into_iter().map(|(_, a)| a).collect();
            }
        }
        queue.into_iter().map(|a| a.id).collect()
    }

    /// Releases holding aircraft into the approach while ground capacity
    /// allows. Returns the released ids in landing order.
    pub fn manage_arrivals(
        &mut self,
        ctx: &ArrivalContext,
        holding: &mut Vec<AircraftId>,
        fleet: &mut BTreeMap<AircraftId, Aircraft>,
    ) -> Vec<AircraftId> {
        let free = ctx.free_capacity();
        if free == 0 || holding.is_empty() {
            return Vec::new();
        }

        mark_delayed_behind_emergencies(holding, fleet);

        *holding = self.sequence(holding, fleet, ctx.weather, ctx.ground_capacity);
        let release = free
            .min(ctx.max_release_per_tick as usize)
            .min(holding.len());

        let mut released = Vec::with_capacity(release);
        for id in holding.drain(..release) {
            let Some(aircraft) = fleet.get_mut(&id) else {
                continue;
            };
            if aircraft.state != AircraftState::Holding {
                continue;
            }
            aircraft.state = AircraftState::Arriving;
            aircraft.holding_ticks = 0;
            if aircraft.is_emergency {
                self.stats.emergencies_handled += 1;
            }
            released.push(id);
        }
        released
    }

    /// Grants every free runway to the head of the departure queue.
    pub fn manage_departures(
        &mut self,
        queue: &mut VecDeque<AircraftId>,
        runways: &mut RunwayPool,
        fleet: &mut BTreeMap<AircraftId, Aircraft>,
        takeoff_time: u32,
    ) -> Vec<AircraftId> {
        let free: Vec<usize> = runways.free_slots().collect();
        let mut cleared = Vec::new();
        for index in free {
            while let Some(id) = queue.pop_front() {
                let Some(aircraft) = fleet.get_mut(&id) else {
                    continue;
                };
                if runways.assign(index, id, takeoff_time) {
                    aircraft.state = AircraftState::Departing;
                    cleared.push(id);
                }
                break;
            }
        }
        cleared
    }

    /// Tower efficiency in [0, 100]: diversions relative to arrivals cost
    /// points, handled emergencies earn up to 20.
    pub fn efficiency(&self, ticks: u64, arrivals: u64, diversions: u64) -> f64 {
        if ticks == 0 {
            return 100.0;
        }
        let diversion_rate = diversions as f64 / arrivals.max(1) as f64 * 100.0;
        let bonus = (self.stats.emergencies_handled as f64 * 5.0).min(20.0);
        (100.0 - diversion_rate * 2.0 + bonus).clamp(0.0, 100.0)
    }
}

/// With an emergency in the stack, everyone else in holding is delayed.
fn mark_delayed_behind_emergencies(
    holding: &[AircraftId],
    fleet: &mut BTreeMap<AircraftId, Aircraft>,
) {
    let any_emergency = holding
        .iter()
        .filter_map(|id| fleet.get(id))
        .any(|a| a.is_emergency);
    if !any_emergency {
        return;
    }
    for id in holding {
        if let Some(aircraft) = fleet.get_mut(id) {
            if !aircraft.is_emergency && aircraft.priority < Priority::Delayed {
                aircraft.priority = Priority::Delayed;
            }
        }
    }
}
