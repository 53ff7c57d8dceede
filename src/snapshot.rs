//! Read-only, serialisable view of the world after a tick.

use serde::Serialize;

use crate::aircraft::{AircraftClass, AircraftState, Priority, Punctuality};
use crate::airline::{CostBreakdown, PerformanceMetrics};
use crate::airspace::GridPos;
use crate::clock::TimePeriod;
use crate::scenario::SimulationConfig;
use crate::tower::{SchedulerPolicy, TowerStats};
use crate::weather::{DemandFactor, WeatherRegime};
use crate::world::World;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub clock: ClockView,
    pub weather: WeatherView,
    pub aircraft: Vec<AircraftView>,
    pub airlines: Vec<AirlineView>,
    pub runways: Vec<RunwayView>,
    pub metrics: MetricsView,
    pub config: SimulationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClockView {
    pub hour: u32,
    pub minute: u32,
    pub period: TimePeriod,
    pub elapsed_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherView {
    pub regime: WeatherRegime,
    /// `None` while the airport is closed.
    pub demand_factor: Option<f64>,
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirlineSummary {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AircraftView {
    pub id: u64,
    pub flight_code: String,
    pub position: GridPos,
    pub state: AircraftState,
    pub priority: u8,
    pub fuel: u32,
    pub emergency: bool,
    pub go_around: bool,
    pub distance: f64,
    pub class: AircraftClass,
    pub punctuality: Punctuality,
    pub airline: AirlineSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirlineView {
    pub name: String,
    pub code: String,
    pub fleet_size: usize,
    pub diversions: u32,
    pub costs: CostBreakdown,
    pub total_cost: f64,
    pub performance: PerformanceMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunwayView {
    pub id: usize,
    pub busy: bool,
    pub remaining: u32,
    pub occupant: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerView {
    pub policy: SchedulerPolicy,
    #[serde(flatten)]
    pub stats: TowerStats,
    pub tower_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    pub total_spawned: u64,
    pub total_arrivals: u64,
    pub total_departures: u64,
    pub total_diverted: u64,
    pub total_emergencies: u64,
    pub total_go_arounds: u64,
    pub active_emergencies: usize,
    pub delayed: usize,
    pub holding: usize,
    pub departure_queue: usize,
    pub on_ground: usize,
    pub throughput_per_hour: f64,
    pub runway_utilization: f64,
    pub average_holding_time: f64,
    pub fuel_efficiency: f64,
    pub emergency_rate: f64,
    pub scheduler: SchedulerView,
}

impl Snapshot {
    pub fn from_world(world: &World) -> Self {
        let center = world.airspace.center();
        let aircraft = world
            .aircraft
            .values()
            .map(|a| {
                let airline = world.airlines.get(a.airline.0);
                AircraftView {
                    id: a.id.raw(),
                    flight_code: a.flight_code.clone(),
                    position: a.position,
                    state: a.state,
                    priority: a.priority.level(),
                    fuel: a.fuel_remaining,
                    emergency: a.is_emergency,
                    go_around: a.go_around_flag > 0,
                    distance: a.distance_from(center),
                    class: a.class,
                    punctuality: a.punctuality,
                    airline: AirlineSummary {
                        name: airline.map(|al| al.name.clone()).unwrap_or_default(),
                        code: airline.map(|al| al.code.clone()).unwrap_or_default(),
                    },
                }
            })
            .collect();

        let airlines = world
            .airlines
            .iter()
            .map(|airline| AirlineView {
                name: airline.name.clone(),
                code: airline.code.clone(),
                fleet_size: airline.fleet.len(),
                diversions: airline.diversions,
                costs: airline.costs,
                total_cost: airline.costs.total(),
                performance: airline.performance(),
            })
            .collect();

        let runways = world
            .runways
            .slots()
            .iter()
            .enumerate()
            .map(|(id, slot)| RunwayView {
                id,
                busy: slot.busy,
                remaining: slot.remaining_ticks,
                occupant: slot.occupant.map(|o| o.raw()),
            })
            .collect();

        Self {
            tick: world.tick(),
            clock: ClockView {
                hour: world.clock.hour(),
                minute: world.clock.minute(),
                period: world.clock.period(),
                elapsed_minutes: world.clock.elapsed_minutes(),
            },
            weather: WeatherView {
                regime: world.weather.regime,
                demand_factor: match world.weather.demand_factor {
                    DemandFactor::Open(factor) => Some(factor),
                    DemandFactor::Closed => None,
                },
                closed: world.weather.is_closed(),
            },
            aircraft,
            airlines,
            runways,
            metrics: metrics(world),
            config: world.config.clone(),
        }
    }
}

fn metrics(world: &World) -> MetricsView {
    let counters = &world.counters;
    let hours = world.clock.elapsed_hours();
    let throughput_per_hour = if hours > 0.0 {
        (counters.arrivals + counters.departures) as f64 / hours
    } else {
        0.0
    };

    let (holding_sum, holding_count) = world
        .airlines
        .iter()
        .flat_map(|airline| airline.holding_samples.iter())
        .fold((0u64, 0u64), |(sum, n), ticks| (sum + *ticks as u64, n + 1));
    let average_holding_time = if holding_count > 0 {
        holding_sum as f64 / holding_count as f64
    } else {
        0.0
    };

    let fuel_efficiency = if counters.fuel_burned > 0 {
        100.0 - counters.holding_fuel_burned as f64 / counters.fuel_burned as f64 * 100.0
    } else {
        100.0
    };

    let emergency_rate = if counters.spawned > 0 {
        counters.emergency_events as f64 / counters.spawned as f64 * 100.0
    } else {
        0.0
    };

    MetricsView {
        total_spawned: counters.spawned,
        total_arrivals: counters.arrivals,
        total_departures: counters.departures,
        total_diverted: counters.diverted,
        total_emergencies: counters.emergency_events,
        total_go_arounds: counters.go_arounds,
        active_emergencies: world.aircraft.values().filter(|a| a.is_emergency).count(),
        delayed: world
            .aircraft
            .values()
            .filter(|a| a.priority == Priority::Delayed)
            .count(),
        holding: world.holding.len(),
        departure_queue: world.departure_queue.len(),
        on_ground: world.on_ground_count(),
        throughput_per_hour,
        runway_utilization: world.runways.utilization(),
        average_holding_time,
        fuel_efficiency,
        emergency_rate,
        scheduler: SchedulerView {
            policy: world.tower.policy(),
            stats: *world.tower.stats(),
            tower_efficiency: world.tower.efficiency(
                world.tick(),
                counters.arrivals,
                counters.diverted,
            ),
        },
    }
}
