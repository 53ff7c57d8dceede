//! Aircraft entity and its per-tick lifecycle.
//!
//! An aircraft only decides things about itself. Anything that touches a
//! shared collection (holding set, departure queue, counters, airlines) is
//! reported back to the caller as an [`AircraftEvent`] and applied there.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::airline::AirlineId;
use crate::airspace::{Airspace, GridPos};

/// Fuel level at or below which an airborne aircraft declares an emergency.
pub const EMERGENCY_FUEL: u32 = 10;
pub const HOLDING_RADIUS: i32 = 3;
const HOLDING_ANGLE_STEP: f64 = 0.25;
const GO_AROUND_FLAG_TICKS: u32 = 2;
const PUNCTUALITY_TOLERANCE_MINUTES: u64 = 15;
const SCHEDULE_JITTER_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AircraftId(pub u64);

impl AircraftId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftState {
    Arriving,
    Holding,
    Waiting,
    QueuedDeparture,
    Departing,
    Diverted,
    Gone,
}

impl AircraftState {
    pub fn is_airborne(self) -> bool {
        matches!(self, AircraftState::Arriving | AircraftState::Holding)
    }

    /// States that occupy ground capacity.
    pub fn is_on_ground(self) -> bool {
        matches!(
            self,
            AircraftState::Waiting | AircraftState::QueuedDeparture | AircraftState::Departing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    Delayed,
    Emergency,
}

impl Priority {
    pub fn level(self) -> u8 {
        match self {
            Priority::Normal => 0,
            Priority::Delayed => 1,
            Priority::Emergency => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftClass {
    Light,
    Medium,
    Heavy,
    SuperHeavy,
}

impl AircraftClass {
    pub const ALL: [AircraftClass; 4] = [
        AircraftClass::Light,
        AircraftClass::Medium,
        AircraftClass::Heavy,
        AircraftClass::SuperHeavy,
    ];

    /// Share of spawned traffic.
    pub fn share(self) -> f64 {
        match self {
            AircraftClass::Light => 0.25,
            AircraftClass::Medium => 0.55,
            AircraftClass::Heavy => 0.15,
            AircraftClass::SuperHeavy => 0.05,
        }
    }

    /// Multiplier applied to the tower's sequencing score.
    pub fn priority_weight(self) -> f64 {
        match self {
            AircraftClass::Light => 0.8,
            AircraftClass::Medium => 1.0,
            AircraftClass::Heavy => 1.2,
            AircraftClass::SuperHeavy => 1.3,
        }
    }

    /// Extra ground turnaround ticks on top of the scenario turn time.
    pub fn turnaround_adjustment(self) -> i64 {
        match self {
            AircraftClass::Light => -1,
            AircraftClass::Medium => 0,
            AircraftClass::Heavy => 1,
            AircraftClass::SuperHeavy => 2,
        }
    }

    pub fn turnaround_ticks(self, turn_time: u32) -> u32 {
        (turn_time as i64 + self.turnaround_adjustment()).max(1) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Punctuality {
    Early,
    OnTime,
    Delayed,
}

impl Punctuality {
    pub fn classify(expected_minute: u64, scheduled_minute: u64) -> Self {
        if expected_minute + PUNCTUALITY_TOLERANCE_MINUTES < scheduled_minute {
            Punctuality::Early
        } else if expected_minute > scheduled_minute + PUNCTUALITY_TOLERANCE_MINUTES {
            Punctuality::Delayed
        } else {
            Punctuality::OnTime
        }
    }
}

/// Circular orbit around the airport, tracked by phase angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldingPattern {
    pub angle: f64,
    pub radius: i32,
}

impl HoldingPattern {
    pub fn new(angle: f64) -> Self {
        Self {
            angle,
            radius: HOLDING_RADIUS,
        }
    }

    /// Advances the phase and returns the orbit cell, clamped to the map.
    pub fn advance(&mut self, airspace: &Airspace) -> GridPos {
        self.angle += HOLDING_ANGLE_STEP;
        let center = airspace.center();
        let r = self.radius as f64;
        airspace.clamp(GridPos::new(
            center.x + (r * self.angle.cos()) as i32,
            center.y + (r * self.angle.sin()) as i32,
        ))
    }
}

/// Something an aircraft did this tick that the engine has to book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AircraftEvent {
    EmergencyDeclared,
    GoAround { fuel_lost: u32 },
    EnteredHolding,
    Landed,
    Diverted,
    QueuedForDeparture,
    Departed,
    LeftAirspace,
}

/// Read-only view of the world an aircraft needs for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub airspace: Airspace,
    pub ground_saturated: bool,
    pub allow_diversion: bool,
    pub max_holding_ticks: u32,
    pub go_around_probability: f64,
    pub now_minute: u64,
    pub minutes_per_tick: u32,
}

/// Everything drawn at random when an aircraft enters the airspace.
#[derive(Debug, Clone)]
pub struct SpawnParams<'a> {
    pub id: AircraftId,
    pub airline: AirlineId,
    pub airline_code: &'a str,
    pub airspace: Airspace,
    pub turn_time: u32,
    pub now_minute: u64,
    pub minutes_per_tick: u32,
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: AircraftId,
    pub flight_code: String,
    pub airline: AirlineId,
    pub class: AircraftClass,
    pub state: AircraftState,
    pub position: GridPos,
    pub spawn_point: GridPos,
    pub exit_point: GridPos,
    pub fuel_remaining: u32,
    pub priority: Priority,
    pub is_emergency: bool,
    pub holding_ticks: u32,
    pub total_holding_ticks: u32,
    pub holding_angle: f64,
    pub holding: Option<HoldingPattern>,
    pub ground_turn_ticks: u32,
    pub scheduled_arrival_minute: u64,
    pub actual_arrival_minute: Option<u64>,
    pub punctuality: Punctuality,
    pub go_around_flag: u32,
    pub emergency_reported: bool,
    pub fuel_burned: u32,
    pub holding_fuel_burned: u32,
}

impl Aircraft {
    pub fn spawn<R: Rng + ?Sized>(params: SpawnParams<'_>, rng: &mut R) -> Self {
        let class = AircraftClass::ALL
            .choose_weighted(rng, |class| class.share())
            .copied()
            .unwrap_or(AircraftClass::Medium);
        let spawn_point = params.airspace.random_edge(rng);
        let exit_point = params.airspace.random_edge(rng);
        let transit = spawn_point.steps_to(params.airspace.center()) as u64
            * params.minutes_per_tick as u64;
        let jitter = rng.gen_range(-SCHEDULE_JITTER_MINUTES..=SCHEDULE_JITTER_MINUTES);
        let scheduled = (params.now_minute + transit).saturating_add_signed(jitter);

        Self {
            id: params.id,
            flight_code: format!("{} {}", params.airline_code, params.id),
            airline: params.airline,
            class,
            state: AircraftState::Arriving,
            position: spawn_point,
            spawn_point,
            exit_point,
            fuel_remaining: rng.gen_range(60..=120),
            priority: Priority::Normal,
            is_emergency: false,
            holding_ticks: 0,
            total_holding_ticks: 0,
            holding_angle: rng.gen::<f64>() * std::f64::consts::TAU,
            holding: None,
            ground_turn_ticks: class.turnaround_ticks(params.turn_time),
            scheduled_arrival_minute: scheduled,
            actual_arrival_minute: None,
            punctuality: Punctuality::OnTime,
            go_around_flag: 0,
            emergency_reported: false,
            fuel_burned: 0,
            holding_fuel_burned: 0,
        }
    }

    pub fn distance_from(&self, center: GridPos) -> f64 {
        self.position.distance_to(center)
    }

    /// Runs one tick of the lifecycle and appends whatever happened.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &StepContext,
        rng: &mut R,
        events: &mut Vec<AircraftEvent>,
    ) {
        if self.go_around_flag > 0 {
            self.go_around_flag -= 1;
        }

        if self.state.is_airborne() {
            self.burn_fuel(1);
            if !self.is_emergency && self.fuel_remaining <= EMERGENCY_FUEL {
                self.declare_emergency(events);
            }
            self.update_punctuality(ctx);
        }

        match self.state {
            AircraftState::Arriving => self.step_arriving(ctx, events),
            AircraftState::Holding => self.step_holding(ctx, rng, events),
            AircraftState::Waiting => self.step_waiting(events),
            AircraftState::QueuedDeparture | AircraftState::Gone => {}
            AircraftState::Departing => self.step_departing(ctx, events),
            AircraftState::Diverted => {
                self.position = ctx.airspace.step_towards(self.position, self.exit_point);
                if self.position == self.exit_point {
                    events.push(AircraftEvent::LeftAirspace);
                }
            }
        }
    }

    fn step_arriving(&mut self, ctx: &StepContext, events: &mut Vec<AircraftEvent>) {
        if ctx.ground_saturated {
            if self.holding.is_none() {
                self.holding = Some(HoldingPattern::new(self.holding_angle));
            }
            self.state = AircraftState::Holding;
            self.holding_ticks = 0;
            events.push(AircraftEvent::EnteredHolding);
            return;
        }

        let center = ctx.airspace.center();
        self.position = ctx.airspace.step_towards(self.position, center);
        if self.position == center {
            self.state = AircraftState::Waiting;
            self.actual_arrival_minute = Some(ctx.now_minute);
            self.punctuality = Punctuality::classify(ctx.now_minute, self.scheduled_arrival_minute);
            events.push(AircraftEvent::Landed);
        }
    }

    fn step_holding<R: Rng + ?Sized>(
        &mut self,
        ctx: &StepContext,
        rng: &mut R,
        events: &mut Vec<AircraftEvent>,
    ) {
        self.holding_ticks += 1;
        self.total_holding_ticks += 1;

        if !self.is_emergency && rng.gen_bool(ctx.go_around_probability) {
            let fuel_lost = rng.gen_range(20..=40);
            self.burn_fuel(fuel_lost);
            self.go_around_flag = GO_AROUND_FLAG_TICKS;
            events.push(AircraftEvent::GoAround { fuel_lost });
            self.declare_emergency(events);
        }

        if ctx.allow_diversion
            && !self.is_emergency
            && self.holding_ticks >= ctx.max_holding_ticks
        {
            self.state = AircraftState::Diverted;
            events.push(AircraftEvent::Diverted);
            return;
        }

        let angle = self.holding_angle;
        let pattern = self
            .holding
            .get_or_insert_with(|| HoldingPattern::new(angle));
        self.position = pattern.advance(&ctx.airspace);
        self.holding_angle = pattern.angle;
    }

    fn step_waiting(&mut self, events: &mut Vec<AircraftEvent>) {
        self.resolve_emergency();
        self.ground_turn_ticks = self.ground_turn_ticks.saturating_sub(1);
        if self.ground_turn_ticks == 0 {
            self.state = AircraftState::QueuedDeparture;
            events.push(AircraftEvent::QueuedForDeparture);
        }
    }

    fn step_departing(&mut self, ctx: &StepContext, events: &mut Vec<AircraftEvent>) {
        self.resolve_emergency();
        self.go_around_flag = 0;
        self.position = ctx.airspace.step_towards(self.position, self.exit_point);
        if self.position == self.exit_point {
            self.state = AircraftState::Gone;
            events.push(AircraftEvent::Departed);
        }
    }

    fn burn_fuel(&mut self, amount: u32) {
        let burned = amount.min(self.fuel_remaining);
        self.fuel_remaining -= burned;
        self.fuel_burned += burned;
        if self.state == AircraftState::Holding {
            self.holding_fuel_burned += burned;
        }
    }

    fn declare_emergency(&mut self, events: &mut Vec<AircraftEvent>) {
        self.is_emergency = true;
        self.priority = Priority::Emergency;
        if !self.emergency_reported {
            self.emergency_reported = true;
            events.push(AircraftEvent::EmergencyDeclared);
        }
    }

    /// Landing or taking off resolves an emergency; the aircraft keeps
    /// "delayed" priority afterwards.
    fn resolve_emergency(&mut self) {
        self.is_emergency = false;
        if self.priority == Priority::Emergency {
            self.priority = Priority::Delayed;
        }
    }

    fn update_punctuality(&mut self, ctx: &StepContext) {
        let remaining_ticks = self.position.steps_to(ctx.airspace.center()) as u64;
        let expected = ctx.now_minute + remaining_ticks * ctx.minutes_per_tick as u64;
        self.punctuality = Punctuality::classify(expected, self.scheduled_arrival_minute);
        if self.punctuality == Punctuality::Delayed && self.priority == Priority::Normal {
            self.priority = Priority::Delayed;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    pub(crate) fn test_aircraft(id: u64) -> Aircraft {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        let mut aircraft = Aircraft::spawn(
            SpawnParams {
                id: AircraftId(id),
                airline: AirlineId(0),
                airline_code: "AL1",
                airspace: Airspace::new(20),
                turn_time: 3,
                now_minute: 0,
                minutes_per_tick: 5,
            },
            &mut rng,
        );
        aircraft.class = AircraftClass::Medium;
        aircraft.ground_turn_ticks = 3;
        aircraft.fuel_remaining = 100;
        aircraft.scheduled_arrival_minute = 10_000;
        aircraft
    }

    fn ctx(ground_saturated: bool) -> StepContext {
        StepContext {
            airspace: Airspace::new(20),
            ground_saturated,
            allow_diversion: false,
            max_holding_ticks: 10,
            go_around_probability: 0.0,
            now_minute: 0,
            minutes_per_tick: 5,
        }
    }

    #[test]
    fn saturated_ground_sends_arrivals_to_holding() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut aircraft = test_aircraft(1);
        let start = aircraft.position;
        let mut events = Vec::new();

        aircraft.step(&ctx(true), &mut rng, &mut events);

        assert_eq!(aircraft.state, AircraftState::Holding);
        assert_eq!(aircraft.position, start);
        assert!(aircraft.holding.is_some());
        assert_eq!(events, vec![AircraftEvent::EnteredHolding]);
    }

    #[test]
    fn arrival_lands_at_the_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut aircraft = test_aircraft(2);
        let mut events = Vec::new();
        for _ in 0..20 {
            aircraft.step(&ctx(false), &mut rng, &mut events);
            if aircraft.state != AircraftState::Arriving {
                break;
            }
        }
        assert_eq!(aircraft.state, AircraftState::Waiting);
        assert_eq!(aircraft.position, Airspace::new(20).center());
        assert!(events.contains(&AircraftEvent::Landed));
        assert!(aircraft.actual_arrival_minute.is_some());
    }

    #[test]
    fn fuel_floors_at_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut aircraft = test_aircraft(3);
        aircraft.fuel_remaining = 1;
        let mut events = Vec::new();
        for _ in 0..5 {
            aircraft.step(&ctx(true), &mut rng, &mut events);
        }
        assert_eq!(aircraft.fuel_remaining, 0);
    }

    #[test]
    fn emergency_is_declared_once_when_fuel_reaches_ten() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut aircraft = test_aircraft(4);
        aircraft.state = AircraftState::Holding;
        aircraft.fuel_remaining = 11;
        let mut events = Vec::new();

        aircraft.step(&ctx(true), &mut rng, &mut events);
        assert_eq!(aircraft.fuel_remaining, 10);
        assert!(aircraft.is_emergency);
        assert_eq!(aircraft.priority, Priority::Emergency);

        for _ in 0..20 {
            aircraft.step(&ctx(true), &mut rng, &mut events);
        }
        let declared = events
            .iter()
            .filter(|e| **e == AircraftEvent::EmergencyDeclared)
            .count();
        assert_eq!(declared, 1);
    }

    #[test]
    fn holding_without_diversion_never_diverts() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut aircraft = test_aircraft(5);
        aircraft.state = AircraftState::Holding;
        aircraft.holding_ticks = 10_000;
        let mut events = Vec::new();
        for _ in 0..50 {
            aircraft.step(&ctx(true), &mut rng, &mut events);
        }
        assert_eq!(aircraft.state, AircraftState::Holding);
        assert!(!events.contains(&AircraftEvent::Diverted));
    }

    #[test]
    fn holding_past_the_limit_diverts_without_moving() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut aircraft = test_aircraft(6);
        aircraft.state = AircraftState::Holding;
        aircraft.holding_ticks = 5;
        let before = aircraft.position;
        let mut step_ctx = ctx(true);
        step_ctx.allow_diversion = true;
        step_ctx.max_holding_ticks = 5;
        let mut events = Vec::new();

        aircraft.step(&step_ctx, &mut rng, &mut events);

        assert_eq!(aircraft.state, AircraftState::Diverted);
        assert_eq!(aircraft.position, before);
        assert_eq!(events, vec![AircraftEvent::Diverted]);
    }

    #[test]
    fn emergencies_are_not_diverted() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut aircraft = test_aircraft(7);
        aircraft.state = AircraftState::Holding;
        aircraft.holding_ticks = 50;
        aircraft.is_emergency = true;
        aircraft.priority = Priority::Emergency;
        let mut step_ctx = ctx(true);
        step_ctx.allow_diversion = true;
        step_ctx.max_holding_ticks = 5;
        let mut events = Vec::new();

        aircraft.step(&step_ctx, &mut rng, &mut events);
        assert_eq!(aircraft.state, AircraftState::Holding);
    }

    #[test]
    fn go_around_burns_fuel_and_escalates() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut aircraft = test_aircraft(8);
        aircraft.state = AircraftState::Holding;
        let mut step_ctx = ctx(true);
        step_ctx.go_around_probability = 1.0;
        let mut events = Vec::new();

        aircraft.step(&step_ctx, &mut rng, &mut events);

        assert!(aircraft.is_emergency);
        assert_eq!(aircraft.go_around_flag, 2);
        assert!(aircraft.fuel_remaining <= 100 - 1 - 20);
        assert!(aircraft.fuel_remaining >= 100 - 1 - 40);
        assert!(matches!(events[0], AircraftEvent::GoAround { .. }));
        assert_eq!(events[1], AircraftEvent::EmergencyDeclared);
    }

    #[test]
    fn waiting_resolves_emergency_and_queues_after_turnaround() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut aircraft = test_aircraft(9);
        aircraft.state = AircraftState::Waiting;
        aircraft.is_emergency = true;
        aircraft.priority = Priority::Emergency;
        let fuel = aircraft.fuel_remaining;
        let mut events = Vec::new();

        aircraft.step(&ctx(false), &mut rng, &mut events);
        assert!(!aircraft.is_emergency);
        assert_eq!(aircraft.priority, Priority::Delayed);
        assert_eq!(aircraft.fuel_remaining, fuel);

        aircraft.step(&ctx(false), &mut rng, &mut events);
        aircraft.step(&ctx(false), &mut rng, &mut events);
        assert_eq!(aircraft.state, AircraftState::QueuedDeparture);
        assert_eq!(events, vec![AircraftEvent::QueuedForDeparture]);
    }

    #[test]
    fn departing_aircraft_leave_through_the_exit() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut aircraft = test_aircraft(10);
        aircraft.state = AircraftState::Departing;
        aircraft.position = Airspace::new(20).center();
        let mut events = Vec::new();
        for _ in 0..30 {
            aircraft.step(&ctx(false), &mut rng, &mut events);
        }
        assert_eq!(aircraft.state, AircraftState::Gone);
        assert_eq!(aircraft.position, aircraft.exit_point);
        assert_eq!(events, vec![AircraftEvent::Departed]);
    }

    #[test]
    fn heavier_classes_turn_around_slower() {
        assert_eq!(AircraftClass::Light.turnaround_ticks(1), 1);
        assert_eq!(AircraftClass::Medium.turnaround_ticks(3), 3);
        assert_eq!(AircraftClass::SuperHeavy.turnaround_ticks(3), 5);
        let shares: f64 = AircraftClass::ALL.iter().map(|c| c.share()).sum();
        assert!((shares - 1.0).abs() < 1e-9);
    }
}
