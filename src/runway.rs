use serde::Serialize;

use crate::aircraft::AircraftId;
use crate::weather::CLOSED_RUNWAY_TICKS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunwaySlot {
    pub busy: bool,
    pub remaining_ticks: u32,
    pub occupant: Option<AircraftId>,
}

impl RunwaySlot {
    fn free(&mut self) {
        self.busy = false;
        self.remaining_ticks = 0;
        self.occupant = None;
    }
}

/// Departure runways. A slot is either free or counting down an occupancy.
#[derive(Debug, Clone)]
pub struct RunwayPool {
    slots: Vec<RunwaySlot>,
    busy_slot_ticks: u64,
    advanced_ticks: u64,
}

impl RunwayPool {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![RunwaySlot::default(); count],
            busy_slot_ticks: 0,
            advanced_ticks: 0,
        }
    }

    pub fn slots(&self) -> &[RunwaySlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.busy).count()
    }

    pub fn free_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.busy)
            .map(|(index, _)| index)
    }

    /// Counts down busy slots and frees those that reach zero.
    pub fn advance(&mut self) {
        self.advanced_ticks += 1;
        for slot in self.slots.iter_mut().filter(|slot| slot.busy) {
            self.busy_slot_ticks += 1;
            slot.remaining_ticks = slot.remaining_ticks.saturating_sub(1);
            if slot.remaining_ticks == 0 {
                slot.free();
            }
        }
    }

    /// Binds `aircraft` to the free slot at `index` for `ticks` ticks.
    ///
    /// Returns false when the slot is already busy.
    pub fn assign(&mut self, index: usize, aircraft: AircraftId, ticks: u32) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if !slot.busy => {
                slot.busy = true;
                slot.remaining_ticks = ticks.max(1);
                slot.occupant = Some(aircraft);
                true
            }
            _ => false,
        }
    }

    /// Makes every slot busy with the closure countdown.
    pub fn close(&mut self) {
        for slot in &mut self.slots {
            slot.busy = true;
            slot.remaining_ticks = CLOSED_RUNWAY_TICKS;
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.slots.is_empty()
            && self
                .slots
                .iter()
                .all(|slot| slot.remaining_ticks >= CLOSED_RUNWAY_TICKS - 1)
    }

    /// Frees slots still held by a closure countdown.
    pub fn reopen(&mut self) {
        for slot in &mut self.slots {
            if slot.remaining_ticks >= CLOSED_RUNWAY_TICKS - 1 {
                slot.free();
            }
        }
    }

    /// Drops references to an aircraft that left the simulation; the slot
    /// keeps counting down.
    pub fn forget(&mut self, aircraft: AircraftId) {
        for slot in &mut self.slots {
            if slot.occupant == Some(aircraft) {
                slot.occupant = None;
            }
        }
    }

    pub fn busy_slot_ticks(&self) -> u64 {
        self.busy_slot_ticks
    }

    /// Share of slot-ticks spent busy, in percent.
    pub fn utilization(&self) -> f64 {
        let capacity = self.advanced_ticks * self.slots.len() as u64;
        if capacity == 0 {
            return 0.0;
        }
        self.busy_slot_ticks as f64 / capacity as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_counts_down_and_frees() {
        let mut pool = RunwayPool::new(2);
        assert!(pool.assign(0, AircraftId(1), 2));
        assert!(!pool.assign(0, AircraftId(2), 2));

        pool.advance();
        assert_eq!(pool.slots()[0].remaining_ticks, 1);
        assert_eq!(pool.slots()[0].occupant, Some(AircraftId(1)));

        pool.advance();
        assert_eq!(pool.slots()[0], RunwaySlot::default());
        assert_eq!(pool.busy_slot_ticks(), 2);
        assert_eq!(pool.utilization(), 50.0);
    }

    #[test]
    fn free_slots_never_hold_an_occupant() {
        let mut pool = RunwayPool::new(3);
        pool.assign(1, AircraftId(4), 3);
        for _ in 0..5 {
            pool.advance();
            for slot in pool.slots() {
                if !slot.busy {
                    assert_eq!(slot.remaining_ticks, 0);
                    assert!(slot.occupant.is_none());
                }
            }
        }
    }

    #[test]
    fn closure_blocks_every_slot_until_reopened() {
        let mut pool = RunwayPool::new(2);
        pool.assign(0, AircraftId(7), 3);
        pool.close();
        assert!(pool.slots().iter().all(|s| s.busy));
        assert!(pool.slots().iter().all(|s| s.remaining_ticks == CLOSED_RUNWAY_TICKS));
        assert!(pool.is_closed());
        assert_eq!(pool.free_slots().count(), 0);

        pool.advance();
        assert!(pool.is_closed());

        pool.reopen();
        assert_eq!(pool.busy_count(), 0);
        assert!(pool.slots().iter().all(|s| s.occupant.is_none()));
    }

    #[test]
    fn forgetting_an_aircraft_keeps_the_countdown() {
        let mut pool = RunwayPool::new(1);
        pool.assign(0, AircraftId(3), 4);
        pool.forget(AircraftId(3));
        assert!(pool.slots()[0].busy);
        assert_eq!(pool.slots()[0].remaining_ticks, 4);
        assert!(pool.slots()[0].occupant.is_none());
    }
}
