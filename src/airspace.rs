use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of diagonal-capable grid steps between two cells.
    pub fn steps_to(self, other: GridPos) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }

    pub fn distance_to(self, other: GridPos) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Square airspace with the airport at its center cell.
#[derive(Debug, Clone, Copy)]
pub struct Airspace {
    size: i32,
}

impl Airspace {
    pub fn new(size: i32) -> Self {
        Self { size }
    }

    pub fn center(&self) -> GridPos {
        GridPos::new(self.size / 2, self.size / 2)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        (0..self.size).contains(&pos.x) && (0..self.size).contains(&pos.y)
    }

    pub fn clamp(&self, pos: GridPos) -> GridPos {
        GridPos::new(pos.x.clamp(0, self.size - 1), pos.y.clamp(0, self.size - 1))
    }

    /// One step towards `target`, staying put if the step would leave the map.
    pub fn step_towards(&self, from: GridPos, target: GridPos) -> GridPos {
        let next = GridPos::new(
            from.x + (target.x - from.x).signum(),
            from.y + (target.y - from.y).signum(),
        );
        if self.contains(next) {
            next
        } else {
            from
        }
    }

    pub fn random_edge<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPos {
        let last = self.size - 1;
        let along = rng.gen_range(0..self.size);
        match rng.gen_range(0..4) {
            0 => GridPos::new(along, last),
            1 => GridPos::new(along, 0),
            2 => GridPos::new(0, along),
            _ => GridPos::new(last, along),
        }
    }
}
