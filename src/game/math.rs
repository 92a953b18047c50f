use serde::{Deserialize, Serialize};

/// A world-space position on a single map.
///
/// Game data stores fractional coordinates; the walkability grid truncates
/// them to pixels, everything else keeps full `f64` precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        pythagoras(self.x, self.y, other.x, other.y)
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A point qualified with the map it lives on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub map: String,
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(map: impl Into<String>, x: f64, y: f64) -> Self {
        Self { map: map.into(), x, y }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub fn pythagoras(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

/// Velocity toward `going` at `speed` units per second.
///
/// The `1e-4` term keeps the normalisation finite for a zero-length move;
/// components are truncated to whole units like the server does.
pub fn calculate_velocity(from: Point, going: Point, speed: f64) -> Point {
    let dx = going.x - from.x;
    let dy = going.y - from.y;
    let reference = (0.0001 + dx * dx + dy * dy).sqrt();
    Point::new((speed * dx / reference).trunc(), (speed * dy / reference).trunc())
}

/// Frame deltas above this are clamped so a stalled interpolator
/// does not teleport entities past their destination.
pub const MAX_FRAME_DELTA_MS: f64 = 50.0;

/// Snap distance used when deciding an interpolated entity has arrived.
pub const ARRIVAL_SNAP: f64 = 0.1;
