
//! Simple math utilities.

use std::ops::{Add, Sub};

/// Simple two-dimensional vector of any numerical type.
/// Supports only few mathematical operations, as this is used mainly as a tuple.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Vec2<T>(pub T, pub T);

impl<T> Vec2<T> {

    /// The first component of this 2D vector.
    pub fn x(self) -> T where T: Copy { self.0 }

    /// The second component of this 2D vector.
    pub fn y(self) -> T where T: Copy { self.1 }

    /// The first component of this 2D vector, interpreted as the width of a rectangle.
    pub fn width(self) -> T where T: Copy { self.0 }

    /// The second component of this 2D vector, interpreted as the height of a rectangle.
    pub fn height(self) -> T where T: Copy { self.1 }
}

impl Vec2<u32> {

    /// The number of samples in a rectangle of this size.
    /// Never overflows, as the result is wider than the components.
    pub fn area(self) -> u64 {
        u64::from(self.0) * u64::from(self.1)
    }
}

impl<T: Add<T>> Add<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn add(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 + other.0, self.1 + other.1)
    }
}

impl<T: Sub<T>> Sub<Vec2<T>> for Vec2<T> {
    type Output = Vec2<T::Output>;
    fn sub(self, other: Vec2<T>) -> Self::Output {
        Vec2(self.0 - other.0, self.1 - other.1)
    }
}


/// Whether to round up or down.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RoundingMode {
    Down, Up,
}

impl RoundingMode {
    pub fn divide(self, dividend: u32, divisor: u32) -> u32 {
        match self {
            RoundingMode::Up => (dividend + divisor - 1) / divisor, // only works for positive numbers
            RoundingMode::Down => dividend / divisor,
        }
    }
}

/// Compute the number of tiles required to contain all values.
pub fn compute_tile_count(full_res: u32, tile_size: u32) -> u32 {
    // round up, because if the image is not evenly divisible by the tiles,
    // we add another tile at the end (which is only partially used)
    RoundingMode::Up.divide(full_res, tile_size)
}
