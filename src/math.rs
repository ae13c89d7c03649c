
//! Simple math utilities.

use crate::error::{Result, checked_mul};


/// Simple two-dimensional vector of any numerical type.
/// Supports only few mathematical operations
/// as this is used mainly as data struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Vec2<T> (pub T, pub T);

impl<T> Vec2<T> {

    /// Seeing this vector as a dimension or size (width and height),
    /// this returns the area that this dimensions contains (`width * height`).
    pub fn area(self) -> T where T: std::ops::Mul<T, Output = T> {
        self.0 * self.1
    }

    /// The first component of this 2D vector.
    #[inline] pub fn width(self) -> T { self.0 }

    /// The second component of this 2D vector.
    #[inline] pub fn height(self) -> T { self.1 }
}

impl Vec2<usize> {

    /// The larger of both dimensions.
    pub fn max_dimension(self) -> usize {
        self.0.max(self.1)
    }

    /// The area, or a resource limit error if it does not fit into memory.
    pub(crate) fn area_checked(self) -> Result<usize> {
        checked_mul(self.0, self.1, "image too large")
    }
}

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self { Vec2(x, y) }
}

impl<T> From<Vec2<T>> for (T, T) {
    fn from(vec2: Vec2<T>) -> Self { (vec2.0, vec2.1) }
}


/// The number of whole bytes occupied by a sample of `depth` bits.
#[inline]
pub(crate) fn bytes_per_sample(depth: usize) -> usize {
    (depth + 7) / 8
}
