use crate::error::{Error, Result};
use crate::vector::{Ccw, Ring, Vector};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A distinguished direction in the plane and the predicates derived from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vertical<T> {
    direction: Vector<T>,
}

impl<T: Ring> Vertical<T> {
    pub fn new(direction: Vector<T>) -> Result<Self> {
        if direction.is_zero() {
            return Err(Error::InvalidArgument(
                "the vertical direction must be non-zero".to_string(),
            ));
        }
        Ok(Vertical { direction })
    }

    pub fn direction(&self) -> &Vector<T> {
        &self.direction
    }

    /// The component of `v` along the horizontal, i.e. the cross product
    /// with the vertical. Vanishes exactly for vertical vectors.
    pub fn perpendicular(&self, v: &Vector<T>) -> T {
        self.direction.cross(v)
    }

    /// The component of `v` along the vertical.
    pub fn parallel(&self, v: &Vector<T>) -> T {
        self.direction.dot(v)
    }

    pub fn perpendicular_sign(&self, v: &Vector<T>) -> Ordering {
        self.perpendicular(v).cmp(&T::zero())
    }

    pub fn parallel_sign(&self, v: &Vector<T>) -> Ordering {
        self.parallel(v).cmp(&T::zero())
    }

    /// Whether `v` is parallel to the vertical, in either direction.
    pub fn is_vertical(&self, v: &Vector<T>) -> bool {
        !v.is_zero() && self.direction.ccw(v) == Ccw::Collinear
    }

    /// Whether an edge with vector `v` may be flipped in a collapsed
    /// surface: its vertical component must not vanish.
    pub fn large(&self, v: &Vector<T>) -> bool {
        self.parallel_sign(v) != Ordering::Equal
    }
}

impl<T: Ring> Display for Vertical<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components() {
        let vertical = Vertical::new(Vector::new(0i64, 1)).unwrap();
        assert_eq!(vertical.perpendicular(&Vector::new(3, 5)), 3);
        assert_eq!(vertical.parallel(&Vector::new(3, 5)), 5);
        assert!(vertical.is_vertical(&Vector::new(0, -2)));
        assert!(!vertical.is_vertical(&Vector::new(1, 2)));
    }

    #[test]
    fn slanted_vertical() {
        let vertical = Vertical::new(Vector::new(1i64, 1)).unwrap();
        assert!(vertical.is_vertical(&Vector::new(-2, -2)));
        assert_eq!(vertical.perpendicular_sign(&Vector::new(1, 0)), Ordering::Less);
        assert!(vertical.large(&Vector::new(1, 0)));
        assert!(!vertical.large(&Vector::new(1, -1)));
    }

    #[test]
    fn rejects_zero() {
        assert!(Vertical::new(Vector::<i64>::new(0, 0)).is_err());
    }
}
