use crate::half_edge::{Edge, HalfEdge};
use crate::vector::{scalar_mul, Ring, Vector};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Neg};

/// A formal integer combination of the edges of a surface.
///
/// The developing map accumulates the path it unfolds as a chain; evaluating
/// the chain against the surface's vectors recovers the exact displacement.
/// Coefficients refer to the positive half edge of each edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Chain {
    coefficients: Vec<i64>,
}

impl Chain {
    pub fn zero(edges: usize) -> Self {
        Chain {
            coefficients: vec![0; edges],
        }
    }

    /// The chain consisting of a single half edge.
    pub fn from_half_edge(e: HalfEdge, edges: usize) -> Self {
        let mut chain = Chain::zero(edges);
        chain.push(e);
        chain
    }

    /// Append one step along `e`.
    pub fn push(&mut self, e: HalfEdge) {
        let delta = if e.is_positive() { 1 } else { -1 };
        self.coefficients[e.edge().index()] += delta;
    }

    pub fn coefficient(&self, e: Edge) -> i64 {
        self.coefficients[e.index()]
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().all(|&c| c == 0)
    }

    /// The vector this chain represents, given the vector of every positive
    /// half edge.
    pub fn evaluate<T: Ring>(&self, mut vectors: impl FnMut(Edge) -> Vector<T>) -> Vector<T> {
        let mut sum = Vector::zero();
        for (i, &coefficient) in self.coefficients.iter().enumerate() {
            if coefficient == 0 {
                continue;
            }
            let v = vectors(Edge::from_index(i));
            sum = sum
                + Vector::new(
                    scalar_mul(&v.x, coefficient),
                    scalar_mul(&v.y, coefficient),
                );
        }
        sum
    }
}

impl Add for Chain {
    type Output = Chain;

    fn add(self, rhs: Chain) -> Chain {
        debug_assert_eq!(self.coefficients.len(), rhs.coefficients.len());
        Chain {
            coefficients: self
                .coefficients
                .iter()
                .zip(rhs.coefficients.iter())
                .map(|(a, b)| a + b)
                .collect(),
        }
    }
}

impl Neg for Chain {
    type Output = Chain;

    fn neg(self) -> Chain {
        Chain {
            coefficients: self.coefficients.iter().map(|c| -c).collect(),
        }
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (i, &c) in self.coefficients.iter().enumerate() {
            if c == 0 {
                continue;
            }
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "{}*{}", c, Edge::from_index(i))?;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn square_vectors(e: Edge) -> Vector<i64> {
        match e.id() {
            1 => Vector::new(1, 0),
            2 => Vector::new(0, 1),
            3 => Vector::new(-1, -1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn single_half_edge() {
        let chain = Chain::from_half_edge(h(-3), 3);
        assert_eq!(chain.coefficient(Edge::new(3)), -1);
        assert_eq!(chain.evaluate(square_vectors), Vector::new(1, 1));
    }

    #[test]
    fn accumulation_and_negation() {
        let mut chain = Chain::zero(3);
        chain.push(h(1));
        chain.push(h(1));
        chain.push(h(2));
        assert_eq!(chain.evaluate(square_vectors), Vector::new(2, 1));
        assert_eq!((-chain).evaluate(square_vectors), Vector::new(-2, -1));
    }

    #[test]
    fn face_cycle_sums_to_zero() {
        let mut chain = Chain::zero(3);
        chain.push(h(1));
        chain.push(h(2));
        chain.push(h(3));
        assert!(chain.evaluate(square_vectors).is_zero());
        assert!(!chain.is_zero());
    }
}
