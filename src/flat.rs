use crate::chain::Chain;
use crate::combinatorial::{Subscriber, Triangulation, Vertex};
use crate::error::{Error, Result};
use crate::half_edge::{Edge, HalfEdge};
use crate::saddle_connection::SaddleConnection;
use crate::tracking::HalfEdgeMap;
use crate::vector::{Ring, Vector};
use log::trace;
use std::fmt::{Display, Formatter};

/// A translation surface: a combinatorial triangulation together with a
/// vector for every half edge, so that each face closes up to a Euclidean
/// triangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatTriangulation<T> {
    combinatorial: Triangulation,
    vectors: HalfEdgeMap<Vector<T>>,
}

struct VectorStore<'a, T> {
    vectors: &'a mut HalfEdgeMap<Vector<T>>,
}

impl<'a, T: Ring> Subscriber for VectorStore<'a, T> {
    fn after_flip(&mut self, triangulation: &Triangulation, e: HalfEdge) -> Result<()> {
        let flipped = self.vectors.get(-triangulation.next_in_face(e)).clone()
            + self.vectors.get(triangulation.next_at_vertex(e)).clone();
        self.vectors.set(-e, -flipped.clone());
        self.vectors.set(e, flipped);
        Ok(())
    }

    fn before_collapse(&mut self, _: &Triangulation, e: Edge) -> Result<()> {
        Err(Error::InvariantViolated(format!(
            "a flat triangulation cannot absorb the collapse of {}",
            e
        )))
    }

    fn before_swap(&mut self, _: &Triangulation, a: HalfEdge, b: HalfEdge) {
        self.vectors.swap(a, b);
    }

    fn before_erase(&mut self, _: &Triangulation, edges: &[Edge]) {
        self.vectors.truncate(edges.len());
    }
}

impl<T: Ring> FlatTriangulation<T> {
    /// Build a surface from a triangulation and the vectors of its positive
    /// half edges, in order `1, 2, …`.
    pub fn new(combinatorial: Triangulation, vectors: Vec<Vector<T>>) -> Result<Self> {
        if vectors.len() != combinatorial.edge_count() {
            return Err(Error::InvalidArgument(format!(
                "expected one vector for each of the {} edges, got {}",
                combinatorial.edge_count(),
                vectors.len()
            )));
        }
        let vectors = HalfEdgeMap::new(&combinatorial, |e| {
            let v = vectors[e.edge().index()].clone();
            if e.is_positive() {
                v
            } else {
                -v
            }
        });
        let surface = FlatTriangulation {
            combinatorial,
            vectors,
        };
        for e in surface.half_edges() {
            if surface.vector(e).is_zero() {
                return Err(Error::InvalidArgument(format!(
                    "the vector of {} must not be zero",
                    e
                )));
            }
            if !surface.face_closes(e) {
                return Err(Error::InvalidArgument(format!(
                    "the face of {} is not closed",
                    e
                )));
            }
        }
        if surface.area2() <= T::zero() {
            return Err(Error::InvalidArgument(
                "the total area of the surface must be positive".to_string(),
            ));
        }
        Ok(surface)
    }

    pub fn combinatorial(&self) -> &Triangulation {
        &self.combinatorial
    }

    pub fn edge_count(&self) -> usize {
        self.combinatorial.edge_count()
    }

    pub fn half_edges(&self) -> impl Iterator<Item = HalfEdge> {
        self.combinatorial.half_edges()
    }

    pub fn next_in_face(&self, e: HalfEdge) -> HalfEdge {
        self.combinatorial.next_in_face(e)
    }

    pub fn previous_in_face(&self, e: HalfEdge) -> HalfEdge {
        self.combinatorial.previous_in_face(e)
    }

    pub fn next_at_vertex(&self, e: HalfEdge) -> HalfEdge {
        self.combinatorial.next_at_vertex(e)
    }

    pub fn previous_at_vertex(&self, e: HalfEdge) -> HalfEdge {
        self.combinatorial.previous_at_vertex(e)
    }

    pub fn source(&self, e: HalfEdge) -> Vertex {
        self.combinatorial.source(e)
    }

    pub fn target(&self, e: HalfEdge) -> Vertex {
        self.combinatorial.target(e)
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        self.combinatorial.vertices()
    }

    /// The vector along a half edge.
    pub fn vector(&self, e: HalfEdge) -> &Vector<T> {
        self.vectors.get(e)
    }

    /// The saddle connection of length one along `e`.
    pub fn from_edge(&self, e: HalfEdge) -> SaddleConnection<T> {
        SaddleConnection::new(
            e,
            -e,
            Chain::from_half_edge(e, self.edge_count()),
            self.vector(e).clone(),
        )
    }

    /// Whether the direction `v` points out of the corner counterclockwise
    /// of `sector` at its source vertex, begin inclusive.
    pub fn in_sector(&self, sector: HalfEdge, v: &Vector<T>) -> Result<bool> {
        let begin = self.vector(sector);
        let end = self.vector(self.next_at_vertex(sector));
        v.in_sector(begin, end)
    }

    fn face_closes(&self, e: HalfEdge) -> bool {
        let sum = self.vector(e).clone()
            + self.vector(self.next_in_face(e)).clone()
            + self.vector(self.previous_in_face(e)).clone();
        sum.is_zero()
    }

    /// Twice the total area of the surface.
    pub fn area2(&self) -> T {
        let mut area = T::zero();
        for cycle in self.combinatorial.face_cycles() {
            area = area + self.vector(cycle[0]).cross(self.vector(cycle[1]));
        }
        area
    }

    /// The largest squared edge length.
    pub fn longest_edge_squared(&self) -> T {
        let mut longest = T::zero();
        for e in self.half_edges() {
            let len = self.vector(e).length_squared();
            if len > longest {
                longest = len;
            }
        }
        longest
    }

    /// Flip the diagonal `{e, -e}`, recomputing its vector from the new
    /// quadrilateral so that both new faces close.
    pub fn flip(&mut self, e: HalfEdge) -> Result<()> {
        if !self.face_closes(e) || !self.face_closes(-e) {
            return Err(Error::InvariantViolated(format!(
                "a face at {} is not closed before the flip",
                e
            )));
        }
        let area_before = if cfg!(debug_assertions) {
            Some(self.area2())
        } else {
            None
        };
        trace!("flipping {} of flat triangulation", e);
        self.combinatorial.flip(
            e,
            &mut VectorStore {
                vectors: &mut self.vectors,
            },
        )?;
        if !self.face_closes(e) || !self.face_closes(-e) {
            return Err(Error::InvariantViolated(format!(
                "a face at {} is not closed after the flip",
                e
            )));
        }
        if let Some(area) = area_before {
            if self.area2() != area {
                return Err(Error::InvariantViolated(
                    "the flip changed the area of the surface".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Collapsing is not possible on a plain flat triangulation: only a
    /// zero edge could be contracted without destroying the metric, and no
    /// record of such a contraction is kept here.
    pub fn collapse(&mut self, e: HalfEdge) -> Result<(HalfEdge, HalfEdge)> {
        Err(Error::InvalidArgument(format!(
            "cannot collapse {} of a flat triangulation",
            e
        )))
    }
}

impl<T: Ring> Display for FlatTriangulation<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} with vectors {{", self.combinatorial)?;
        let mut first = true;
        for e in self.half_edges() {
            if !e.is_positive() && *self.vector(e) == -self.vector(-e).clone() {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}: {}", e, self.vector(e))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    pub(crate) fn square_torus() -> FlatTriangulation<i64> {
        let combinatorial = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        FlatTriangulation::new(
            combinatorial,
            vec![
                Vector::new(1, 0),
                Vector::new(0, 1),
                Vector::new(-1, -1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_open_faces() {
        let combinatorial = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        let result = FlatTriangulation::new(
            combinatorial,
            vec![Vector::new(1, 0), Vector::new(0, 1), Vector::new(-1, 0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn vectors_are_antisymmetric() {
        let surface = square_torus();
        for e in surface.half_edges() {
            assert_eq!(*surface.vector(e), -surface.vector(-e).clone());
        }
    }

    #[test]
    fn area_of_the_square() {
        assert_eq!(square_torus().area2(), 2);
    }

    #[test]
    fn flip_of_the_diagonal() {
        let mut surface = square_torus();
        surface.flip(h(3)).unwrap();
        assert_eq!(*surface.vector(h(3)), Vector::new(1, -1));
        assert_eq!(surface.area2(), 2);
        for e in surface.half_edges() {
            assert!(surface.face_closes(e));
        }
    }

    #[test]
    fn flip_then_flip_back_restores_vectors() {
        let original = square_torus();
        let mut surface = original.clone();
        surface.flip(h(3)).unwrap();
        surface.flip(h(3)).unwrap();
        assert_eq!(surface, original);
    }

    #[test]
    fn collapse_is_rejected() {
        let mut surface = square_torus();
        assert!(surface.collapse(h(2)).is_err());
    }

    #[test]
    fn from_edge_is_a_unit_connection() {
        let surface = square_torus();
        let connection = surface.from_edge(h(2));
        assert_eq!(connection.source(), h(2));
        assert_eq!(connection.target(), h(-2));
        assert_eq!(connection.vector(), &Vector::new(0, 1));
        assert_eq!(
            connection.chain().evaluate(|edge| surface.vector(edge.positive()).clone()),
            Vector::new(0, 1)
        );
    }

    #[test]
    fn sector_containment_at_a_vertex() {
        let surface = square_torus();
        // At the unique vertex, the corner at half edge 1 spans from (1, 0)
        // to (1, 1) exclusive.
        assert_eq!(surface.next_at_vertex(h(1)), h(-3));
        assert!(surface.in_sector(h(1), &Vector::new(2, 1)).unwrap());
        assert!(surface.in_sector(h(1), &Vector::new(1, 0)).unwrap());
        assert!(!surface.in_sector(h(1), &Vector::new(1, 1)).unwrap());
        assert!(!surface.in_sector(h(1), &Vector::new(0, 1)).unwrap());
    }

    #[test]
    fn works_over_exact_rationals() {
        use num_bigint::BigInt;
        use num_rational::BigRational;
        let r = |n: i64| BigRational::from(BigInt::from(n));
        let v = |x: i64, y: i64| Vector::new(r(x), r(y));
        let combinatorial = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        let mut surface =
            FlatTriangulation::new(combinatorial, vec![v(1, 0), v(0, 1), v(-1, -1)]).unwrap();
        assert_eq!(surface.area2(), r(2));
        surface.flip(h(3)).unwrap();
        assert_eq!(*surface.vector(h(3)), v(1, -1));
    }

    #[test]
    fn prints_cycles_and_vectors() {
        let surface = square_torus();
        assert_eq!(
            format!("{}", surface),
            "(1, 2, 3)(-1, -2, -3) with vectors {1: (1, 0), 2: (0, 1), 3: (-1, -1)}"
        );
    }
}
