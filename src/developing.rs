use crate::chain::Chain;
use crate::error::{Error, Result};
use crate::flat::FlatTriangulation;
use crate::half_edge::HalfEdge;
use crate::saddle_connection::SaddleConnection;
use crate::vector::{scalar_mul, Ccw, Orientation, Ring, Vector};
use log::trace;

/// An upper bound on the length of connections, kept as its square so rings
/// without square roots can compare against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bound<T> {
    squared: T,
}

impl<T: Ring> Bound<T> {
    /// The bound given by the length of the vector `(x, y)`.
    pub fn new(x: T, y: T) -> Self {
        Bound {
            squared: x.clone() * x + y.clone() * y,
        }
    }

    pub fn from_squared(squared: T) -> Self {
        Bound { squared }
    }

    pub fn squared(&self) -> &T {
        &self.squared
    }

    pub fn contains(&self, v: &Vector<T>) -> bool {
        v.length_squared() <= self.squared
    }

    pub fn min(self, rhs: Self) -> Self {
        if rhs.squared < self.squared {
            rhs
        } else {
            self
        }
    }
}

/// A developed position on the surface: a point of the plane reached by
/// unfolding faces, remembered both as a chain and as its exact vector.
#[derive(Clone, Debug)]
pub(crate) struct DevelopedPoint<T> {
    pub chain: Chain,
    pub vector: Vector<T>,
}

impl<T: Ring> DevelopedPoint<T> {
    pub fn along(surface: &FlatTriangulation<T>, e: HalfEdge) -> Self {
        DevelopedPoint {
            chain: Chain::from_half_edge(e, surface.edge_count()),
            vector: surface.vector(e).clone(),
        }
    }

    pub fn extended(&self, surface: &FlatTriangulation<T>, e: HalfEdge) -> Self {
        let mut chain = self.chain.clone();
        chain.push(e);
        DevelopedPoint {
            chain,
            vector: self.vector.clone() + surface.vector(e).clone(),
        }
    }
}

/// Whether every point of the segment from `p` to `q` is farther from the
/// origin than the bound. Exact: the nearest point of the segment is either
/// an endpoint or the foot of the perpendicular through the origin.
pub(crate) fn segment_beyond<T: Ring>(p: &Vector<T>, q: &Vector<T>, bound: &Bound<T>) -> bool {
    let squared = bound.squared();
    if &p.length_squared() <= squared || &q.length_squared() <= squared {
        return false;
    }
    let direction = q.clone() - p.clone();
    let foot_inside = p.dot(&direction) < T::zero() && q.dot(&direction) > T::zero();
    if !foot_inside {
        return true;
    }
    let cross = p.cross(q);
    cross.clone() * cross > squared.clone() * direction.length_squared()
}

/// The half edge anchoring the sector at the source of `start` that contains
/// the direction `direction`, found by rotating counterclockwise from
/// `start`.
pub(crate) fn sector_at<T: Ring>(
    surface: &FlatTriangulation<T>,
    start: HalfEdge,
    direction: &Vector<T>,
) -> Result<HalfEdge> {
    let mut walk = start;
    loop {
        if surface.in_sector(walk, direction)? {
            return Ok(walk);
        }
        walk = surface.next_at_vertex(walk);
        if walk == start {
            return Err(Error::InvariantViolated(format!(
                "no sector at the source of {} contains the direction {}",
                start, direction
            )));
        }
    }
}

/// Unfolds faces along a fixed direction from a singularity.
///
/// The state tracks the edge the ray is currently crossing, oriented so that
/// the ray passes its head on the left, together with the developed
/// positions of both of its endpoints relative to the start of the ray.
pub struct DevelopingMap<'a, T> {
    surface: &'a FlatTriangulation<T>,
    start: Vector<T>,
    source: HalfEdge,
    current_edge: HalfEdge,
    tail: DevelopedPoint<T>,
    head: DevelopedPoint<T>,
    cap_squared: T,
}

impl<'a, T: Ring> DevelopingMap<'a, T> {
    /// Start following `direction` out of the sector anchored at `sector`.
    /// The sweep gives up once the developed face offset exceeds `bound`
    /// plus a slack accounting for the detour a geodesic can take through
    /// long triangles.
    pub fn new(
        surface: &'a FlatTriangulation<T>,
        sector: HalfEdge,
        direction: Vector<T>,
        bound: &Bound<T>,
    ) -> Result<Self> {
        if !surface.in_sector(sector, &direction)? {
            return Err(Error::InvalidArgument(format!(
                "direction {} does not lie in the sector at {}",
                direction, sector
            )));
        }
        let crossed = surface.next_in_face(sector);
        let tail = DevelopedPoint::along(surface, sector);
        let head = tail.extended(surface, crossed);
        Ok(DevelopingMap {
            surface,
            start: direction,
            source: sector,
            current_edge: crossed,
            tail,
            head,
            cap_squared: Self::cap_squared(surface, bound),
        })
    }

    /// `2 (b² + s²)` with `s = 2 (b² + 2 L² + 1)` where `L` is the longest
    /// edge; an exactly computable upper bound for the square of the search
    /// radius plus the traditional slack `2 (2 b L + L² + 1)`.
    fn cap_squared(surface: &FlatTriangulation<T>, bound: &Bound<T>) -> T {
        let b2 = bound.squared().clone();
        let l2 = surface.longest_edge_squared();
        let slack = scalar_mul(&(b2.clone() + l2.clone() + l2 + T::one()), 2);
        scalar_mul(&(b2 + slack.clone() * slack), 2)
    }

    pub fn current_edge(&self) -> HalfEdge {
        self.current_edge
    }

    /// The developed position of the head of the current edge, the next
    /// candidate endpoint for a connection.
    pub fn current_vertex_position(&self) -> &Vector<T> {
        &self.head.vector
    }

    fn next_crossing(&self) -> (HalfEdge, DevelopedPoint<T>) {
        let into = -self.current_edge;
        let first = self.surface.next_in_face(into);
        let far = self.tail.extended(self.surface, first);
        (first, far)
    }

    /// Whether the ray passes exactly through the far vertex of the next
    /// face.
    pub fn will_hit_vertex(&self) -> bool {
        let (_, far) = self.next_crossing();
        self.start.ccw(&far.vector) == Ccw::Collinear
            && self.start.orientation(&far.vector) == Orientation::Same
    }

    /// The connection to the vertex the ray is about to hit.
    pub fn vertex_to_hit(&self) -> Result<Option<SaddleConnection<T>>> {
        let (first, far) = self.next_crossing();
        if !(self.start.ccw(&far.vector) == Ccw::Collinear
            && self.start.orientation(&far.vector) == Orientation::Same)
        {
            return Ok(None);
        }
        let arrival = self.surface.next_in_face(first);
        let target = sector_at(self.surface, arrival, &-far.vector.clone())?;
        Ok(Some(SaddleConnection::new(
            self.source,
            target,
            far.chain.clone(),
            far.vector,
        )))
    }

    /// Step across the next edge into the neighbouring face. Returns false
    /// once the developed offset has left the search radius and the sweep
    /// should stop.
    pub fn advance(&mut self) -> bool {
        let (first, far) = self.next_crossing();
        let hit = self.start.ccw(&far.vector) == Ccw::Collinear
            && self.start.orientation(&far.vector) == Orientation::Same;
        if hit || self.start.ccw(&far.vector) == Ccw::Clockwise {
            // The ray leaves through the second of the two far edges,
            // passing a hit vertex on its left.
            self.current_edge = self.surface.next_in_face(first);
            self.tail = far;
        } else {
            self.current_edge = first;
            self.head = far;
        }
        trace!("advanced developing map across {}", self.current_edge);
        let tail_far = self.tail.vector.length_squared() > self.cap_squared;
        let head_far = self.head.vector.length_squared() > self.cap_squared;
        !(tail_far && head_far)
    }
}

/// Follow `direction` from the sector at `sector` and report the connection
/// to the first singularity the ray hits within `bound`, if any.
pub fn follow_direction<T: Ring>(
    surface: &FlatTriangulation<T>,
    sector: HalfEdge,
    direction: Vector<T>,
    bound: &Bound<T>,
) -> Result<Option<SaddleConnection<T>>> {
    // The direction along the sector boundary is the connection along that
    // edge itself.
    if surface.vector(sector).parallel_same(&direction) {
        let connection = surface.from_edge(sector);
        if bound.contains(connection.vector()) {
            return Ok(Some(connection));
        }
        return Ok(None);
    }
    let mut map = DevelopingMap::new(surface, sector, direction, bound)?;
    loop {
        if let Some(connection) = map.vertex_to_hit()? {
            if bound.contains(connection.vector()) {
                return Ok(Some(connection));
            }
            return Ok(None);
        }
        if !map.advance() {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::Triangulation;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn square_torus() -> FlatTriangulation<i64> {
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
    fn bound_compares_squared_lengths() {
        let bound = Bound::new(1i64, 1);
        assert!(bound.contains(&Vector::new(1, 1)));
        assert!(bound.contains(&Vector::new(1, 0)));
        assert!(!bound.contains(&Vector::new(2, 1)));
    }

    #[test]
    fn segment_pruning() {
        let bound = Bound::from_squared(1i64);
        assert!(segment_beyond(
            &Vector::new(5, -5),
            &Vector::new(5, 5),
            &bound
        ));
        assert!(!segment_beyond(
            &Vector::new(1, -5),
            &Vector::new(1, 5),
            &bound
        ));
        assert!(!segment_beyond(
            &Vector::new(0, 1),
            &Vector::new(5, 5),
            &bound
        ));
    }

    #[test]
    fn follows_the_diagonal_of_the_square() {
        let surface = square_torus();
        // The diagonal direction leaves through the sector anchored at the
        // diagonal itself.
        let connection = follow_direction(
            &surface,
            h(-3),
            Vector::new(1, 1),
            &Bound::new(2, 2),
        )
        .unwrap()
        .expect("the diagonal is a connection");
        assert_eq!(connection.vector(), &Vector::new(1, 1));
        assert_eq!(connection.source(), h(-3));
    }

    #[test]
    fn follows_a_direction_through_two_triangles() {
        let surface = square_torus();
        let connection = follow_direction(
            &surface,
            h(-3),
            Vector::new(1, 2),
            &Bound::new(3, 3),
        )
        .unwrap()
        .expect("(1, 2) is a connection on the torus");
        assert_eq!(connection.vector(), &Vector::new(1, 2));
        assert_eq!(connection.target(), h(3));
    }

    #[test]
    fn follows_a_deeper_direction() {
        let surface = square_torus();
        let connection = follow_direction(
            &surface,
            h(1),
            Vector::new(2, 1),
            &Bound::new(3, 3),
        )
        .unwrap()
        .expect("(2, 1) is a connection on the torus");
        assert_eq!(connection.vector(), &Vector::new(2, 1));
    }

    #[test]
    fn respects_the_bound() {
        let surface = square_torus();
        let connection = follow_direction(
            &surface,
            h(1),
            Vector::new(2, 1),
            &Bound::new(1, 1),
        )
        .unwrap();
        assert!(connection.is_none());
    }

    #[test]
    fn edge_direction_yields_the_edge_connection() {
        let surface = square_torus();
        let connection = follow_direction(
            &surface,
            h(1),
            Vector::new(3, 0),
            &Bound::new(1, 1),
        )
        .unwrap()
        .expect("half edge 1 is itself a connection");
        assert_eq!(connection, surface.from_edge(h(1)));
    }
}
