use crate::combinatorial::Vertex;
use crate::developing::{segment_beyond, sector_at, Bound, DevelopedPoint};
use crate::error::Result;
use crate::flat::FlatTriangulation;
use crate::half_edge::HalfEdge;
use crate::saddle_connection::SaddleConnection;
use crate::vector::{Ccw, Ring, Vector};
use log::trace;
use std::collections::VecDeque;

/// One search sector: the connections leaving a vertex through the corner
/// counterclockwise of `source`, possibly narrowed to a sub-cone.
///
/// An unrefined sector still contains the connection along its own half
/// edge; refinement drops that anchor unless it lands strictly inside the
/// refined cone.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Sector<T> {
    source: HalfEdge,
    bounds: Option<(Vector<T>, Vector<T>)>,
}

impl<T: Ring> Sector<T> {
    fn whole(source: HalfEdge) -> Self {
        Sector {
            source,
            bounds: None,
        }
    }

    fn effective_bounds(&self, surface: &FlatTriangulation<T>) -> (Vector<T>, Vector<T>) {
        match &self.bounds {
            Some((first, second)) => (first.clone(), second.clone()),
            None => (
                surface.vector(self.source).clone(),
                surface
                    .vector(surface.next_at_vertex(self.source))
                    .clone(),
            ),
        }
    }

    /// Intersect with the half-open cone `[begin, end)`, producing up to two
    /// sub-sectors; two when this sector straddles `begin` in the clockwise
    /// sense.
    fn refine(
        &self,
        surface: &FlatTriangulation<T>,
        begin: &Vector<T>,
        end: &Vector<T>,
    ) -> Result<Vec<Sector<T>>> {
        let (first, second) = self.effective_bounds(surface);
        if begin.in_sector(&first, &second)? {
            if begin.ccw(end) == Ccw::Clockwise {
                let from_begin = Sector {
                    source: self.source,
                    bounds: Some((begin.clone(), second.clone())),
                };
                let to_end = Sector {
                    source: self.source,
                    bounds: Some((first.clone(), end.clone())),
                };
                if first.ccw(end) == Ccw::CounterClockwise {
                    Ok(vec![from_begin, to_end])
                } else {
                    Ok(vec![from_begin])
                }
            } else if end.in_sector(&first, &second)? {
                Ok(vec![Sector {
                    source: self.source,
                    bounds: Some((begin.clone(), end.clone())),
                }])
            } else {
                Ok(vec![Sector {
                    source: self.source,
                    bounds: Some((begin.clone(), second)),
                }])
            }
        } else if end.in_sector(&first, &second)? && !end.parallel_same(&first) {
            Ok(vec![Sector {
                source: self.source,
                bounds: Some((first, end.clone())),
            }])
        } else if first.in_sector(begin, end)? {
            Ok(vec![self.clone()])
        } else {
            Ok(vec![])
        }
    }
}

/// The set of saddle connections of a flat surface, narrowed step by step by
/// a search radius, a source vertex, or angular sectors. Every narrowing
/// returns a new query and leaves the original untouched.
#[derive(Clone, Debug)]
pub struct SaddleConnections<'a, T: Ring> {
    surface: &'a FlatTriangulation<T>,
    bound: Option<Bound<T>>,
    sectors: Vec<Sector<T>>,
}

impl<'a, T: Ring> SaddleConnections<'a, T> {
    /// All connections of the surface, one search sector per half edge.
    pub fn new(surface: &'a FlatTriangulation<T>) -> Self {
        SaddleConnections {
            surface,
            bound: None,
            sectors: surface.half_edges().map(Sector::whole).collect(),
        }
    }

    pub fn surface(&self) -> &'a FlatTriangulation<T> {
        self.surface
    }

    /// Keep only connections of length at most `bound`.
    pub fn bound(&self, bound: Bound<T>) -> Self {
        let mut ret = self.clone();
        ret.bound = Some(match ret.bound {
            Some(existing) => existing.min(bound),
            None => bound,
        });
        ret
    }

    /// Keep only connections emanating from `source`.
    pub fn source(&self, source: Vertex) -> Self {
        let mut ret = self.clone();
        ret.sectors
            .retain(|sector| self.surface.source(sector.source) == source);
        ret
    }

    /// Keep only the sector anchored at the given half edge.
    pub fn sector(&self, source: HalfEdge) -> Self {
        let mut ret = self.clone();
        ret.sectors.retain(|sector| sector.source == source);
        ret
    }

    /// Intersect every sector with the half-open cone `[begin, end)`.
    pub fn sector_between(&self, begin: &Vector<T>, end: &Vector<T>) -> Result<Self> {
        let mut ret = self.clone();
        let mut sectors = Vec::new();
        for sector in &ret.sectors {
            sectors.extend(sector.refine(self.surface, begin, end)?);
        }
        ret.sectors = sectors;
        Ok(ret)
    }

    /// Intersect with the cone from one connection to another. Both must
    /// emanate from the same vertex; the connection on `begin` stays
    /// included, the one on `end` does not.
    pub fn sector_between_connections(
        &self,
        begin: &SaddleConnection<T>,
        end: &SaddleConnection<T>,
    ) -> Result<Self> {
        let mut ret = self
            .source(self.surface.source(begin.source()))
            .source(self.surface.source(end.source()));
        let mut sectors = Vec::new();
        for sector in &ret.sectors {
            if begin.source() == end.source() {
                if sector.source == begin.source() {
                    sectors.extend(sector.refine(self.surface, begin.vector(), end.vector())?);
                } else if begin.vector().ccw(end.vector()) == Ccw::Clockwise {
                    sectors.push(sector.clone());
                }
            } else if sector.source == begin.source() {
                let until = self
                    .surface
                    .vector(self.surface.next_at_vertex(sector.source))
                    .clone();
                sectors.extend(sector.refine(self.surface, begin.vector(), &until)?);
            } else if sector.source == end.source() {
                if self.surface.vector(sector.source).ccw(end.vector()) == Ccw::Collinear {
                    // The exclusive end boundary swallows this whole sector.
                } else {
                    let from = self.surface.vector(sector.source).clone();
                    sectors.extend(sector.refine(self.surface, &from, end.vector())?);
                }
            } else {
                let mut walk = sector.source;
                while walk != begin.source() {
                    if walk == end.source() {
                        sectors.push(sector.clone());
                        break;
                    }
                    walk = self.surface.next_at_vertex(walk);
                }
            }
        }
        ret.sectors = sectors;
        Ok(ret)
    }

    /// The same connections ordered by length instead of by sector.
    pub fn by_length(&self) -> SaddleConnectionsByLength<'a, T> {
        SaddleConnectionsByLength {
            connections: self.clone(),
        }
    }

    /// Iterate sectors in builder order and, within each sector, in the
    /// order the developing map discovers the connections. Without a search
    /// radius this falls back to iteration by length, which stays lazy.
    pub fn iter(&self) -> SaddleConnectionsIterator<'a, T> {
        match &self.bound {
            Some(bound) => SaddleConnectionsIterator::Sectors(SectorIterator::new(
                self.surface,
                self.sectors.clone(),
                bound.clone(),
            )),
            None => SaddleConnectionsIterator::ByLength(self.by_length().iter()),
        }
    }
}

impl<'s, 'a, T: Ring> IntoIterator for &'s SaddleConnections<'a, T> {
    type Item = SaddleConnection<T>;
    type IntoIter = SaddleConnectionsIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub enum SaddleConnectionsIterator<'a, T: Ring> {
    Sectors(SectorIterator<'a, T>),
    ByLength(ByLengthIterator<'a, T>),
}

impl<'a, T: Ring> Iterator for SaddleConnectionsIterator<'a, T> {
    type Item = SaddleConnection<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SaddleConnectionsIterator::Sectors(iter) => iter.next(),
            SaddleConnectionsIterator::ByLength(iter) => iter.next(),
        }
    }
}

enum Node<T> {
    Explore {
        sector: usize,
        crossed: HalfEdge,
        tail: DevelopedPoint<T>,
        head: DevelopedPoint<T>,
    },
    Emit(SaddleConnection<T>),
}

/// Depth-first unfolding of the sectors of a query, emitting candidates as
/// a counterclockwise rotation of the search ray encounters them.
pub struct SectorIterator<'a, T: Ring> {
    surface: &'a FlatTriangulation<T>,
    bound: Bound<T>,
    sectors: Vec<Sector<T>>,
    next_sector: usize,
    stack: Vec<Node<T>>,
}

impl<'a, T: Ring> SectorIterator<'a, T> {
    fn new(surface: &'a FlatTriangulation<T>, sectors: Vec<Sector<T>>, bound: Bound<T>) -> Self {
        SectorIterator {
            surface,
            bound,
            sectors,
            next_sector: 0,
            stack: Vec::new(),
        }
    }

    fn seed(&mut self, index: usize) {
        let sector = &self.sectors[index];
        trace!("searching sector at {}", sector.source);
        let tail = DevelopedPoint::along(self.surface, sector.source);
        let crossed = self.surface.next_in_face(sector.source);
        let head = tail.extended(self.surface, crossed);
        self.stack.push(Node::Explore {
            sector: index,
            crossed,
            tail,
            head,
        });
        // The connection along the sector's own half edge: part of every
        // unrefined sector, kept after refinement only strictly inside, and
        // subject to the length bound like every other candidate.
        let anchor = self.surface.from_edge(sector.source);
        let emit_anchor = self.bound.contains(anchor.vector())
            && match &sector.bounds {
                None => true,
                Some((first, second)) => {
                    let v = anchor.vector();
                    !v.parallel_same(first) && v.in_sector(first, second).unwrap_or(false)
                }
            };
        if emit_anchor {
            self.stack.push(Node::Emit(anchor));
        }
    }

}

impl<'a, T: Ring> Iterator for SectorIterator<'a, T> {
    type Item = SaddleConnection<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop() {
                Some(Node::Emit(connection)) => return Some(connection),
                Some(Node::Explore {
                    sector,
                    crossed,
                    tail,
                    head,
                }) => {
                    if segment_beyond(&tail.vector, &head.vector, &self.bound) {
                        continue;
                    }
                    let into = -crossed;
                    let first = self.surface.next_in_face(into);
                    let second = self.surface.next_in_face(first);
                    let far = tail.extended(self.surface, first);

                    let clockwise_open =
                        tail.vector.ccw(&far.vector) == Ccw::CounterClockwise;
                    let counterclockwise_open =
                        far.vector.ccw(&head.vector) == Ccw::CounterClockwise;

                    // The far vertex is visible only strictly inside the cone
                    // through the crossed segment; on the boundary rays the
                    // segment's endpoint vertices block the line of sight.
                    let candidate = if clockwise_open
                        && counterclockwise_open
                        && self.bound.contains(&far.vector)
                    {
                        let inside = match &self.sectors[sector].bounds {
                            None => true,
                            Some((b, e)) => far.vector.in_sector(b, e).unwrap_or(false),
                        };
                        if inside {
                            sector_at(self.surface, second, &-far.vector.clone())
                                .ok()
                                .map(|target| {
                                    SaddleConnection::new(
                                        self.sectors[sector].source,
                                        target,
                                        far.chain.clone(),
                                        far.vector.clone(),
                                    )
                                })
                        } else {
                            None
                        }
                    } else {
                        None
                    };

                    // Counterclockwise half first onto the stack so that the
                    // clockwise half, closer to the begin boundary, comes
                    // back out first.
                    if counterclockwise_open {
                        self.stack.push(Node::Explore {
                            sector,
                            crossed: second,
                            tail: far.clone(),
                            head,
                        });
                    }
                    if let Some(connection) = candidate {
                        self.stack.push(Node::Emit(connection));
                    }
                    if clockwise_open {
                        self.stack.push(Node::Explore {
                            sector,
                            crossed: first,
                            tail,
                            head: far,
                        });
                    }
                }
                None => {
                    if self.next_sector >= self.sectors.len() {
                        return None;
                    }
                    let index = self.next_sector;
                    self.next_sector += 1;
                    self.seed(index);
                }
            }
        }
    }
}

/// The connections of a query re-ordered by increasing length. The sequence
/// is computed lazily in rounds of doubling radius, so it can be restarted
/// or cut off at any point.
#[derive(Clone, Debug)]
pub struct SaddleConnectionsByLength<'a, T: Ring> {
    connections: SaddleConnections<'a, T>,
}

impl<'a, T: Ring> SaddleConnectionsByLength<'a, T> {
    pub fn iter(&self) -> ByLengthIterator<'a, T> {
        let surface = self.connections.surface;
        ByLengthIterator {
            surface,
            sectors: self.connections.sectors.clone(),
            user_bound: self.connections.bound.clone(),
            queue: VecDeque::new(),
            previous_squared: None,
            current_squared: surface.longest_edge_squared(),
            done: false,
        }
    }
}

impl<'s, 'a, T: Ring> IntoIterator for &'s SaddleConnectionsByLength<'a, T> {
    type Item = SaddleConnection<T>;
    type IntoIter = ByLengthIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ByLengthIterator<'a, T: Ring> {
    surface: &'a FlatTriangulation<T>,
    sectors: Vec<Sector<T>>,
    user_bound: Option<Bound<T>>,
    queue: VecDeque<SaddleConnection<T>>,
    previous_squared: Option<T>,
    current_squared: T,
    done: bool,
}

impl<'a, T: Ring> Iterator for ByLengthIterator<'a, T> {
    type Item = SaddleConnection<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(connection) = self.queue.pop_front() {
                return Some(connection);
            }
            if self.done {
                return None;
            }
            let radius = match &self.user_bound {
                Some(bound) if bound.squared() < &self.current_squared => {
                    self.done = true;
                    bound.squared().clone()
                }
                _ => self.current_squared.clone(),
            };
            trace!("collecting connections of squared length at most {}", radius);
            let mut batch: Vec<SaddleConnection<T>> = SectorIterator::new(
                self.surface,
                self.sectors.clone(),
                Bound::from_squared(radius.clone()),
            )
            .filter(|connection| {
                let length = connection.length_squared();
                length <= radius
                    && match &self.previous_squared {
                        Some(previous) => &length > previous,
                        None => true,
                    }
            })
            .collect();
            batch.sort_by(|lhs, rhs| lhs.length_squared().cmp(&rhs.length_squared()));
            self.queue.extend(batch);
            self.previous_squared = Some(radius);
            self.current_squared = crate::vector::scalar_mul(&self.current_squared, 4);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::Triangulation;
    use crate::vector::CompareSlope;

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

    fn slope_classes(vectors: &[Vector<i64>]) -> usize {
        let lt = CompareSlope;
        let mut distinct: Vec<Vector<i64>> = Vec::new();
        for v in vectors {
            if !distinct
                .iter()
                .any(|u| !lt.lt(u, v) && !lt.lt(v, u))
            {
                distinct.push(v.clone());
            }
        }
        distinct.len()
    }

    #[test]
    fn unit_square_within_bound_one() {
        let surface = square_torus();
        // Only the four unit connections fit under a squared bound of one;
        // the diagonal edge is longer and stays out.
        let connections: Vec<_> = SaddleConnections::new(&surface)
            .bound(Bound::new(1, 0))
            .iter()
            .collect();
        let vectors: Vec<_> = connections.iter().map(|c| c.vector().clone()).collect();
        assert!(vectors.iter().all(|v| v.length_squared() <= 1));
        assert_eq!(slope_classes(&vectors), 2);
        assert_eq!(connections.len(), 4);
    }

    #[test]
    fn unit_square_within_the_diagonal_bound() {
        let surface = square_torus();
        let connections: Vec<_> = SaddleConnections::new(&surface)
            .bound(Bound::new(1, 1))
            .iter()
            .collect();
        let vectors: Vec<_> = connections.iter().map(|c| c.vector().clone()).collect();
        assert!(vectors.iter().all(|v| v.length_squared() <= 2));
        // The three edge slopes plus the transversal diagonal.
        assert_eq!(slope_classes(&vectors), 4);
        assert_eq!(connections.len(), 8);
    }

    #[test]
    fn enumeration_is_complete_and_duplicate_free() {
        let surface = square_torus();
        let connections: Vec<_> = SaddleConnections::new(&surface)
            .bound(Bound::from_squared(8))
            .iter()
            .collect();
        let mut found: Vec<Vector<i64>> = connections
            .iter()
            .map(|c| c.vector().clone())
            .collect();
        let mut expected = Vec::new();
        for x in -2i64..=2 {
            for y in -2i64..=2 {
                let g = gcd(x.abs(), y.abs());
                if g == 1 && x * x + y * y <= 8 {
                    expected.push(Vector::new(x, y));
                }
            }
        }
        let key = |v: &Vector<i64>| (v.x, v.y);
        found.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(found, expected);
    }

    fn gcd(a: i64, b: i64) -> i64 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }

    #[test]
    fn sector_narrowing_to_the_diagonal() {
        let surface = square_torus();
        let connections: Vec<_> = SaddleConnections::new(&surface)
            .bound(Bound::new(1, 1))
            .sector_between(&Vector::new(1, 0), &Vector::new(0, 1))
            .unwrap()
            .iter()
            .collect();
        let vectors: Vec<_> = connections.iter().map(|c| c.vector().clone()).collect();
        assert_eq!(vectors, vec![Vector::new(1, 1)]);
    }

    #[test]
    fn sector_refinement_is_idempotent() {
        let surface = square_torus();
        let begin = Vector::new(1, 0);
        let end = Vector::new(0, 1);
        let once = SaddleConnections::new(&surface)
            .sector_between(&begin, &end)
            .unwrap();
        let twice = once.sector_between(&begin, &end).unwrap();
        assert_eq!(once.sectors, twice.sectors);
    }

    #[test]
    fn source_keeps_only_one_vertex() {
        let surface = square_torus();
        let vertex = surface.source(h(1));
        let all = SaddleConnections::new(&surface).source(vertex);
        // The torus has a single vertex, so nothing is filtered out.
        assert_eq!(all.sectors.len(), 6);
    }

    #[test]
    fn single_sector_query() {
        let surface = square_torus();
        let connections: Vec<_> = SaddleConnections::new(&surface)
            .sector(h(1))
            .bound(Bound::from_squared(5))
            .iter()
            .collect();
        let vectors: Vec<_> = connections.iter().map(|c| c.vector().clone()).collect();
        assert!(vectors.contains(&Vector::new(1, 0)));
        assert!(vectors.contains(&Vector::new(2, 1)));
        assert_eq!(vectors.len(), 2);
    }

    #[test]
    fn by_length_orders_by_length() {
        let surface = square_torus();
        let connections = SaddleConnections::new(&surface);
        let by_length: Vec<_> = connections.by_length().iter().take(8).collect();
        let lengths: Vec<i64> = by_length.iter().map(|c| c.length_squared()).collect();
        assert_eq!(lengths, vec![1, 1, 1, 1, 2, 2, 2, 2]);
        let mut sorted = lengths.clone();
        sorted.sort_unstable();
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn unbounded_iteration_is_lazy() {
        let surface = square_torus();
        let connections = SaddleConnections::new(&surface);
        let first: Vec<_> = connections.iter().take(4).collect();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|c| c.length_squared() == 1));
    }
}
