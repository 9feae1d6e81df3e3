use crate::combinatorial::{Subscriber, Triangulation, Vertex};
use crate::error::{Error, Result};
use crate::flat::FlatTriangulation;
use crate::half_edge::{Edge, HalfEdge};
use crate::saddle_connection::SaddleConnection;
use crate::tracking::HalfEdgeMap;
use crate::vector::{scalar_mul, Ccw, Ring, Vector};
use crate::vertical::Vertical;
use log::trace;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

type Hidden<T> = VecDeque<SaddleConnection<T>>;

/// A flat triangulation in which every edge parallel to a chosen vertical
/// has been contracted.
///
/// Contracting does not lose geometry: each half edge remembers, in order,
/// the vertical connections that were swept into it, and carries as its own
/// vector the saddle connection of the uncollapsed surface that its side of
/// the edge corresponds to.
pub struct CollapsedTriangulation<T: Ring> {
    combinatorial: Triangulation,
    original: Rc<FlatTriangulation<T>>,
    vertical: Vertical<T>,
    vectors: HalfEdgeMap<SaddleConnection<T>>,
    hidden: HalfEdgeMap<Hidden<T>>,
}

/// The attribute stores of a collapsed surface, wired to the mutation
/// events of its combinatorial triangulation.
struct Stores<'a, T: Ring> {
    vertical: &'a Vertical<T>,
    vectors: &'a mut HalfEdgeMap<SaddleConnection<T>>,
    hidden: &'a mut HalfEdgeMap<Hidden<T>>,
}

impl<'a, T: Ring> Stores<'a, T> {
    fn copy_slot(&mut self, target: HalfEdge, source: HalfEdge) {
        self.vectors.set(target, self.vectors.get(source).clone());
        self.hidden.set(target, self.hidden.get(source).clone());
    }

    /// Append all connections of `source` to `target`, emptying `source`.
    fn splice_back(&mut self, target: HalfEdge, source: HalfEdge) {
        let moved = std::mem::take(self.hidden.get_mut(source));
        self.hidden.get_mut(target).extend(moved);
    }

    /// Prepend all connections of `source` to `target`, emptying `source`.
    fn splice_front(&mut self, target: HalfEdge, source: HalfEdge) {
        let mut moved = std::mem::take(self.hidden.get_mut(source));
        moved.extend(std::mem::take(self.hidden.get_mut(target)));
        self.hidden.set(target, moved);
    }

    fn oriented(&self, e: Edge) -> HalfEdge {
        let positive = e.positive();
        if self.vertical.parallel_sign(self.vectors.get(positive).vector()) == Ordering::Less {
            e.negative()
        } else {
            positive
        }
    }
}

impl<'a, T: Ring> Subscriber for Stores<'a, T> {
    fn after_flip(&mut self, triangulation: &Triangulation, flip: HalfEdge) -> Result<()> {
        // The flip turned (a b flip)(c d -flip) into (a -flip d)(c flip b).
        let a = triangulation.previous_in_face(-flip);
        let b = triangulation.next_in_face(flip);
        let c = triangulation.previous_in_face(flip);
        let d = triangulation.next_in_face(-flip);

        // Pull b down over the connections hidden in flip and push d up over
        // the connections hidden in -flip.
        for connection in self.hidden.get(flip).clone() {
            let extended = self.vectors.get(b).extended(&connection);
            self.vectors.set(b, extended);
        }
        for connection in self.hidden.get(-flip).clone() {
            let extended = self.vectors.get(d).extended(&connection);
            self.vectors.set(d, extended);
        }

        // The connections stored at flip actually belong into -b, the ones
        // at -flip into -d.
        self.splice_back(-b, flip);
        self.splice_back(-d, -flip);

        // Nothing is hidden inside the pair anymore, so the faces are
        // regular and determine its vectors.
        let diagonal = self.vectors.get(d).extended(self.vectors.get(a));
        self.vectors.set(-flip, diagonal.reversed());
        self.vectors.set(flip, diagonal);

        let closing = self.vectors.get(b).extended(self.vectors.get(c));
        if self.vectors.get(-flip).vector() != closing.vector() {
            return Err(Error::InvariantViolated(format!(
                "face at {} not closed after flip",
                flip
            )));
        }
        Ok(())
    }

    fn before_collapse(&mut self, triangulation: &Triangulation, edge: Edge) -> Result<()> {
        let collapse = self.oriented(edge);

        // The faces are (a -collapse d) and (c collapse b).
        let a = triangulation.previous_in_face(-collapse);
        let b = triangulation.next_in_face(collapse);
        let c = triangulation.previous_in_face(collapse);
        let d = triangulation.next_in_face(-collapse);

        let connection = self.vectors.get(collapse).clone();
        if self.vectors.get(-collapse) != &connection.reversed() {
            return Err(Error::InvariantViolated(format!(
                "the vertical {} hides no connections so it must agree with {}",
                collapse, -collapse
            )));
        }

        self.hidden.get_mut(b).push_front(connection.clone());
        self.hidden.get_mut(d).push_front(connection.reversed());

        // Reset the vectors of the inner half edges by flowing through the
        // collapsed gadget to the opposite outer half edge. Identifications
        // among the outer edges each need their own treatment.
        if a == -c && b == -d {
            // Opposite sides are identified, so the entire gadget collapses
            // to a single pair of half edges; everything is squashed onto a.
            let reversed = self.vectors.get(a).reversed();
            self.vectors.set(-a, reversed);

            self.splice_back(a, b);
            self.splice_front(-a, -b);

            self.copy_slot(b, a);
            self.copy_slot(-b, -a);
        } else if a == -c {
            // The inner edge (a, -c) collapses as well.
            self.splice_back(-b, c);
            self.splice_back(-b, d);
            self.splice_back(-d, a);
            self.splice_back(-d, b);

            self.copy_slot(a, -d);
            self.copy_slot(b, -d);
            self.copy_slot(c, -b);
            self.copy_slot(d, -b);
        } else if b == -d {
            // The inner edge (b, -d) collapses as well.
            self.splice_back(-a, d);
            self.splice_back(-a, c);
            self.splice_back(-c, b);
            self.splice_back(-c, a);

            self.copy_slot(a, -c);
            self.copy_slot(b, -c);
            self.copy_slot(c, -a);
            self.copy_slot(d, -a);
        } else if a == -d || b == -c {
            if a == -d {
                // The right side already consists of a single edge pair.
                let reversed = self.vectors.get(a).reversed();
                self.vectors.set(-a, reversed);
            } else {
                self.splice_back(-a, d);
                self.splice_back(-d, a);

                self.copy_slot(a, -d);
                self.copy_slot(d, -a);
            }
            if b == -c {
                // The left side already consists of a single edge pair.
                let reversed = self.vectors.get(b).reversed();
                self.vectors.set(-b, reversed);
            } else {
                self.splice_back(-b, c);
                self.splice_back(-c, b);

                self.copy_slot(b, -c);
                self.copy_slot(c, -b);
            }
        } else {
            let gadget = [a, b, c, d, -a, -b, -c, -d];
            for (i, x) in gadget.iter().enumerate() {
                if gadget[..i].contains(x) {
                    return Err(Error::InvariantViolated(format!(
                        "unhandled identification in gadget ({} {} {})({} {} {})",
                        collapse, b, c, -collapse, d, a
                    )));
                }
            }
            self.splice_back(-a, d);
            self.splice_back(-b, c);
            self.splice_back(-c, b);
            self.splice_back(-d, a);

            self.copy_slot(a, -d);
            self.copy_slot(b, -c);
            self.copy_slot(c, -b);
            self.copy_slot(d, -a);
        }

        debug_assert!(!self.hidden.get(-a).is_empty());
        debug_assert!(!self.hidden.get(b).is_empty());
        debug_assert!(!self.hidden.get(-c).is_empty());
        debug_assert!(!self.hidden.get(d).is_empty());

        Ok(())
    }

    fn before_swap(&mut self, _: &Triangulation, x: HalfEdge, y: HalfEdge) {
        self.vectors.swap(x, y);
        self.hidden.swap(x, y);
    }

    fn before_erase(&mut self, _: &Triangulation, edges: &[Edge]) {
        self.vectors.truncate(edges.len());
        self.hidden.truncate(edges.len());
    }
}

impl<T: Ring> CollapsedTriangulation<T> {
    /// Collapse every edge of `original` that is parallel to `vertical`.
    /// The original surface is only read, never modified.
    pub fn new(original: Rc<FlatTriangulation<T>>, vertical: Vector<T>) -> Result<Self> {
        let vertical = Vertical::new(vertical)?;
        let combinatorial = original.combinatorial().clone();
        let vectors = HalfEdgeMap::new(&combinatorial, |e| original.from_edge(e));
        let hidden = HalfEdgeMap::new(&combinatorial, |_| Hidden::new());
        let mut surface = CollapsedTriangulation {
            combinatorial,
            original,
            vertical,
            vectors,
            hidden,
        };
        loop {
            let next = surface.combinatorial.half_edges().find(|e| {
                surface
                    .vertical
                    .is_vertical(surface.vectors.get(*e).vector())
            });
            match next {
                Some(e) => {
                    surface.collapse(e)?;
                }
                None => break,
            }
        }
        surface.check()?;
        Ok(surface)
    }

    pub fn combinatorial(&self) -> &Triangulation {
        &self.combinatorial
    }

    /// The surface this was collapsed from.
    pub fn uncollapsed(&self) -> &Rc<FlatTriangulation<T>> {
        &self.original
    }

    pub fn vertical(&self) -> &Vertical<T> {
        &self.vertical
    }

    pub fn edge_count(&self) -> usize {
        self.combinatorial.edge_count()
    }

    pub fn half_edges(&self) -> impl Iterator<Item = HalfEdge> {
        self.combinatorial.half_edges()
    }

    /// The saddle connection of the original surface along this half edge.
    pub fn from_edge(&self, e: HalfEdge) -> &SaddleConnection<T> {
        self.vectors.get(e)
    }

    /// The vertical connections that were swept into this half edge, in the
    /// order they were swept over.
    pub fn cross(&self, e: HalfEdge) -> Vec<SaddleConnection<T>> {
        self.hidden.get(e).iter().cloned().collect()
    }

    /// All hidden connections encountered when rotating clockwise from
    /// `from` to `to` around their common source vertex.
    pub fn turn(&self, from: HalfEdge, to: HalfEdge) -> Result<Vec<SaddleConnection<T>>> {
        if self.combinatorial.source(from) != self.combinatorial.source(to) {
            return Err(Error::InvalidArgument(format!(
                "can only turn between half edges starting at the same vertex but {} and {} do not",
                from, to
            )));
        }
        let mut connections = Vec::new();
        let mut walk = from;
        while walk != to {
            connections.extend(self.cross(walk));
            walk = self.combinatorial.previous_at_vertex(walk);
        }
        for (i, connection) in connections.iter().enumerate() {
            if connections[..i].contains(connection) {
                return Err(Error::InvariantViolated(
                    "a collapsed connection appeared twice while turning around a vertex"
                        .to_string(),
                ));
            }
        }
        Ok(connections)
    }

    /// Whether the direction `v` points out of the corner counterclockwise
    /// of `sector`, begin inclusive.
    pub fn in_sector(&self, sector: HalfEdge, v: &Vector<T>) -> bool {
        let begin = self.from_edge(sector).vector();
        let end = -self
            .from_edge(self.combinatorial.previous_in_face(sector))
            .vector()
            .clone();
        begin.ccw(v) != Ccw::Clockwise && end.ccw(v) == Ccw::Clockwise
    }

    pub fn source(&self, e: HalfEdge) -> Vertex {
        self.combinatorial.source(e)
    }

    /// Flip the diagonal `{e, -e}`. Only large edges away from any collapsed
    /// face can be flipped; when the new diagonal comes out vertical it is
    /// collapsed right away.
    pub fn flip(&mut self, e: HalfEdge) -> Result<()> {
        if !self.vertical.large(self.vectors.get(e).vector()) {
            return Err(Error::InvalidArgument(format!(
                "only large edges can be flipped, not {}",
                e
            )));
        }
        if !self.combinatorial.is_flippable(e) {
            return Err(Error::InvalidArgument(format!(
                "cannot flip {}: it touches a collapsed face",
                e
            )));
        }
        let e = if self.vertical.perpendicular_sign(self.vectors.get(e).vector())
            == Ordering::Less
        {
            -e
        } else {
            e
        };
        trace!("flipping {} of collapsed surface", e);
        self.combinatorial.flip(
            e,
            &mut Stores {
                vertical: &self.vertical,
                vectors: &mut self.vectors,
                hidden: &mut self.hidden,
            },
        )?;
        if self.vertical.is_vertical(self.vectors.get(e).vector()) {
            self.collapse(e)?;
        }
        if cfg!(debug_assertions) {
            self.check()?;
        }
        Ok(())
    }

    /// Contract a vertical edge, recording its connection in the hidden
    /// lists of the surviving neighbours.
    pub fn collapse(&mut self, e: HalfEdge) -> Result<(HalfEdge, HalfEdge)> {
        if !self.vertical.is_vertical(self.vectors.get(e).vector()) {
            return Err(Error::InvalidArgument(format!(
                "cannot collapse {}: it is not vertical",
                e
            )));
        }
        let positive = e.edge().positive();
        let oriented = if self.vertical.parallel_sign(self.vectors.get(positive).vector())
            == Ordering::Less
        {
            -positive
        } else {
            positive
        };
        trace!("collapsing {} of collapsed surface", oriented);
        self.combinatorial.collapse(
            oriented,
            &mut Stores {
                vertical: &self.vertical,
                vectors: &mut self.vectors,
                hidden: &mut self.hidden,
            },
        )
    }

    /// Six times the area of the surface, counting both the remaining
    /// triangles and the connections hidden in collapsed edges.
    pub fn area6(&self) -> T {
        let mut area = T::zero();
        for e in self.half_edges() {
            if self.combinatorial.next_in_face(e) != self.combinatorial.previous_in_face(e) {
                area = area
                    + self
                        .vectors
                        .get(e)
                        .vector()
                        .cross(self.vectors.get(self.combinatorial.next_in_face(e)).vector());
            }
            for connection in self.hidden.get(e) {
                let remainder =
                    self.vectors.get(e).vector().clone() - connection.vector().clone();
                area = area + scalar_mul(&connection.vector().cross(&remainder), 3);
            }
        }
        area
    }

    /// Face closure and area conservation; fatal when violated.
    pub(crate) fn check(&self) -> Result<()> {
        for e in self.half_edges() {
            if self.combinatorial.is_in_collapsed_face(e) {
                continue;
            }
            let zero = self
                .vertical
                .perpendicular(self.vectors.get(e).vector())
                + self.vertical.perpendicular(
                    self.vectors
                        .get(self.combinatorial.next_in_face(e))
                        .vector(),
                )
                + self.vertical.perpendicular(
                    self.vectors
                        .get(self.combinatorial.previous_in_face(e))
                        .vector(),
                );
            if !zero.is_zero() {
                return Err(Error::InvariantViolated(format!(
                    "the face of {} is not closed",
                    e
                )));
            }
        }
        let expected = scalar_mul(&self.original.area2(), 3);
        if self.area6() != expected {
            return Err(Error::InvariantViolated(
                "collapsing changed the area of the surface".to_string(),
            ));
        }
        Ok(())
    }
}

impl<T: Ring> Display for CollapsedTriangulation<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} with vectors {{", self.combinatorial)?;
        let mut first = true;
        for e in self.half_edges() {
            let connection = self.vectors.get(e);
            if !e.is_positive() && *connection == self.vectors.get(-e).reversed() {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            if connection.source() == e && connection.target() == -e {
                write!(f, "{}: {}", e, connection.vector())?;
            } else {
                write!(f, "{}: {}", e, connection)?;
            }
        }
        write!(f, "}}")?;
        if self.half_edges().any(|e| !self.hidden.get(e).is_empty()) {
            write!(f, ", collapsed half edges {{")?;
            let mut first = true;
            for e in self.half_edges() {
                if self.hidden.get(e).is_empty() {
                    continue;
                }
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{}: [", e)?;
                for (i, connection) in self.hidden.get(e).iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", connection.vector())?;
                }
                write!(f, "]")?;
            }
            write!(f, "}}")?;
        }
        write!(f, " with respect to {}", self.vertical)
    }
}
