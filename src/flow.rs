use crate::collapsed::CollapsedTriangulation;
use crate::half_edge::HalfEdge;
use crate::saddle_connection::SaddleConnection;
use crate::vector::Ring;
use std::fmt::{Display, Formatter};

/// A non-vertical connection on the boundary of a flow component.
///
/// The vertical connections swept into its half edge bound the component on
/// either side; walking the perimeter and re-reading these hidden lists
/// recovers the contour of the component after any flip or collapse.
pub struct ContourConnection<'a, T: Ring> {
    surface: &'a CollapsedTriangulation<T>,
    half_edge: HalfEdge,
}

impl<'a, T: Ring> ContourConnection<'a, T> {
    pub fn half_edge(&self) -> HalfEdge {
        self.half_edge
    }

    pub fn connection(&self) -> &SaddleConnection<T> {
        self.surface.from_edge(self.half_edge)
    }

    /// The vertical connections on the left of this connection, from its
    /// left end towards the interior.
    pub fn left(&self) -> Vec<SaddleConnection<T>> {
        self.surface
            .cross(-self.half_edge)
            .iter()
            .rev()
            .map(|connection| connection.reversed())
            .collect()
    }

    /// The vertical connections on the right of this connection, from its
    /// right end towards the interior.
    pub fn right(&self) -> Vec<SaddleConnection<T>> {
        self.surface.cross(self.half_edge)
    }

    pub fn next_in_perimeter(&self) -> ContourConnection<'a, T> {
        ContourConnection {
            surface: self.surface,
            half_edge: self.surface.combinatorial().next_in_face(self.half_edge),
        }
    }

    pub fn previous_in_perimeter(&self) -> ContourConnection<'a, T> {
        ContourConnection {
            surface: self.surface,
            half_edge: self
                .surface
                .combinatorial()
                .previous_in_face(self.half_edge),
        }
    }
}

impl<'a, T: Ring> PartialEq for ContourConnection<'a, T> {
    fn eq(&self, rhs: &Self) -> bool {
        std::ptr::eq(self.surface, rhs.surface) && self.half_edge == rhs.half_edge
    }
}

impl<'a, T: Ring> Display for ContourConnection<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "contour along {}", self.half_edge)
    }
}

/// A piece of the decomposition of a collapsed surface along its vertical
/// flow: either a maximal cylinder, which the collapse squashed into a
/// single slit, or a component of the remaining triangulated part.
pub struct FlowComponent<'a, T: Ring> {
    surface: &'a CollapsedTriangulation<T>,
    faces: Vec<Vec<HalfEdge>>,
}

impl<'a, T: Ring> FlowComponent<'a, T> {
    /// A cylinder is a component the vertical collapse swallowed entirely:
    /// all that remains of it is a slit.
    pub fn cylinder(&self) -> bool {
        self.faces.len() == 1 && self.faces[0].len() == 2
    }

    /// The boundary of the component in face-cycle order.
    pub fn perimeter(&self) -> Vec<ContourConnection<'a, T>> {
        self.faces
            .iter()
            .flatten()
            .map(|half_edge| ContourConnection {
                surface: self.surface,
                half_edge: *half_edge,
            })
            .collect()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// The decomposition of a collapsed surface into flow components.
pub struct FlowDecomposition<'a, T: Ring> {
    components: Vec<FlowComponent<'a, T>>,
}

impl<'a, T: Ring> FlowDecomposition<'a, T> {
    pub fn new(surface: &'a CollapsedTriangulation<T>) -> Self {
        let combinatorial = surface.combinatorial();
        let cycles = combinatorial.face_cycles();
        let mut assigned = vec![usize::MAX; cycles.len()];
        let face_of = |e: HalfEdge| -> usize {
            cycles
                .iter()
                .position(|cycle| cycle.contains(&e))
                .expect("every half edge lies in a face cycle")
        };

        // Slits are components of their own; triangles cluster with the
        // triangles they share an edge with.
        let mut components: Vec<Vec<usize>> = Vec::new();
        for (i, cycle) in cycles.iter().enumerate() {
            if assigned[i] != usize::MAX {
                continue;
            }
            let component = components.len();
            if cycle.len() == 2 {
                assigned[i] = component;
                components.push(vec![i]);
                continue;
            }
            let mut members = vec![i];
            assigned[i] = component;
            let mut frontier = vec![i];
            while let Some(face) = frontier.pop() {
                for &e in &cycles[face] {
                    let neighbour = face_of(-e);
                    if cycles[neighbour].len() == 2 || assigned[neighbour] != usize::MAX {
                        continue;
                    }
                    assigned[neighbour] = component;
                    members.push(neighbour);
                    frontier.push(neighbour);
                }
            }
            components.push(members);
        }

        FlowDecomposition {
            components: components
                .into_iter()
                .map(|members| FlowComponent {
                    surface,
                    faces: members.into_iter().map(|i| cycles[i].clone()).collect(),
                })
                .collect(),
        }
    }

    pub fn components(&self) -> &[FlowComponent<'a, T>] {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::Triangulation;
    use crate::flat::FlatTriangulation;
    use crate::vector::Vector;
    use std::rc::Rc;

    fn h(id: i64) -> HalfEdge {
        HalfEdge::new(id)
    }

    fn collapsed_torus() -> CollapsedTriangulation<i64> {
        let combinatorial = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        let original = Rc::new(
            FlatTriangulation::new(
                combinatorial,
                vec![
                    Vector::new(1, 0),
                    Vector::new(0, 1),
                    Vector::new(-1, -1),
                ],
            )
            .unwrap(),
        );
        CollapsedTriangulation::new(original, Vector::new(0, 1)).unwrap()
    }

    #[test]
    fn the_torus_is_one_cylinder() {
        let collapsed = collapsed_torus();
        let decomposition = FlowDecomposition::new(&collapsed);
        assert_eq!(decomposition.components().len(), 1);
        let cylinder = &decomposition.components()[0];
        assert!(cylinder.cylinder());

        let perimeter = cylinder.perimeter();
        assert_eq!(perimeter.len(), 2);
        // The bottom and the top of the cylinder.
        assert_eq!(perimeter[0].connection().vector(), &Vector::new(1, 0));
        assert_eq!(perimeter[1].connection().vector(), &Vector::new(-1, 0));
        assert!(perimeter[0].next_in_perimeter() == perimeter[1]);
        assert!(perimeter[1].next_in_perimeter() == perimeter[0]);
        assert!(perimeter[1].previous_in_perimeter() == perimeter[0]);
    }

    #[test]
    fn the_cylinder_boundary_carries_the_absorbed_verticals() {
        let collapsed = collapsed_torus();
        let decomposition = FlowDecomposition::new(&collapsed);
        let perimeter = decomposition.components()[0].perimeter();
        let bottom = &perimeter[0];
        assert_eq!(bottom.right().len(), 1);
        assert_eq!(bottom.right()[0].vector(), &Vector::new(0, -1));
        assert_eq!(bottom.left().len(), 1);
        assert_eq!(bottom.left()[0].vector(), &Vector::new(0, -1));
    }

    #[test]
    fn a_surface_without_vertical_edges_is_one_minimal_component() {
        let combinatorial = Triangulation::from_faces(&[
            vec![h(1), h(2), h(3)],
            vec![h(-1), h(-2), h(-3)],
        ])
        .unwrap();
        let original = Rc::new(
            FlatTriangulation::new(
                combinatorial,
                vec![
                    Vector::new(1, 0),
                    Vector::new(1, 1),
                    Vector::new(-2, -1),
                ],
            )
            .unwrap(),
        );
        let collapsed = CollapsedTriangulation::new(original, Vector::new(0, 1)).unwrap();
        let decomposition = FlowDecomposition::new(&collapsed);
        assert_eq!(decomposition.components().len(), 1);
        let component = &decomposition.components()[0];
        assert!(!component.cylinder());
        assert_eq!(component.face_count(), 2);
        assert_eq!(component.perimeter().len(), 6);
    }
}
