//! Extracting the boundary of a set of areas.

use kurbo::{BezPath, ParamCurve, Point, Shape};

use crate::topology::{AreaIdx, OrientedEdge, Topology};

/// An index for a [`Contour`] within [`Contours`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, serde::Serialize)]
pub struct ContourIdx(pub usize);

/// A closed curve that doesn't cross itself.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Contour {
    /// The geometry, passing through the centers of the vertices that it
    /// visits.
    pub path: BezPath,

    /// The edges making up this contour, in order.
    pub edges: Vec<OrientedEdge>,

    /// A contour can have a parent, so that sets with holes can be represented as nested contours.
    /// For example, the shaded set below:
    ///
    /// ```text
    ///   ----------------------
    ///   |xxxxxxxxxxxxxxxxxxxx|
    ///   |xxxxxxxxx/\xxxxxxxxx|
    ///   |xxxxxxxx/  \xxxxxxxx|
    ///   |xxxxxxxx\  /xxxxxxxx|
    ///   |xxxxxxxxx\/xxxxxxxxx|
    ///   |xxxxxxxxxxxxxxxxxxxx|
    ///   ----------------------
    /// ```
    ///
    /// is represented as a square contour with no parent, and a diamond
    /// contour with the square as its parent. The parent is the smallest
    /// contour that encloses this one.
    pub parent: Option<ContourIdx>,

    /// Whether this contour is "outer" or not.
    ///
    /// As you walk along a contour, the "occupied" part of the set it
    /// represents is on your left. This means that outer contours wind
    /// counter-clockwise and inner contours wind clockwise (with the `y` axis
    /// pointing up).
    pub outer: bool,
}

/// A collection of [`Contour`]s.
///
/// Can be indexed with a [`ContourIdx`].
#[derive(Clone, Debug, serde::Serialize, Default)]
pub struct Contours {
    contours: Vec<Contour>,
}

impl Contours {
    /// Returns all of the contour indices, grouped by containment.
    ///
    /// For each of the inner vecs, the first element is a contour with no
    /// parent. All of the other contours in that inner vec lie inside it.
    pub fn grouped(&self) -> Vec<Vec<ContourIdx>> {
        let mut children = vec![Vec::new(); self.contours.len()];
        let mut top_level = Vec::new();
        for (i, c) in self.contours.iter().enumerate() {
            if let Some(parent) = c.parent {
                children[parent.0].push(ContourIdx(i));
            } else {
                top_level.push(ContourIdx(i));
            }
        }

        fn visit(idx: ContourIdx, children: &[Vec<ContourIdx>], acc: &mut Vec<ContourIdx>) {
            acc.push(idx);
            for &child in &children[idx.0] {
                visit(child, children, acc);
            }
        }

        top_level
            .into_iter()
            .map(|top| {
                let mut tree = Vec::new();
                visit(top, &children, &mut tree);
                tree
            })
            .collect()
    }

    /// Iterates over all of the contours.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> + '_ {
        self.contours.iter()
    }

    /// The number of contours.
    pub fn len(&self) -> usize {
        self.contours.len()
    }

    /// Are there no contours at all?
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// All the contours, as one path.
    ///
    /// Because inner contours wind the other way, the path's non-zero
    /// interior and its even-odd interior are both the set that these
    /// contours describe.
    pub fn to_path(&self) -> BezPath {
        let mut ret = BezPath::new();
        for c in &self.contours {
            ret.extend(c.path.iter());
        }
        ret
    }
}

impl std::ops::Index<ContourIdx> for Contours {
    type Output = Contour;

    fn index(&self, index: ContourIdx) -> &Self::Output {
        &self.contours[index.0]
    }
}

impl Topology {
    /// Returns the contours of some set defined by this topology.
    ///
    /// The callback function `inside` takes the winding numbers of an area
    /// (one for each input path) and returns `true` if the area should be in
    /// the resulting set. For example, to compute the intersection of the
    /// first two paths using the non-zero winding rule, `inside` should be
    /// `|w| w[0] != 0 && w[1] != 0`.
    pub fn contours(&self, inside: impl Fn(&[i32]) -> bool) -> Contours {
        let in_set: Vec<bool> = self.areas().values().map(|a| inside(&a.winding)).collect();
        let is_in = |a: AreaIdx| in_set[a.0];

        let mut visited = vec![false; self.edges().len()];
        // For each vertex, where it appears in the contour we're walking. If
        // we come back to a vertex, we've walked a loop that gets split off.
        let mut last_visit: Vec<Option<usize>> = vec![None; self.vertices().len()];
        let mut loops = Vec::new();

        for (idx, e) in self.edges().iter() {
            if visited[idx.0] || is_in(e.left) == is_in(e.right) {
                continue;
            }

            // Arrange the orientation so that the interior is on our left as
            // we walk.
            let start = if is_in(e.left) {
                OrientedEdge::forward(idx)
            } else {
                OrientedEdge::backward(idx)
            };
            let mut segs: Vec<OrientedEdge> = Vec::new();
            last_visit[self.tail(start).0] = Some(0);
            let mut next = start;
            loop {
                visited[next.edge.0] = true;
                segs.push(next);

                // Walk clockwise around the vertex until we find the next
                // edge that's on the boundary.
                let rays = &self.vertices()[self.head(next)].rays;
                let n = rays.len();
                let Some(pos) = rays.iter().position(|&r| r == next.flip()) else {
                    tracing::warn!(edge = %next.edge, "edge missing from its vertex");
                    break;
                };
                let nbr = (1..=n)
                    .map(|step| rays[(pos + n - step) % n])
                    .find(|&r| is_in(self.left_of(r)) && !is_in(self.right_of(r)));
                let Some(nbr) = nbr else {
                    tracing::warn!(edge = %next.edge, "contour doesn't continue");
                    break;
                };
                if nbr == start {
                    break;
                }

                let p = self.tail(nbr).0;
                let last_visit_idx = last_visit[p]
                    // We don't clean up `last_visit` between contours, so
                    // double-check that it really refers to this walk.
                    .filter(|&i| i < segs.len() && self.tail(segs[i]).0 == p);
                if let Some(i) = last_visit_idx {
                    // We came back to a vertex, so split off the loop since
                    // the last time we were here.
                    loops.push(segs.split_off(i));
                } else {
                    last_visit[p] = Some(segs.len());
                }
                next = nbr;
            }
            loops.push(segs);
        }

        self.assemble_contours(loops)
    }

    fn assemble_contours(&self, loops: Vec<Vec<OrientedEdge>>) -> Contours {
        let mut contours: Vec<Contour> = Vec::with_capacity(loops.len());
        let mut areas = Vec::with_capacity(loops.len());
        for edges in loops {
            let path = self.loop_path(&edges);
            let area = path.area();
            areas.push(area);
            contours.push(Contour {
                path,
                edges,
                parent: None,
                outer: area > 0.0,
            });
        }

        // The parent is the smallest contour around a point on our boundary.
        let samples: Vec<Option<Point>> = contours
            .iter()
            .map(|c| c.edges.first().map(|&oe| self.oriented_seg(oe).eval(0.5)))
            .collect();
        for i in 0..contours.len() {
            let Some(sample) = samples[i] else {
                continue;
            };
            let size = areas[i].abs();
            let parent = (0..contours.len())
                .filter(|&j| j != i && areas[j].abs() > size)
                .filter(|&j| contours[j].path.winding(sample) != 0)
                .min_by(|&j, &k| areas[j].abs().total_cmp(&areas[k].abs()));
            contours[i].parent = parent.map(ContourIdx);
        }

        Contours { contours }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Circle, Rect};

    use super::*;

    fn squares(rects: &[Rect]) -> Topology {
        let paths: Vec<BezPath> = rects.iter().map(|r| r.to_path(0.0)).collect();
        Topology::new(&paths, 0.01).unwrap()
    }

    #[test]
    fn annulus() {
        let top = squares(&[
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(2.0, 2.0, 8.0, 8.0),
        ]);
        let contours = top.contours(|w| (w[0] + w[1]) % 2 != 0);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours.grouped().len(), 1);
        let outer = contours.contours().find(|c| c.outer).unwrap();
        let inner = contours.contours().find(|c| !c.outer).unwrap();
        assert_eq!(outer.parent, None);
        assert!(inner.parent.is_some());
        assert!((outer.path.area() - 100.0).abs() < 1.0);
        assert!((inner.path.area() + 36.0).abs() < 1.0);
        assert!((contours.to_path().area() - 64.0).abs() < 1.0);
    }

    #[test]
    fn island_in_a_hole() {
        let top = squares(&[
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(2.0, 2.0, 8.0, 8.0),
            Rect::new(4.0, 4.0, 6.0, 6.0),
        ]);
        let contours = top.contours(|w| w.iter().sum::<i32>() % 2 != 0);
        assert_eq!(contours.len(), 3);
        let groups = contours.grouped();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);

        // Going down the tree, the contours alternate.
        let island = contours
            .contours()
            .position(|c| (c.path.area() - 4.0).abs() < 0.1)
            .unwrap();
        let hole = contours[ContourIdx(island)].parent.unwrap();
        assert!(!contours[hole].outer);
        let outer = contours[hole].parent.unwrap();
        assert!(contours[outer].outer);
        assert_eq!(contours[outer].parent, None);
    }

    #[test]
    fn pinched_contours_are_split() {
        // Two squares touching at a corner make two contours, not one
        // figure-eight.
        let top = squares(&[
            Rect::new(0.0, 0.0, 4.0, 4.0),
            Rect::new(4.0, 4.0, 8.0, 8.0),
        ]);
        let contours = top.contours(|w| w[0] != 0 || w[1] != 0);
        assert_eq!(contours.len(), 2);
        for c in contours.contours() {
            assert!(c.outer);
            assert_eq!(c.parent, None);
            assert_eq!(c.edges.len(), 4);
        }
    }

    #[test]
    fn union_of_circles() {
        let a = Circle::new((0.0, 0.0), 3.0).to_path(1e-3);
        let b = Circle::new((2.0, 0.0), 3.0).to_path(1e-3);
        let top = Topology::new([&a, &b], 1e-6).unwrap();
        let contours = top.contours(|w| w[0] != 0 || w[1] != 0);
        assert_eq!(contours.len(), 1);
        let c = contours.contours().next().unwrap();
        assert!(c.outer);
        // Bigger than one circle, smaller than two.
        let area = c.path.area();
        let circle = std::f64::consts::PI * 9.0;
        assert!(area > circle && area < 2.0 * circle);
    }
}
