//! The planar graph: vertices, edges, and the areas between them.
//!
//! This consumes the output of the sweep and builds up the graph one tile end
//! at a time. Every tile becomes an edge (with the same index). Vertices are
//! the fat vertex boxes that have at least one tile ending in them, and areas
//! are the connected regions of the plane that are left over, each one knowing
//! its winding number with respect to every input path.
//!
//! Areas are discovered greedily: every time a tile opens, we create a new
//! area on one side of it. Later on, when the sweep finds that two areas
//! actually touch, we fuse them. So an area's boundary is assembled out of
//! pieces ("chains") that get glued together as their endpoints become known.

use std::collections::HashMap;

use kurbo::{BezPath, ParamCurve, PathSeg, Point, Rect, Shape};

use crate::{
    cluster::cluster,
    sweep::{Event, EventKind, Sweeper},
    tiles::{decompose, BoxIdx, BoxVec, TileIdx, Tiles},
    Error, TopologyError,
};

/// An index into the vertices of a [`Topology`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct VertexIdx(pub usize);

/// A vector indexed by vertices.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct VertexVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(VertexVec, VertexIdx, "v");

/// An index into the edges of a [`Topology`].
///
/// Edges are in one-to-one correspondence with the tiles they came from, so
/// this is also a tile index.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct EdgeIdx(pub usize);

/// A vector indexed by edges.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct EdgeVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(EdgeVec, EdgeIdx, "e");

/// An index into the areas of a [`Topology`].
///
/// The unbounded area, outside of everything, is always `AreaIdx(0)`.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct AreaIdx(pub usize);

/// A vector indexed by areas.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct AreaVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(AreaVec, AreaIdx, "a");

impl AreaIdx {
    /// The unbounded area.
    pub const UNBOUNDED: AreaIdx = AreaIdx(0);
}

impl From<TileIdx> for EdgeIdx {
    fn from(t: TileIdx) -> Self {
        EdgeIdx(t.0)
    }
}

/// An edge, together with a direction to walk along it.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, serde::Serialize)]
pub struct OrientedEdge {
    /// The edge.
    pub edge: EdgeIdx,
    /// If false, we walk from the edge's start to its end.
    pub reversed: bool,
}

impl OrientedEdge {
    /// Walk the edge from its start to its end.
    pub fn forward(edge: EdgeIdx) -> Self {
        OrientedEdge {
            edge,
            reversed: false,
        }
    }

    /// Walk the edge from its end to its start.
    pub fn backward(edge: EdgeIdx) -> Self {
        OrientedEdge {
            edge,
            reversed: true,
        }
    }

    /// The same edge, walked the other way.
    pub fn flip(self) -> Self {
        OrientedEdge {
            edge: self.edge,
            reversed: !self.reversed,
        }
    }
}

/// A fat vertex.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Vertex {
    /// The vertex box.
    pub rect: Rect,
    /// The edges touching this vertex, in counter-clockwise order.
    ///
    /// They're oriented to point away from the vertex, so an edge that ends
    /// here appears reversed.
    pub rays: Vec<OrientedEdge>,
}

impl Vertex {
    /// The point that stands in for this vertex.
    pub fn center(&self) -> Point {
        self.rect.center()
    }
}

/// An edge of the graph: a monotonic piece of one of the input curves.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Edge {
    /// The vertex at the start of the curve.
    pub start: VertexIdx,
    /// The vertex at the end of the curve.
    pub end: VertexIdx,
    /// The area on the left as we walk from start to end.
    pub left: AreaIdx,
    /// The area on the right as we walk from start to end.
    pub right: AreaIdx,
    /// The input path that this edge came from.
    pub path: usize,
    /// The curve within the input path.
    pub curve: usize,
    /// The parameter on that curve where this edge starts.
    pub f: f64,
    /// The parameter on that curve where this edge ends.
    pub t: f64,
    /// The geometry, exactly as it was in the input.
    ///
    /// Its endpoints are inside the vertex boxes, but not necessarily at
    /// their centers.
    pub seg: PathSeg,
}

/// A maximal connected region that isn't crossed by any edge.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Area {
    /// The boundary that encloses this area, with the area on its left.
    ///
    /// This is `None` for the unbounded area.
    pub outer: Option<Vec<OrientedEdge>>,
    /// The boundaries of holes in this area, also with the area on their
    /// left. This makes them go clockwise.
    pub inner: Vec<Vec<OrientedEdge>>,
    /// The winding number of each input path around this area.
    ///
    /// Paths that aren't closed don't affect winding numbers, and always
    /// have zero here.
    pub winding: Vec<i32>,
}

impl Area {
    /// All the boundary loops, outer one first.
    pub fn boundaries(&self) -> impl Iterator<Item = &[OrientedEdge]> + '_ {
        self.outer
            .iter()
            .map(Vec::as_slice)
            .chain(self.inner.iter().map(Vec::as_slice))
    }
}

/// The planar graph defined by a collection of paths.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Topology {
    vertices: VertexVec<Vertex>,
    edges: EdgeVec<Edge>,
    areas: AreaVec<Area>,
    closed: Vec<bool>,
    tolerance: f64,
}

impl Topology {
    /// Builds the graph of a collection of paths.
    ///
    /// Points closer than (roughly) `tolerance` might get identified with
    /// one another.
    pub fn new<'a>(
        paths: impl IntoIterator<Item = &'a BezPath>,
        tolerance: f64,
    ) -> Result<Self, Error> {
        let paths: Vec<&BezPath> = paths.into_iter().collect();
        for p in &paths {
            crate::check_finite(p)?;
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(Error::BadTolerance(tolerance));
        }
        let tiles = cluster(decompose(paths, tolerance))?;
        Ok(Self::from_tiles(tiles)?)
    }

    /// Builds the graph out of some already-clustered tiles.
    pub fn from_tiles(tiles: Tiles) -> Result<Self, TopologyError> {
        let mut sweeper = Sweeper::new(tiles);
        let mut builder = Builder::new(sweeper.tiles());
        while let Some(ev) = sweeper.next_event()? {
            builder.handle(&ev)?;
        }
        let ret = builder.finish()?;
        tracing::debug!(
            vertices = ret.vertices.len(),
            edges = ret.edges.len(),
            areas = ret.areas.len(),
            "built topology"
        );
        Ok(ret)
    }

    /// All the vertices.
    pub fn vertices(&self) -> &VertexVec<Vertex> {
        &self.vertices
    }

    /// All the edges.
    pub fn edges(&self) -> &EdgeVec<Edge> {
        &self.edges
    }

    /// All the areas.
    pub fn areas(&self) -> &AreaVec<Area> {
        &self.areas
    }

    /// The winding numbers of the input paths around an area.
    pub fn winding(&self, area: AreaIdx) -> &[i32] {
        &self.areas[area].winding
    }

    /// The number of input paths.
    pub fn num_paths(&self) -> usize {
        self.closed.len()
    }

    /// Was the input path closed?
    pub fn is_closed(&self, path: usize) -> bool {
        self.closed[path]
    }

    /// The tolerance that the graph was built with.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// The areas whose winding numbers satisfy a predicate.
    pub fn areas_where<'a>(
        &'a self,
        pred: impl Fn(&[i32]) -> bool + 'a,
    ) -> impl Iterator<Item = AreaIdx> + 'a {
        self.areas
            .iter()
            .filter(move |(_, a)| pred(&a.winding))
            .map(|(idx, _)| idx)
    }

    /// The vertex that we start at when walking an oriented edge.
    pub fn tail(&self, oe: OrientedEdge) -> VertexIdx {
        let e = &self.edges[oe.edge];
        if oe.reversed {
            e.end
        } else {
            e.start
        }
    }

    /// The vertex that we end at when walking an oriented edge.
    pub fn head(&self, oe: OrientedEdge) -> VertexIdx {
        self.tail(oe.flip())
    }

    /// The area on our left as we walk an oriented edge.
    pub fn left_of(&self, oe: OrientedEdge) -> AreaIdx {
        let e = &self.edges[oe.edge];
        if oe.reversed {
            e.right
        } else {
            e.left
        }
    }

    /// The area on our right as we walk an oriented edge.
    pub fn right_of(&self, oe: OrientedEdge) -> AreaIdx {
        self.left_of(oe.flip())
    }

    /// The geometry of an oriented edge, with its endpoints moved to the
    /// centers of its vertices.
    pub fn oriented_seg(&self, oe: OrientedEdge) -> PathSeg {
        let e = &self.edges[oe.edge];
        let p0 = self.vertices[self.tail(oe)].center();
        let p1 = self.vertices[self.head(oe)].center();
        let seg = if oe.reversed {
            reverse_seg(e.seg)
        } else {
            e.seg
        };
        let d0 = p0 - seg.start();
        let d1 = p1 - seg.end();
        match seg {
            PathSeg::Line(_) => PathSeg::Line(kurbo::Line::new(p0, p1)),
            PathSeg::Quad(q) => {
                PathSeg::Quad(kurbo::QuadBez::new(p0, q.p1 + (d0 + d1) * 0.5, p1))
            }
            PathSeg::Cubic(c) => {
                PathSeg::Cubic(kurbo::CubicBez::new(p0, c.p1 + d0, c.p2 + d1, p1))
            }
        }
    }

    /// Stitches a closed loop of oriented edges into a path.
    pub fn loop_path(&self, edges: &[OrientedEdge]) -> BezPath {
        let mut ret = BezPath::new();
        let Some(&first) = edges.first() else {
            return ret;
        };
        ret.move_to(self.vertices[self.tail(first)].center());
        for &oe in edges {
            match self.oriented_seg(oe) {
                PathSeg::Line(l) => ret.line_to(l.p1),
                PathSeg::Quad(q) => ret.quad_to(q.p1, q.p2),
                PathSeg::Cubic(c) => ret.curve_to(c.p1, c.p2, c.p3),
            }
        }
        ret.close_path();
        ret
    }

    /// The boundary of an area, as a path.
    ///
    /// The area is on the left of every subpath, so (with `y` pointing up)
    /// the outer boundary goes counter-clockwise and the holes go clockwise.
    pub fn area_path(&self, area: AreaIdx) -> BezPath {
        let mut ret = BezPath::new();
        for bdy in self.areas[area].boundaries() {
            ret.extend(self.loop_path(bdy));
        }
        ret
    }

    /// Draws the graph, coloring each edge by the input path it came from.
    #[cfg(feature = "debug-svg")]
    pub fn dump_svg(&self, color: impl Fn(usize) -> String) -> svg::Document {
        use svg::node::element::{Path, Rectangle};

        let mut bbox: Option<Rect> = None;
        let mut doc = svg::Document::new();
        for (_, e) in self.edges.iter() {
            let mut path = BezPath::new();
            path.move_to(e.seg.start());
            match e.seg {
                PathSeg::Line(l) => path.line_to(l.p1),
                PathSeg::Quad(q) => path.quad_to(q.p1, q.p2),
                PathSeg::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
            }
            bbox = Some(bbox.map_or(e.seg.bounding_box(), |b| b.union(e.seg.bounding_box())));
            doc = doc.add(
                Path::new()
                    .set("d", path.to_svg())
                    .set("stroke", color(e.path))
                    .set("stroke-width", self.tolerance)
                    .set("fill", "none"),
            );
        }
        for (_, v) in self.vertices.iter() {
            doc = doc.add(
                Rectangle::new()
                    .set("x", v.rect.x0)
                    .set("y", v.rect.y0)
                    .set("width", v.rect.width())
                    .set("height", v.rect.height())
                    .set("fill", "black")
                    .set("opacity", 0.3),
            );
        }
        if let Some(b) = bbox {
            let b = b.inflate(b.width() * 0.05, b.height() * 0.05);
            doc = doc.set("viewBox", (b.x0, b.y0, b.width(), b.height()));
        }
        doc
    }
}

fn reverse_seg(seg: PathSeg) -> PathSeg {
    match seg {
        PathSeg::Line(l) => PathSeg::Line(kurbo::Line::new(l.p1, l.p0)),
        PathSeg::Quad(q) => PathSeg::Quad(kurbo::QuadBez::new(q.p2, q.p1, q.p0)),
        PathSeg::Cubic(c) => PathSeg::Cubic(kurbo::CubicBez::new(c.p3, c.p2, c.p1, c.p0)),
    }
}

// An edge whose endpoints and neighbors are only partly known.
#[derive(Clone, Debug)]
struct ProtoEdge {
    start: Option<VertexIdx>,
    end: Option<VertexIdx>,
    left: Option<AreaIdx>,
    right: Option<AreaIdx>,
}

#[derive(Clone, Debug)]
struct ProtoArea {
    // Pieces of the boundary, each with the area on its left. They get
    // merged when the end of one turns out to be the start of another.
    chains: Vec<Vec<OrientedEdge>>,
    winding: Vec<i32>,
}

struct Builder {
    edges: EdgeVec<ProtoEdge>,
    areas: AreaVec<ProtoArea>,
    vertices: VertexVec<Vertex>,
    vertex_of: BoxVec<Option<VertexIdx>>,
    tiles: Tiles,
}

impl Builder {
    fn new(tiles: &Tiles) -> Self {
        let edges = tiles.tiles.values().map(|_| ProtoEdge {
            start: None,
            end: None,
            left: None,
            right: None,
        });
        let mut areas = AreaVec::default();
        areas.push(ProtoArea {
            chains: Vec::new(),
            winding: vec![0; tiles.num_paths()],
        });
        Builder {
            edges: EdgeVec::from_vec(edges.collect()),
            areas,
            vertices: VertexVec::default(),
            vertex_of: BoxVec::from_vec(vec![None; tiles.boxes.len()]),
            tiles: tiles.clone(),
        }
    }

    fn vertex(&mut self, b: BoxIdx) -> VertexIdx {
        if let Some(v) = self.vertex_of[b] {
            return v;
        }
        let v = self.vertices.push(Vertex {
            rect: self.tiles.boxes[b],
            rays: Vec::new(),
        });
        self.vertex_of[b] = Some(v);
        v
    }

    fn left_of(&self, oe: OrientedEdge) -> Result<AreaIdx, TopologyError> {
        let e = &self.edges[oe.edge];
        let side = if oe.reversed { e.right } else { e.left };
        side.ok_or(TopologyError::UnresolvedEdge(oe.edge))
    }

    fn right_of(&self, oe: OrientedEdge) -> Result<AreaIdx, TopologyError> {
        self.left_of(oe.flip())
    }

    fn tail(&self, oe: OrientedEdge) -> Option<VertexIdx> {
        let e = &self.edges[oe.edge];
        if oe.reversed {
            e.end
        } else {
            e.start
        }
    }

    fn head(&self, oe: OrientedEdge) -> Option<VertexIdx> {
        self.tail(oe.flip())
    }

    fn chain_is_loop(&self, chain: &[OrientedEdge]) -> bool {
        match (chain.first(), chain.last()) {
            (Some(&first), Some(&last)) => {
                self.tail(first).is_some() && self.tail(first) == self.head(last)
            }
            _ => false,
        }
    }

    fn handle(&mut self, ev: &Event) -> Result<(), TopologyError> {
        let v = self.vertex(ev.vertex);
        let edge = EdgeIdx::from(ev.tile);
        // Pointing away from the vertex.
        let ray = OrientedEdge {
            edge,
            reversed: !ev.centrifugal,
        };
        let prev = self.vertices[v].rays.last().copied();

        match ev.kind {
            EventKind::Closing => {
                let e = &mut self.edges[edge];
                if ev.centrifugal {
                    e.start = Some(v);
                } else {
                    e.end = Some(v);
                }
                self.vertices[v].rays.push(ray);
                if let Some(prev) = prev {
                    // The sector between the previous ray and this one.
                    let a = self.left_of(prev)?;
                    let b = self.right_of(ray)?;
                    self.fuse(a, b);
                }
                let a = self.left_of(ray)?;
                self.connect(a);
                let b = self.right_of(ray)?;
                self.connect(b);
            }
            EventKind::Opening => {
                let cur = match prev {
                    Some(prev) => self.left_of(prev)?,
                    None => match ev.above {
                        Some(t) => {
                            // The area just below the tile above us.
                            let above = OrientedEdge {
                                edge: t.into(),
                                reversed: !self.tiles.tiles[t].reversed,
                            };
                            self.left_of(above)?
                        }
                        None => AreaIdx::UNBOUNDED,
                    },
                };
                let path = self.tiles.tiles[ev.tile].path;
                let mut winding = self.areas[cur].winding.clone();
                if self.tiles.closed[path] {
                    winding[path] += if ev.centrifugal { 1 } else { -1 };
                }
                let new = self.areas.push(ProtoArea {
                    chains: vec![vec![ray]],
                    winding,
                });
                self.areas[cur].chains.push(vec![ray.flip()]);

                let e = &mut self.edges[edge];
                if ev.centrifugal {
                    e.start = Some(v);
                    e.left = Some(new);
                    e.right = Some(cur);
                } else {
                    e.end = Some(v);
                    e.left = Some(cur);
                    e.right = Some(new);
                }
                self.vertices[v].rays.push(ray);
                self.connect(cur);
            }
        }

        if !ev.to_be_continued {
            // Close up the loop around the vertex.
            let rays = &self.vertices[v].rays;
            if let (Some(&first), Some(&last)) = (rays.first(), rays.last()) {
                let a = self.right_of(first)?;
                let b = self.left_of(last)?;
                self.fuse(a, b);
            }
        }
        Ok(())
    }

    /// Merges two areas, keeping the smaller index.
    fn fuse(&mut self, a: AreaIdx, b: AreaIdx) {
        if a == b {
            return;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        tracing::trace!(%lo, %hi, "fusing areas");
        let removed = self.areas.remove(hi);
        if removed.winding != self.areas[lo].winding {
            tracing::debug!(
                %lo,
                %hi,
                lo_winding = ?self.areas[lo].winding,
                hi_winding = ?removed.winding,
                "fusing areas with different winding numbers"
            );
        }
        self.areas[lo].chains.extend(removed.chains);

        for (_, e) in self.edges.iter_mut() {
            for side in [&mut e.left, &mut e.right].into_iter().flatten() {
                if *side == hi {
                    *side = lo;
                } else if *side > hi {
                    side.0 -= 1;
                }
            }
        }
        self.connect(lo);
    }

    /// Glues together the boundary chains of an area wherever one ends where
    /// another starts.
    fn connect(&mut self, area: AreaIdx) {
        let chains = std::mem::take(&mut self.areas[area].chains);
        if chains.len() < 2 {
            self.areas[area].chains = chains;
            return;
        }

        let mut slots: Vec<Option<Vec<OrientedEdge>>> = chains.into_iter().map(Some).collect();
        let mut by_tail: HashMap<VertexIdx, Vec<usize>> = HashMap::new();
        for (i, chain) in slots.iter().enumerate() {
            if let Some(&first) = chain.as_ref().and_then(|c| c.first()) {
                if let Some(t) = self.tail(first) {
                    by_tail.entry(t).or_default().push(i);
                }
            }
        }

        for i in 0..slots.len() {
            loop {
                let Some(chain) = &slots[i] else {
                    break;
                };
                if self.chain_is_loop(chain) {
                    break;
                }
                let Some(head) = chain.last().and_then(|&oe| self.head(oe)) else {
                    break;
                };
                let next = by_tail.get(&head).and_then(|js| {
                    js.iter().copied().find(|&j| {
                        j != i
                            && slots[j]
                                .as_ref()
                                .is_some_and(|c| !self.chain_is_loop(c))
                    })
                });
                let Some(j) = next else {
                    break;
                };
                let tail = slots[j].take().unwrap_or_default();
                if let Some(chain) = &mut slots[i] {
                    chain.extend(tail);
                }
            }
        }
        self.areas[area].chains = slots.into_iter().flatten().collect();
    }

    fn finish(mut self) -> Result<Topology, TopologyError> {
        let areas: Vec<AreaIdx> = self.areas.indices().collect();
        for a in areas {
            self.connect(a);
        }

        let mut edges = EdgeVec::with_capacity(self.edges.len());
        for (idx, (e, tile)) in self
            .edges
            .values()
            .zip(self.tiles.tiles.values())
            .enumerate()
        {
            let unresolved = TopologyError::UnresolvedEdge(EdgeIdx(idx));
            edges.push(Edge {
                start: e.start.ok_or(unresolved.clone())?,
                end: e.end.ok_or(unresolved.clone())?,
                left: e.left.ok_or(unresolved.clone())?,
                right: e.right.ok_or(unresolved)?,
                path: tile.path,
                curve: tile.curve,
                f: tile.f,
                t: tile.t,
                seg: tile.seg,
            });
        }

        for (idx, area) in self.areas.iter() {
            if area.chains.iter().any(|c| !self.chain_is_loop(c)) {
                return Err(TopologyError::OpenBoundary(idx));
            }
        }

        let mut ret = Topology {
            vertices: self.vertices,
            edges,
            areas: AreaVec::default(),
            closed: self.tiles.closed,
            tolerance: self.tiles.tolerance,
        };
        let areas = self
            .areas
            .into_vec()
            .into_iter()
            .enumerate()
            .map(|(i, a)| ret.classify_boundaries(AreaIdx(i), a.chains, a.winding))
            .collect();
        ret.areas = AreaVec::from_vec(areas);
        Ok(ret)
    }
}

impl Topology {
    // Picks out the outer boundary of an area: it's the one going
    // counter-clockwise around the most stuff.
    fn classify_boundaries(
        &self,
        idx: AreaIdx,
        mut loops: Vec<Vec<OrientedEdge>>,
        winding: Vec<i32>,
    ) -> Area {
        let mut outer = None;
        if idx != AreaIdx::UNBOUNDED && !loops.is_empty() {
            let signed: Vec<f64> = loops
                .iter()
                .map(|l| self.loop_path(l).area())
                .collect();
            let best = (0..loops.len())
                .max_by(|&i, &j| signed[i].total_cmp(&signed[j]))
                .unwrap_or(0);
            if signed[best] <= 0.0 {
                tracing::debug!(area = %idx, "bounded area with no counter-clockwise boundary");
            }
            outer = Some(loops.swap_remove(best));
        }
        Area {
            outer,
            inner: loops,
            winding,
        }
    }
}

/// What [`Topology::trim_whiskers`] removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Trimmed {
    /// The number of edges that had the same area on both sides.
    pub whiskers: usize,
    /// The number of vertices that were left holding the two halves of a
    /// single curve, and were joined over.
    pub vestigial: usize,
}

impl Topology {
    /// Removes the parts of the graph that don't separate anything.
    ///
    /// A whisker is an edge with the same area on both sides, like the parts
    /// of an open path that dangle into an area or connect two boundaries of
    /// the same area. Once the whiskers are gone, a vertex that's left with
    /// nothing but two consecutive pieces of one curve is vestigial: the
    /// pieces are joined into one edge, and the vertex goes away. So do
    /// vertices that are left without any edges.
    ///
    /// Vertices and edges are renumbered; areas and their winding numbers
    /// stay as they were, but their boundaries are walked again.
    pub fn trim_whiskers(&mut self) -> Trimmed {
        let mut trimmed = Trimmed::default();
        let mut alive: Vec<bool> = self.edges.values().map(|e| e.left != e.right).collect();
        trimmed.whiskers = alive.iter().filter(|a| !**a).count();
        if trimmed.whiskers == 0 {
            return trimmed;
        }
        for (_, v) in self.vertices.iter_mut() {
            v.rays.retain(|r| alive[r.edge.0]);
        }

        let vertices: Vec<VertexIdx> = self.vertices.indices().collect();
        for v in vertices {
            if let Some(gone) = self.join_at(v) {
                alive[gone.0] = false;
                trimmed.vestigial += 1;
            }
        }

        let mut edge_map = vec![None; self.edges.len()];
        let mut edges = EdgeVec::with_capacity(self.edges.len());
        for (i, e) in std::mem::take(&mut self.edges).into_vec().into_iter().enumerate() {
            if alive[i] {
                edge_map[i] = Some(edges.push(e));
            }
        }
        let mut vertex_map = vec![None; self.vertices.len()];
        let mut vertices = VertexVec::with_capacity(self.vertices.len());
        for (i, mut v) in std::mem::take(&mut self.vertices)
            .into_vec()
            .into_iter()
            .enumerate()
        {
            if v.rays.is_empty() {
                continue;
            }
            v.rays = v
                .rays
                .into_iter()
                .filter_map(|r| {
                    Some(OrientedEdge {
                        edge: edge_map[r.edge.0]?,
                        reversed: r.reversed,
                    })
                })
                .collect();
            vertex_map[i] = Some(vertices.push(v));
        }
        for (_, e) in edges.iter_mut() {
            // Every surviving edge is a ray of both of its vertices, so they
            // survived too.
            e.start = vertex_map[e.start.0].unwrap_or(e.start);
            e.end = vertex_map[e.end.0].unwrap_or(e.end);
        }
        self.edges = edges;
        self.vertices = vertices;

        let mut loops = vec![Vec::new(); self.areas.len()];
        for l in self.face_loops() {
            if let Some(&first) = l.first() {
                loops[self.left_of(first).0].push(l);
            }
        }
        let areas = std::mem::take(&mut self.areas)
            .into_vec()
            .into_iter()
            .zip(loops)
            .enumerate()
            .map(|(i, (a, l))| self.classify_boundaries(AreaIdx(i), l, a.winding))
            .collect();
        self.areas = AreaVec::from_vec(areas);

        tracing::debug!(
            whiskers = trimmed.whiskers,
            vestigial = trimmed.vestigial,
            "trimmed whiskers"
        );
        trimmed
    }

    // If the only two edges at `v` are consecutive pieces of the same curve,
    // extends the first one over the second and returns the second, which is
    // no longer referenced by any vertex.
    fn join_at(&mut self, v: VertexIdx) -> Option<EdgeIdx> {
        let [r0, r1] = self.vertices[v].rays[..] else {
            return None;
        };
        let (first, second) = if self.edges[r0.edge].end == v && self.edges[r1.edge].start == v {
            (r0.edge, r1.edge)
        } else if self.edges[r1.edge].end == v && self.edges[r0.edge].start == v {
            (r1.edge, r0.edge)
        } else {
            return None;
        };
        let (a, b) = (&self.edges[first], &self.edges[second]);
        if first == second
            || a.path != b.path
            || a.curve != b.curve
            || (a.t - b.f).abs() > 1e-12
            || a.start == b.end
            || (a.left, a.right) != (b.left, b.right)
        {
            return None;
        }
        // The joined edge has to stay monotonic.
        let (da, db) = (a.seg.end() - a.seg.start(), b.seg.end() - b.seg.start());
        if da.x * db.x < 0.0 || da.y * db.y < 0.0 {
            return None;
        }

        // Extend whichever piece covers more of the curve, since it's the
        // more accurate one.
        let seg = if a.t - a.f >= b.t - b.f {
            a.seg.subsegment(0.0..(b.t - a.f) / (a.t - a.f))
        } else {
            b.seg.subsegment((a.f - b.f) / (b.t - b.f)..1.0)
        };
        let (end, t) = (b.end, b.t);
        let e = &mut self.edges[first];
        e.seg = seg;
        e.end = end;
        e.t = t;
        for r in &mut self.vertices[end].rays {
            if *r == OrientedEdge::backward(second) {
                *r = OrientedEdge::backward(first);
            }
        }
        self.vertices[v].rays.clear();
        Some(second)
    }

    // Walks around every face of the graph, keeping the face on the left.
    fn face_loops(&self) -> Vec<Vec<OrientedEdge>> {
        let mut visited = vec![[false; 2]; self.edges.len()];
        let mut loops = Vec::new();
        for idx in self.edges.indices() {
            for start in [OrientedEdge::forward(idx), OrientedEdge::backward(idx)] {
                let mut cur = start;
                let mut l = Vec::new();
                while !visited[cur.edge.0][usize::from(cur.reversed)] {
                    visited[cur.edge.0][usize::from(cur.reversed)] = true;
                    l.push(cur);
                    // The next edge is the one just clockwise of where we
                    // came in.
                    let rays = &self.vertices[self.head(cur)].rays;
                    let Some(pos) = rays.iter().position(|&r| r == cur.flip()) else {
                        tracing::warn!(edge = %cur.edge, "edge missing from its vertex");
                        break;
                    };
                    cur = rays[(pos + rays.len() - 1) % rays.len()];
                }
                if !l.is_empty() {
                    loops.push(l);
                }
            }
        }
        loops
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Circle, Rect, Shape};

    use super::*;

    fn topology(paths: &[BezPath]) -> Topology {
        Topology::new(paths, 0.01).unwrap()
    }

    // Checks the things that should be true of every topology.
    fn check(top: &Topology) {
        for (idx, e) in top.edges().iter() {
            assert!(e.left.0 < top.areas().len());
            assert!(e.right.0 < top.areas().len());
            // Every edge appears once in each vertex it touches.
            for (v, reversed) in [(e.start, false), (e.end, true)] {
                let ray = OrientedEdge { edge: idx, reversed };
                assert_eq!(
                    top.vertices()[v].rays.iter().filter(|&&r| r == ray).count(),
                    1
                );
            }
        }
        for (idx, area) in top.areas().iter() {
            for bdy in area.boundaries() {
                assert!(!bdy.is_empty());
                for (i, &oe) in bdy.iter().enumerate() {
                    let next = bdy[(i + 1) % bdy.len()];
                    assert_eq!(top.head(oe), top.tail(next));
                    assert_eq!(top.left_of(oe), idx);
                }
            }
            assert_eq!(area.outer.is_none(), idx == AreaIdx::UNBOUNDED);
        }
    }

    #[test]
    fn rectangle() {
        let top = topology(&[Rect::new(0.0, 0.0, 5.0, 8.0).to_path(0.0)]);
        check(&top);
        for e in top.edges().values() {
            assert_ne!(e.left, e.right);
        }
        assert_eq!(top.vertices().len(), 4);
        assert_eq!(top.edges().len(), 4);
        assert_eq!(top.areas().len(), 2);
        assert_eq!(top.winding(AreaIdx(0)), &[0]);
        assert_eq!(top.winding(AreaIdx(1)), &[1]);
        assert_eq!(top.areas()[AreaIdx(1)].outer.as_ref().unwrap().len(), 4);
        assert!((top.area_path(AreaIdx(1)).area() - 40.0).abs() < 1.0);
    }

    #[test]
    fn clockwise_rectangle() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((0.0, 8.0));
        path.line_to((5.0, 8.0));
        path.line_to((5.0, 0.0));
        path.close_path();
        let top = topology(&[path]);
        check(&top);
        assert_eq!(top.areas().len(), 2);
        assert_eq!(top.winding(AreaIdx(1)), &[-1]);
    }

    #[test]
    fn nested_squares() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.0);
        let inner = Rect::new(2.0, 2.0, 8.0, 8.0).to_path(0.0);
        let top = topology(&[outer, inner]);
        check(&top);
        assert_eq!(top.vertices().len(), 8);
        assert_eq!(top.areas().len(), 3);

        let mut windings: Vec<Vec<i32>> =
            top.areas().values().map(|a| a.winding.clone()).collect();
        windings.sort();
        insta::assert_debug_snapshot!(windings, @r"
        [
            [
                0,
                0,
            ],
            [
                1,
                0,
            ],
            [
                1,
                1,
            ],
        ]
        ");

        // The annulus has a hole.
        let annulus = top.areas_where(|w| w == [1, 0]).next().unwrap();
        assert_eq!(top.areas()[annulus].inner.len(), 1);
        assert!((top.area_path(annulus).area() - 64.0).abs() < 1.0);
    }

    #[test]
    fn overlapping_squares() {
        let a = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let b = Rect::new(2.0, 2.0, 6.0, 6.0).to_path(0.0);
        let top = topology(&[a, b]);
        check(&top);
        // Four corners of each square, plus two crossings.
        assert_eq!(top.vertices().len(), 10);
        assert_eq!(top.edges().len(), 12);
        let mut windings: Vec<Vec<i32>> =
            top.areas().values().map(|a| a.winding.clone()).collect();
        windings.sort();
        assert_eq!(
            windings,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
    }

    #[test]
    fn disjoint_squares() {
        let a = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let b = Rect::new(10.0, 1.0, 12.0, 2.0).to_path(0.0);
        let top = topology(&[a, b]);
        check(&top);
        assert_eq!(top.areas().len(), 3);
        // Both squares are holes in the unbounded area.
        assert_eq!(top.areas()[AreaIdx::UNBOUNDED].inner.len(), 2);
    }

    #[test]
    fn touching_squares() {
        // They share a corner, so the unbounded area gets pinched there.
        let a = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let b = Rect::new(4.0, 4.0, 8.0, 8.0).to_path(0.0);
        let top = topology(&[a, b]);
        check(&top);
        assert_eq!(top.vertices().len(), 7);
        assert_eq!(top.areas().len(), 3);
    }

    #[test]
    fn circles() {
        let a = Circle::new((0.0, 0.0), 3.0).to_path(1e-3);
        let b = Circle::new((2.0, 0.0), 3.0).to_path(1e-3);
        let top = Topology::new([&a, &b], 1e-6).unwrap();
        check(&top);
        let mut windings: Vec<Vec<i32>> =
            top.areas().values().map(|a| a.winding.clone()).collect();
        windings.sort();
        assert_eq!(
            windings,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
    }

    #[test]
    fn winding_matches_kurbo() {
        let a = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let b = Circle::new((3.0, 3.0), 2.0).to_path(1e-3);
        let top = Topology::new([&a, &b], 1e-6).unwrap();
        check(&top);
        for (idx, area) in top.areas().iter() {
            if idx == AreaIdx::UNBOUNDED {
                continue;
            }
            // Find a point inside the area, away from its boundary, by
            // looking at a grid.
            let path = top.area_path(idx);
            let bbox = path.bounding_box();
            let mut found = false;
            'grid: for i in 1..40 {
                for j in 1..40 {
                    let p = Point::new(
                        bbox.x0 + bbox.width() * i as f64 / 40.0,
                        bbox.y0 + bbox.height() * j as f64 / 40.0,
                    );
                    if path.winding(p) != 0 {
                        assert_eq!(a.winding(p), area.winding[0]);
                        assert_eq!(b.winding(p), area.winding[1]);
                        found = true;
                        break 'grid;
                    }
                }
            }
            assert!(found, "no sample point in {idx:?}");
        }
    }

    #[test]
    fn open_paths_dont_wind() {
        let square = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let mut slash = BezPath::new();
        slash.move_to((-1.0, 2.0));
        slash.line_to((5.0, 2.5));
        let top = topology(&[square, slash]);
        check(&top);
        assert!(top.areas().values().all(|a| a.winding[1] == 0));
        assert!(!top.is_closed(1));
        // The slash cuts the square in two, but sticks out into the unbounded
        // area on both sides.
        assert_eq!(top.areas().len(), 3);
        let dangling = top
            .edges()
            .values()
            .filter(|e| e.left == e.right)
            .count();
        assert_eq!(dangling, 2);
    }

    #[test]
    fn trimming_open_paths() {
        let square = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let mut slash = BezPath::new();
        slash.move_to((-1.0, 2.0));
        slash.line_to((5.0, 2.5));
        let mut top = topology(&[square, slash]);
        assert_eq!(top.edges().len(), 9);
        assert_eq!(
            top.trim_whiskers(),
            Trimmed {
                whiskers: 2,
                vestigial: 0
            }
        );
        check(&top);
        assert!(top.edges().values().all(|e| e.left != e.right));
        assert_eq!(top.edges().len(), 7);
        // The ends of the slash are gone, the crossings stay.
        assert_eq!(top.vertices().len(), 6);
        assert_eq!(top.areas().len(), 3);
        let halves: Vec<f64> = top
            .areas()
            .indices()
            .filter(|&a| a != AreaIdx::UNBOUNDED)
            .map(|a| top.area_path(a).area())
            .collect();
        assert!((halves.iter().sum::<f64>() - 16.0).abs() < 0.1);
    }

    #[test]
    fn trimming_joins_vestigial_vertices() {
        // The stub pokes into the square and stops, so once it's trimmed the
        // vertex where it crossed the left side doesn't separate anything.
        let square = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.0);
        let mut stub = BezPath::new();
        stub.move_to((-1.0, 2.0));
        stub.line_to((2.0, 2.0));
        let mut top = topology(&[square, stub]);
        assert_eq!(top.vertices().len(), 7);
        assert_eq!(
            top.trim_whiskers(),
            Trimmed {
                whiskers: 2,
                vestigial: 1
            }
        );
        check(&top);
        assert_eq!(top.vertices().len(), 4);
        assert_eq!(top.edges().len(), 4);
        assert_eq!(top.areas().len(), 2);
        let left = top
            .edges()
            .values()
            .find(|e| e.seg.start().x.abs() < 1e-9 && e.seg.end().x.abs() < 1e-9)
            .unwrap();
        assert_eq!((left.f, left.t), (0.0, 1.0));
        assert!(left.seg.start().distance(Point::new(0.0, 4.0)) < 1e-9);
        assert!(left.seg.end().distance(Point::new(0.0, 0.0)) < 1e-9);
        assert!((top.area_path(AreaIdx(1)).area() - 16.0).abs() < 0.1);

        // Nothing left to trim.
        assert_eq!(top.trim_whiskers(), Trimmed::default());
    }
}
