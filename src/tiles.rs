//! Tiles, and the decomposition of input paths into tiles.
//!
//! A tile is a piece of one input curve that is monotonic in both coordinates
//! and that doesn't cross any other tile, except possibly at its endpoints.
//! Each end of a tile sits in a box; initially that's just a small square
//! around the endpoint, but after clustering (see [`crate::cluster`]) it's the
//! box of a fat vertex shared with every other tile ending nearby.

use kurbo::{BezPath, CubicBez, ParamCurve, PathEl, PathSeg, Point, Rect};

use crate::{
    curve::{self, intersect_monotonic, monotonic_bbox, monotonic_cuts},
    geom::{self, fat_point, sweep_cmp},
    num::CheapOrderedFloat,
};

/// An index into the tiles of a [`Tiles`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct TileIdx(pub usize);

/// A vector indexed by tiles.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct TileVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(TileVec, TileIdx, "t");

/// An index into the endpoint boxes of a [`Tiles`].
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct BoxIdx(pub usize);

/// A vector indexed by endpoint boxes.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct BoxVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(BoxVec, BoxIdx, "b");

/// How far the sweep has progressed along a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TileState {
    /// The sweep hasn't reached either end yet.
    Unreached,
    /// The sweep has passed the first end, but not the second.
    Open,
    /// The sweep has passed both ends.
    Closed,
}

/// A monotonic piece of one input curve.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Tile {
    /// The index of the input path this tile came from.
    pub path: usize,
    /// The index of the curve (segment) within its path.
    pub curve: usize,
    /// The parameter on the source curve at which this tile starts.
    pub f: f64,
    /// The parameter on the source curve at which this tile ends.
    pub t: f64,
    /// The geometry of this tile, from parameter `f` to parameter `t`.
    pub seg: PathSeg,
    /// The box containing the point at parameter `f`.
    pub fbox: BoxIdx,
    /// The box containing the point at parameter `t`.
    pub tbox: BoxIdx,
    /// True if the parametric direction of this tile runs against the sweep,
    /// meaning that the sweep reaches `tbox` before `fbox`.
    pub reversed: bool,
    /// Where the sweep is, relative to this tile.
    pub state: TileState,
}

impl Tile {
    /// This tile's geometry, as a cubic with the same parametrization as
    /// `seg`.
    pub fn cubic(&self) -> CubicBez {
        curve::cubic(&self.seg)
    }

    /// The box that the sweep reaches first.
    pub fn first_box(&self) -> BoxIdx {
        if self.reversed {
            self.tbox
        } else {
            self.fbox
        }
    }

    /// The box that the sweep reaches last.
    pub fn last_box(&self) -> BoxIdx {
        if self.reversed {
            self.fbox
        } else {
            self.tbox
        }
    }

    /// The endpoint that the sweep reaches first.
    pub fn first_point(&self) -> Point {
        if self.reversed {
            self.seg.end()
        } else {
            self.seg.start()
        }
    }

    /// The endpoint that the sweep reaches last.
    pub fn last_point(&self) -> Point {
        if self.reversed {
            self.seg.start()
        } else {
            self.seg.end()
        }
    }

    /// Splits this tile at the parameter `s` of its own geometry (so `s` is in
    /// `[0, 1]`, not in `[f, t]`).
    ///
    /// The two halves share the box `mid`.
    pub(crate) fn split(&self, s: f64, mid: BoxIdx) -> (Tile, Tile) {
        let param = self.f + s * (self.t - self.f);
        let first = Tile {
            t: param,
            seg: self.seg.subsegment(0.0..s),
            tbox: mid,
            ..self.clone()
        };
        let second = Tile {
            f: param,
            seg: self.seg.subsegment(s..1.0),
            fbox: mid,
            ..self.clone()
        };
        (first, second)
    }
}

/// A collection of tiles, together with the boxes at their ends.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Tiles {
    /// All the tiles.
    pub tiles: TileVec<Tile>,
    /// All the boxes that tiles can end in.
    ///
    /// Before clustering, these can overlap and there are two of them for each
    /// tile. After clustering, they're disjoint and sorted in sweep order.
    pub boxes: BoxVec<Rect>,
    /// For each input path, whether all of its subpaths are closed.
    pub closed: Vec<bool>,
    /// The half-width of the box around a single point.
    pub tolerance: f64,
}

impl Tiles {
    /// Adds a tile, with fresh boxes around both of its ends.
    pub(crate) fn push_with_boxes(&mut self, path: usize, curve: usize, f: f64, t: f64, seg: PathSeg) {
        let fbox = self.boxes.push(fat_point(seg.start(), self.tolerance));
        let tbox = self.boxes.push(fat_point(seg.end(), self.tolerance));
        self.tiles.push(Tile {
            path,
            curve,
            f,
            t,
            seg,
            fbox,
            tbox,
            reversed: sweep_cmp(seg.start(), seg.end()).is_gt(),
            state: TileState::Unreached,
        });
    }

    /// The number of input paths.
    pub fn num_paths(&self) -> usize {
        self.closed.len()
    }
}

// Cutting at intersections creates new pieces, and those can still cross
// pieces that they didn't cross before (the search is approximate), so we
// keep going for a few rounds.
const MAX_CUT_ROUNDS: usize = 8;

// A monotonic piece of a curve, before it's been turned into a tile.
struct Piece {
    path: usize,
    curve: usize,
    f: f64,
    t: f64,
    seg: PathSeg,
    // Whether this piece was created in the last round of cutting. Pairs of
    // pieces that aren't fresh have already been intersected.
    fresh: bool,
}

impl Piece {
    fn far_from_ends(&self, s: f64, tol: f64) -> bool {
        let p = self.seg.eval(s);
        p.distance(self.seg.start()) > tol && p.distance(self.seg.end()) > tol
    }

    // Cuts this piece at some parameters of its own geometry.
    fn cut(self, mut cuts: Vec<f64>, out: &mut Vec<Piece>) {
        if cuts.is_empty() {
            out.push(Piece {
                fresh: false,
                ..self
            });
            return;
        }
        cuts.push(0.0);
        cuts.push(1.0);
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|a, b| *a - *b <= 1e-12);
        for w in cuts.windows(2) {
            out.push(Piece {
                path: self.path,
                curve: self.curve,
                f: self.f + w[0] * (self.t - self.f),
                t: self.f + w[1] * (self.t - self.f),
                seg: self.seg.subsegment(w[0]..w[1]),
                fresh: true,
            });
        }
    }
}

/// Cuts every curve of every path into tiles.
///
/// Curves are first cut wherever they have a horizontal or vertical tangent,
/// and then the pieces are cut wherever they intersect one another, until no
/// two pieces cross.
pub fn decompose<'a>(paths: impl IntoIterator<Item = &'a BezPath>, tolerance: f64) -> Tiles {
    let mut pieces = Vec::new();
    let mut closed = Vec::new();
    for (path, bez) in paths.into_iter().enumerate() {
        closed.push(is_closed(bez));
        for (curve, seg) in bez.segments().enumerate() {
            let cuts = monotonic_cuts(&seg);
            for w in cuts.windows(2) {
                pieces.push(Piece {
                    path,
                    curve,
                    f: w[0],
                    t: w[1],
                    seg: seg.subsegment(w[0]..w[1]),
                    fresh: true,
                });
            }
        }
    }

    let mut rounds = 0;
    loop {
        let cuts = intersection_cuts(&pieces, tolerance);
        if cuts.iter().all(Vec::is_empty) {
            break;
        }
        let mut next = Vec::with_capacity(pieces.len());
        for (piece, cuts) in pieces.into_iter().zip(cuts) {
            piece.cut(cuts, &mut next);
        }
        pieces = next;
        rounds += 1;
        if rounds >= MAX_CUT_ROUNDS {
            tracing::debug!(rounds, "intersections didn't settle");
            break;
        }
    }

    let mut ret = Tiles {
        tiles: TileVec::with_capacity(pieces.len()),
        boxes: BoxVec::with_capacity(2 * pieces.len()),
        closed,
        tolerance,
    };
    for piece in pieces {
        ret.push_with_boxes(piece.path, piece.curve, piece.f, piece.t, piece.seg);
    }
    tracing::debug!(
        tiles = ret.tiles.len(),
        paths = ret.num_paths(),
        rounds,
        "decomposed paths into tiles"
    );
    ret
}

// For every piece, the parameters (in the piece's own parametrization) at
// which it meets some other piece away from its ends.
fn intersection_cuts(pieces: &[Piece], tol: f64) -> Vec<Vec<f64>> {
    let bboxes: Vec<Rect> = pieces
        .iter()
        .map(|p| monotonic_bbox(&p.seg).inflate(tol, tol))
        .collect();
    let mut order: Vec<usize> = (0..pieces.len()).collect();
    order.sort_by_key(|&i| CheapOrderedFloat::from(bboxes[i].x0));

    let mut cuts = vec![Vec::new(); pieces.len()];
    for (k, &i) in order.iter().enumerate() {
        for &j in &order[(k + 1)..] {
            if bboxes[j].x0 > bboxes[i].x1 {
                break;
            }
            if !(pieces[i].fresh || pieces[j].fresh) || !geom::overlaps(&bboxes[i], &bboxes[j]) {
                continue;
            }
            for (s, t) in intersect_monotonic(&pieces[i].seg, &pieces[j].seg, tol) {
                // A cut within `tol` of an endpoint would only produce a tile
                // that gets swallowed by the endpoint's vertex.
                if pieces[i].far_from_ends(s, tol) {
                    cuts[i].push(s);
                }
                if pieces[j].far_from_ends(t, tol) {
                    cuts[j].push(t);
                }
            }
        }
    }
    let total: usize = cuts.iter().map(Vec::len).sum();
    tracing::trace!(cuts = total, "found intersections");
    cuts
}

/// Does every subpath of this path end where it started?
pub fn is_closed(path: &BezPath) -> bool {
    let mut subpath_start: Option<Point> = None;
    let mut last: Option<Point> = None;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                if last != subpath_start {
                    return false;
                }
                subpath_start = Some(p);
                last = Some(p);
            }
            PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                last = Some(p);
            }
            PathEl::ClosePath => {
                last = subpath_start;
            }
        }
    }
    last == subpath_start
}
