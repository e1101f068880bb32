//! The sweep over fat vertices.
//!
//! The main entry point is [`Sweeper`], which visits the vertex boxes in sweep
//! order and produces one [`Event`] for every tile end, ordered
//! counter-clockwise around each vertex. While it goes, it maintains the
//! "context": the tiles crossing the sweep line, from bottom to top. The
//! context is only used to figure out where a vertex sits among the open
//! tiles, so that the consumer of the events can tell which area the vertex
//! is in.

mod rays;

use kurbo::{ParamCurve, Point};

use crate::{
    curve::solve_t_for_coord,
    geom::{self, Axis},
    tiles::{BoxIdx, BoxVec, Tile, TileIdx, TileState, Tiles},
    TopologyError,
};

pub use rays::Side;
use rays::{exit_point, rotate_rays, separating_rect, sort_rays, Ray};

/// Whether an event starts or finishes a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum EventKind {
    /// The sweep reached the tile's first vertex.
    Opening,
    /// The sweep reached the tile's last vertex.
    Closing,
}

/// A tile end at a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Event {
    /// The tile.
    pub tile: TileIdx,
    /// Is this the tile's first or last vertex?
    pub kind: EventKind,
    /// True if the tile's parametrization points away from the vertex, so
    /// that the vertex is at the tile's start.
    pub centrifugal: bool,
    /// The vertex box.
    pub vertex: BoxIdx,
    /// For an opening tile, its position in the context.
    pub insert_at: usize,
    /// True if there are more events coming for this vertex.
    pub to_be_continued: bool,
    /// For the first event at a vertex where no tiles close, the open tile
    /// just above the vertex (or `None` if there's nothing above).
    pub above: Option<TileIdx>,
}

impl Event {
    /// Is this an opening event?
    pub fn is_opening(&self) -> bool {
        self.kind == EventKind::Opening
    }
}

#[derive(Debug)]
enum State {
    /// Between vertices.
    Idle,
    /// We've found the next vertex, but haven't ordered its rays yet.
    CollectingVertex(BoxIdx),
    /// We're handing out the rays of a vertex, one at a time.
    EmittingRays {
        vertex: BoxIdx,
        rays: Vec<Ray>,
        next: usize,
        insert_at: usize,
    },
}

/// Encapsulates the state of the sweep, and hands out events one at a time.
#[derive(Debug)]
pub struct Sweeper {
    tiles: Tiles,
    // For each vertex box, all the tiles with an end in it.
    incident: BoxVec<Vec<TileIdx>>,
    next_box: usize,
    context: Vec<TileIdx>,
    state: State,
    // The last event we handed out. We update the context for it just before
    // computing the next one.
    pending: Option<Event>,
}

impl Sweeper {
    /// Creates a sweeper for some clustered tiles.
    ///
    /// The tiles should have come out of [`cluster`](crate::cluster::cluster),
    /// so that their boxes are disjoint and sorted.
    pub fn new(mut tiles: Tiles) -> Self {
        let mut incident = BoxVec::from_vec(vec![Vec::new(); tiles.boxes.len()]);
        for (idx, tile) in tiles.tiles.iter_mut() {
            tile.state = TileState::Unreached;
            incident[tile.fbox].push(idx);
            incident[tile.tbox].push(idx);
        }
        Sweeper {
            tiles,
            incident,
            next_box: 0,
            context: Vec::new(),
            state: State::Idle,
            pending: None,
        }
    }

    /// The tiles we're sweeping over.
    pub fn tiles(&self) -> &Tiles {
        &self.tiles
    }

    /// Gives back the tiles.
    pub fn into_tiles(self) -> Tiles {
        self.tiles
    }

    /// The tiles crossing the sweep line, from bottom to top.
    ///
    /// Tiles that closed at the current vertex stay in here until the sweep
    /// moves on to the next vertex.
    pub fn context(&self) -> &[TileIdx] {
        &self.context
    }

    /// Moves the sweep forward by one tile end.
    ///
    /// Returns `None` when every tile has been opened and closed.
    pub fn next_event(&mut self) -> Result<Option<Event>, TopologyError> {
        if let Some(ev) = self.pending.take() {
            self.apply(&ev);
        }

        loop {
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Idle => {
                    let Some(vertex) = self.next_vertex() else {
                        self.check_finished();
                        return Ok(None);
                    };
                    self.state = State::CollectingVertex(vertex);
                }
                State::CollectingVertex(vertex) => {
                    self.context
                        .retain(|&t| self.tiles.tiles[t].state == TileState::Open);
                    self.check_invariants();

                    let rays = self.collect_rays(vertex)?;
                    let insert_at = self.insertion_point(vertex, &rays)?;
                    tracing::trace!(%vertex, rays = rays.len(), insert_at, "visiting vertex");
                    self.state = State::EmittingRays {
                        vertex,
                        rays,
                        next: 0,
                        insert_at,
                    };
                }
                State::EmittingRays {
                    vertex,
                    rays,
                    next,
                    insert_at,
                } => {
                    let Some(&ray) = rays.get(next) else {
                        continue;
                    };
                    let above = if next == 0 && ray.opening {
                        self.context.get(insert_at).copied()
                    } else {
                        None
                    };
                    let to_be_continued = next + 1 < rays.len();
                    let ev = Event {
                        tile: ray.tile,
                        kind: if ray.opening {
                            EventKind::Opening
                        } else {
                            EventKind::Closing
                        },
                        centrifugal: ray.centrifugal,
                        vertex,
                        insert_at,
                        to_be_continued,
                        above,
                    };
                    if to_be_continued {
                        self.state = State::EmittingRays {
                            vertex,
                            rays,
                            next: next + 1,
                            insert_at: insert_at + usize::from(ray.opening),
                        };
                    }
                    self.pending = Some(ev);
                    return Ok(Some(ev));
                }
            }
        }
    }

    fn apply(&mut self, ev: &Event) {
        let tile = &mut self.tiles.tiles[ev.tile];
        match ev.kind {
            EventKind::Opening => {
                tile.state = TileState::Open;
                self.context.insert(ev.insert_at, ev.tile);
            }
            EventKind::Closing => {
                tile.state = TileState::Closed;
            }
        }
    }

    fn next_vertex(&mut self) -> Option<BoxIdx> {
        while self.next_box < self.incident.len() {
            let b = BoxIdx(self.next_box);
            self.next_box += 1;
            if !self.incident[b].is_empty() {
                return Some(b);
            }
        }
        None
    }

    fn collect_rays(&self, vertex: BoxIdx) -> Result<Vec<Ray>, TopologyError> {
        let incident = &self.incident[vertex];
        let far_boxes = incident.iter().map(|&t| {
            let tile = &self.tiles.tiles[t];
            if tile.fbox == vertex {
                tile.tbox
            } else {
                tile.fbox
            }
        });
        let sep = separating_rect(vertex, far_boxes, &self.tiles.boxes)?;

        let mut rays: Vec<Ray> = incident
            .iter()
            .map(|&idx| {
                let tile = &self.tiles.tiles[idx];
                let centrifugal = tile.fbox == vertex;
                let c = tile.cubic();
                let outward = if centrifugal {
                    c
                } else {
                    kurbo::CubicBez::new(c.p3, c.p2, c.p1, c.p0)
                };
                let (side, place) = exit_point(outward, &sep);
                Ray {
                    tile: idx,
                    centrifugal,
                    opening: tile.state == TileState::Unreached,
                    side,
                    place,
                }
            })
            .collect();
        sort_rays(&mut rays, self.tiles.tolerance * 1e-6);
        rotate_rays(&mut rays);
        Ok(rays)
    }

    // Where the vertex's opening tiles go in the context.
    fn insertion_point(&self, vertex: BoxIdx, rays: &[Ray]) -> Result<usize, TopologyError> {
        match rays.first() {
            Some(first) if !first.opening => self
                .context
                .iter()
                .position(|&t| t == first.tile)
                .map(|pos| pos + 1)
                .ok_or(TopologyError::UnmatchedRay { tile: first.tile }),
            _ => {
                let c = self.tiles.boxes[vertex].center();
                Ok(self
                    .context
                    .partition_point(|&t| tile_below(&self.tiles.tiles[t], c)))
            }
        }
    }

    #[cfg(feature = "slow-asserts")]
    fn check_invariants(&self) {
        for &t in &self.context {
            assert_eq!(
                self.tiles.tiles[t].state,
                TileState::Open,
                "{t:?} is in the context, but isn't open"
            );
        }
        let open = self
            .tiles
            .tiles
            .values()
            .filter(|t| t.state == TileState::Open)
            .count();
        assert_eq!(open, self.context.len());
        assert_disjoint(&self.tiles.boxes);
    }

    #[cfg(not(feature = "slow-asserts"))]
    fn check_invariants(&self) {}

    #[cfg(feature = "slow-asserts")]
    fn check_finished(&self) {
        for (idx, tile) in self.tiles.tiles.iter() {
            assert_eq!(tile.state, TileState::Closed, "{idx:?} never closed");
        }
    }

    #[cfg(not(feature = "slow-asserts"))]
    fn check_finished(&self) {}
}

#[cfg(feature = "slow-asserts")]
fn assert_disjoint(boxes: &BoxVec<kurbo::Rect>) {
    for (i, a) in boxes.iter() {
        for (j, b) in boxes.iter() {
            if i < j {
                assert!(!geom::overlaps(a, b), "{i:?} and {j:?} overlap");
            }
        }
    }
}

/// Is the open tile below the point `c`?
///
/// If the tile spans `c` horizontally, that's just a comparison of heights.
/// Otherwise, the tile is entirely to one side of `c` and we look at which
/// side of its chord `c` is on; the chord points forward in the sweep, so a
/// tile on the left that ends above `c` is above it, and a tile on the right
/// that starts below `c` is below it.
fn tile_below(tile: &Tile, c: Point) -> bool {
    let p = tile.first_point();
    let q = tile.last_point();
    let (x0, x1) = (p.x.min(q.x), p.x.max(q.x));
    if x0 < c.x && c.x < x1 {
        let cubic = tile.cubic();
        if let Some(t) = solve_t_for_coord(cubic, Axis::X, c.x) {
            return cubic.eval(t).y < c.y;
        }
    }
    geom::orientation(p, q, c) > 0.0
}

/// Runs a whole sweep, collecting all the events.
pub fn sweep(tiles: Tiles) -> Result<Vec<Event>, TopologyError> {
    let mut sweeper = Sweeper::new(tiles);
    let mut events = Vec::new();
    while let Some(ev) = sweeper.next_event()? {
        events.push(ev);
    }
    Ok(events)
}
