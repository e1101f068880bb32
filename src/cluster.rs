//! Clustering tile ends into fat vertices.
//!
//! After decomposition, every tile end has its own little box. Boxes that
//! overlap (even transitively) are fused into a single vertex box, and then
//! every tile is re-pointed to the vertex boxes containing its ends. Tiles with
//! both ends in the same vertex are swallowed by it and disappear.
//!
//! A tile can also pass straight through some other vertex's box without ending
//! there. We split such tiles inside the box, so that afterwards every tile
//! stays clear of every vertex box except the two at its ends.

use kurbo::Rect;

use crate::{
    curve::{box_interval, monotonic_bbox},
    geom::{self, box_key},
    num::CheapOrderedFloat,
    tiles::{BoxIdx, BoxVec, Tile, TileVec, Tiles},
    TopologyError,
};

// Splitting can in principle enlarge boxes, which can cause more splitting.
// In practice one extra round settles everything.
const MAX_ROUNDS: usize = 8;

/// Fuses tile end boxes into disjoint vertex boxes, and re-points the tiles.
///
/// On return, the boxes of `tiles` are pairwise disjoint and sorted in sweep
/// order, no tile has both ends in the same box, no tile passes through a box
/// other than its end boxes, and every tile's `reversed` flag is accurate.
pub fn cluster(mut tiles: Tiles) -> Result<Tiles, TopologyError> {
    let mut round = 0;
    loop {
        fuse_and_repoint(&mut tiles)?;
        round += 1;
        if round >= MAX_ROUNDS || split_through_boxes(&mut tiles) == 0 {
            break;
        }
    }

    for (_, tile) in tiles.tiles.iter_mut() {
        // The boxes are in sweep order, and enlarging them may have swapped
        // which end comes first.
        tile.reversed = tile.fbox > tile.tbox;
    }
    tracing::debug!(
        tiles = tiles.tiles.len(),
        vertices = tiles.boxes.len(),
        rounds = round,
        "clustered tile ends"
    );
    Ok(tiles)
}

fn fuse_and_repoint(tiles: &mut Tiles) -> Result<(), TopologyError> {
    let mut fused = fuse_boxes(tiles.boxes.values().copied().collect());
    fused.sort_by_key(box_key);

    let old_boxes = std::mem::replace(&mut tiles.boxes, BoxVec::from_vec(fused));
    for (idx, tile) in tiles.tiles.iter_mut() {
        tile.fbox = enclosing_box(&tiles.boxes, &old_boxes[tile.fbox])
            .ok_or(TopologyError::MissingVertex { tile: idx })?;
        tile.tbox = enclosing_box(&tiles.boxes, &old_boxes[tile.tbox])
            .ok_or(TopologyError::MissingVertex { tile: idx })?;
    }

    let before = tiles.tiles.len();
    let kept: Vec<Tile> = std::mem::take(&mut tiles.tiles)
        .into_vec()
        .into_iter()
        .filter(|t| t.fbox != t.tbox)
        .collect();
    tiles.tiles = TileVec::from_vec(kept);
    if tiles.tiles.len() < before {
        tracing::trace!(
            dropped = before - tiles.tiles.len(),
            "dropped tiles swallowed by a vertex"
        );
    }
    Ok(())
}

/// Fuses overlapping boxes until no two of them overlap.
///
/// Each pass sweeps over the boxes from left to right, fusing each one into
/// the first earlier box it overlaps. Fusing makes boxes bigger, and a bigger
/// box can overlap something that neither of its parts did, so we keep going
/// until a pass doesn't fuse anything.
fn fuse_boxes(mut boxes: Vec<Rect>) -> Vec<Rect> {
    loop {
        let before = boxes.len();
        boxes.sort_by_key(|b| CheapOrderedFloat::from(b.x0));
        let mut out: Vec<Rect> = Vec::with_capacity(boxes.len());
        // The boxes in `out` that reach far enough right to meet the next box.
        let mut active: Vec<usize> = Vec::new();
        for b in boxes {
            active.retain(|&i| out[i].x1 >= b.x0);
            match active.iter().find(|&&i| geom::overlaps(&out[i], &b)) {
                Some(&i) => out[i] = out[i].union(b),
                None => {
                    active.push(out.len());
                    out.push(b);
                }
            }
        }
        boxes = out;
        if boxes.len() == before {
            return boxes;
        }
    }
}

/// Finds the vertex box containing `r`.
///
/// Any box containing `r` has a sweep key at most that of `r`, so we find the
/// last box whose key is small enough and search backwards from there.
fn enclosing_box(boxes: &BoxVec<Rect>, r: &Rect) -> Option<BoxIdx> {
    let key = box_key(r);
    let upper = boxes
        .values()
        .as_slice()
        .partition_point(|b| box_key(b) <= key);
    (0..upper)
        .rev()
        .map(BoxIdx)
        .find(|&idx| geom::contains_rect(&boxes[idx], r))
}

/// Splits every tile that passes through a vertex box other than its own end
/// boxes. Returns the number of splits.
fn split_through_boxes(tiles: &mut Tiles) -> usize {
    let max_width = tiles
        .boxes
        .values()
        .map(|b| b.width())
        .fold(0.0, f64::max);
    let boxes = tiles.boxes.values().as_slice();

    let mut splits = 0;
    let old = std::mem::take(&mut tiles.tiles);
    let mut out = TileVec::with_capacity(old.len());
    for tile in old.into_vec() {
        let bbox = monotonic_bbox(&tile.seg);
        let lo = boxes.partition_point(|b| b.x0 < bbox.x0 - max_width);
        let hi = boxes.partition_point(|b| b.x0 <= bbox.x1);
        let cubic = tile.cubic();

        let mut cuts: Vec<(f64, BoxIdx)> = (lo..hi)
            .map(BoxIdx)
            .filter(|&idx| idx != tile.fbox && idx != tile.tbox)
            .filter(|&idx| geom::overlaps(&tiles.boxes[idx], &bbox))
            .filter_map(|idx| {
                let (s0, s1) = box_interval(cubic, &tiles.boxes[idx])?;
                Some((0.5 * (s0 + s1), idx))
            })
            .filter(|&(s, _)| s > 0.0 && s < 1.0)
            .collect();

        if cuts.is_empty() {
            out.push(tile);
            continue;
        }
        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));
        splits += cuts.len();

        let mut rest = tile;
        let mut consumed = 0.0;
        for (s, idx) in cuts {
            // `s` is a parameter on the original tile; rescale it to the
            // part that's left.
            let local = (s - consumed) / (1.0 - consumed);
            let (first, second) = rest.split(local, idx);
            out.push(first);
            rest = second;
            consumed = s;
        }
        out.push(rest);
    }
    tiles.tiles = out;
    if splits > 0 {
        tracing::trace!(splits, "split tiles passing through vertices");
    }
    splits
}
