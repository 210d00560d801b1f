//! Building rings from contours and pruning degenerate vertices.

use num_traits::Float;

use crate::arena::{Arena, NodeIndex};
use crate::geom::{area, signed_area};

/// Links `data[start..end]` into a circular ring in the requested orientation.
///
/// `ccw == true` yields a counter-clockwise ring (y up), used for outer rings; holes are
/// built clockwise. Consecutive duplicate points are dropped, including a closing point
/// that repeats the first one.
pub(crate) fn build_ring(
    arena: &mut Arena,
    data: &[[f64; 2]],
    start: usize,
    end: usize,
    ccw: bool,
) -> Option<NodeIndex> {
    if start >= end {
        return None;
    }
    let contour = &data[start..end];
    let mut last_i: Option<NodeIndex> = None;

    let mut append = |offset: usize| {
        let [x, y] = contour[offset];
        if let Some(li) = last_i {
            let last = &arena[li];
            if last.x == x && last.y == y {
                return;
            }
        }
        last_i = Some(arena.insert((start + offset) as u32, x, y, last_i));
    };
    if ccw == (signed_area(contour) > 0.0) {
        (0..contour.len()).for_each(&mut append);
    } else {
        (0..contour.len()).rev().for_each(&mut append);
    }

    let last_i = last_i?;
    let next_i = arena[last_i].next_i;
    if next_i != last_i && arena[last_i].same_position(&arena[next_i]) {
        let (_, next_i) = arena.remove(last_i);
        return Some(next_i);
    }
    Some(last_i)
}

/// Removes duplicate and collinear points between `start` and `end` (the whole ring
/// when `end` is `None`). Returns a node that is still linked.
pub(crate) fn filter_points(
    arena: &mut Arena,
    start_i: NodeIndex,
    end_i: Option<NodeIndex>,
    tolerance: f64,
) -> NodeIndex {
    let mut end_i = end_i.unwrap_or(start_i);
    let mut p_i = start_i;
    loop {
        let p = &arena[p_i];
        let prev = &arena[p.prev_i];
        let next = &arena[p.next_i];
        let degenerate =
            !p.steiner && (p.same_position(next) || Float::abs(area(prev, p, next)) <= tolerance);

        if degenerate {
            let (prev_i, next_i) = arena.remove(p_i);
            p_i = prev_i;
            end_i = prev_i;
            if p_i == next_i {
                return end_i;
            }
        } else {
            p_i = arena[p_i].next_i;
            if p_i == end_i {
                return end_i;
            }
        }
    }
}

/// find the leftmost node of a polygon ring (lowest y among equal x)
pub(crate) fn leftmost(arena: &Arena, start_i: NodeIndex) -> NodeIndex {
    arena
        .ring(start_i)
        .reduce(|best_i, p_i| {
            let (best, p) = (&arena[best_i], &arena[p_i]);
            if p.x < best.x || (p.x == best.x && p.y < best.y) {
                p_i
            } else {
                best_i
            }
        })
        .unwrap_or(start_i)
}
