//! Fallbacks for rings on which plain ear slicing stalls.
//!
//! They only ever run on malformed input (self-intersections, touching rings, numeric
//! noise). Each one either emits triangles or strictly shrinks the ring it hands back,
//! so slicing always terminates.

use crate::arena::{Arena, NodeIndex};
use crate::clip::{earcut_linked, Pass, Triangles};
use crate::geom::{area, intersects, locally_inside, middle_inside};
use crate::ring::filter_points;
use crate::zorder::Frame;

/// go through all polygon nodes and cure small local self-intersections
pub(crate) fn cure_local_intersections<T: Triangles>(
    arena: &mut Arena,
    start_i: NodeIndex,
    triangles: &mut T,
    frame: &Frame,
) -> NodeIndex {
    let mut start_i = start_i;
    let mut p_i = start_i;
    loop {
        let p = &arena[p_i];
        let (a_i, p_next_i) = (p.prev_i, p.next_i);
        let b_i = arena[p_next_i].next_i;
        let (a, b) = (&arena[a_i], &arena[b_i]);

        if !a.same_position(b)
            && intersects(a, p, &arena[p_next_i], b)
            && locally_inside(arena, a_i, b_i)
            && locally_inside(arena, b_i, a_i)
        {
            triangles.emit([a.i, p.i, b.i]);

            // remove two nodes involved
            arena.remove(p_i);
            arena.remove(p_next_i);

            p_i = b_i;
            start_i = b_i;
        }

        p_i = arena[p_i].next_i;
        if p_i == start_i {
            return filter_points(arena, p_i, None, frame.tolerance);
        }
    }
}

/// try splitting polygon into two and triangulate them independently
pub(crate) fn split_earcut<T: Triangles>(
    arena: &mut Arena,
    start_i: NodeIndex,
    triangles: &mut T,
    frame: &Frame,
) {
    if let Some((a_i, b_i)) = find_diagonal(arena, start_i) {
        split_and_slice(arena, a_i, b_i, triangles, frame);
        return;
    }

    let remaining = arena.ring_len(start_i);
    if !frame.force_split {
        log::debug!("no valid diagonal, dropping {remaining} vertices");
        return;
    }
    match remaining {
        0..=2 => {}
        3 => {
            log::debug!("emitting the last 3 vertices unconditionally");
            let s = &arena[start_i];
            triangles.emit([arena[s.prev_i].i, s.i, arena[s.next_i].i]);
        }
        _ => {
            let far_i = farthest_vertex(arena, start_i);
            log::debug!("no valid diagonal in {remaining} vertices, forcing a split");
            split_and_slice(arena, start_i, far_i, triangles, frame);
        }
    }
}

/// look for a valid diagonal that divides the polygon into two
fn find_diagonal(arena: &Arena, start_i: NodeIndex) -> Option<(NodeIndex, NodeIndex)> {
    for a_i in arena.ring(start_i) {
        let a = &arena[a_i];
        let mut b_i = arena[a.next_i].next_i;
        while b_i != a.prev_i {
            if a.i != arena[b_i].i && is_valid_diagonal(arena, a_i, b_i) {
                return Some((a_i, b_i));
            }
            b_i = arena[b_i].next_i;
        }
    }
    None
}

/// The non-adjacent vertex farthest from `start_i`; the ring must have at least 4 nodes.
fn farthest_vertex(arena: &Arena, start_i: NodeIndex) -> NodeIndex {
    let a = &arena[start_i];
    let mut best_i = arena[a.next_i].next_i;
    let mut best_d = f64::NEG_INFINITY;
    let mut b_i = best_i;
    while b_i != a.prev_i {
        let b = &arena[b_i];
        let d = (b.x - a.x) * (b.x - a.x) + (b.y - a.y) * (b.y - a.y);
        if d > best_d {
            (best_i, best_d) = (b_i, d);
        }
        b_i = b.next_i;
    }
    best_i
}

fn split_and_slice<T: Triangles>(
    arena: &mut Arena,
    a_i: NodeIndex,
    b_i: NodeIndex,
    triangles: &mut T,
    frame: &Frame,
) {
    let c_i = arena.split(a_i, b_i);

    // filter colinear points around the cuts
    let end_i = arena[a_i].next_i;
    let a_i = filter_points(arena, a_i, Some(end_i), frame.tolerance);
    let end_i = arena[c_i].next_i;
    let c_i = filter_points(arena, c_i, Some(end_i), frame.tolerance);

    earcut_linked(arena, a_i, triangles, frame, Pass::Initial);
    earcut_linked(arena, c_i, triangles, frame, Pass::Initial);
}

/// check if a diagonal between two polygon nodes is valid (lies in polygon interior)
fn is_valid_diagonal(arena: &Arena, a_i: NodeIndex, b_i: NodeIndex) -> bool {
    let (a, b) = (&arena[a_i], &arena[b_i]);
    let (a_prev, a_next) = (&arena[a.prev_i], &arena[a.next_i]);
    let (b_prev, b_next) = (&arena[b.prev_i], &arena[b.next_i]);

    // doesn't intersect other edges
    if a_next.i == b.i || a_prev.i == b.i || intersects_polygon(arena, a_i, b_i) {
        return false;
    }
    // locally visible, without creating opposite-facing sectors
    let visible = locally_inside(arena, a_i, b_i)
        && locally_inside(arena, b_i, a_i)
        && middle_inside(arena, a_i, b_i)
        && (area(a_prev, a, b_prev) != 0.0 || area(a, b_prev, b) != 0.0);
    // special zero-length case
    let touching = a.same_position(b) && area(a_prev, a, a_next) > 0.0 && area(b_prev, b, b_next) > 0.0;
    visible || touching
}

/// check if a polygon diagonal intersects any polygon segments
fn intersects_polygon(arena: &Arena, a_i: NodeIndex, b_i: NodeIndex) -> bool {
    let (a, b) = (&arena[a_i], &arena[b_i]);
    arena.ring(a_i).any(|p_i| {
        let p = &arena[p_i];
        let q = &arena[p.next_i];
        p.i != a.i && p.i != b.i && q.i != a.i && q.i != b.i && intersects(p, q, a, b)
    })
}
