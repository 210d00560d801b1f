//! Splicing hole rings into the outer ring.
//!
//! Holes are bridged one at a time, from left to right by their leftmost vertex, using
//! David Eberly's visibility search. Each bridge duplicates its two end points so the
//! result is a single ring that walks around the hole and back.

use num_traits::Float;

use crate::allocator::Buffer;
use crate::arena::{Arena, NodeIndex};
use crate::geom::{area, locally_inside, point_in_triangle, Point};
use crate::ring::{build_ring, filter_points, leftmost};
use crate::Index;

/// link every hole into the outer loop, producing a single-ring polygon without holes
pub(crate) fn eliminate_holes<H: Index>(
    arena: &mut Arena,
    data: &[[f64; 2]],
    hole_indices: &[H],
    outer_i: NodeIndex,
    queue: &mut Buffer<NodeIndex>,
    steiner_holes: bool,
    tolerance: f64,
) -> NodeIndex {
    queue.clear();
    for (k, start) in hole_indices.iter().enumerate() {
        let start = start.into_usize();
        let end = hole_indices.get(k + 1).map_or(data.len(), |e| e.into_usize());
        let Some(list_i) = build_ring(arena, data, start, end, false) else {
            continue;
        };
        match arena.ring_len(list_i) {
            len if len >= 3 => {}
            1 if steiner_holes => arena[list_i].steiner = true,
            2 if steiner_holes => {}
            len => {
                log::trace!("skipping hole {k} with {len} distinct points");
                continue;
            }
        }
        queue.push(leftmost(arena, list_i), arena.allocator());
    }

    queue.sort_unstable_by(|&a_i, &b_i| {
        let (a, b) = (&arena[a_i], &arena[b_i]);
        a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)).then(a_i.cmp(&b_i))
    });

    // process holes from left to right
    queue
        .iter()
        .fold(outer_i, |outer_i, &hole_i| eliminate_hole(arena, hole_i, outer_i, tolerance))
}

/// find a bridge between vertices that connects hole with an outer ring and link it
fn eliminate_hole(
    arena: &mut Arena,
    hole_i: NodeIndex,
    outer_i: NodeIndex,
    tolerance: f64,
) -> NodeIndex {
    let bridge_i = match find_hole_bridge(arena, hole_i, outer_i) {
        Some(bridge_i) => bridge_i,
        None => {
            log::debug!("no visible bridge for hole vertex {}, using nearest vertex", arena[hole_i].i);
            nearest_vertex(arena, hole_i, outer_i)
        }
    };
    log::trace!("bridging hole vertex {} to {}", arena[hole_i].i, arena[bridge_i].i);

    let bridge_reverse_i = arena.split(bridge_i, hole_i);

    // filter collinear points around the cuts
    let end_i = arena[bridge_reverse_i].next_i;
    filter_points(arena, bridge_reverse_i, Some(end_i), tolerance);
    let end_i = arena[bridge_i].next_i;
    filter_points(arena, bridge_i, Some(end_i), tolerance)
}

/// David Eberly's algorithm for finding a bridge between hole and outer polygon
fn find_hole_bridge(arena: &Arena, hole_i: NodeIndex, outer_i: NodeIndex) -> Option<NodeIndex> {
    let hole = arena[hole_i].point();
    let mut qx = f64::NEG_INFINITY;
    let mut m_i: Option<NodeIndex> = None;

    // find a segment intersected by a ray from the hole's leftmost point to the left;
    // segment's endpoint with lesser x will be potential connection point
    for p_i in arena.ring(outer_i) {
        let p = &arena[p_i];
        let q = &arena[p.next_i];
        if hole.y <= p.y && hole.y >= q.y && q.y != p.y {
            let x = p.x + (hole.y - p.y) * (q.x - p.x) / (q.y - p.y);
            if x <= hole.x && x > qx {
                qx = x;
                let endpoint = if p.x < q.x { p_i } else { p.next_i };
                if x == hole.x {
                    // hole touches outer segment; pick leftmost endpoint
                    return Some(endpoint);
                }
                m_i = Some(endpoint);
            }
        }
    }
    let mut m_i = m_i?;

    // look for points inside the triangle of hole point, segment intersection and endpoint;
    // if there are no points found, we have a valid connection;
    // otherwise choose the point of the minimum angle with the ray as connection point
    let m = arena[m_i].point();
    let (left, right) = if hole.y < m.y {
        (Point::new(hole.x, hole.y), Point::new(qx, hole.y))
    } else {
        (Point::new(qx, hole.y), Point::new(hole.x, hole.y))
    };
    let mut tan_min = f64::INFINITY;

    for p_i in arena.ring(m_i) {
        let p = &arena[p_i];
        if !(hole.x >= p.x && p.x >= m.x && hole.x != p.x)
            || !point_in_triangle(left, m, right, p.point())
        {
            continue;
        }
        let tan = Float::abs(hole.y - p.y) / (hole.x - p.x);
        if !locally_inside(arena, p_i, hole_i) {
            continue;
        }
        let best = &arena[m_i];
        let closer = tan < tan_min
            || (tan == tan_min
                && (p.x > best.x || (p.x == best.x && sector_contains_sector(arena, m_i, p_i))));
        if closer {
            m_i = p_i;
            tan_min = tan;
        }
    }
    Some(m_i)
}

/// whether sector in vertex m contains sector in vertex p in the same coordinates
fn sector_contains_sector(arena: &Arena, m_i: NodeIndex, p_i: NodeIndex) -> bool {
    let (m, p) = (&arena[m_i], &arena[p_i]);
    area(&arena[m.prev_i], m, &arena[p.prev_i]) < 0.0
        && area(&arena[p.next_i], m, &arena[m.next_i]) < 0.0
}

/// Bridge target when the ray hits nothing: the closest outer vertex to the left of the
/// hole, or the closest one overall when there is none.
fn nearest_vertex(arena: &Arena, hole_i: NodeIndex, outer_i: NodeIndex) -> NodeIndex {
    let hole = arena[hole_i].point();
    let distance = |p_i: NodeIndex| {
        let p = &arena[p_i];
        (p.x - hole.x) * (p.x - hole.x) + (p.y - hole.y) * (p.y - hole.y)
    };
    let closest = |candidates: &mut dyn Iterator<Item = NodeIndex>| {
        candidates.min_by(|&a, &b| distance(a).total_cmp(&distance(b)))
    };
    closest(&mut arena.ring(outer_i).filter(|&p_i| arena[p_i].x <= hole.x))
        .or_else(|| closest(&mut arena.ring(outer_i)))
        .unwrap_or(outer_i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(data: &[[f64; 2]], outer_len: usize) -> (Arena<'static>, NodeIndex) {
        let mut arena = Arena::new();
        let outer = build_ring(&mut arena, data, 0, outer_len, true).unwrap();
        (arena, outer)
    }

    #[test]
    fn test_bridge_targets_visible_vertex() {
        let data = [
            [0., 0.],
            [10., 0.],
            [10., 10.],
            [0., 10.],
            [4., 4.],
            [6., 4.],
            [5., 6.],
        ];
        let (mut arena, outer) = setup(&data, 4);
        let hole = build_ring(&mut arena, &data, 4, 7, false).unwrap();
        let hole = leftmost(&arena, hole);
        assert_eq!(arena[hole].i, 4);
        let bridge = find_hole_bridge(&arena, hole, outer).unwrap();
        assert_eq!(arena[bridge].i, 0);
    }

    #[test]
    fn test_eliminate_holes_merges_rings() {
        let data = [
            [0., 0.],
            [10., 0.],
            [10., 10.],
            [0., 10.],
            [4., 4.],
            [6., 4.],
            [5., 6.],
        ];
        let (mut arena, outer) = setup(&data, 4);
        let mut queue = Buffer::new();
        let merged = eliminate_holes(&mut arena, &data, &[4u32], outer, &mut queue, false, 0.0);
        // 4 outer + 3 hole + 2 bridge duplicates
        assert_eq!(arena.ring_len(merged), 9);
        unsafe { queue.free(arena.allocator()) };
    }

    #[test]
    fn test_unreachable_hole_bridges_to_nearest_vertex() {
        // the hole lies left of the outer ring, so the leftward ray hits nothing
        let data = [
            [10., 0.],
            [20., 0.],
            [20., 10.],
            [10., 10.],
            [0., 4.],
            [4., 4.],
            [2., 6.],
        ];
        let (mut arena, outer) = setup(&data, 4);
        let hole = build_ring(&mut arena, &data, 4, 7, false).unwrap();
        let hole = leftmost(&arena, hole);
        assert_eq!(find_hole_bridge(&arena, hole, outer), None);

        let mut queue = Buffer::new();
        let merged = eliminate_holes(&mut arena, &data, &[4u32], outer, &mut queue, false, 0.0);
        assert_eq!(arena.ring_len(merged), 9);
        // (10, 0) is the closest outer vertex
        let bridged = arena
            .ring(merged)
            .any(|n| arena[n].i == 4 && arena[arena[n].prev_i].i == 0);
        assert!(bridged);
        unsafe { queue.free(arena.allocator()) };
    }

    #[test]
    fn test_small_holes_follow_steiner_setting() {
        let data = [[0., 0.], [10., 0.], [10., 10.], [5., 3.], [6., 3.]];
        for (steiner, expected) in [(false, 3), (true, 3 + 2 + 2)] {
            let (mut arena, outer) = setup(&data, 3);
            let mut queue = Buffer::new();
            let merged =
                eliminate_holes(&mut arena, &data, &[3u32], outer, &mut queue, steiner, 0.0);
            assert_eq!(arena.ring_len(merged), expected);
            unsafe { queue.free(arena.allocator()) };
        }
    }

    #[test]
    fn test_nearest_vertex_prefers_left_side() {
        let data = [[0., 0.], [10., 0.], [10., 10.], [0., 10.], [9., 5.]];
        let (mut arena, outer) = setup(&data, 4);
        let hole = arena.insert(4, 9., 5., None);
        let bridge = nearest_vertex(&arena, hole, outer);
        // (10, 0) and (10, 10) are closer but lie to the right
        assert!(arena[bridge].x <= 9.0);
    }
}
