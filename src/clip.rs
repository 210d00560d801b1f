//! The ear slicing loop.

use alloc::vec::Vec;

use crate::allocator::{Buffer, RawAllocator};
use crate::arena::{Arena, NodeIndex};
use crate::geom::{area, point_in_triangle, TriangleBounds};
use crate::recovery::{cure_local_intersections, split_earcut};
use crate::ring::filter_points;
use crate::zorder::{index_curve, Frame};
use crate::Index;

/// Escalation level of [`earcut_linked`]. Each stage runs once the previous one
/// went around the whole ring without finding an ear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    /// plain ear slicing
    Initial,
    /// after filtering points, with a widened z-range window
    Relaxed,
    /// after curing small local self-intersections
    Cured,
}

/// Receives the triangles as they are cut, as input vertex indices.
pub(crate) trait Triangles {
    fn emit(&mut self, triangle: [u32; 3]);
}

impl<N: Index> Triangles for Vec<N> {
    #[inline]
    fn emit(&mut self, triangle: [u32; 3]) {
        self.extend(triangle.map(|i| N::from_usize(i as usize)));
    }
}

/// Index scratch grown through the caller's allocator.
pub(crate) struct Collect<'a> {
    pub indices: &'a mut Buffer<u32>,
    pub allocator: &'a dyn RawAllocator,
}

impl Triangles for Collect<'_> {
    #[inline]
    fn emit(&mut self, triangle: [u32; 3]) {
        for i in triangle {
            self.indices.push(i, self.allocator);
        }
    }
}

/// main ear slicing loop which triangulates a polygon (given as a linked list)
pub(crate) fn earcut_linked<T: Triangles>(
    arena: &mut Arena,
    ear_i: NodeIndex,
    triangles: &mut T,
    frame: &Frame,
    pass: Pass,
) {
    if pass == Pass::Initial && frame.is_hashed() {
        index_curve(arena, ear_i, frame);
    }

    let mut ear_i = ear_i;
    let mut stop_i = ear_i;

    loop {
        let ear = &arena[ear_i];
        if ear.prev_i == ear.next_i {
            return;
        }
        let (prev_i, next_i) = (ear.prev_i, ear.next_i);

        let clip = if frame.is_hashed() {
            is_ear_hashed(arena, ear_i, frame)
        } else {
            is_ear(arena, ear_i, frame)
        };

        if clip {
            triangles.emit([arena[prev_i].i, arena[ear_i].i, arena[next_i].i]);
            arena.remove(ear_i);

            // skipping the next vertex leads to less sliver triangles
            ear_i = arena[next_i].next_i;
            stop_i = ear_i;
            continue;
        }

        ear_i = next_i;
        if ear_i != stop_i {
            continue;
        }

        // went all the way around without an ear
        log::debug!("no ear found during {pass:?} pass, escalating");
        match pass {
            Pass::Initial => {
                let start_i = filter_points(arena, ear_i, None, frame.tolerance);
                earcut_linked(arena, start_i, triangles, &frame.relaxed(), Pass::Relaxed);
            }
            Pass::Relaxed => {
                let filtered_i = filter_points(arena, ear_i, None, frame.tolerance);
                let start_i = cure_local_intersections(arena, filtered_i, triangles, frame);
                earcut_linked(arena, start_i, triangles, frame, Pass::Cured);
            }
            Pass::Cured => split_earcut(arena, ear_i, triangles, frame),
        }
        return;
    }
}

/// Whether the turn at `ear_i` is convex beyond the degeneracy tolerance.
#[inline]
fn is_convex(arena: &Arena, ear_i: NodeIndex, frame: &Frame) -> bool {
    let b = &arena[ear_i];
    area(&arena[b.prev_i], b, &arena[b.next_i]) < -frame.tolerance
}

/// Whether the reflex node `p_i` sits inside the triangle and would be cut off by it.
#[inline]
fn blocks_ear(arena: &Arena, ear_i: NodeIndex, bounds: &TriangleBounds, p_i: NodeIndex) -> bool {
    let b = &arena[ear_i];
    let (a, c) = (&arena[b.prev_i], &arena[b.next_i]);
    let p = &arena[p_i];
    bounds.contains(p)
        && point_in_triangle(a.point(), b.point(), c.point(), p.point())
        && area(&arena[p.prev_i], p, &arena[p.next_i]) >= 0.0
}

/// check whether a polygon node forms a valid ear with adjacent nodes
fn is_ear(arena: &Arena, ear_i: NodeIndex, frame: &Frame) -> bool {
    if !is_convex(arena, ear_i, frame) {
        return false;
    }
    let b = &arena[ear_i];
    let (a_i, c_i) = (b.prev_i, b.next_i);
    let bounds = TriangleBounds::of(&arena[a_i], b, &arena[c_i]);

    // no other ring vertex may lie inside the ear
    let mut p_i = arena[c_i].next_i;
    while p_i != a_i {
        if blocks_ear(arena, ear_i, &bounds, p_i) {
            return false;
        }
        p_i = arena[p_i].next_i;
    }
    true
}

/// Same as [`is_ear`], but only scans the z-order range spanned by the ear.
fn is_ear_hashed(arena: &Arena, ear_i: NodeIndex, frame: &Frame) -> bool {
    if !is_convex(arena, ear_i, frame) {
        return false;
    }
    let b = &arena[ear_i];
    let (a_i, c_i) = (b.prev_i, b.next_i);
    let bounds = TriangleBounds::of(&arena[a_i], b, &arena[c_i]);

    let min_z = frame.z_order(bounds.min_x - frame.pad, bounds.min_y - frame.pad);
    let max_z = frame.z_order(bounds.max_x + frame.pad, bounds.max_y + frame.pad);
    let blocks = |p_i: NodeIndex| p_i != a_i && p_i != c_i && blocks_ear(arena, ear_i, &bounds, p_i);

    let mut down = b.prev_z_i;
    let mut up = b.next_z_i;

    // look for points inside the triangle in both directions
    while let (Some(p_i), Some(n_i)) = (down, up) {
        if arena[p_i].z < min_z || arena[n_i].z > max_z {
            break;
        }
        if blocks(p_i) || blocks(n_i) {
            return false;
        }
        down = arena[p_i].prev_z_i;
        up = arena[n_i].next_z_i;
    }

    // look for remaining points in decreasing z-order
    while let Some(p_i) = down {
        if arena[p_i].z < min_z {
            break;
        }
        if blocks(p_i) {
            return false;
        }
        down = arena[p_i].prev_z_i;
    }

    // look for remaining points in increasing z-order
    while let Some(n_i) = up {
        if arena[n_i].z > max_z {
            break;
        }
        if blocks(n_i) {
            return false;
        }
        up = arena[n_i].next_z_i;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EarcutConfig;
    use crate::ring::build_ring;

    fn run(data: &[[f64; 2]], hashed: bool) -> Vec<u32> {
        let mut arena = Arena::new();
        let mut triangles = Vec::new();
        let start = build_ring(&mut arena, data, 0, data.len(), true).unwrap();
        let frame = Frame::new(data, &EarcutConfig::default(), hashed);
        earcut_linked(&mut arena, start, &mut triangles, &frame, Pass::Initial);
        triangles
    }

    #[test]
    fn test_square() {
        let data = [[0., 0.], [100., 0.], [100., 100.], [0., 100.]];
        assert_eq!(run(&data, false), [2, 3, 0, 0, 1, 2]);
    }

    #[test]
    fn test_concave_vertex_is_not_clipped() {
        // arrow head: vertex 2 is reflex
        let data = [[0., 0.], [4., 2.], [1., 2.], [0., 4.]];
        let triangles = run(&data, false);
        assert_eq!(triangles.len(), 6);
        for t in triangles.chunks_exact(3) {
            assert_ne!(t[1], 2, "reflex vertex clipped as an ear tip");
        }
    }

    /// comb with 30 teeth
    fn comb() -> Vec<[f64; 2]> {
        let mut data = alloc::vec![[0., 0.], [60., 0.]];
        for k in (0..30).rev() {
            let x = k as f64 * 2.0;
            data.extend([[x + 2.0, 10.0], [x + 1.0, 3.0 + (k % 5) as f64]]);
        }
        data.push([0., 10.]);
        data
    }

    #[test]
    fn test_hashed_matches_linear_scan() {
        let data = comb();
        let n = data.len();

        let linear = run(&data, false);
        let hashed = run(&data, true);
        assert_eq!(linear.len(), (n - 2) * 3);
        assert_eq!(hashed.len(), (n - 2) * 3);
        assert_eq!(
            crate::deviation(data.iter().copied(), &[] as &[u32], &hashed),
            crate::deviation(data.iter().copied(), &[] as &[u32], &linear)
        );
    }

    #[test]
    fn test_relaxed_window_keeps_hashed_scan_exact() {
        let data = comb();
        let n = data.len();
        let mut arena = Arena::new();
        let start = build_ring(&mut arena, &data, 0, n, true).unwrap();
        let frame = Frame::new(&data, &EarcutConfig::default(), true).relaxed();
        assert!(frame.pad > 0.0);
        index_curve(&mut arena, start, &frame);

        let mut triangles: Vec<u32> = Vec::new();
        earcut_linked(&mut arena, start, &mut triangles, &frame, Pass::Relaxed);
        assert_eq!(triangles.len(), (n - 2) * 3);
        assert_eq!(triangles, run(&data, false));
    }

    #[test]
    fn test_hashed_stall_escalates_through_relaxed_pass() {
        // bow tie: one ear, then an inverted triangle no pass can clip
        let data = [[0., 0.], [10., 10.], [10., 0.], [0., 10.]];
        assert_eq!(run(&data, true), [3, 2, 1, 1, 0, 3]);

        let config = EarcutConfig {
            force_split: false,
            ..EarcutConfig::default()
        };
        let mut arena = Arena::new();
        let start = build_ring(&mut arena, &data, 0, 4, true).unwrap();
        let frame = Frame::new(&data, &config, true);
        let mut triangles: Vec<u32> = Vec::new();
        earcut_linked(&mut arena, start, &mut triangles, &frame, Pass::Initial);
        assert_eq!(triangles, [3, 2, 1]);
    }

    #[test]
    fn test_collect_grows_through_allocator() {
        let allocator = crate::allocator::SystemAllocator;
        let mut indices = Buffer::new();
        let mut collect = Collect {
            indices: &mut indices,
            allocator: &allocator,
        };
        collect.emit([0, 1, 2]);
        collect.emit([2, 3, 0]);
        assert_eq!(&*indices, &[0, 1, 2, 2, 3, 0]);
        unsafe { indices.free(&allocator) };
    }
}
