//! Orientation and containment predicates.
//!
//! All of them work in `f64`. Areas are computed with the "y up" sign convention used
//! throughout the crate: [`area`] is negative for a counter-clockwise turn.

use num_traits::Float;

use crate::arena::{Arena, Node, NodeIndex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// signed area of a triangle (twice over, negated)
#[inline]
pub(crate) fn area(p: &Node, q: &Node, r: &Node) -> f64 {
    (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y)
}

/// check if a point lies within a convex triangle (boundary included)
#[inline]
pub(crate) fn point_in_triangle(a: Point, b: Point, c: Point, p: Point) -> bool {
    (c.x - p.x) * (a.y - p.y) >= (a.x - p.x) * (c.y - p.y)
        && (a.x - p.x) * (b.y - p.y) >= (b.x - p.x) * (a.y - p.y)
        && (b.x - p.x) * (c.y - p.y) >= (c.x - p.x) * (b.y - p.y)
}

/// Bounding box of a candidate ear.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TriangleBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl TriangleBounds {
    pub fn of(a: &Node, b: &Node, c: &Node) -> Self {
        Self {
            min_x: Float::min(a.x, Float::min(b.x, c.x)),
            min_y: Float::min(a.y, Float::min(b.y, c.y)),
            max_x: Float::max(a.x, Float::max(b.x, c.x)),
            max_y: Float::max(a.y, Float::max(b.y, c.y)),
        }
    }

    #[inline]
    pub fn contains(&self, p: &Node) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// check if two segments intersect
pub(crate) fn intersects(p1: &Node, q1: &Node, p2: &Node, q2: &Node) -> bool {
    let o1 = sign(area(p1, q1, p2));
    let o2 = sign(area(p1, q1, q2));
    let o3 = sign(area(p2, q2, p1));
    let o4 = sign(area(p2, q2, q1));

    if o1 != o2 && o3 != o4 {
        return true;
    }
    // collinear special cases: an endpoint lying on the other segment
    (o1 == 0 && on_segment(p1, p2, q1))
        || (o2 == 0 && on_segment(p1, q2, q1))
        || (o3 == 0 && on_segment(p2, p1, q2))
        || (o4 == 0 && on_segment(p2, q1, q2))
}

/// for collinear points p, q, r, check if point q lies on segment pr
fn on_segment(p: &Node, q: &Node, r: &Node) -> bool {
    q.x <= Float::max(p.x, r.x)
        && q.x >= Float::min(p.x, r.x)
        && q.y <= Float::max(p.y, r.y)
        && q.y >= Float::min(p.y, r.y)
}

#[inline]
fn sign(v: f64) -> i32 {
    (v > 0.0) as i32 - (v < 0.0) as i32
}

/// Shoelace sum of a closed contour; positive when counter-clockwise with y up.
pub(crate) fn signed_area(contour: &[[f64; 2]]) -> f64 {
    let Some(&[mut bx, mut by]) = contour.last() else {
        return 0.0;
    };
    let mut sum = 0.0;
    for &[ax, ay] in contour {
        sum += (bx - ax) * (ay + by);
        (bx, by) = (ax, ay);
    }
    sum
}

/// check if a polygon diagonal `a -> b` is locally inside the polygon at `a`
pub(crate) fn locally_inside(arena: &Arena, a_i: NodeIndex, b_i: NodeIndex) -> bool {
    let a = &arena[a_i];
    let b = &arena[b_i];
    let a_prev = &arena[a.prev_i];
    let a_next = &arena[a.next_i];
    if area(a_prev, a, a_next) < 0.0 {
        area(a, b, a_next) >= 0.0 && area(a, a_prev, b) >= 0.0
    } else {
        area(a, b, a_prev) < 0.0 || area(a, a_next, b) < 0.0
    }
}

/// check if the middle point of a polygon diagonal is inside the polygon (even-odd rule)
pub(crate) fn middle_inside(arena: &Arena, a_i: NodeIndex, b_i: NodeIndex) -> bool {
    let (a, b) = (&arena[a_i], &arena[b_i]);
    let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    let mut inside = false;
    for p_i in arena.ring(a_i) {
        let p = &arena[p_i];
        let q = &arena[p.next_i];
        if (p.y > mid.y) != (q.y > mid.y)
            && q.y != p.y
            && mid.x < (q.x - p.x) * (mid.y - p.y) / (q.y - p.y) + p.x
        {
            inside = !inside;
        }
    }
    inside
}
