//! Z-order (Morton) index over the ring vertices.
//!
//! Above [`EarcutConfig::hash_threshold`] points every node gets a 32-bit key from its
//! position quantized to a 32768×32768 grid over the outer ring's bounding box, and the
//! nodes are threaded into a second list (`prev_z_i`/`next_z_i`) sorted by that key.
//! Ear validation then only scans the key range covering the candidate triangle.

use num_traits::Float;

use crate::arena::{Arena, NodeIndex};
use crate::config::EarcutConfig;

const GRID_MAX: f64 = 32767.0;

/// Per-call parameters shared by the clipping passes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub min_x: f64,
    pub min_y: f64,
    /// grid cells per unit of length; zero disables the index
    pub inv_size: f64,
    /// absolute area below which a turn counts as degenerate
    pub tolerance: f64,
    /// how far (in coordinate units) the z-range window is widened around a triangle
    pub pad: f64,
    relaxed_window: f64,
    pub force_split: bool,
}

impl Frame {
    /// Derives the frame from the outer ring's points.
    pub fn new(outer: &[[f64; 2]], config: &EarcutConfig, hashed: bool) -> Self {
        let (min, max) = outer.iter().fold(
            ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
            |(lo, hi), &[x, y]| {
                (
                    [Float::min(lo[0], x), Float::min(lo[1], y)],
                    [Float::max(hi[0], x), Float::max(hi[1], y)],
                )
            },
        );
        let size = Float::max(max[0] - min[0], max[1] - min[1]);
        let size = if size.is_finite() { size } else { 0.0 };
        let inv_size = if hashed && size > 0.0 {
            GRID_MAX / size
        } else {
            0.0
        };
        Self {
            min_x: min[0],
            min_y: min[1],
            inv_size,
            tolerance: config.epsilon * size * size,
            pad: 0.0,
            relaxed_window: config.relaxed_window,
            force_split: config.force_split,
        }
    }

    #[inline]
    pub fn is_hashed(&self) -> bool {
        self.inv_size != 0.0
    }

    /// The same frame with the z-range window widened by the configured number of cells.
    pub fn relaxed(&self) -> Self {
        let pad = if self.is_hashed() {
            self.relaxed_window / self.inv_size
        } else {
            0.0
        };
        Self { pad, ..*self }
    }

    /// z-order of a point, after clamping it into the grid
    pub fn z_order(&self, x: f64, y: f64) -> i32 {
        let x = quantize((x - self.min_x) * self.inv_size);
        let y = quantize((y - self.min_y) * self.inv_size);
        (spread_bits(x) | (spread_bits(y) << 1)) as i32
    }
}

fn quantize(v: f64) -> u32 {
    // NaN falls through both comparisons to zero
    Float::min(Float::max(v, 0.0), GRID_MAX) as u32
}

/// Spreads the low 16 bits of `v` over the even bit positions.
fn spread_bits(v: u32) -> u32 {
    let mut v = v & 0x0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333;
    (v | (v << 1)) & 0x5555_5555
}

/// Computes keys for a ring and links its nodes in z-order.
pub(crate) fn index_curve(arena: &mut Arena, start_i: NodeIndex, frame: &Frame) {
    let mut p_i = start_i;
    loop {
        let p = &mut arena[p_i];
        if p.z == 0 {
            p.z = frame.z_order(p.x, p.y);
        }
        p.prev_z_i = Some(p.prev_i);
        p.next_z_i = Some(p.next_i);
        p_i = p.next_i;
        if p_i == start_i {
            break;
        }
    }

    // open the circle into a list
    if let Some(tail_i) = arena[start_i].prev_z_i.take() {
        arena[tail_i].next_z_i = None;
    }
    sort_linked(arena, start_i);
}

/// Bottom-up merge sort of the z-order list (Simon Tatham's linked list variant).
/// Stable, O(n log n), no extra memory.
fn sort_linked(arena: &mut Arena, head_i: NodeIndex) {
    let mut list = Some(head_i);
    let mut in_size = 1usize;

    loop {
        let mut p = list;
        list = None;
        let mut tail: Option<NodeIndex> = None;
        let mut num_merges = 0;

        while let Some(p_start) = p {
            num_merges += 1;

            // q starts `in_size` places after p
            let mut q = Some(p_start);
            let mut p_size = 0;
            while p_size < in_size {
                let Some(q_i) = q else { break };
                p_size += 1;
                q = arena[q_i].next_z_i;
            }
            let mut q_size = in_size;

            loop {
                let from_p = p_size > 0
                    && match (p, q) {
                        (Some(p_i), Some(q_i)) if q_size > 0 => arena[p_i].z <= arena[q_i].z,
                        _ => true,
                    };
                let next = if from_p {
                    p
                } else if q_size > 0 {
                    q
                } else {
                    None
                };
                let Some(e_i) = next else { break };

                if from_p {
                    p = arena[e_i].next_z_i;
                    p_size -= 1;
                } else {
                    q = arena[e_i].next_z_i;
                    q_size -= 1;
                }

                arena[e_i].prev_z_i = tail;
                match tail {
                    Some(tail_i) => arena[tail_i].next_z_i = Some(e_i),
                    None => list = Some(e_i),
                }
                tail = Some(e_i);
            }

            p = q;
        }

        if let Some(tail_i) = tail {
            arena[tail_i].next_z_i = None;
        }
        if num_merges <= 1 {
            return;
        }
        in_size *= 2;
    }
}
