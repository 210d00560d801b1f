//! Ear-clipping triangulation of 2D polygons with holes, in the manner of
//! [Earcut](https://github.com/mapbox/earcut).
//!
//! Output triangles are counter-clockwise with the y axis pointing up (clockwise on
//! screen). Result buffers can come from a caller-supplied allocator, and the [`ffi`]
//! module exposes the same operation over a C ABI.
//!
//! ```
//! use zearcut::Earcut;
//!
//! let mut earcut = Earcut::new();
//! let square = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
//! let holes: &[u32] = &[];
//! let mut triangles: Vec<u32> = Vec::new();
//! earcut.earcut(square, holes, &mut triangles).unwrap();
//! assert_eq!(triangles, [2, 3, 0, 0, 1, 2]);
//! ```

#![no_std]

extern crate alloc;

mod arena;
mod clip;
mod geom;
mod holes;
mod recovery;
mod ring;
mod zorder;

pub mod allocator;
pub mod config;
pub mod error;
pub mod ffi;

use alloc::vec::Vec;
use core::mem;
use num_traits::Float;

pub use crate::allocator::{FnAllocator, RawAllocator, SystemAllocator, TriangleIndices};
pub use crate::config::EarcutConfig;
pub use crate::error::EarcutError;

use crate::allocator::Buffer;
use crate::arena::{Arena, Node, NodeIndex};
use crate::clip::{earcut_linked, Collect, Pass, Triangles};
use crate::geom::signed_area;
use crate::holes::eliminate_holes;
use crate::ring::build_ring;
use crate::zorder::Frame;

/// Index of a vertex
pub trait Index: Copy {
    /// Largest vertex index the type can hold.
    const MAX: usize;

    fn into_usize(self) -> usize;
    fn from_usize(v: usize) -> Self;
}

macro_rules! impl_index {
    ($($t:ty),*) => {$(
        impl Index for $t {
            const MAX: usize = <$t>::MAX as usize;

            #[inline]
            fn into_usize(self) -> usize {
                self as usize
            }
            #[inline]
            fn from_usize(v: usize) -> Self {
                debug_assert!(v <= <Self as Index>::MAX);
                v as Self
            }
        }
    )*};
}

impl_index!(u16, u32, usize);

/// Instance of the earcut algorithm.
///
/// Keeps its working memory between calls, so reusing one instance for many polygons
/// avoids most allocations. All of that memory comes from the instance's allocator
/// and goes back to it on drop.
pub struct Earcut<A: RawAllocator = SystemAllocator> {
    config: EarcutConfig,
    allocator: A,
    data: Buffer<[f64; 2]>,
    nodes: Buffer<Node>,
    queue: Buffer<NodeIndex>,
    scratch: Buffer<u32>,
}

impl Default for Earcut {
    fn default() -> Self {
        Self::new()
    }
}

impl Earcut {
    /// Creates an instance that allocates from the global allocator.
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator)
    }
}

impl<A: RawAllocator> Earcut<A> {
    /// Creates an instance whose working memory and [`triangulate`](Self::triangulate)
    /// results are allocated from `allocator`.
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            config: EarcutConfig::DEFAULT,
            allocator,
            data: Buffer::new(),
            nodes: Buffer::new(),
            queue: Buffer::new(),
            scratch: Buffer::new(),
        }
    }

    pub fn with_config(mut self, config: EarcutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EarcutConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EarcutConfig {
        &mut self.config
    }

    /// Performs the earcut triangulation on a polygon.
    ///
    /// `data` holds the outer ring followed by the hole rings, `hole_indices` the
    /// offset of each hole's first point. Indices of the resulting triangles replace
    /// the contents of `triangles_out`. Fewer than three points give no triangles.
    ///
    /// Fails with [`EarcutError::TooManyPoints`] when some vertex index would not fit
    /// in `N`.
    pub fn earcut<T: Float, N: Index>(
        &mut self,
        data: impl IntoIterator<Item = [T; 2]>,
        hole_indices: &[N],
        triangles_out: &mut Vec<N>,
    ) -> Result<(), EarcutError> {
        triangles_out.clear();
        self.load(data, hole_indices)?;
        let len = self.data.len();
        if len > N::MAX.saturating_add(1) {
            return Err(EarcutError::TooManyPoints { count: len });
        }
        if len >= 3 {
            triangles_out.reserve((len + 2 * hole_indices.len()).saturating_sub(2) * 3);
            earcut_impl(
                &self.data,
                hole_indices,
                &mut self.nodes,
                &mut self.queue,
                &self.config,
                &self.allocator,
                triangles_out,
            )?;
        }
        Ok(())
    }

    /// Triangulates a polygon into a buffer from this instance's allocator.
    ///
    /// Unlike [`earcut`](Self::earcut), an outer ring of fewer than three points is
    /// an error.
    pub fn triangulate<T: Float, H: Index>(
        &mut self,
        data: impl IntoIterator<Item = [T; 2]>,
        hole_indices: &[H],
    ) -> Result<TriangleIndices<A>, EarcutError>
    where
        A: Clone,
    {
        self.load(data, hole_indices)?;
        let len = self.data.len();
        let outer_len = outer_len(len, hole_indices);
        if outer_len < 3 {
            return Err(EarcutError::TooFewPoints { count: outer_len });
        }

        let allocator: &dyn RawAllocator = &self.allocator;
        self.scratch.clear();
        self.scratch
            .try_reserve((len + 2 * hole_indices.len()).saturating_sub(2) * 3, allocator)?;
        let mut collect = Collect {
            indices: &mut self.scratch,
            allocator,
        };
        earcut_impl(
            &self.data,
            hole_indices,
            &mut self.nodes,
            &mut self.queue,
            &self.config,
            allocator,
            &mut collect,
        )?;
        TriangleIndices::copy_from(&self.scratch, self.allocator.clone())
    }

    /// Converts and validates the input.
    fn load<T: Float, H: Index>(
        &mut self,
        data: impl IntoIterator<Item = [T; 2]>,
        hole_indices: &[H],
    ) -> Result<(), EarcutError> {
        let data = data.into_iter();
        self.data.clear();
        self.data.try_reserve(data.size_hint().0, &self.allocator)?;
        for (index, [x, y]) in data.enumerate() {
            match (x.to_f64(), y.to_f64()) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                    self.data.try_push([x, y], &self.allocator)?
                }
                _ => return Err(EarcutError::NonFiniteCoordinate { index }),
            }
        }

        let len = self.data.len();
        if u32::try_from(len).is_err() {
            return Err(EarcutError::TooManyPoints { count: len });
        }
        validate_holes(len, hole_indices)
    }
}

impl<A: RawAllocator> Drop for Earcut<A> {
    fn drop(&mut self) {
        let allocator: &dyn RawAllocator = &self.allocator;
        // SAFETY: every buffer only ever grew through `self.allocator`
        unsafe {
            self.data.free(allocator);
            self.nodes.free(allocator);
            self.queue.free(allocator);
            self.scratch.free(allocator);
        }
    }
}

fn earcut_impl<H: Index, O: Triangles>(
    data: &[[f64; 2]],
    hole_indices: &[H],
    nodes: &mut Buffer<Node>,
    queue: &mut Buffer<NodeIndex>,
    config: &EarcutConfig,
    allocator: &dyn RawAllocator,
    triangles_out: &mut O,
) -> Result<(), EarcutError> {
    // each bridge duplicates two vertices
    let capacity = data.len() + 2 * hole_indices.len();
    let mut arena = Arena::with_buffer(mem::take(nodes), allocator, capacity)?;
    slice_polygon(&mut arena, data, hole_indices, queue, config, triangles_out);
    *nodes = arena.into_buffer();
    Ok(())
}

fn slice_polygon<H: Index, O: Triangles>(
    arena: &mut Arena,
    data: &[[f64; 2]],
    hole_indices: &[H],
    queue: &mut Buffer<NodeIndex>,
    config: &EarcutConfig,
    triangles_out: &mut O,
) {
    let len = data.len();
    let outer_len = outer_len(len, hole_indices);

    // create nodes
    let Some(outer_i) = build_ring(arena, data, 0, outer_len, true) else {
        return;
    };
    let outer = &arena[outer_i];
    if outer.next_i == outer.prev_i {
        return;
    }

    // if the shape is not too simple, we'll use z-order curve hash later
    let hashed = len > config.hash_threshold;
    let frame = Frame::new(&data[..outer_len], config, hashed);
    log::debug!(
        "triangulating {len} points, {} holes, z-order index {}",
        hole_indices.len(),
        if frame.is_hashed() { "on" } else { "off" }
    );

    let outer_i = if hole_indices.is_empty() {
        outer_i
    } else {
        eliminate_holes(
            arena,
            data,
            hole_indices,
            outer_i,
            queue,
            config.steiner_holes,
            frame.tolerance,
        )
    };

    earcut_linked(arena, outer_i, triangles_out, &frame, Pass::Initial);
}

/// Hole offsets must be non-decreasing and within the data.
fn validate_holes<H: Index>(len: usize, hole_indices: &[H]) -> Result<(), EarcutError> {
    let mut prev = 0;
    for (position, value) in hole_indices.iter().map(|h| h.into_usize()).enumerate() {
        if value < prev || value > len {
            return Err(EarcutError::InvalidHoleIndex {
                position,
                value,
                len,
            });
        }
        prev = value;
    }
    Ok(())
}

fn outer_len<N: Index>(len: usize, hole_indices: &[N]) -> usize {
    hole_indices.first().map_or(len, |h| h.into_usize())
}

/// Returns a percentage difference between the polygon area and its triangulation area;
/// used to verify correctness of triangulation
///
/// Input that [`Earcut::earcut`] would reject for its hole offsets, or triangles that
/// reference a missing vertex, give `f64::INFINITY`.
pub fn deviation<T: Float, N: Index>(
    data: impl IntoIterator<Item = [T; 2]>,
    hole_indices: &[N],
    triangles: &[N],
) -> f64 {
    let data: Vec<[f64; 2]> = data
        .into_iter()
        .map(|[x, y]| [x.to_f64().unwrap_or(f64::NAN), y.to_f64().unwrap_or(f64::NAN)])
        .collect();
    if validate_holes(data.len(), hole_indices).is_err() {
        return f64::INFINITY;
    }
    let outer_len = outer_len(data.len(), hole_indices);

    let polygon_area = if data.len() < 3 {
        0.0
    } else {
        let holes = hole_indices.iter().enumerate().map(|(k, start)| {
            let end = hole_indices.get(k + 1).map_or(data.len(), |e| e.into_usize());
            &data[start.into_usize()..end]
        });
        holes
            .filter(|hole| hole.len() >= 3)
            .fold(Float::abs(signed_area(&data[..outer_len])), |area, hole| {
                area - Float::abs(signed_area(hole))
            })
    };

    let mut triangles_area = 0.0;
    for t in triangles.chunks_exact(3) {
        let vertex = |k: usize| data.get(t[k].into_usize());
        let (Some(a), Some(b), Some(c)) = (vertex(0), vertex(1), vertex(2)) else {
            return f64::INFINITY;
        };
        triangles_area += Float::abs((a[0] - c[0]) * (b[1] - a[1]) - (a[0] - b[0]) * (c[1] - a[1]));
    }

    if polygon_area == 0.0 && triangles_area == 0.0 {
        0.0
    } else {
        Float::abs((polygon_area - triangles_area) / polygon_area)
    }
}
