/// Errors reported by [`Earcut`](crate::Earcut).
///
/// Only malformed calls are errors. Degenerate geometry (duplicate points, zero-area
/// rings, self-intersections) is handled on a best-effort basis and never fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EarcutError {
    /// The outer ring has fewer than three points.
    #[error("polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },

    /// Vertex indices do not fit into 32 bits.
    #[error("{count} points exceed the 32-bit index range")]
    TooManyPoints { count: usize },

    /// A coordinate is NaN, infinite, or not representable as `f64`.
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// Hole start offsets must be non-decreasing and within the point array.
    #[error("hole index {value} at position {position} is out of order or beyond {len} points")]
    InvalidHoleIndex {
        position: usize,
        value: usize,
        len: usize,
    },

    /// The allocator returned a null or misaligned buffer.
    #[error("allocator returned no usable buffer for {size} bytes")]
    AllocationFailed { size: usize },
}
