/// Tunables of the triangulation.
///
/// The defaults reproduce the usual earcut behaviour; most callers never need to touch them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EarcutConfig {
    /// The z-order index is built when the input has more points than this.
    pub hash_threshold: usize,
    /// Tolerance for degenerate turns, relative to the squared size of the outer ring's
    /// bounding box. Ears whose area falls within it are never clipped and points whose
    /// turn falls within it are treated as collinear.
    pub epsilon: f64,
    /// Number of z-grid cells by which the index-assisted retry widens its search window.
    pub relaxed_window: f64,
    /// Keep holes with one or two distinct points as Steiner points spliced into the
    /// outer ring instead of skipping them.
    pub steiner_holes: bool,
    /// When no valid diagonal is left, split at the farthest vertex anyway so every
    /// remaining vertex ends up in a triangle. Without it the remainder is dropped.
    pub force_split: bool,
}

impl EarcutConfig {
    pub const DEFAULT: Self = Self {
        hash_threshold: 80,
        epsilon: 1e-14,
        relaxed_window: 1.0,
        steiner_holes: false,
        force_split: true,
    };
}

impl Default for EarcutConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
