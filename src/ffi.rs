//! C ABI.
//!
//! ```c
//! typedef struct { float x, y; } Vec2;
//! typedef struct { size_t num_indices; uint32_t *indices; } EarcutResult;
//!
//! void earcut_set_allocator(void *(*alloc_fn)(size_t), void (*free_fn)(void *));
//! void earcut_create(size_t num_points, const Vec2 *points, EarcutResult *result);
//! void earcut_free(EarcutResult *result);
//! ```
//!
//! The boundary is meant for trusted in-process callers: every precondition is
//! asserted, and a failed assertion aborts the process since it cannot unwind
//! through an `extern "C"` frame.

use core::ptr;
use core::slice;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::allocator::{AllocFn, FnAllocator, FreeFn, TriangleIndices};
use crate::Earcut;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Triangulation output handed to C. `num_indices` is three times the triangle count.
#[repr(C)]
#[derive(Debug)]
pub struct EarcutResult {
    pub num_indices: usize,
    pub indices: *mut u32,
}

impl EarcutResult {
    pub const EMPTY: Self = Self {
        num_indices: 0,
        indices: ptr::null_mut(),
    };
}

impl Default for EarcutResult {
    fn default() -> Self {
        Self::EMPTY
    }
}

static ALLOC_FN: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());
static FREE_FN: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

/// Sets the process-wide allocator used for result buffers and working memory.
///
/// Must not race with [`earcut_create`] or [`earcut_free`]. Passing null for either
/// function unconfigures the allocator.
#[no_mangle]
pub extern "C" fn earcut_set_allocator(alloc_fn: Option<AllocFn>, free_fn: Option<FreeFn>) {
    ALLOC_FN.store(alloc_fn.map_or(ptr::null_mut(), |f| f as *mut ()), Ordering::Release);
    FREE_FN.store(free_fn.map_or(ptr::null_mut(), |f| f as *mut ()), Ordering::Release);
}

fn configured() -> Option<FnAllocator> {
    let alloc_fn = ALLOC_FN.load(Ordering::Acquire);
    let free_fn = FREE_FN.load(Ordering::Acquire);
    if alloc_fn.is_null() || free_fn.is_null() {
        return None;
    }
    // SAFETY: both slots only ever hold null or a function pointer of the matching type,
    // and the C side vouches for the pair when it installs them
    unsafe {
        let alloc_fn = core::mem::transmute::<*mut (), AllocFn>(alloc_fn);
        let free_fn = core::mem::transmute::<*mut (), FreeFn>(free_fn);
        Some(FnAllocator::new(alloc_fn, free_fn))
    }
}

/// Triangulates a simple polygon given as its outer contour.
///
/// Working memory is freed before returning; only `result.indices` stays allocated.
///
/// # Safety
///
/// `points` must point to `num_points` readable `Vec2`s and `result` must be valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn earcut_create(
    num_points: usize,
    points: *const Vec2,
    result: *mut EarcutResult,
) {
    assert!(num_points >= 3, "earcut_create needs at least 3 points, got {num_points}");
    assert!(!points.is_null(), "earcut_create called with null points");
    assert!(!result.is_null(), "earcut_create called with a null result");
    let Some(allocator) = configured() else {
        panic!("earcut_set_allocator must be called before earcut_create");
    };

    let points = slice::from_raw_parts(points, num_points);
    let mut earcut = Earcut::with_allocator(allocator);
    let triangles = match earcut.triangulate(points.iter().map(|p| [p.x, p.y]), &[] as &[u32]) {
        Ok(triangles) => triangles,
        Err(err) => panic!("earcut_create: {err}"),
    };
    log::debug!("earcut_create: {} triangles", triangles.triangle_count());

    let (indices, num_indices, _) = triangles.into_raw_parts();
    result.write(EarcutResult {
        num_indices,
        indices,
    });
}

/// Returns a result's buffer to the configured free function and clears the record.
///
/// # Safety
///
/// `result` must have been filled by [`earcut_create`] and not freed since.
#[no_mangle]
pub unsafe extern "C" fn earcut_free(result: *mut EarcutResult) {
    assert!(!result.is_null(), "earcut_free called with a null result");
    let result = &mut *result;
    assert!(result.num_indices != 0, "earcut_free called on an empty result");
    assert!(!result.indices.is_null(), "earcut_free called on a released result");
    let Some(allocator) = configured() else {
        panic!("earcut_free called without a configured allocator");
    };

    TriangleIndices::from_raw_parts(result.indices, result.num_indices, allocator).release();
    *result = EarcutResult::EMPTY;
}
