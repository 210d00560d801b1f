use std::ffi::c_void;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

use zearcut::ffi::{earcut_create, earcut_free, earcut_set_allocator, EarcutResult, Vec2};
use zearcut::{RawAllocator, SystemAllocator};

static ALLOCS: AtomicUsize = AtomicUsize::new(0);
static FREES: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn counting_alloc(size: usize) -> *mut c_void {
    ALLOCS.fetch_add(1, Ordering::SeqCst);
    SystemAllocator.allocate(size).cast()
}

unsafe extern "C" fn counting_free(ptr: *mut c_void) {
    FREES.fetch_add(1, Ordering::SeqCst);
    SystemAllocator.free(ptr.cast())
}

fn live() -> usize {
    ALLOCS.load(Ordering::SeqCst) - FREES.load(Ordering::SeqCst)
}

fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2 { x, y }
}

// the allocator is process-wide, so everything runs in one test
#[test]
fn create_and_free_through_c_abi() {
    earcut_set_allocator(Some(counting_alloc), Some(counting_free));

    let square = [vec2(0.0, 0.0), vec2(100.0, 0.0), vec2(100.0, 100.0), vec2(0.0, 100.0)];
    let mut result = EarcutResult::default();
    unsafe { earcut_create(square.len(), square.as_ptr(), &mut result) };
    assert_eq!(result.num_indices, 6);
    // working memory went through the same pair and is back already
    assert!(ALLOCS.load(Ordering::SeqCst) > 1);
    assert_eq!(live(), 1);
    let indices = unsafe { slice::from_raw_parts(result.indices, result.num_indices) };
    assert_eq!(indices, &[2, 3, 0, 0, 1, 2]);

    unsafe { earcut_free(&mut result) };
    assert_eq!(live(), 0);
    assert_eq!(result.num_indices, 0);
    assert!(result.indices.is_null());

    // no result buffer for a flat polygon
    let flat = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(2.0, 0.0)];
    unsafe { earcut_create(flat.len(), flat.as_ptr(), &mut result) };
    assert_eq!(result.num_indices, 0);
    assert!(result.indices.is_null());
    assert_eq!(live(), 0);

    // clockwise input comes back in the same winding
    let triangle = [vec2(0.0, 0.0), vec2(0.0, 10.0), vec2(10.0, 0.0)];
    unsafe { earcut_create(triangle.len(), triangle.as_ptr(), &mut result) };
    assert_eq!(result.num_indices, 3);
    let mut indices = unsafe { slice::from_raw_parts(result.indices, 3) }.to_vec();
    indices.sort_unstable();
    assert_eq!(indices, [0, 1, 2]);
    unsafe { earcut_free(&mut result) };

    assert_eq!(ALLOCS.load(Ordering::SeqCst), FREES.load(Ordering::SeqCst));
}
