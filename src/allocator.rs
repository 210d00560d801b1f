//! The allocation boundary.
//!
//! Every buffer a triangulation needs comes from a [`RawAllocator`], a size-in /
//! pointer-out pair in the shape of C's `malloc`/`free`: the converted input points,
//! the ring nodes, the hole queue, the index scratch and the returned result. The
//! working buffers live in the [`Earcut`](crate::Earcut) context and are reused between
//! calls; the result is handed out as [`TriangleIndices`].

use alloc::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use core::ffi::c_void;
use core::fmt;
use core::mem::{size_of, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::slice;

use crate::error::EarcutError;

/// A caller-controlled allocate/free pair.
///
/// `allocate` may return null to signal failure. Buffers used for indices must be
/// aligned for `u32`; anything else is rejected.
pub trait RawAllocator {
    fn allocate(&self, size: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator and not freed since.
    unsafe fn free(&self, ptr: *mut u8);
}

impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    #[inline]
    fn allocate(&self, size: usize) -> *mut u8 {
        (**self).allocate(size)
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) {
        (**self).free(ptr)
    }
}

const HEADER: usize = 16;

/// The global Rust allocator behind a `free` that needs no size.
///
/// The requested size is stored in a small header in front of the returned buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl SystemAllocator {
    fn layout(size: usize) -> Option<Layout> {
        Layout::from_size_align(size.checked_add(HEADER)?, HEADER).ok()
    }
}

impl RawAllocator for SystemAllocator {
    fn allocate(&self, size: usize) -> *mut u8 {
        let Some(layout) = Self::layout(size) else {
            return ptr::null_mut();
        };
        // SAFETY: the layout is never zero-sized because of the header
        unsafe {
            let base = alloc(layout);
            if base.is_null() {
                return base;
            }
            base.cast::<usize>().write(size);
            base.add(HEADER)
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let base = ptr.sub(HEADER);
        let size = base.cast::<usize>().read();
        if let Some(layout) = Self::layout(size) {
            dealloc(base, layout);
        }
    }
}

/// `void *(*)(size_t)`
pub type AllocFn = unsafe extern "C" fn(size: usize) -> *mut c_void;
/// `void (*)(void *)`
pub type FreeFn = unsafe extern "C" fn(ptr: *mut c_void);

/// A pair of C function pointers used as a [`RawAllocator`].
#[derive(Clone, Copy, Debug)]
pub struct FnAllocator {
    alloc_fn: AllocFn,
    free_fn: FreeFn,
}

impl FnAllocator {
    /// # Safety
    ///
    /// `alloc_fn` must return null or a buffer of at least the requested size, and
    /// `free_fn` must accept every non-null pointer returned by `alloc_fn`.
    pub const unsafe fn new(alloc_fn: AllocFn, free_fn: FreeFn) -> Self {
        Self { alloc_fn, free_fn }
    }
}

impl RawAllocator for FnAllocator {
    fn allocate(&self, size: usize) -> *mut u8 {
        // SAFETY: upheld by the caller of `FnAllocator::new`
        unsafe { (self.alloc_fn)(size).cast() }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        (self.free_fn)(ptr.cast())
    }
}

/// Hands out a buffer for `cap` values of `T`, or the error to report.
fn allocate_array<T>(cap: usize, allocator: &dyn RawAllocator) -> Result<NonNull<T>, EarcutError> {
    let size = cap
        .checked_mul(size_of::<T>())
        .ok_or(EarcutError::AllocationFailed { size: usize::MAX })?;
    let raw = allocator.allocate(size);
    let Some(buf) = NonNull::new(raw.cast::<T>()) else {
        return Err(EarcutError::AllocationFailed { size });
    };
    if !buf.as_ptr().is_aligned() {
        // SAFETY: `raw` came from this allocator just now
        unsafe { allocator.free(raw) };
        return Err(EarcutError::AllocationFailed { size });
    }
    Ok(buf)
}

/// A growable array of plain values whose storage comes from a [`RawAllocator`].
///
/// The buffer does not remember its allocator. Every call that may allocate takes
/// one, and the owner hands the same one to [`free`](Self::free) before dropping the
/// buffer; a buffer dropped without it leaks.
pub(crate) struct Buffer<T> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

// SAFETY: the buffer owns its values like a `Vec` does
unsafe impl<T: Send> Send for Buffer<T> {}
unsafe impl<T: Sync> Sync for Buffer<T> {}

impl<T: Copy> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Buffer<T> {
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
        }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Makes room for at least `additional` more values.
    pub fn try_reserve(
        &mut self,
        additional: usize,
        allocator: &dyn RawAllocator,
    ) -> Result<(), EarcutError> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(EarcutError::AllocationFailed { size: usize::MAX })?;
        if required <= self.cap {
            return Ok(());
        }
        let cap = required.max(self.cap.saturating_mul(2)).max(4);
        let buf = allocate_array::<T>(cap, allocator)?;
        // SAFETY: both buffers hold at least `len` values and are distinct allocations;
        // the old one came from `allocator`
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), buf.as_ptr(), self.len);
            if self.cap != 0 {
                allocator.free(self.ptr.as_ptr().cast());
            }
        }
        self.ptr = buf;
        self.cap = cap;
        Ok(())
    }

    pub fn try_push(&mut self, value: T, allocator: &dyn RawAllocator) -> Result<(), EarcutError> {
        if self.len == self.cap {
            self.try_reserve(1, allocator)?;
        }
        // SAFETY: `len < cap`, so the slot is inside the buffer
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Like [`try_push`](Self::try_push), for the places that cannot report an error.
    /// Running out of memory there aborts, the same way a `Vec` does.
    pub fn push(&mut self, value: T, allocator: &dyn RawAllocator) {
        if self.try_push(value, allocator).is_err() {
            handle_alloc_error(Layout::new::<T>());
        }
    }

    /// Returns the storage to `allocator` and leaves an empty buffer behind.
    ///
    /// # Safety
    ///
    /// `allocator` must be the one every earlier call on this buffer was given.
    pub unsafe fn free(&mut self, allocator: &dyn RawAllocator) {
        if self.cap != 0 {
            allocator.free(self.ptr.as_ptr().cast());
        }
        *self = Self::new();
    }
}

impl<T: Copy> Deref for Buffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: the first `len` values are initialized; an empty buffer is dangling but aligned
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> DerefMut for Buffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, and `&mut self` makes the access unique
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

/// Triangle indices stored in a buffer obtained from a [`RawAllocator`].
///
/// Every three consecutive indices form one triangle. The buffer is returned to the
/// allocator exactly once, either on drop or by [`release`](Self::release). An empty
/// result never touches the allocator.
pub struct TriangleIndices<A: RawAllocator = SystemAllocator> {
    ptr: Option<NonNull<u32>>,
    len: usize,
    allocator: A,
}

impl<A: RawAllocator> TriangleIndices<A> {
    /// Copies `indices` into a fresh buffer from `allocator`.
    pub fn copy_from(indices: &[u32], allocator: A) -> Result<Self, EarcutError> {
        if indices.is_empty() {
            return Ok(Self {
                ptr: None,
                len: 0,
                allocator,
            });
        }
        let buf = allocate_array::<u32>(indices.len(), &allocator)?;
        // SAFETY: `buf` is aligned, holds `indices.len()` values and does not overlap `indices`
        unsafe { ptr::copy_nonoverlapping(indices.as_ptr(), buf.as_ptr(), indices.len()) };

        Ok(Self {
            ptr: Some(buf),
            len: indices.len(),
            allocator,
        })
    }

    /// Takes back ownership of a buffer from [`into_raw_parts`](Self::into_raw_parts).
    ///
    /// # Safety
    ///
    /// `ptr` must be null with `len == 0`, or point to `len` initialized indices
    /// allocated by `allocator` and not owned by anything else.
    pub unsafe fn from_raw_parts(ptr: *mut u32, len: usize, allocator: A) -> Self {
        let ptr = NonNull::new(ptr);
        Self {
            len: if ptr.is_some() { len } else { 0 },
            ptr,
            allocator,
        }
    }

    /// Hands the buffer over to the caller, who becomes responsible for freeing it.
    /// The pointer is null when there are no triangles.
    pub fn into_raw_parts(self) -> (*mut u32, usize, A) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the allocator is moved out exactly once
        let allocator = unsafe { ptr::read(&this.allocator) };
        let ptr = this.ptr.map_or(ptr::null_mut(), NonNull::as_ptr);
        (ptr, this.len, allocator)
    }

    /// Returns the buffer to the allocator.
    pub fn release(self) {
        drop(self)
    }

    pub fn as_slice(&self) -> &[u32] {
        match self.ptr {
            // SAFETY: `ptr` owns `len` initialized indices
            Some(ptr) => unsafe { slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.len / 3
    }

    /// Iterates the triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.as_slice().chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<A: RawAllocator> Deref for TriangleIndices<A> {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        self.as_slice()
    }
}

impl<A: RawAllocator> Drop for TriangleIndices<A> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: the buffer came from `self.allocator` and is freed only here
            unsafe { self.allocator.free(ptr.as_ptr().cast()) };
        }
    }
}

impl<A: RawAllocator> fmt::Debug for TriangleIndices<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.triangles()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct Counting {
        allocs: Cell<usize>,
        frees: Cell<usize>,
    }

    impl RawAllocator for Counting {
        fn allocate(&self, size: usize) -> *mut u8 {
            self.allocs.set(self.allocs.get() + 1);
            SystemAllocator.allocate(size)
        }

        unsafe fn free(&self, ptr: *mut u8) {
            self.frees.set(self.frees.get() + 1);
            SystemAllocator.free(ptr)
        }
    }

    struct Failing;

    impl RawAllocator for Failing {
        fn allocate(&self, _size: usize) -> *mut u8 {
            ptr::null_mut()
        }

        unsafe fn free(&self, _ptr: *mut u8) {
            unreachable!("nothing was allocated")
        }
    }

    /// hands out buffers one byte past a real allocation
    struct Misaligned(Counting);

    impl RawAllocator for Misaligned {
        fn allocate(&self, size: usize) -> *mut u8 {
            let base = self.0.allocate(size + 1);
            base.wrapping_add(1)
        }

        unsafe fn free(&self, ptr: *mut u8) {
            self.0.free(ptr.sub(1))
        }
    }

    #[test]
    fn test_copy_and_drop_frees_once() {
        let counting = Counting::default();
        let result = TriangleIndices::copy_from(&[2, 3, 0, 0, 1, 2], &counting).unwrap();
        assert_eq!(&*result, &[2, 3, 0, 0, 1, 2]);
        assert_eq!(result.triangle_count(), 2);
        assert_eq!(result.triangles().collect::<alloc::vec::Vec<_>>(), [[2, 3, 0], [0, 1, 2]]);
        assert_eq!(counting.allocs.get(), 1);
        result.release();
        assert_eq!(counting.frees.get(), 1);
    }

    #[test]
    fn test_empty_result_skips_allocator() {
        let result = TriangleIndices::copy_from(&[], Failing).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.triangle_count(), 0);
    }

    #[test]
    fn test_null_buffer_is_an_error() {
        let err = TriangleIndices::copy_from(&[0, 1, 2], Failing).unwrap_err();
        assert_eq!(err, EarcutError::AllocationFailed { size: 12 });
    }

    #[test]
    fn test_misaligned_buffer_is_returned() {
        let misaligned = Misaligned(Counting::default());
        let err = TriangleIndices::copy_from(&[0, 1, 2], &misaligned).unwrap_err();
        assert_eq!(err, EarcutError::AllocationFailed { size: 12 });
        assert_eq!(misaligned.0.allocs.get(), 1);
        assert_eq!(misaligned.0.frees.get(), 1);
    }

    #[test]
    fn test_raw_parts_round_trip() {
        let counting = Counting::default();
        let result = TriangleIndices::copy_from(&[0, 1, 2], &counting).unwrap();
        let (ptr, len, allocator) = result.into_raw_parts();
        assert_eq!(len, 3);
        assert_eq!(counting.frees.get(), 0);
        let result = unsafe { TriangleIndices::from_raw_parts(ptr, len, allocator) };
        assert_eq!(&*result, &[0, 1, 2]);
        drop(result);
        assert_eq!(counting.frees.get(), 1);
    }

    #[test]
    fn test_buffer_grows_through_allocator() {
        let counting = Counting::default();
        let mut buffer = Buffer::new();
        for k in 0..100u32 {
            buffer.push(k, &counting);
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer[99], 99);
        assert!(counting.allocs.get() > 1);
        // growing hands the old storage back right away
        assert_eq!(counting.frees.get(), counting.allocs.get() - 1);

        buffer.clear();
        buffer.try_reserve(100, &counting).unwrap();
        assert_eq!(counting.frees.get(), counting.allocs.get() - 1);

        unsafe { buffer.free(&counting) };
        assert_eq!(counting.frees.get(), counting.allocs.get());
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn test_buffer_reports_allocation_failure() {
        let mut buffer: Buffer<[f64; 2]> = Buffer::new();
        assert_eq!(
            buffer.try_reserve(10, &Failing),
            Err(EarcutError::AllocationFailed { size: 10 * 16 })
        );
        assert_eq!(
            buffer.try_push([1.0, 2.0], &Failing),
            Err(EarcutError::AllocationFailed { size: 4 * 16 })
        );
        assert!(buffer.is_empty());

        let misaligned = Misaligned(Counting::default());
        assert!(buffer.try_reserve(1, &misaligned).is_err());
        assert_eq!(misaligned.0.frees.get(), 1);
    }

    #[test]
    fn test_system_allocator_keeps_size_header() {
        let ptr = SystemAllocator.allocate(40);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % HEADER, 0);
        unsafe { SystemAllocator.free(ptr) };
    }
}
