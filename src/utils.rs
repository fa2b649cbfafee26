use std::alloc::{alloc_zeroed, dealloc, realloc, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::buffer::Element;
use crate::error::{allocation_error, invalid_argument, Result};

/// Byte alignment requested for sample and result storage.
///
/// The value is validated once, at the boundary where it enters the library:
/// it must be positive and a power of two. The alignment actually used for a
/// buffer is never smaller than the natural alignment of its element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment(usize);

impl Alignment {
    /// Validates a caller-supplied byte count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BenchError::InvalidArgument`] if `bytes <= 0` or if
    /// `bytes` is not a power of two.
    pub fn new(bytes: i64) -> Result<Self> {
        if bytes <= 0 {
            return Err(invalid_argument(format!(
                "alignment must be positive, got {bytes}"
            )));
        }
        let bytes = usize::try_from(bytes)
            .map_err(|_| invalid_argument(format!("alignment {bytes} is too large")))?;
        if !bytes.is_power_of_two() {
            return Err(invalid_argument(format!(
                "alignment must be a power of two, got {bytes}"
            )));
        }
        Ok(Alignment(bytes))
    }

    /// The requested alignment in bytes.
    pub fn bytes(self) -> usize {
        self.0
    }

    /// The alignment used for a buffer of `T`.
    pub fn for_type<T>(self) -> usize {
        self.0.max(mem::align_of::<T>())
    }
}

impl Default for Alignment {
    /// Pointer-sized alignment, the same default `aligned_alloc` callers use.
    fn default() -> Self {
        Alignment(mem::size_of::<*const ()>())
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An owned, contiguous, over-aligned array of floating-point elements.
///
/// `AlignedVec<T>` allocates through the global allocator with a caller
/// supplied alignment, zero-initialises every slot it hands out, and grows
/// geometrically on [`push`](AlignedVec::push). Growth failures are returned
/// as errors instead of aborting, and a failed growth leaves the existing
/// contents untouched, so a buffer is never silently truncated.
///
/// # Memory Safety
///
/// - Allocation and deallocation always use the same [`Layout`], derived from
///   the capacity and the alignment recorded at construction.
/// - The allocated size is padded up to a multiple of the alignment.
/// - Element types are restricted to [`Element`] (`f32` / `f64`), for which
///   the all-zero bit pattern is a valid value (`+0.0`).
pub struct AlignedVec<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    align: usize,
    _marker: PhantomData<T>,
}

// SAFETY: `AlignedVec<T>` uniquely owns its allocation, like `Vec<T>`.
unsafe impl<T: Element> Send for AlignedVec<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Element> Sync for AlignedVec<T> {}

impl<T: Element> AlignedVec<T> {
    /// Creates an empty vector with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the size overflows or the allocator
    /// fails.
    pub fn with_capacity(capacity: usize, alignment: Alignment) -> Result<Self> {
        let align = alignment.for_type::<T>();
        let ptr = Self::allocate(capacity, align)?;
        Ok(AlignedVec {
            ptr,
            len: 0,
            cap: capacity,
            align,
            _marker: PhantomData,
        })
    }

    /// Creates a vector of `len` zeros.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the size overflows or the allocator
    /// fails.
    pub fn zeroed(len: usize, alignment: Alignment) -> Result<Self> {
        let mut v = Self::with_capacity(len, alignment)?;
        // Memory from `alloc_zeroed` already holds `+0.0` in every slot.
        v.len = len;
        Ok(v)
    }

    /// Copies `values` into a new aligned vector.
    pub fn from_slice(values: &[T], alignment: Alignment) -> Result<Self> {
        let mut v = Self::zeroed(values.len(), alignment)?;
        v.copy_from_slice(values);
        Ok(v)
    }

    /// Appends an element, doubling the capacity when full.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the buffer cannot grow. The vector is
    /// left unchanged in that case.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            let new_cap = if self.cap == 0 {
                4
            } else {
                self.cap.checked_mul(2).ok_or_else(|| {
                    allocation_error(usize::MAX, self.align, "capacity overflow")
                })?
            };
            self.grow(new_cap)?;
        }
        // SAFETY: len < cap after the growth above.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Number of elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the vector holds no elements.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current allocation can hold.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Alignment of the allocation in bytes.
    pub fn alignment(&self) -> usize {
        self.align
    }

    fn layout(capacity: usize, align: usize) -> Result<Layout> {
        let size = capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or_else(|| allocation_error(usize::MAX, align, "size overflow"))?;
        let layout = Layout::from_size_align(size, align)
            .map_err(|e| allocation_error(size, align, e.to_string()))?;
        Ok(layout.pad_to_align())
    }

    fn dangling(align: usize) -> NonNull<T> {
        // A non-null address that satisfies `align`, never dereferenced.
        let p = ptr::null_mut::<u8>().wrapping_add(align).cast::<T>();
        NonNull::new(p).unwrap_or(NonNull::dangling())
    }

    fn allocate(capacity: usize, align: usize) -> Result<NonNull<T>> {
        let layout = Self::layout(capacity, align)?;
        if layout.size() == 0 {
            return Ok(Self::dangling(align));
        }
        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        NonNull::new(raw.cast::<T>())
            .ok_or_else(|| allocation_error(layout.size(), align, "allocator returned null"))
    }

    fn grow(&mut self, new_cap: usize) -> Result<()> {
        let new_layout = Self::layout(new_cap, self.align)?;
        if self.cap == 0 {
            self.ptr = Self::allocate(new_cap, self.align)?;
            self.cap = new_cap;
            return Ok(());
        }
        let old_layout = Self::layout(self.cap, self.align)?;
        // SAFETY: `ptr` was allocated with `old_layout`; `realloc` keeps its
        // alignment, and the new size is non-zero and padded.
        let raw = unsafe { realloc(self.ptr.as_ptr().cast(), old_layout, new_layout.size()) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or_else(|| {
            allocation_error(new_layout.size(), self.align, "failed to grow sample storage")
        })?;
        // SAFETY: the tail past the old allocation is uninitialised; zero it.
        unsafe {
            let tail = old_layout.size();
            ptr.as_ptr()
                .cast::<u8>()
                .add(tail)
                .write_bytes(0, new_layout.size() - tail);
        }
        self.ptr = ptr;
        self.cap = new_cap;
        Ok(())
    }
}

impl<T: Element> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.cap, self.align) {
            if layout.size() > 0 {
                // SAFETY: allocated with this exact layout.
                unsafe { dealloc(self.ptr.as_ptr().cast(), layout) };
            }
        }
    }
}

impl<T: Element> Deref for AlignedVec<T> {
    type Target = [T];
    fn deref(&self) -> &Self::Target {
        // SAFETY: the first `len` elements are initialised.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: unique access, first `len` elements initialised.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> fmt::Debug for AlignedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
