use crate::error::{handle_alloc, Error, Result};
use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::mem::{self, size_of, MaybeUninit};
use std::ptr::NonNull;

/// RawStorage owns one uninitialized memory block sized for
/// `capacity` elements of type T.
///
/// It only computes addresses. It never reads a slot, never constructs
/// into one on its own and never runs element destructors, so whoever
/// holds it must track which slots are live and drop them before the
/// storage goes away.
///
/// Ownership of the block is exclusive and is only ever moved or
/// swapped. There is no way to duplicate it:
///
/// ```compile_fail
/// use dynarray::RawStorage;
///
/// let a = RawStorage::<u32>::with_capacity(4);
/// let b = a.clone();
/// ```
pub struct RawStorage<T> {
    /// Dangling when nothing is allocated.
    ptr: NonNull<T>,
    cap: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for RawStorage<T> {}
unsafe impl<T: Sync> Sync for RawStorage<T> {}

impl<T> Drop for RawStorage<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(layout) = self.allocated_layout() {
            // # SAFETY
            //
            // The pointer was returned by the global allocator with
            // exactly this layout and is released only here.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout) }
        }
    }
}

impl<T> Default for RawStorage<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RawStorage<T> {
    /// Create an empty storage without allocation.
    #[inline]
    pub const fn new() -> Self {
        RawStorage {
            ptr: NonNull::dangling(),
            cap: 0,
            _marker: PhantomData,
        }
    }

    /// Create a storage for `cap` elements.
    /// The memory is allocated immediately and left uninitialized.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        handle_alloc(Self::try_with_capacity(cap))
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// Zero capacity and zero-sized types never call the allocator.
    pub fn try_with_capacity(cap: usize) -> Result<Self> {
        if cap == 0 {
            return Ok(Self::new());
        }
        let layout = Layout::array::<T>(cap).map_err(|_| Error::CapacityOverflow(cap))?;
        if layout.size() == 0 {
            return Ok(RawStorage {
                ptr: NonNull::dangling(),
                cap,
                _marker: PhantomData,
            });
        }
        // # SAFETY
        //
        // Layout size is non-zero as checked above.
        let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();
        let ptr = NonNull::new(ptr).ok_or(Error::InsufficientMemory(layout))?;
        Ok(RawStorage {
            ptr,
            cap,
            _marker: PhantomData,
        })
    }

    /// Returns number of elements the storage can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns base address of the storage.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns mutable base address of the storage.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns address of slot at given offset.
    ///
    /// One-past-end is a valid address but must never be dereferenced.
    #[inline]
    pub fn offset(&self, offset: usize) -> *const T {
        debug_assert!(offset <= self.cap);
        // # SAFETY
        //
        // Offset is within the allocated block or one past its end.
        unsafe { self.ptr.as_ptr().add(offset) }
    }

    /// Returns mutable address of slot at given offset.
    #[inline]
    pub fn offset_mut(&mut self, offset: usize) -> *mut T {
        debug_assert!(offset <= self.cap);
        // # SAFETY
        //
        // Offset is within the allocated block or one past its end.
        unsafe { self.ptr.as_ptr().add(offset) }
    }

    /// Returns the slot at given index.
    /// Whether the slot holds a live value is not known here.
    #[inline]
    pub fn slot(&self, index: usize) -> &MaybeUninit<T> {
        assert!(index < self.cap);
        // # SAFETY
        //
        // Index is in bound and MaybeUninit has no validity requirement.
        unsafe { &*self.offset(index).cast::<MaybeUninit<T>>() }
    }

    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> &mut MaybeUninit<T> {
        assert!(index < self.cap);
        // # SAFETY
        //
        // Index is in bound and MaybeUninit has no validity requirement.
        unsafe { &mut *self.offset_mut(index).cast::<MaybeUninit<T>>() }
    }

    /// Construct value in slot at given index and returns reference to it.
    ///
    /// # Safety
    ///
    /// Caller must guarantee the slot does not hold a live value,
    /// otherwise that value is leaked. The returned value is owned
    /// by the caller from now on: it must be dropped before the
    /// storage is released.
    #[inline]
    pub unsafe fn write(&mut self, index: usize, value: T) -> &mut T {
        self.slot_mut(index).write(value)
    }

    /// Exchange the memory blocks of two storages.
    /// Elements are not touched.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.cap, &mut other.cap);
    }

    #[inline]
    fn allocated_layout(&self) -> Option<Layout> {
        if self.cap == 0 || size_of::<T>() == 0 {
            return None;
        }
        // # SAFETY
        //
        // The same layout was successfully computed at allocation.
        Some(unsafe {
            Layout::from_size_align_unchecked(size_of::<T>() * self.cap, mem::align_of::<T>())
        })
    }
}
