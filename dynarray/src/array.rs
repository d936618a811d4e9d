use crate::error::{handle_alloc, Error, Result};
use crate::growth;
use crate::iter::IntoIter;
use crate::raw::RawStorage;
use scopeguard::ScopeGuard;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::ptr;
use std::slice::{self, SliceIndex};

/// DynArray is a growable array over a single [`RawStorage`].
///
/// Slots `[0, len)` always hold live values, slots `[len, capacity)`
/// are allocated but uninitialized. Capacity only grows, either by
/// explicit reserve/resize or when pushing or inserting into a full
/// array, which follows the policy in [`growth`].
///
/// Any reallocation builds the new block completely before swapping it
/// in, so a panicking element constructor or a failed allocation leaves
/// the array as it was.
pub struct DynArray<T> {
    buf: RawStorage<T>,
    len: usize,
}

impl<T> DynArray<T> {
    /// Create an empty array without allocation.
    #[inline]
    pub const fn new() -> Self {
        DynArray {
            buf: RawStorage::new(),
            len: 0,
        }
    }

    /// Create an empty array with room for `cap` elements.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        DynArray {
            buf: RawStorage::with_capacity(cap),
            len: 0,
        }
    }

    /// Create an array of `len` default values.
    /// Capacity equals to length.
    #[inline]
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        let mut arr = Self::with_capacity(len);
        // # SAFETY
        //
        // Slots [0, len) are allocated and uninitialized.
        unsafe { construct_n(arr.buf.as_mut_ptr(), len, |_| T::default()) };
        arr.len = len;
        arr
    }

    /// Create an array of `n` copies of `elem`.
    #[inline]
    pub fn from_elem(elem: T, n: usize) -> Self
    where
        T: Clone,
    {
        let mut arr = Self::with_capacity(n);
        if n > 0 {
            // # SAFETY
            //
            // Slots [0, n) are allocated and uninitialized. The last
            // slot takes the original value.
            unsafe {
                construct_n(arr.buf.as_mut_ptr(), n - 1, |_| elem.clone());
                arr.buf.write(n - 1, elem);
            }
            arr.len = n;
        }
        arr
    }

    /// Returns number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns number of elements the array can hold without reallocation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.as_mut_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // # SAFETY
        //
        // Slots [0, len) are live, and the pointer is aligned and
        // non-null even if nothing is allocated.
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // # SAFETY
        //
        // Slots [0, len) are live, and the pointer is aligned and
        // non-null even if nothing is allocated.
        unsafe { slice::from_raw_parts_mut(self.buf.as_mut_ptr(), self.len) }
    }

    /// Make sure capacity is at least `cap`.
    ///
    /// Exactly `cap` slots are allocated if the array has to grow.
    /// No-op if current capacity is sufficient.
    #[inline]
    pub fn reserve(&mut self, cap: usize) {
        handle_alloc(self.try_reserve(cap))
    }

    /// Fallible version of [`reserve`](Self::reserve).
    /// The array is unchanged on error.
    pub fn try_reserve(&mut self, cap: usize) -> Result<()> {
        if cap <= self.capacity() {
            return Ok(());
        }
        let mut new_buf = RawStorage::try_with_capacity(cap)?;
        log::trace!(
            "dynarray reserves {} slots, relocating {} of {}",
            cap,
            self.len,
            self.capacity()
        );
        // # SAFETY
        //
        // New storage holds at least len slots and does not overlap.
        // The old slots are vacated and the old block is released
        // without dropping them.
        unsafe { relocate(self.buf.as_ptr(), new_buf.as_mut_ptr(), self.len) };
        self.buf.swap(&mut new_buf);
        Ok(())
    }

    /// Change length to `new_len`.
    ///
    /// Extra elements are dropped when shrinking, capacity is kept.
    /// When growing, exactly `new_len` slots are reserved and the tail
    /// is filled with values returned by `f`. If `f` panics, the values
    /// it already produced are dropped and length is unchanged.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len;
        if new_len <= len {
            self.truncate(new_len);
            return;
        }
        self.reserve(new_len);
        // # SAFETY
        //
        // Slots [len, new_len) are allocated and uninitialized.
        unsafe { construct_n(self.buf.offset_mut(len), new_len - len, |_| f()) };
        self.len = new_len;
    }

    /// Change length to `new_len`, filling the tail with default values.
    #[inline]
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default)
    }

    /// Drop elements from `len` to the end.
    /// No-op if `len` is not less than current length.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(self.buf.offset_mut(len), self.len - len);
        // Length shrinks first, so a panicking destructor never
        // exposes a dropped slot.
        self.len = len;
        // # SAFETY
        //
        // Tail slots were live and are now out of the live range.
        unsafe { ptr::drop_in_place(tail) }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0)
    }

    /// Append a value built by `f` and returns reference to it.
    ///
    /// On a full array the value is constructed directly in its slot of
    /// the grown storage before existing elements are relocated, so if
    /// `f` panics nothing has changed.
    #[inline]
    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        handle_alloc(self.try_emplace_back_with(f))
    }

    /// Fallible version of [`emplace_back_with`](Self::emplace_back_with).
    /// `f` is not called if growth fails.
    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        let len = self.len;
        if len == self.capacity() {
            let mut new_buf = self.alloc_growth()?;
            // # SAFETY
            //
            // Slot len of the new storage is free. Old slots [0, len)
            // are moved into the new storage and vacated.
            unsafe {
                new_buf.write(len, f());
                relocate(self.buf.as_ptr(), new_buf.as_mut_ptr(), len);
            }
            self.buf.swap(&mut new_buf);
        } else {
            // # SAFETY
            //
            // Slot len is allocated and uninitialized.
            unsafe { self.buf.write(len, f()) };
        }
        self.len = len + 1;
        // # SAFETY
        //
        // Slot len was just constructed.
        Ok(unsafe { &mut *self.buf.offset_mut(len) })
    }

    /// Append a value to the end.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.emplace_back_with(|| value);
    }

    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<()> {
        self.try_emplace_back_with(|| value).map(|_| ())
    }

    /// Remove the last element and returns it, or None if empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // # SAFETY
        //
        // The slot was live and is now out of the live range.
        Some(unsafe { self.buf.offset(self.len).read() })
    }

    /// Insert a value built by `f` at position `index`, shifting all
    /// elements after it to the right. Returns reference to the inserted
    /// value.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[inline]
    pub fn emplace_with<F>(&mut self, index: usize, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        handle_alloc(self.try_emplace_with(index, f))
    }

    /// Fallible version of [`emplace_with`](Self::emplace_with).
    /// `f` is not called if growth fails.
    pub fn try_emplace_with<F>(&mut self, index: usize, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        let len = self.len;
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        if index == len {
            return self.try_emplace_back_with(f);
        }
        if len == self.capacity() {
            let mut new_buf = self.alloc_growth()?;
            // # SAFETY
            //
            // The new value goes to its final slot first. Then prefix and
            // suffix are moved around it, relocation cannot fail.
            unsafe {
                new_buf.write(index, f());
                relocate(self.buf.as_ptr(), new_buf.as_mut_ptr(), index);
                relocate(
                    self.buf.offset(index),
                    new_buf.offset_mut(index + 1),
                    len - index,
                );
            }
            self.buf.swap(&mut new_buf);
        } else {
            let value = f();
            // # SAFETY
            //
            // Slot len is free, so [index, len) shifts one slot right
            // and the vacated slot at index takes the new value.
            unsafe {
                let p = self.buf.offset_mut(index);
                ptr::copy(p, p.add(1), len - index);
                p.write(value);
            }
        }
        self.len = len + 1;
        // # SAFETY
        //
        // Slot index was just constructed.
        Ok(unsafe { &mut *self.buf.offset_mut(index) })
    }

    /// Insert `value` at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[inline]
    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        self.emplace_with(index, || value)
    }

    /// Remove element at `index` and returns it, shifting all elements
    /// after it to the left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );
        // # SAFETY
        //
        // Slot index is live. After reading it out, [index + 1, len)
        // shifts one slot left and the last slot leaves the live range.
        unsafe {
            let p = self.buf.offset_mut(index);
            let value = p.read();
            ptr::copy(p.add(1), p, len - index - 1);
            self.len = len - 1;
            value
        }
    }

    /// Drop element at `index`.
    /// Returns the position of the element that followed it, which is
    /// `index` itself, or the new length if the last one was erased.
    #[inline]
    pub fn erase(&mut self, index: usize) -> usize {
        drop(self.remove(index));
        index
    }

    /// Exchange contents with another array in constant time.
    #[inline]
    pub fn swap_with(&mut self, other: &mut Self) {
        self.buf.swap(&mut other.buf);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Append clones of all values in `other`.
    pub fn extend_from_slice(&mut self, other: &[T])
    where
        T: Clone,
    {
        let len = self.len;
        handle_alloc(self.try_grow_amortized(other.len()));
        let new_len = len + other.len();
        // # SAFETY
        //
        // Slots [len, new_len) are allocated and uninitialized.
        unsafe { construct_n(self.buf.offset_mut(len), other.len(), |i| other[i].clone()) };
        self.len = new_len;
    }

    /// Split into storage and length without dropping any element.
    #[inline]
    pub(crate) fn into_raw_parts(self) -> (RawStorage<T>, usize) {
        let mut arr = ManuallyDrop::new(self);
        let buf = mem::take(&mut arr.buf);
        (buf, arr.len)
    }

    /// Make room for `additional` more elements. Unlike `reserve`, the
    /// array grows at least as much as a push on a full array would.
    fn try_grow_amortized(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow(self.len))?;
        if needed <= self.capacity() {
            return Ok(());
        }
        let cap = needed.max(growth::next_capacity(self.capacity())?);
        self.try_reserve(cap)
    }

    #[inline]
    fn alloc_growth(&self) -> Result<RawStorage<T>> {
        let cap = growth::next_capacity(self.capacity())?;
        log::trace!(
            "dynarray grows from {} to {} slots, relocating {}",
            self.capacity(),
            cap,
            self.len
        );
        RawStorage::try_with_capacity(cap)
    }
}

/// Transfer `count` values from `src` to `dst`.
///
/// Moving a value in Rust is a bitwise copy that never fails, so
/// relocation always moves and never clones. Source slots are vacated
/// and must not be dropped afterwards.
#[inline]
unsafe fn relocate<T>(src: *const T, dst: *mut T, count: usize) {
    ptr::copy_nonoverlapping(src, dst, count)
}

/// Construct `n` values returned by `f` into consecutive slots from `dst`.
///
/// If `f` panics, the values this call already constructed are dropped
/// before the panic continues, so all `n` slots are uninitialized again.
///
/// # Safety
///
/// `dst` must be valid for writes of `n` elements, none of which holds
/// a live value.
unsafe fn construct_n<T, F>(dst: *mut T, n: usize, mut f: F)
where
    F: FnMut(usize) -> T,
{
    let mut done = scopeguard::guard(0usize, |done| {
        // # SAFETY
        //
        // Exactly `done` leading slots were constructed.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(dst, done)) }
    });
    while *done < n {
        let value = f(*done);
        dst.add(*done).write(value);
        *done += 1;
    }
    ScopeGuard::into_inner(done);
}

impl<T> Drop for DynArray<T> {
    #[inline]
    fn drop(&mut self) {
        // # SAFETY
        //
        // All live elements are dropped exactly once, the storage
        // releases its memory afterwards.
        unsafe { ptr::drop_in_place(self.as_mut_slice()) }
    }
}

impl<T> Default for DynArray<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy with capacity equal to source length.
impl<T: Clone> Clone for DynArray<T> {
    fn clone(&self) -> Self {
        let src = self.as_slice();
        let mut buf = RawStorage::with_capacity(src.len());
        // # SAFETY
        //
        // Slots [0, len) of the new storage are uninitialized.
        unsafe { construct_n(buf.as_mut_ptr(), src.len(), |i| src[i].clone()) };
        DynArray { buf, len: src.len() }
    }

    /// Reuse existing storage if it is large enough, otherwise
    /// swap in a full copy of source.
    fn clone_from(&mut self, source: &Self) {
        if self.capacity() < source.len {
            let mut copy = source.clone();
            self.swap_with(&mut copy);
            return;
        }
        if source.len < self.len {
            self.as_mut_slice()[..source.len].clone_from_slice(source);
            self.truncate(source.len);
        } else {
            let (prefix, tail) = source.split_at(self.len);
            self.as_mut_slice().clone_from_slice(prefix);
            let len = self.len;
            // # SAFETY
            //
            // Capacity is sufficient and slots [len, source.len) are
            // uninitialized.
            unsafe { construct_n(self.buf.offset_mut(len), tail.len(), |i| tail[i].clone()) };
            self.len = source.len;
        }
    }
}

impl<T> Deref for DynArray<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynArray<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>> Index<I> for DynArray<T> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, I: SliceIndex<[T]>> IndexMut<I> for DynArray<T> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T> AsRef<[T]> for DynArray<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T> AsMut<[T]> for DynArray<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}

impl<T: PartialEq> PartialEq for DynArray<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynArray<T> {}

impl<T: PartialEq> PartialEq<[T]> for DynArray<T> {
    #[inline]
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, const N: usize> PartialEq<[T; N]> for DynArray<T> {
    #[inline]
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq> PartialEq<Vec<T>> for DynArray<T> {
    #[inline]
    fn eq(&self, other: &Vec<T>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Hash> Hash for DynArray<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(self.as_slice(), state)
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arr = DynArray::new();
        arr.extend(iter);
        arr
    }
}

impl<T> Extend<T> for DynArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        handle_alloc(self.try_grow_amortized(lower));
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T: Copy + 'a> Extend<&'a T> for DynArray<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl<T> From<Vec<T>> for DynArray<T> {
    #[inline]
    fn from(src: Vec<T>) -> Self {
        src.into_iter().collect()
    }
}

impl<T, const N: usize> From<[T; N]> for DynArray<T> {
    #[inline]
    fn from(src: [T; N]) -> Self {
        src.into_iter().collect()
    }
}

impl<T: Clone> From<&[T]> for DynArray<T> {
    #[inline]
    fn from(src: &[T]) -> Self {
        let mut arr = DynArray::with_capacity(src.len());
        arr.extend_from_slice(src);
        arr
    }
}

impl<T> IntoIterator for DynArray<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    #[inline]
    fn into_iter(self) -> IntoIter<T> {
        let (buf, len) = self.into_raw_parts();
        IntoIter::new(buf, len)
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynArray<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}
