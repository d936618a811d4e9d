use crate::raw::RawStorage;
use std::fmt;
use std::iter::FusedIterator;
use std::ptr;
use std::slice;

/// Owning iterator of [`DynArray`](crate::DynArray).
///
/// Values in `[start, end)` are still live. Whatever is left
/// unconsumed is dropped together with the iterator.
pub struct IntoIter<T> {
    buf: RawStorage<T>,
    start: usize,
    end: usize,
}

impl<T> IntoIter<T> {
    #[inline]
    pub(crate) fn new(buf: RawStorage<T>, len: usize) -> Self {
        IntoIter {
            buf,
            start: 0,
            end: len,
        }
    }

    /// Returns remaining values as slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // # SAFETY
        //
        // Slots [start, end) are live.
        unsafe { slice::from_raw_parts(self.buf.offset(self.start), self.end - self.start) }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        // # SAFETY
        //
        // Slot start is live and leaves the live range right after.
        let value = unsafe { self.buf.offset(self.start).read() };
        self.start += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.start;
        (n, Some(n))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        // # SAFETY
        //
        // Slot end was live and is now out of the live range.
        Some(unsafe { self.buf.offset(self.end).read() })
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let rest = ptr::slice_from_raw_parts_mut(self.buf.offset_mut(self.start), self.end - self.start);
        // # SAFETY
        //
        // Remaining slots are live and dropped exactly once.
        unsafe { ptr::drop_in_place(rest) }
    }
}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}
