//! A growable contiguous array built on explicitly managed raw storage.
//!
//! [`RawStorage`] owns an uninitialized memory block and only computes
//! slot addresses. [`DynArray`] owns one such storage plus the count of
//! live elements, and implements growth, construction and destruction
//! on top of it. Reallocation always completes in a fresh storage before
//! it is swapped in, so a failed allocation or a panicking element
//! constructor leaves the array unchanged.
#[macro_use]
mod macros;

pub mod array;
pub mod error;
pub mod growth;
pub mod iter;
pub mod raw;

pub use array::DynArray;
pub use error::{Error, Result};
pub use iter::IntoIter;
pub use raw::RawStorage;
