use std::alloc::Layout;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("capacity overflow({0})")]
    CapacityOverflow(usize),
    #[error("insufficient memory({} bytes)", .0.size())]
    InsufficientMemory(Layout),
}

/// Unwrap the result of an allocating operation.
///
/// Overflow panics, exhausted memory goes to the global
/// allocation error handler, which never returns.
#[inline]
pub(crate) fn handle_alloc<T>(res: Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(Error::CapacityOverflow(_)) => capacity_overflow(),
        Err(Error::InsufficientMemory(layout)) => std::alloc::handle_alloc_error(layout),
    }
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}
