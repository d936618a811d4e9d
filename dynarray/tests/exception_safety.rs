use dynarray::DynArray;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Shared bookkeeping of all values created from one probe.
#[derive(Debug, Default)]
struct Probe {
    live: Cell<isize>,
    clones: Cell<usize>,
    /// Number of clones allowed before the next one panics.
    clone_budget: Cell<Option<usize>>,
}

impl Probe {
    fn new() -> Rc<Self> {
        Rc::new(Probe::default())
    }

    fn make(self: &Rc<Self>, value: u32) -> Tracked {
        self.live.set(self.live.get() + 1);
        Tracked {
            value,
            probe: Rc::clone(self),
        }
    }

    /// Make the k-th clone from now on panic.
    fn arm(&self, k: usize) {
        self.clone_budget.set(Some(k - 1));
    }

    fn disarm(&self) {
        self.clone_budget.set(None);
    }

    fn live(&self) -> isize {
        self.live.get()
    }
}

#[derive(Debug)]
struct Tracked {
    value: u32,
    probe: Rc<Probe>,
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        if let Some(n) = self.probe.clone_budget.get() {
            if n == 0 {
                panic!("clone bomb");
            }
            self.probe.clone_budget.set(Some(n - 1));
        }
        self.probe.clones.set(self.probe.clones.get() + 1);
        self.probe.make(self.value)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.probe.live.set(self.probe.live.get() - 1);
    }
}

fn values(arr: &DynArray<Tracked>) -> Vec<u32> {
    arr.iter().map(|t| t.value).collect()
}

fn filled(probe: &Rc<Probe>, n: u32) -> DynArray<Tracked> {
    let mut arr = DynArray::new();
    for i in 0..n {
        arr.push(probe.make(i));
    }
    arr
}

#[test]
fn test_drop_releases_every_value_once() {
    let probe = Probe::new();
    {
        let mut arr = filled(&probe, 10);
        arr.insert(3, probe.make(100));
        arr.erase(0);
        drop(arr.pop());
        arr.truncate(5);
        arr.resize_with(7, || probe.make(7));
        let copy = arr.clone();
        assert_eq!(14, probe.live());
        let mut it = copy.into_iter();
        it.next();
        drop(it);
        assert_eq!(7, probe.live());
    }
    assert_eq!(0, probe.live());
}

#[test]
fn test_reserve_relocates_without_clone() {
    let probe = Probe::new();
    let mut arr = filled(&probe, 5);
    probe.arm(1);
    arr.reserve(64);
    assert_eq!(64, arr.capacity());
    assert_eq!(vec![0, 1, 2, 3, 4], values(&arr));
    assert_eq!(0, probe.clones.get());
    assert_eq!(5, probe.live());
}

#[test]
fn test_reserve_failure_keeps_state() {
    let probe = Probe::new();
    let mut arr = filled(&probe, 3);
    let cap = arr.capacity();
    let ptr = arr.as_ptr();
    assert!(arr.try_reserve(usize::MAX).is_err());
    assert_eq!(cap, arr.capacity());
    assert_eq!(ptr, arr.as_ptr());
    assert_eq!(vec![0, 1, 2], values(&arr));
    assert_eq!(3, probe.live());
}

#[test]
fn test_clone_panic_keeps_source() {
    let probe = Probe::new();
    let arr = filled(&probe, 5);
    probe.arm(3);
    let res = catch_unwind(AssertUnwindSafe(|| arr.clone()));
    assert!(res.is_err());
    probe.disarm();
    assert_eq!(vec![0, 1, 2, 3, 4], values(&arr));
    assert_eq!(5, probe.live());
}

#[test]
fn test_clone_from_panic_with_growth() {
    let probe = Probe::new();
    let src = filled(&probe, 6);
    let mut dst = filled(&probe, 2);
    let cap = dst.capacity();
    probe.arm(4);
    let res = catch_unwind(AssertUnwindSafe(|| dst.clone_from(&src)));
    assert!(res.is_err());
    probe.disarm();
    assert_eq!(vec![0, 1], values(&dst));
    assert_eq!(cap, dst.capacity());
    assert_eq!(8, probe.live());
}

#[test]
fn test_clone_from_panic_in_place() {
    let probe = Probe::new();
    let src = filled(&probe, 4);
    let mut dst = DynArray::with_capacity(8);
    dst.push(probe.make(9));
    probe.arm(3);
    let res = catch_unwind(AssertUnwindSafe(|| dst.clone_from(&src)));
    assert!(res.is_err());
    probe.disarm();
    // prefix was assigned, the partially built tail was dropped
    assert_eq!(vec![0], values(&dst));
    assert_eq!(5, probe.live());
}

#[test]
fn test_emplace_back_panic() {
    let probe = Probe::new();
    // full array takes the growth path
    let mut arr = filled(&probe, 4);
    assert_eq!(arr.len(), arr.capacity());
    let ptr = arr.as_ptr();
    let res = catch_unwind(AssertUnwindSafe(|| {
        arr.emplace_back_with(|| panic!("constructor"));
    }));
    assert!(res.is_err());
    assert_eq!(4, arr.capacity());
    assert_eq!(ptr, arr.as_ptr());
    assert_eq!(vec![0, 1, 2, 3], values(&arr));

    // spare capacity takes the in-place path
    arr.reserve(8);
    let res = catch_unwind(AssertUnwindSafe(|| {
        arr.emplace_back_with(|| panic!("constructor"));
    }));
    assert!(res.is_err());
    assert_eq!(vec![0, 1, 2, 3], values(&arr));
    assert_eq!(4, probe.live());
}

#[test]
fn test_emplace_panic() {
    let probe = Probe::new();
    let mut arr = filled(&probe, 4);
    let ptr = arr.as_ptr();
    let res = catch_unwind(AssertUnwindSafe(|| {
        arr.emplace_with(1, || panic!("constructor"));
    }));
    assert!(res.is_err());
    assert_eq!(4, arr.capacity());
    assert_eq!(ptr, arr.as_ptr());
    assert_eq!(vec![0, 1, 2, 3], values(&arr));

    arr.reserve(8);
    let res = catch_unwind(AssertUnwindSafe(|| {
        arr.emplace_with(1, || panic!("constructor"));
    }));
    assert!(res.is_err());
    assert_eq!(vec![0, 1, 2, 3], values(&arr));
    assert_eq!(4, probe.live());

    arr.emplace_with(1, || probe.make(42));
    assert_eq!(vec![0, 42, 1, 2, 3], values(&arr));
}

#[test]
fn test_resize_with_panic() {
    let probe = Probe::new();
    let mut arr = filled(&probe, 2);
    let mut n = 0;
    let res = catch_unwind(AssertUnwindSafe(|| {
        arr.resize_with(6, || {
            n += 1;
            if n == 3 {
                panic!("constructor");
            }
            probe.make(n)
        });
    }));
    assert!(res.is_err());
    assert_eq!(vec![0, 1], values(&arr));
    assert_eq!(6, arr.capacity());
    assert_eq!(2, probe.live());
}

#[test]
fn test_extend_from_slice_panic() {
    let probe = Probe::new();
    let src = filled(&probe, 3);
    let mut arr = filled(&probe, 1);
    probe.arm(2);
    let res = catch_unwind(AssertUnwindSafe(|| arr.extend_from_slice(&src)));
    assert!(res.is_err());
    probe.disarm();
    assert_eq!(vec![0], values(&arr));
    assert_eq!(4, probe.live());
}

#[test]
fn test_from_elem_panic() {
    let probe = Probe::new();
    let elem = probe.make(1);
    probe.arm(2);
    let res = catch_unwind(AssertUnwindSafe(|| DynArray::from_elem(elem, 4)));
    assert!(res.is_err());
    assert_eq!(0, probe.live());
}
