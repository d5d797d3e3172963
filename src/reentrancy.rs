//! Debug-only reentrancy detection for chain walks.
//!
//! While the map walks or relinks a chain it calls into user code
//! (`K: Eq`, `K: Hash`, `S: BuildHasher`). A key whose `eq` reaches back
//! into the same map would observe half-relinked buckets, so every public
//! entry point holds an [`OpGuard`] for its duration. In debug builds a
//! nested `enter` panics and names both operations. In release builds the
//! tracker is zero-sized and `enter` does nothing.

use core::marker::PhantomData;
#[cfg(debug_assertions)]
use core::cell::Cell;

/// Per-map tracker of the operation currently walking the table.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // The map is single-threaded; this keeps it !Send + !Sync.
    _single_threaded: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _single_threaded: PhantomData,
        }
    }

    /// Marks `op` as running until the returned guard is dropped.
    ///
    /// Panics in debug builds if another operation is already running on the
    /// same map.
    #[inline]
    pub fn enter(&self, op: &'static str) -> OpGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(current) = self.active.get() {
                panic!("reentrant call to `{op}` while `{current}` is walking the table");
            }
            self.active.set(Some(op));
            return OpGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return OpGuard { _owner: PhantomData };
        }
    }

    /// Name of the operation currently holding the guard, if any.
    #[cfg(all(test, debug_assertions))]
    pub fn active(&self) -> Option<&'static str> {
        self.active.get()
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII marker returned by [`DebugReentrancy::enter`].
pub struct OpGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_operations_are_allowed() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter("put");
        }
        let _g = r.enter("get");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn guard_release_clears_active_operation() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter("remove");
            assert_eq!(r.active(), Some("remove"));
        }
        assert_eq!(r.active(), None);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_with_both_names() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter("put");
            let _inner = r.enter("contains_key");
        }));
        let payload = res.expect_err("nested entry must panic in debug builds");
        let msg = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert!(msg.contains("`contains_key`"), "message: {msg}");
        assert!(msg.contains("`put`"), "message: {msg}");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_entry_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter("put");
        let _g2 = r.enter("get");
    }
}
