//! Scoped binding.
//!
//! GL binding points are global, and nothing stops a caller from leaving a
//! program, vertex array or texture bound after it is done with it. The
//! wrappers keep explicit `bind`/`unbind` methods, and each also offers a
//! `bound(..)` method returning a [`Bound`] guard that unbinds when dropped,
//! including on early returns.
//!
//! ```
//! # use gl_lessons::{headless::HeadlessContext, buffers::VertexArray};
//! # fn main() -> gl_lessons::Result<()> {
//! let gl = HeadlessContext::new();
//! let vao = VertexArray::new(&gl)?;
//! {
//!     let _vao = vao.bound();
//!     assert!(gl.bindings().vertex_array.is_some());
//! }
//! assert!(gl.bindings().vertex_array.is_none());
//! # Ok(())
//! # }
//! ```

use std::ops::Deref;

/// A resource whose binding point can be cleared.
///
/// Clearing must be idempotent: unbinding twice leaves the same state as
/// unbinding once.
pub trait Unbind {
    /// Clear the binding point this resource binds to.
    fn unbind(&self);
}

/// A resource that stays bound for as long as this guard lives.
#[must_use = "the resource is unbound as soon as the guard is dropped"]
pub struct Bound<'a, T: Unbind> {
    resource: &'a T,
}

impl<'a, T: Unbind> Bound<'a, T> {
    /// Wrap a resource the caller has just bound.
    pub(crate) fn new(resource: &'a T) -> Self {
        Self { resource }
    }
}

impl<T: Unbind> Deref for Bound<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource
    }
}

impl<T: Unbind> Drop for Bound<'_, T> {
    fn drop(&mut self) {
        self.resource.unbind();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Slot<'a> {
        bound: &'a Cell<bool>,
    }

    impl Slot<'_> {
        fn bound(&self) -> Bound<'_, Self> {
            self.bound.set(true);
            Bound::new(self)
        }
    }

    impl Unbind for Slot<'_> {
        fn unbind(&self) {
            self.bound.set(false);
        }
    }

    #[test]
    fn guard_unbinds_on_drop() {
        let state = Cell::new(false);
        let slot = Slot { bound: &state };
        {
            let _guard = slot.bound();
            assert!(state.get());
        }
        assert!(!state.get());
    }

    #[test]
    fn guard_unbinds_on_early_return() {
        fn draw(slot: &Slot<'_>, fail: bool) -> Result<(), ()> {
            let _guard = slot.bound();
            if fail {
                return Err(());
            }
            Ok(())
        }

        let state = Cell::new(false);
        let slot = Slot { bound: &state };
        assert!(draw(&slot, true).is_err());
        assert!(!state.get());
    }
}
