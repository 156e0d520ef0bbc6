use std::cell::Cell;
use std::fmt;

use super::registry;

/// Reference-count record embedded in every engine-owned resource.
///
/// An `Object` starts with zero references. [`Handle`](super::Handle) adds a
/// reference for every live handle and releases it when the handle goes away;
/// the resource is destroyed together with the last handle.
///
/// Construction and destruction are tallied by the thread's object registry,
/// which reports leaks at teardown.
///
/// `Object` is neither `Clone` nor `Copy`: duplicating a reference
/// count has no meaning.
pub struct Object {
    refs: Cell<i32>,
    id: u64,
}

impl Object {
    /// Creates a record with zero references and registers it.
    ///
    /// `name` identifies the object in leak reports when name tracking is on.
    pub fn new(name: &'static str) -> Self {
        Self {
            refs: Cell::new(0),
            id: registry::register(name),
        }
    }

    /// Adds one reference.
    pub fn add_ref(&self) {
        let n = self.refs.get();
        assert!(n >= 0, "object #{} has a negative reference count ({n})", self.id);
        self.refs.set(n + 1);
    }

    /// Removes one reference and returns the remaining count.
    ///
    /// Releasing an object that holds no references is a contract violation.
    pub fn release_ref(&self) -> i32 {
        let n = self.refs.get();
        assert!(n > 0, "release_ref on object #{} with no references", self.id);
        self.refs.set(n - 1);
        n - 1
    }

    pub fn ref_count(&self) -> i32 {
        self.refs.get()
    }

    /// Registry id, unique per thread. 0 only for objects created during thread teardown.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        registry::unregister(self.id);
        let n = self.refs.get();
        if n != 0 && !std::thread::panicking() {
            panic!("object #{} destroyed with {n} outstanding reference(s)", self.id);
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("refs", &self.refs.get())
            .finish()
    }
}

/// Implemented by every type that embeds an [`Object`] and can be held by a `Handle`.
pub trait Managed {
    fn object(&self) -> &Object;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_zero_references() {
        let obj = Object::new("Sample");
        assert_eq!(obj.ref_count(), 0);
    }

    #[test]
    fn add_minus_release_equals_count() {
        let obj = Object::new("Sample");
        obj.add_ref();
        obj.add_ref();
        obj.add_ref();
        assert_eq!(obj.release_ref(), 2);
        assert_eq!(obj.ref_count(), 2);
        assert_eq!(obj.release_ref(), 1);
        assert_eq!(obj.release_ref(), 0);
    }

    #[test]
    fn construction_and_drop_are_tallied() {
        let before = registry::live_objects();
        let a = Object::new("Sample");
        let b = Object::new("Sample");
        assert_ne!(a.id(), b.id());
        assert_eq!(registry::live_objects(), before + 2);
        drop(a);
        drop(b);
        assert_eq!(registry::live_objects(), before);
    }

    #[test]
    #[should_panic(expected = "no references")]
    fn release_without_reference_panics() {
        let obj = Object::new("Sample");
        obj.release_ref();
    }

    #[test]
    #[should_panic(expected = "outstanding reference")]
    fn drop_with_references_panics() {
        let obj = Object::new("Sample");
        obj.add_ref();
        drop(obj);
    }
}
