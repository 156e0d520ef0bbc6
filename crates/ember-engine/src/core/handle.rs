use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use super::Managed;

/// Shared-ownership handle to an engine object.
///
/// Every live handle holds one reference on the target's [`Object`](super::Object)
/// record. Cloning adds a reference, dropping releases one, and the target is
/// destroyed together with the last handle.
///
/// A handle is either null or points at a live object. Dereferencing a null
/// handle panics; guard with [`Handle::is_null`] or use [`Handle::get`].
///
/// Equality compares target identity, never value.
pub struct Handle<T: Managed> {
    target: Option<Rc<T>>,
}

impl<T: Managed> Handle<T> {
    /// Takes ownership of `value` and returns the first handle to it.
    pub fn new(value: T) -> Self {
        let rc = Rc::new(value);
        rc.object().add_ref();
        Self { target: Some(rc) }
    }

    /// A handle with no target.
    pub const fn null() -> Self {
        Self { target: None }
    }

    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.target.as_deref()
    }

    /// Points this handle at `other`'s target.
    ///
    /// The incoming target is referenced before the previous one is released, so
    /// assigning a handle to itself (or to another handle of the same object)
    /// leaves the reference count unchanged.
    pub fn assign(&mut self, other: &Handle<T>) {
        let incoming = other.clone();
        *self = incoming;
    }

    /// Drops this handle's reference and leaves it null.
    pub fn release(&mut self) {
        *self = Self::null();
    }

    /// Whether both handles point at the same object (two null handles are equal).
    pub fn ptr_eq(&self, other: &Handle<T>) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Reference count of the target, or 0 for a null handle.
    pub fn ref_count(&self) -> i32 {
        self.get().map_or(0, |t| t.object().ref_count())
    }
}

impl<T: Managed> Clone for Handle<T> {
    fn clone(&self) -> Self {
        if let Some(rc) = &self.target {
            rc.object().add_ref();
        }
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T: Managed> Drop for Handle<T> {
    fn drop(&mut self) {
        let Some(rc) = self.target.take() else { return };
        let remaining = rc.object().release_ref();
        debug_assert_eq!(
            remaining as usize + 1,
            Rc::strong_count(&rc),
            "reference count out of sync with live handles"
        );
        if remaining == 0 {
            log::trace!(
                "destroying {} #{}",
                std::any::type_name::<T>(),
                rc.object().id()
            );
        }
    }
}

impl<T: Managed> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.target {
            Some(rc) => &**rc,
            None => panic!("dereferenced a null Handle<{}>", std::any::type_name::<T>()),
        }
    }
}

impl<T: Managed> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: Managed> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Managed> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: Managed> Eq for Handle<T> {}

impl<T: Managed> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(t) => write!(
                f,
                "Handle<{}>(#{}, refs={})",
                std::any::type_name::<T>(),
                t.object().id(),
                t.object().ref_count()
            ),
            None => write!(f, "Handle<{}>(null)", std::any::type_name::<T>()),
        }
    }
}
