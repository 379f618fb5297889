//! Thread-bound caller identity.
//!
//! Each request thread binds its own `Authentication`; decisions read it
//! without locking.

use crate::authentication::Authentication;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<Arc<Authentication>>> = const { RefCell::new(None) };
}

pub struct SecurityContextHolder;

impl SecurityContextHolder {
    /// The caller bound to this thread, if any.
    pub fn authentication() -> Option<Arc<Authentication>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Bind `authentication` to this thread until the guard drops, then
    /// restore whatever was bound before.
    pub fn set_authentication(authentication: Authentication) -> AuthenticationGuard {
        let previous = CURRENT.with(|current| current.replace(Some(Arc::new(authentication))));
        AuthenticationGuard {
            previous,
            _thread_bound: PhantomData,
        }
    }

    /// Run `f` with `authentication` bound to this thread.
    pub fn with_authentication<R>(authentication: Authentication, f: impl FnOnce() -> R) -> R {
        let _guard = Self::set_authentication(authentication);
        f()
    }

    pub fn clear() {
        CURRENT.with(|current| *current.borrow_mut() = None);
    }
}

/// Restores the previous binding on drop. Not `Send`: it must drop on the
/// thread that created it.
#[must_use = "the authentication is unbound as soon as the guard drops"]
pub struct AuthenticationGuard {
    previous: Option<Arc<Authentication>>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for AuthenticationGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The thread may be tearing down its locals.
        let _ = CURRENT.try_with(|current| current.replace(previous));
    }
}
