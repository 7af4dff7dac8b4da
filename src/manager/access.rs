//! Write-access tokens consulted before a commit.
//!
//! The artifact manager does not serialize writers itself; it only checks
//! that the caller holds write access according to the injected
//! [`WriteAccess`] collaborator.

use std::sync::Mutex;
use std::thread::{self, ThreadId};

pub trait WriteAccess: Send + Sync {
    fn is_write_access_allowed(&self) -> bool;
}

/// Every caller may write. Suitable for single-threaded tools and tests.
pub struct Unrestricted;

impl WriteAccess for Unrestricted {
    fn is_write_access_allowed(&self) -> bool {
        true
    }
}

/// At most one thread holds write access at a time.
#[derive(Default)]
pub struct WriteLock {
    owner: Mutex<Option<ThreadId>>,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take write access for the current thread, or `None` while another
    /// thread holds it. Not reentrant.
    pub fn try_acquire(&self) -> Option<WriteGuard<'_>> {
        let mut owner = self.owner.lock().expect("write lock poisoned");
        if owner.is_some() {
            return None;
        }
        *owner = Some(thread::current().id());
        Some(WriteGuard { lock: self })
    }
}

impl WriteAccess for WriteLock {
    fn is_write_access_allowed(&self) -> bool {
        *self.owner.lock().expect("write lock poisoned") == Some(thread::current().id())
    }
}

/// Releases write access on drop.
pub struct WriteGuard<'a> {
    lock: &'a WriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        *self.lock.owner.lock().expect("write lock poisoned") = None;
    }
}
