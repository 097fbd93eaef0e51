//! Which thread may drive the device.

use std::thread::{self, ThreadId};

/// Explicit ownership token for the device thread.
///
/// Only the owning thread may issue state-changing calls. Ownership is
/// handed over with [`DeviceOwnership::release`] on the old thread and
/// [`DeviceOwnership::acquire`] on the new one.
#[derive(Debug)]
pub struct DeviceOwnership {
    owner: Option<ThreadId>,
}

impl DeviceOwnership {
    /// Owned by the calling thread.
    pub fn owned_by_current() -> Self {
        Self {
            owner: Some(thread::current().id()),
        }
    }

    /// # Panics
    ///
    /// Panics if another thread still owns the device.
    pub fn acquire(&mut self) {
        let me = thread::current().id();
        match self.owner {
            Some(owner) if owner != me => {
                panic!("device acquired while owned by thread {owner:?}")
            }
            _ => self.owner = Some(me),
        }
    }

    /// # Panics
    ///
    /// Panics if the calling thread is not the owner.
    pub fn release(&mut self) {
        self.assert_owned();
        self.owner = None;
    }

    pub fn is_owned_by_current(&self) -> bool {
        self.owner == Some(thread::current().id())
    }

    /// # Panics
    ///
    /// Panics unless the calling thread owns the device.
    #[track_caller]
    pub fn assert_owned(&self) {
        assert!(
            self.is_owned_by_current(),
            "device used from a thread that does not own it"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_owns_the_device() {
        let own = DeviceOwnership::owned_by_current();
        own.assert_owned();
    }

    #[test]
    #[should_panic(expected = "does not own")]
    fn released_device_rejects_calls() {
        let mut own = DeviceOwnership::owned_by_current();
        own.release();
        own.assert_owned();
    }

    #[test]
    fn ownership_moves_between_threads() {
        let mut own = DeviceOwnership::owned_by_current();
        own.release();
        let own = thread::spawn(move || {
            let mut own = own;
            own.acquire();
            assert!(own.is_owned_by_current());
            own.release();
            own
        })
        .join()
        .unwrap();
        let mut own = own;
        own.acquire();
        own.assert_owned();
    }

    #[test]
    fn other_thread_is_not_owner() {
        let own = DeviceOwnership::owned_by_current();
        let owned_elsewhere = thread::scope(|s| s.spawn(|| own.is_owned_by_current()).join().unwrap());
        assert!(!owned_elsewhere);
    }
}
