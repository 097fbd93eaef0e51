//! Lazily created resources with permanent failure.

/// A resource that is created on first use.
///
/// `Failed` is terminal: a slot that failed once is never retried.
/// `Pending` only exists while the initializer runs, so observing it from
/// outside means the initializer re-entered its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazySlot<T> {
    NotRequested,
    Pending,
    Ready(T),
    Failed,
}

impl<T> Default for LazySlot<T> {
    fn default() -> Self {
        LazySlot::NotRequested
    }
}

impl<T: Copy> LazySlot<T> {
    /// Returns the ready value, running `init` on first request.
    ///
    /// Returns `None` if the slot failed now or earlier.
    ///
    /// # Panics
    ///
    /// Panics if the slot is `Pending`.
    pub fn get_or_try_init<E>(&mut self, init: impl FnOnce() -> Result<T, E>) -> Result<Option<T>, E> {
        match *self {
            LazySlot::Ready(value) => Ok(Some(value)),
            LazySlot::Failed => Ok(None),
            LazySlot::Pending => panic!("lazy slot re-entered while its initializer was running"),
            LazySlot::NotRequested => {
                *self = LazySlot::Pending;
                match init() {
                    Ok(value) => {
                        *self = LazySlot::Ready(value);
                        Ok(Some(value))
                    }
                    Err(err) => {
                        *self = LazySlot::Failed;
                        Err(err)
                    }
                }
            }
        }
    }

    pub fn ready(&self) -> Option<T> {
        match *self {
            LazySlot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LazySlot::Failed)
    }

    /// Forgets the slot and hands back the ready value for release.
    pub fn take(&mut self) -> Option<T> {
        std::mem::take(self).ready()
    }
}
