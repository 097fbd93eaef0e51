//! Known-or-unknown snapshot values.

/// A value the device believes the backend currently holds.
///
/// `Unknown` never compares equal to anything, so the first request after
/// an invalidation always reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracked<T> {
    Unknown,
    Known(T),
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Tracked::Unknown
    }
}

impl<T: PartialEq> Tracked<T> {
    /// True if the snapshot holds exactly `value`.
    pub fn is(&self, value: &T) -> bool {
        matches!(self, Tracked::Known(v) if v == value)
    }

    /// Stores `value` and reports whether the backend needs to hear about it.
    pub fn update(&mut self, value: T) -> bool {
        if self.is(&value) {
            return false;
        }
        *self = Tracked::Known(value);
        true
    }
}

impl<T> Tracked<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Tracked::Known(v) => Some(v),
            Tracked::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Tracked::Known(_))
    }

    pub fn invalidate(&mut self) {
        *self = Tracked::Unknown;
    }
}
