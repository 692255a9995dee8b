//! Task priority levels

use core::fmt;

/// Type-safe task priority
///
/// Higher values are more urgent. Every value of the underlying `u8` is a
/// valid priority; `0` is the least urgent band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority level
    pub const MIN: Priority = Priority(0);

    /// Highest priority level
    pub const MAX: Priority = Priority(u8::MAX);

    /// Create a new priority level
    pub const fn new(priority: u8) -> Self {
        Priority(priority)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Next more urgent level, saturating at [`Priority::MAX`]
    pub const fn raised(self) -> Self {
        Priority(self.0.saturating_add(1))
    }

    /// Next less urgent level, saturating at [`Priority::MIN`]
    pub const fn lowered(self) -> Self {
        Priority(self.0.saturating_sub(1))
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Macro to create compile-time priority constants
#[macro_export]
macro_rules! priority {
    ($value:literal) => {
        $crate::Priority::new($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::new(9) > Priority::new(5));
        assert!(Priority::MAX > Priority::MIN);
        assert_eq!(priority!(7).raw(), 7);
    }

    #[test]
    fn test_priority_saturates() {
        assert_eq!(Priority::MAX.raised(), Priority::MAX);
        assert_eq!(Priority::MIN.lowered(), Priority::MIN);
        assert_eq!(Priority::new(3).raised().raw(), 4);
    }
}
