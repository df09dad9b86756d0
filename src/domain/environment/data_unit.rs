use std::fmt;

use crate::domain::utils::id::DataUnitId;

/// A buffered data unit waiting for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    pub id: DataUnitId,

    /// Consumed capacity when transmitted.
    pub size: u64,

    /// Countdown in steps; the unit expires once it reaches zero.
    pub remaining_lifetime: i64,

    /// Lifetime the unit was created with.
    initial_lifetime: i64,
}

impl DataUnit {
    pub fn new(id: DataUnitId, size: u64, lifetime: i64) -> Self {
        DataUnit { id, size, remaining_lifetime: lifetime, initial_lifetime: lifetime }
    }

    pub fn initial_lifetime(&self) -> i64 {
        self.initial_lifetime
    }

    pub fn decrement_lifetime(&mut self) {
        self.remaining_lifetime -= 1;
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_lifetime <= 0
    }
}

impl fmt::Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit(id: {}, size: {}, lifetime: {}/{})", self.id, self.size, self.remaining_lifetime, self.initial_lifetime)
    }
}
