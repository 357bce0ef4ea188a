use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Unpaid fines in the smallest currency unit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize, Fromln, AsRefln)]
pub struct OutstandingFine(i64);

impl OutstandingFine {
    pub fn new(amount: impl Into<i64>) -> Self {
        Self(amount.into())
    }

    pub fn is_settled(&self) -> bool {
        self.0 <= 0
    }
}
