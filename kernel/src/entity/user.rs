mod fine;
mod id;
mod role;

pub use self::{fine::*, id::*, role::*};
use destructure::Destructure;
use vodca::References;

/// What the reservation queue needs to know about a user.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct UserStanding {
    id: UserId,
    role: UserRole,
    outstanding_fine: OutstandingFine,
}

impl UserStanding {
    pub fn new(id: UserId, role: UserRole, outstanding_fine: OutstandingFine) -> Self {
        Self {
            id,
            role,
            outstanding_fine,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_reserve(&self) -> bool {
        self.outstanding_fine.is_settled()
    }
}
