use destructure::Mutation;
use vodca::References;

use crate::entity::ReservationWindow;

#[derive(Debug, Clone, References, Mutation)]
pub struct ReservationConfig {
    window: ReservationWindow,
    /// Reject reservations for books that still have copies on the shelf.
    require_unavailable: bool,
}

impl ReservationConfig {
    pub fn new(window: ReservationWindow, require_unavailable: bool) -> Self {
        Self {
            window,
            require_unavailable,
        }
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            window: ReservationWindow::default(),
            require_unavailable: true,
        }
    }
}

pub trait DependOnReservationConfig: 'static + Sync + Send {
    fn reservation_config(&self) -> &ReservationConfig;
}
