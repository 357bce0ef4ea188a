use error_stack::Report;
use time::Duration;

use crate::KernelError;

/// How long an unfulfilled reservation stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationWindow(Duration);

impl ReservationWindow {
    pub const MAX_DAYS: i64 = 3650;

    pub fn new(duration: Duration) -> error_stack::Result<Self, KernelError> {
        if !duration.is_positive() {
            return Err(Report::new(KernelError::Internal)
                .attach_printable(format!("Reservation window must be positive: {duration}")));
        }
        if duration > Duration::days(Self::MAX_DAYS) {
            return Err(Report::new(KernelError::Internal).attach_printable(format!(
                "Reservation window exceeds {} days: {duration}",
                Self::MAX_DAYS
            )));
        }
        Ok(Self(duration))
    }

    pub fn days(days: i64) -> error_stack::Result<Self, KernelError> {
        let seconds = days.checked_mul(86_400).ok_or_else(|| {
            Report::new(KernelError::Internal)
                .attach_printable(format!("Reservation window of {days} days overflows"))
        })?;
        Self::new(Duration::seconds(seconds))
    }
}

impl AsRef<Duration> for ReservationWindow {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl Default for ReservationWindow {
    fn default() -> Self {
        Self(Duration::days(7))
    }
}
