use std::time::Duration;

use error_stack::Report;
use kernel::interface::config::ReservationConfig;
use kernel::prelude::entity::ReservationWindow;
use kernel::KernelError;

use crate::env_or;

const RESERVATION_WINDOW_DAYS: &str = "RESERVATION_WINDOW_DAYS";
const RESERVATION_REQUIRE_UNAVAILABLE: &str = "RESERVATION_REQUIRE_UNAVAILABLE";
const STORAGE_TIMEOUT_SECS: &str = "STORAGE_TIMEOUT_SECS";
const SERVER_PORT: &str = "SERVER_PORT";

pub fn load_reservation_config() -> error_stack::Result<ReservationConfig, KernelError> {
    let days = env_or::<i64>(RESERVATION_WINDOW_DAYS, 7)?;
    let window = ReservationWindow::days(days)?;
    let require_unavailable = env_or::<bool>(RESERVATION_REQUIRE_UNAVAILABLE, true)?;
    Ok(ReservationConfig::new(window, require_unavailable))
}

/// Upper bound for every single storage round trip.
pub fn storage_timeout() -> error_stack::Result<Duration, KernelError> {
    bounded_timeout(env_or::<u64>(STORAGE_TIMEOUT_SECS, 5)?)
}

// Postgres reads a zero statement_timeout as "wait forever".
fn bounded_timeout(secs: u64) -> error_stack::Result<Duration, KernelError> {
    if secs == 0 {
        return Err(Report::new(KernelError::Internal)
            .attach_printable(format!("{STORAGE_TIMEOUT_SECS} must be at least 1")));
    }
    Ok(Duration::from_secs(secs))
}

pub fn server_port() -> error_stack::Result<u16, KernelError> {
    env_or::<u16>(SERVER_PORT, 8080)
}
