mod id;
mod notified;
mod status;
mod time;
mod window;

pub use self::{id::*, notified::*, status::*, time::*, window::*};
use crate::entity::{BookId, UserId};
use crate::KernelError;
use ::time::OffsetDateTime;
use destructure::{Destructure, Mutation};
use error_stack::Report;
use std::cmp::Ordering;
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct Reservation {
    id: ReservationId,
    book_id: BookId,
    user_id: UserId,
    status: ReservationStatus,
    reserved_at: ReservedAt,
    expires_at: ExpiresAt,
    notified: IsNotified,
    fulfilled_at: Option<FulfilledAt>,
    cancelled_at: Option<CancelledAt>,
    expired_at: Option<ExpiredAt>,
}

impl Reservation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReservationId,
        book_id: BookId,
        user_id: UserId,
        status: ReservationStatus,
        reserved_at: ReservedAt,
        expires_at: ExpiresAt,
        notified: IsNotified,
        fulfilled_at: Option<FulfilledAt>,
        cancelled_at: Option<CancelledAt>,
        expired_at: Option<ExpiredAt>,
    ) -> Self {
        Self {
            id,
            book_id,
            user_id,
            status,
            reserved_at,
            expires_at,
            notified,
            fulfilled_at,
            cancelled_at,
            expired_at,
        }
    }

    /// A fresh active reservation placed at `now`.
    pub fn open(
        id: ReservationId,
        book_id: BookId,
        user_id: UserId,
        now: OffsetDateTime,
        window: &ReservationWindow,
    ) -> error_stack::Result<Self, KernelError> {
        let expires_at = now.checked_add(*window.as_ref()).ok_or_else(|| {
            Report::new(KernelError::Internal)
                .attach_printable(format!("Expiry of a reservation placed at {now} is out of range"))
        })?;
        Ok(Self::new(
            id,
            book_id,
            user_id,
            ReservationStatus::Active,
            ReservedAt::new(now),
            ExpiresAt::new(expires_at),
            IsNotified::new(false),
            None,
            None,
            None,
        ))
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn is_notified(&self) -> bool {
        *self.notified.as_ref()
    }

    pub fn is_overdue(&self, now: &OffsetDateTime) -> bool {
        now > self.expires_at.as_ref()
    }

    /// Queue priority: earlier `reserved_at` first, `id` breaks ties.
    pub fn queue_order(&self, other: &Reservation) -> Ordering {
        self.reserved_at
            .as_ref()
            .cmp(other.reserved_at.as_ref())
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn fulfill(self, at: OffsetDateTime) -> error_stack::Result<Self, KernelError> {
        self.ensure_transition(&ReservationStatus::Fulfilled)?;
        let mut reservation = self;
        reservation.substitute(|r| {
            *r.status = ReservationStatus::Fulfilled;
            *r.fulfilled_at = Some(FulfilledAt::new(at));
        });
        Ok(reservation)
    }

    pub fn cancel(self, at: OffsetDateTime) -> error_stack::Result<Self, KernelError> {
        self.ensure_transition(&ReservationStatus::Cancelled)?;
        let mut reservation = self;
        reservation.substitute(|r| {
            *r.status = ReservationStatus::Cancelled;
            *r.cancelled_at = Some(CancelledAt::new(at));
        });
        Ok(reservation)
    }

    pub fn expire(self, now: OffsetDateTime) -> error_stack::Result<Self, KernelError> {
        self.ensure_transition(&ReservationStatus::Expired)?;
        if !self.is_overdue(&now) {
            return Err(Report::new(KernelError::InvalidTransition).attach_printable(format!(
                "Reservation {} is valid until {}",
                self.id.as_ref(),
                self.expires_at.as_ref()
            )));
        }
        let mut reservation = self;
        reservation.substitute(|r| {
            *r.status = ReservationStatus::Expired;
            *r.expired_at = Some(ExpiredAt::new(now));
        });
        Ok(reservation)
    }

    pub fn mark_notified(self) -> error_stack::Result<Self, KernelError> {
        if !self.is_active() {
            return Err(Report::new(KernelError::InvalidTransition).attach_printable(format!(
                "Reservation {} is {}, nobody to notify",
                self.id.as_ref(),
                self.status
            )));
        }
        let mut reservation = self;
        reservation.substitute(|r| *r.notified = IsNotified::new(true));
        Ok(reservation)
    }

    /// Undoes `mark_notified` when the notice never left.
    pub fn withdraw_notice(self) -> Self {
        let mut reservation = self;
        reservation.substitute(|r| *r.notified = IsNotified::new(false));
        reservation
    }

    fn ensure_transition(&self, next: &ReservationStatus) -> error_stack::Result<(), KernelError> {
        if self.status.can_transition_to(next) {
            return Ok(());
        }
        Err(Report::new(KernelError::InvalidTransition).attach_printable(format!(
            "Reservation {} cannot move from {} to {}",
            self.id.as_ref(),
            self.status,
            next
        )))
    }
}

/// The active reservation that must be served next, if any.
pub fn first_in_line<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
) -> Option<&'a Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.is_active())
        .min_by(|a, b| a.queue_order(b))
}

#[cfg(test)]
mod test {
    use ::time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use super::*;

    fn reservation_at(book_id: BookId, at: OffsetDateTime) -> Reservation {
        Reservation::open(
            ReservationId::generate(),
            book_id,
            UserId::new(Uuid::new_v4()),
            at,
            &ReservationWindow::default(),
        )
        .unwrap()
    }

    #[test]
    fn open_sets_expiry_from_window() {
        let now = OffsetDateTime::now_utc();
        let window = ReservationWindow::days(3).unwrap();
        let reservation = Reservation::open(
            ReservationId::generate(),
            BookId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            now,
            &window,
        )
        .unwrap();
        assert_eq!(*reservation.expires_at().as_ref(), now + Duration::days(3));
        assert!(reservation.is_active());
        assert!(!reservation.is_notified());
    }

    #[test]
    fn non_positive_window_is_rejected() {
        assert!(ReservationWindow::days(0).is_err());
        assert!(ReservationWindow::new(Duration::seconds(-1)).is_err());
    }

    #[test]
    fn oversized_window_is_rejected() {
        assert!(ReservationWindow::days(i64::MAX).is_err());
        assert!(ReservationWindow::days(3_000_000).is_err());
        assert!(ReservationWindow::days(ReservationWindow::MAX_DAYS + 1).is_err());
        assert!(ReservationWindow::days(ReservationWindow::MAX_DAYS).is_ok());
    }

    #[test]
    fn expiry_out_of_range_is_an_error() {
        let window = ReservationWindow::days(ReservationWindow::MAX_DAYS).unwrap();
        let report = Reservation::open(
            ReservationId::generate(),
            BookId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            ::time::PrimitiveDateTime::MAX.assume_utc(),
            &window,
        )
        .unwrap_err();
        assert_eq!(report.current_context(), &KernelError::Internal);
    }

    #[test]
    fn terminal_reservation_never_moves_again() {
        let now = OffsetDateTime::now_utc();
        let reservation = reservation_at(BookId::new(Uuid::new_v4()), now);
        let cancelled = reservation.cancel(now).unwrap();
        assert_eq!(*cancelled.status(), ReservationStatus::Cancelled);
        assert!(cancelled.cancelled_at().is_some());

        let report = cancelled.clone().fulfill(now).unwrap_err();
        assert_eq!(report.current_context(), &KernelError::InvalidTransition);
        let far_future = now + Duration::days(365);
        assert!(cancelled.clone().expire(far_future).is_err());
        assert!(cancelled.mark_notified().is_err());
    }

    #[test]
    fn expire_requires_passing_expiry() {
        let now = OffsetDateTime::now_utc();
        let reservation = reservation_at(BookId::new(Uuid::new_v4()), now);
        let expiry = *reservation.expires_at().as_ref();

        assert!(reservation.clone().expire(expiry).is_err());
        let expired = reservation
            .expire(expiry + Duration::seconds(1))
            .unwrap();
        assert_eq!(*expired.status(), ReservationStatus::Expired);
        assert!(expired.expired_at().is_some());
    }

    #[test]
    fn earliest_active_reservation_is_first() {
        let book_id = BookId::new(Uuid::new_v4());
        let now = OffsetDateTime::now_utc();
        let first = reservation_at(book_id, now);
        let second = reservation_at(book_id, now + Duration::minutes(1));
        let third = reservation_at(book_id, now + Duration::minutes(2));

        let queue = [third.clone(), second.clone(), first.clone()];
        assert_eq!(first_in_line(&queue), Some(&first));

        let fulfilled = first.fulfill(now).unwrap();
        let queue = [third, fulfilled, second.clone()];
        assert_eq!(first_in_line(&queue), Some(&second));
    }

    #[test]
    fn ties_are_broken_by_id() {
        let book_id = BookId::new(Uuid::new_v4());
        let now = OffsetDateTime::now_utc();
        let a = reservation_at(book_id, now);
        let b = reservation_at(book_id, now);
        let expected = if a.id() < b.id() { &a } else { &b };
        assert_eq!(first_in_line([&a, &b]), Some(expected));
        assert_eq!(first_in_line([&b, &a]), Some(expected));
    }
}
