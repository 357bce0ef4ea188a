use kernel::prelude::entity::{DestructReservation, Reservation, ReservationStatus};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDto {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub status: ReservationStatus,
    pub reserved_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub notified: bool,
    pub fulfilled_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub expired_at: Option<OffsetDateTime>,
}

impl From<Reservation> for ReservationDto {
    fn from(value: Reservation) -> Self {
        let DestructReservation {
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
        } = value.into_destruct();
        Self {
            id: id.into(),
            book_id: book_id.into(),
            user_id: user_id.into(),
            status,
            reserved_at: reserved_at.into(),
            expires_at: expires_at.into(),
            notified: notified.into(),
            fulfilled_at: fulfilled_at.map(OffsetDateTime::from),
            cancelled_at: cancelled_at.map(OffsetDateTime::from),
            expired_at: expired_at.map(OffsetDateTime::from),
        }
    }
}

pub struct CreateReservationDto {
    pub book_id: Uuid,
    pub user_id: Uuid,
}

pub struct GetReservationDto {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstInLineDto {
    pub reservation_id: Uuid,
    pub is_first_in_line: bool,
    /// The reservation currently at the head of the book's queue.
    pub first_in_line: Option<Uuid>,
}

pub struct GetBookReservationsDto {
    pub book_id: Uuid,
    pub status: Option<ReservationStatus>,
}

pub struct GetUserReservationsDto {
    pub user_id: Uuid,
}

pub struct GetAllReservationsDto {
    pub acting_user_id: Uuid,
    pub status: Option<ReservationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct FulfillReservationDto {
    pub reservation_id: Uuid,
    pub acting_user_id: Uuid,
}

/// `warnings` lists side effects that failed after the state change committed.
#[derive(Debug, Clone)]
pub struct FulfillmentDto {
    pub reservation: ReservationDto,
    pub warnings: Vec<String>,
}

pub struct CancelReservationDto {
    pub reservation_id: Uuid,
    pub acting_user_id: Uuid,
}

pub struct ExpireReservationDto {
    pub reservation_id: Uuid,
}

pub struct NotifyFirstInLineDto {
    pub book_id: Uuid,
    pub acting_user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NotificationDto {
    pub reservation: Option<ReservationDto>,
    pub warnings: Vec<String>,
}
