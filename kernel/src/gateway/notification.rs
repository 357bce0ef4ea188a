use destructure::Destructure;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodca::References;

use crate::entity::{BookId, Reservation, ReservationId, UserId};
use crate::KernelError;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationNotice {
    /// A copy is waiting for the first user in line.
    Fulfillable {
        reservation_id: ReservationId,
        book_id: BookId,
        user_id: UserId,
    },
    Fulfilled {
        reservation_id: ReservationId,
        book_id: BookId,
        user_id: UserId,
    },
}

impl ReservationNotice {
    pub fn fulfillable(reservation: &Reservation) -> Self {
        Self::Fulfillable {
            reservation_id: *reservation.id(),
            book_id: *reservation.book_id(),
            user_id: *reservation.user_id(),
        }
    }

    pub fn fulfilled(reservation: &Reservation) -> Self {
        Self::Fulfilled {
            reservation_id: *reservation.id(),
            book_id: *reservation.book_id(),
            user_id: *reservation.user_id(),
        }
    }
}

/// Wire envelope handed to the delivery pipeline; `id` lets consumers dedupe.
#[derive(Debug, Clone, Serialize, Deserialize, References, Destructure)]
pub struct NoticeEnvelope {
    id: Uuid,
    notice: ReservationNotice,
}

impl NoticeEnvelope {
    pub fn new(id: Uuid, notice: ReservationNotice) -> Self {
        Self { id, notice }
    }
}

impl From<ReservationNotice> for NoticeEnvelope {
    fn from(notice: ReservationNotice) -> Self {
        Self {
            id: Uuid::new_v4(),
            notice,
        }
    }
}

/// Delivery, retry and backoff are owned by the implementation, not by callers.
#[async_trait::async_trait]
pub trait NotificationGateway: 'static + Sync + Send {
    async fn dispatch(&self, notice: ReservationNotice) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnNotificationGateway: 'static + Sync + Send {
    type NotificationGateway: NotificationGateway;
    fn notification_gateway(&self) -> &Self::NotificationGateway;
}
