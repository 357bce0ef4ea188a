use time::OffsetDateTime;

use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{
    BookId, Reservation, ReservationId, ReservationStatus, SelectLimit, SelectOffset, UserId,
};
use crate::KernelError;

#[async_trait::async_trait]
pub trait ReservationQuery: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        id: &ReservationId,
    ) -> error_stack::Result<Option<Reservation>, KernelError>;

    /// The active reservation with the smallest `(reserved_at, id)` for the book.
    async fn find_first_in_line(
        &self,
        con: &mut Self::Transaction,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Reservation>, KernelError>;

    async fn find_active_by_book_and_user(
        &self,
        con: &mut Self::Transaction,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<Option<Reservation>, KernelError>;

    /// Queue order: `(reserved_at, id)` ascending.
    async fn find_by_book_id(
        &self,
        con: &mut Self::Transaction,
        book_id: &BookId,
        status: Option<&ReservationStatus>,
    ) -> error_stack::Result<Vec<Reservation>, KernelError>;

    /// Most recent first.
    async fn find_by_user_id(
        &self,
        con: &mut Self::Transaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Reservation>, KernelError>;

    /// Most recent first.
    async fn find_all(
        &self,
        con: &mut Self::Transaction,
        status: Option<&ReservationStatus>,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Reservation>, KernelError>;

    /// Active reservations whose expiry lies strictly before `now`.
    async fn find_overdue(
        &self,
        con: &mut Self::Transaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Reservation>, KernelError>;
}

pub trait DependOnReservationQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type ReservationQuery: ReservationQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn reservation_query(&self) -> &Self::ReservationQuery;
}
