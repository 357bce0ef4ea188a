use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{BookId, Reservation, ReservationStatus};
use crate::KernelError;

#[async_trait::async_trait]
pub trait ReservationModifier: 'static + Sync + Send {
    type Transaction: Transaction;

    /// Serializes queue-sensitive work on one book until the transaction ends.
    async fn lock_book(
        &self,
        con: &mut Self::Transaction,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError>;

    /// Fails with `DuplicateReservation` if the user already has an active
    /// reservation for the book.
    async fn create(
        &self,
        con: &mut Self::Transaction,
        reservation: &Reservation,
    ) -> error_stack::Result<(), KernelError>;

    /// Compare-and-set on `status`: writes only while the stored status still
    /// equals `expected`. Returns whether the row was written.
    async fn update(
        &self,
        con: &mut Self::Transaction,
        reservation: &Reservation,
        expected: &ReservationStatus,
    ) -> error_stack::Result<bool, KernelError>;
}

pub trait DependOnReservationModifier: 'static + Sync + Send + DependOnDatabaseConnection {
    type ReservationModifier: ReservationModifier<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn reservation_modifier(&self) -> &Self::ReservationModifier;
}
