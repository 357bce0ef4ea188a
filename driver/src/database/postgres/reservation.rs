use error_stack::Report;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::ReservationQuery;
use kernel::interface::update::ReservationModifier;
use kernel::prelude::entity::{
    BookId, CancelledAt, ExpiredAt, ExpiresAt, FulfilledAt, IsNotified, ReservedAt, Reservation,
    ReservationId, ReservationStatus, SelectLimit, SelectOffset, UserId,
};
use kernel::KernelError;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

pub struct PostgresReservationRepository;

#[async_trait::async_trait]
impl ReservationQuery for PostgresReservationRepository {
    type Transaction = PostgresTransaction;

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        id: &ReservationId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        PgReservationInternal::find_by_id(con, id).await
    }

    async fn find_first_in_line(
        &self,
        con: &mut PostgresTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        PgReservationInternal::find_first_in_line(con, book_id).await
    }

    async fn find_active_by_book_and_user(
        &self,
        con: &mut PostgresTransaction,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        PgReservationInternal::find_active_by_book_and_user(con, book_id, user_id).await
    }

    async fn find_by_book_id(
        &self,
        con: &mut PostgresTransaction,
        book_id: &BookId,
        status: Option<&ReservationStatus>,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        PgReservationInternal::find_by_book_id(con, book_id, status).await
    }

    async fn find_by_user_id(
        &self,
        con: &mut PostgresTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        PgReservationInternal::find_by_user_id(con, user_id).await
    }

    async fn find_all(
        &self,
        con: &mut PostgresTransaction,
        status: Option<&ReservationStatus>,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        PgReservationInternal::find_all(con, status, limit, offset).await
    }

    async fn find_overdue(
        &self,
        con: &mut PostgresTransaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        PgReservationInternal::find_overdue(con, now).await
    }
}

#[async_trait::async_trait]
impl ReservationModifier for PostgresReservationRepository {
    type Transaction = PostgresTransaction;

    async fn lock_book(
        &self,
        con: &mut PostgresTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        PgReservationInternal::lock_book(con, book_id).await
    }

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        reservation: &Reservation,
    ) -> error_stack::Result<(), KernelError> {
        PgReservationInternal::create(con, reservation).await
    }

    async fn update(
        &self,
        con: &mut PostgresTransaction,
        reservation: &Reservation,
        expected: &ReservationStatus,
    ) -> error_stack::Result<bool, KernelError> {
        PgReservationInternal::update(con, reservation, expected).await
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    book_id: Uuid,
    user_id: Uuid,
    status: String,
    reserved_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    notified: bool,
    fulfilled_at: Option<OffsetDateTime>,
    cancelled_at: Option<OffsetDateTime>,
    expired_at: Option<OffsetDateTime>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = Report<KernelError>;
    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let status = value.status.parse::<ReservationStatus>().map_err(|error| {
            Report::new(KernelError::Internal)
                .attach_printable(format!("Reservation {}: {error}", value.id))
        })?;
        Ok(Reservation::new(
            ReservationId::new(value.id),
            BookId::new(value.book_id),
            UserId::new(value.user_id),
            status,
            ReservedAt::new(value.reserved_at),
            ExpiresAt::new(value.expires_at),
            IsNotified::new(value.notified),
            value.fulfilled_at.map(FulfilledAt::new),
            value.cancelled_at.map(CancelledAt::new),
            value.expired_at.map(ExpiredAt::new),
        ))
    }
}

fn into_reservations(
    rows: Vec<ReservationRow>,
) -> error_stack::Result<Vec<Reservation>, KernelError> {
    rows.into_iter().map(Reservation::try_from).collect()
}

pub(in crate::database) struct PgReservationInternal;

impl PgReservationInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &ReservationId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Reservation::try_from).transpose()
    }

    async fn find_first_in_line(
        con: &mut PgConnection,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE book_id = $1 AND status = 'active'
            ORDER BY reserved_at, id
            LIMIT 1
            "#,
        )
        .bind(book_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Reservation::try_from).transpose()
    }

    async fn find_active_by_book_and_user(
        con: &mut PgConnection,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE book_id = $1 AND user_id = $2 AND status = 'active'
            "#,
        )
        .bind(book_id.as_ref())
        .bind(user_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Reservation::try_from).transpose()
    }

    async fn find_by_book_id(
        con: &mut PgConnection,
        book_id: &BookId,
        status: Option<&ReservationStatus>,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE book_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY reserved_at, id
            "#,
        )
        .bind(book_id.as_ref())
        .bind(status.map(ReservationStatus::as_str))
        .fetch_all(con)
        .await
        .convert_error()?;
        into_reservations(rows)
    }

    async fn find_by_user_id(
        con: &mut PgConnection,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE user_id = $1
            ORDER BY reserved_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        into_reservations(rows)
    }

    async fn find_all(
        con: &mut PgConnection,
        status: Option<&ReservationStatus>,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY reserved_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(ReservationStatus::as_str))
        .bind(limit.as_ref())
        .bind(offset.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        into_reservations(rows)
    }

    async fn find_overdue(
        con: &mut PgConnection,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            // language=postgresql
            r#"
            SELECT id, book_id, user_id, status, reserved_at, expires_at, notified,
                   fulfilled_at, cancelled_at, expired_at
            FROM reservations
            WHERE status = 'active' AND expires_at < $1
            ORDER BY reserved_at, id
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(con)
        .await
        .convert_error()?;
        into_reservations(rows)
    }

    async fn lock_book(
        con: &mut PgConnection,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        // Released automatically on commit or rollback.
        sqlx::query(
            // language=postgresql
            r#"
            SELECT pg_advisory_xact_lock(hashtextextended($1, 0))
            "#,
        )
        .bind(book_id.as_ref().to_string())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn create(
        con: &mut PgConnection,
        reservation: &Reservation,
    ) -> error_stack::Result<(), KernelError> {
        // Duplicates hit the partial unique index and surface as 23505.
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO reservations (id, book_id, user_id, status, reserved_at, expires_at,
                                      notified, fulfilled_at, cancelled_at, expired_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reservation.id().as_ref())
        .bind(reservation.book_id().as_ref())
        .bind(reservation.user_id().as_ref())
        .bind(reservation.status().as_str())
        .bind(reservation.reserved_at().as_ref())
        .bind(reservation.expires_at().as_ref())
        .bind(reservation.notified().as_ref())
        .bind(reservation.fulfilled_at().map(|at| *at.as_ref()))
        .bind(reservation.cancelled_at().map(|at| *at.as_ref()))
        .bind(reservation.expired_at().map(|at| *at.as_ref()))
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn update(
        con: &mut PgConnection,
        reservation: &Reservation,
        expected: &ReservationStatus,
    ) -> error_stack::Result<bool, KernelError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE reservations
            SET status = $2, notified = $3, fulfilled_at = $4, cancelled_at = $5, expired_at = $6
            WHERE id = $1 AND status = $7
            "#,
        )
        .bind(reservation.id().as_ref())
        .bind(reservation.status().as_str())
        .bind(reservation.notified().as_ref())
        .bind(reservation.fulfilled_at().map(|at| *at.as_ref()))
        .bind(reservation.cancelled_at().map(|at| *at.as_ref()))
        .bind(reservation.expired_at().map(|at| *at.as_ref()))
        .bind(expected.as_str())
        .execute(con)
        .await
        .convert_error()?;
        Ok(result.rows_affected() == 1)
    }
}
