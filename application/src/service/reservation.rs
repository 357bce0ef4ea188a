use error_stack::Report;
use kernel::interface::clock::{Clock, DependOnClock};
use kernel::interface::config::DependOnReservationConfig;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::gateway::{
    BookCatalog, DependOnBookCatalog, DependOnNotificationGateway, NotificationGateway,
    ReservationNotice,
};
use kernel::interface::query::{DependOnReservationQuery, ReservationQuery};
use kernel::interface::update::{DependOnReservationModifier, ReservationModifier};
use kernel::prelude::entity::{
    BookId, Reservation, ReservationId, ReservationStatus, SelectLimit, SelectOffset, UserId,
};
use kernel::KernelError;
use tracing::{info, warn};

use crate::service::AuthorizationService;
use crate::transfer::{
    CancelReservationDto, CreateReservationDto, ExpireReservationDto, FirstInLineDto,
    FulfillReservationDto, FulfillmentDto, GetAllReservationsDto, GetBookReservationsDto,
    GetReservationDto, GetUserReservationsDto, NotificationDto, NotifyFirstInLineDto,
    ReservationDto,
};

fn not_found(id: &ReservationId) -> Report<KernelError> {
    Report::new(KernelError::NotFound)
        .attach_printable(format!("Reservation {} not found", id.as_ref()))
}

fn lost_race(reservation: &Reservation) -> Report<KernelError> {
    Report::new(KernelError::InvalidTransition).attach_printable(format!(
        "Reservation {} changed concurrently",
        reservation.id().as_ref()
    ))
}

#[async_trait::async_trait]
pub trait CreateReservationService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnReservationQuery
    + DependOnReservationModifier
    + DependOnBookCatalog
    + DependOnClock
    + DependOnReservationConfig
    + AuthorizationService
{
    async fn create_reservation(
        &self,
        dto: CreateReservationDto,
    ) -> error_stack::Result<ReservationDto, KernelError> {
        let book_id = BookId::new(dto.book_id);
        let user_id = UserId::new(dto.user_id);

        let standing = self.find_user_standing(&user_id).await?;
        if !standing.can_reserve() {
            return Err(Report::new(KernelError::Forbidden).attach_printable(format!(
                "User {} has outstanding fines",
                dto.user_id
            )));
        }

        if *self.reservation_config().require_unavailable() {
            let amount = self
                .book_catalog()
                .find_availability(&book_id)
                .await?
                .ok_or_else(|| {
                    Report::new(KernelError::NotFound)
                        .attach_printable(format!("Book {} not found", dto.book_id))
                })?;
            if amount.is_available() {
                return Err(Report::new(KernelError::BookAvailable)
                    .attach_printable(format!("Book {} can be borrowed directly", dto.book_id)));
            }
        }

        let mut connection = self.database_connection().transact().await?;
        self.reservation_modifier()
            .lock_book(&mut connection, &book_id)
            .await?;

        let existing = self
            .reservation_query()
            .find_active_by_book_and_user(&mut connection, &book_id, &user_id)
            .await?;
        if let Some(existing) = existing {
            return Err(
                Report::new(KernelError::DuplicateReservation).attach_printable(format!(
                    "Reservation {} is still active",
                    existing.id().as_ref()
                )),
            );
        }

        let reservation = Reservation::open(
            ReservationId::generate(),
            book_id,
            user_id,
            self.clock().now(),
            self.reservation_config().window(),
        )?;
        self.reservation_modifier()
            .create(&mut connection, &reservation)
            .await?;
        connection.commit().await?;

        info!(
            "Reservation {} created for book {} by user {}",
            reservation.id().as_ref(),
            dto.book_id,
            dto.user_id
        );
        Ok(ReservationDto::from(reservation))
    }
}

impl<T> CreateReservationService for T where
    T: DependOnDatabaseConnection
        + DependOnReservationQuery
        + DependOnReservationModifier
        + DependOnBookCatalog
        + DependOnClock
        + DependOnReservationConfig
        + AuthorizationService
{
}

#[async_trait::async_trait]
pub trait GetReservationService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnReservationQuery + AuthorizationService
{
    async fn get_reservation(
        &self,
        dto: GetReservationDto,
    ) -> error_stack::Result<Option<ReservationDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let id = ReservationId::new(dto.id);
        let reservation = self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?;
        Ok(reservation.map(ReservationDto::from))
    }

    /// Evaluated against the queue as it is now; never cached.
    async fn is_first_in_line(
        &self,
        dto: GetReservationDto,
    ) -> error_stack::Result<FirstInLineDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let id = ReservationId::new(dto.id);
        let reservation = self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| not_found(&id))?;
        let first = self
            .reservation_query()
            .find_first_in_line(&mut connection, reservation.book_id())
            .await?;

        let first_in_line = first.map(|first| *first.id());
        Ok(FirstInLineDto {
            reservation_id: dto.id,
            is_first_in_line: reservation.is_active() && first_in_line == Some(id),
            first_in_line: first_in_line.map(Into::into),
        })
    }

    async fn get_book_reservations(
        &self,
        dto: GetBookReservationsDto,
    ) -> error_stack::Result<Vec<ReservationDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let book_id = BookId::new(dto.book_id);
        let reservations = self
            .reservation_query()
            .find_by_book_id(&mut connection, &book_id, dto.status.as_ref())
            .await?;
        Ok(reservations.into_iter().map(ReservationDto::from).collect())
    }

    async fn get_user_reservations(
        &self,
        dto: GetUserReservationsDto,
    ) -> error_stack::Result<Vec<ReservationDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let user_id = UserId::new(dto.user_id);
        let reservations = self
            .reservation_query()
            .find_by_user_id(&mut connection, &user_id)
            .await?;
        Ok(reservations.into_iter().map(ReservationDto::from).collect())
    }

    async fn get_all_reservations(
        &self,
        dto: GetAllReservationsDto,
    ) -> error_stack::Result<Vec<ReservationDto>, KernelError> {
        self.ensure_admin(&UserId::new(dto.acting_user_id)).await?;

        let limit = dto.limit.map(SelectLimit::new).unwrap_or_default();
        let offset = dto.offset.map(SelectOffset::new).unwrap_or_default();
        let mut connection = self.database_connection().transact().await?;
        let reservations = self
            .reservation_query()
            .find_all(&mut connection, dto.status.as_ref(), &limit, &offset)
            .await?;
        Ok(reservations.into_iter().map(ReservationDto::from).collect())
    }
}

impl<T> GetReservationService for T where
    T: DependOnDatabaseConnection + DependOnReservationQuery + AuthorizationService
{
}

/// Runs after commit. Failures are reported back as warnings, the
/// reservation stays fulfilled.
async fn dispatch_fulfillment_effects<C, G>(
    catalog: &C,
    gateway: &G,
    reservation: &Reservation,
) -> Vec<String>
where
    C: BookCatalog,
    G: NotificationGateway,
{
    let mut warnings = Vec::new();
    if let Err(report) = catalog
        .allocate(reservation.book_id(), reservation.user_id())
        .await
    {
        warn!(
            "Copy allocation failed for reservation {}: {report:?}",
            reservation.id().as_ref()
        );
        warnings.push(format!("Book allocation failed: {}", report.current_context()));
    }
    if let Err(report) = gateway
        .dispatch(ReservationNotice::fulfilled(reservation))
        .await
    {
        warn!(
            "Fulfilment notice failed for reservation {}: {report:?}",
            reservation.id().as_ref()
        );
        warnings.push(format!("Notification failed: {}", report.current_context()));
    }
    warnings
}

#[async_trait::async_trait]
pub trait FulfillReservationService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnReservationQuery
    + DependOnReservationModifier
    + DependOnBookCatalog
    + DependOnNotificationGateway
    + DependOnClock
    + AuthorizationService
{
    async fn fulfill_reservation(
        &self,
        dto: FulfillReservationDto,
    ) -> error_stack::Result<FulfillmentDto, KernelError> {
        self.ensure_admin(&UserId::new(dto.acting_user_id)).await?;

        let id = ReservationId::new(dto.reservation_id);
        let mut connection = self.database_connection().transact().await?;
        let book_id = *self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| not_found(&id))?
            .book_id();

        // Queue order must be read under the book lock.
        self.reservation_modifier()
            .lock_book(&mut connection, &book_id)
            .await?;
        let reservation = self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| not_found(&id))?;
        if reservation.is_active() {
            let first = self
                .reservation_query()
                .find_first_in_line(&mut connection, &book_id)
                .await?;
            if let Some(first) = first.filter(|first| first.id() != &id) {
                return Err(Report::new(KernelError::OutOfOrderFulfillment {
                    first_in_line: *first.id(),
                })
                .attach_printable(format!(
                    "Reservation {} was placed at {} and is still waiting",
                    first.id().as_ref(),
                    first.reserved_at().as_ref()
                )));
            }
        }

        let fulfilled = reservation.fulfill(self.clock().now())?;
        let written = self
            .reservation_modifier()
            .update(&mut connection, &fulfilled, &ReservationStatus::Active)
            .await?;
        if !written {
            return Err(lost_race(&fulfilled));
        }
        connection.commit().await?;
        info!(
            "Reservation {} fulfilled by {}",
            dto.reservation_id, dto.acting_user_id
        );

        let warnings =
            dispatch_fulfillment_effects(self.book_catalog(), self.notification_gateway(), &fulfilled)
                .await;
        Ok(FulfillmentDto {
            reservation: ReservationDto::from(fulfilled),
            warnings,
        })
    }
}

impl<T> FulfillReservationService for T where
    T: DependOnDatabaseConnection
        + DependOnReservationQuery
        + DependOnReservationModifier
        + DependOnBookCatalog
        + DependOnNotificationGateway
        + DependOnClock
        + AuthorizationService
{
}

#[async_trait::async_trait]
pub trait CancelReservationService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnReservationQuery
    + DependOnReservationModifier
    + DependOnClock
    + AuthorizationService
{
    async fn cancel_reservation(
        &self,
        dto: CancelReservationDto,
    ) -> error_stack::Result<ReservationDto, KernelError> {
        let id = ReservationId::new(dto.reservation_id);
        let acting_user = UserId::new(dto.acting_user_id);

        let mut connection = self.database_connection().transact().await?;
        let reservation = self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| not_found(&id))?;
        if reservation.user_id() != &acting_user {
            self.ensure_admin(&acting_user).await?;
        }

        let cancelled = reservation.cancel(self.clock().now())?;
        let written = self
            .reservation_modifier()
            .update(&mut connection, &cancelled, &ReservationStatus::Active)
            .await?;
        if !written {
            return Err(lost_race(&cancelled));
        }
        connection.commit().await?;
        info!(
            "Reservation {} cancelled by {}",
            dto.reservation_id, dto.acting_user_id
        );
        Ok(ReservationDto::from(cancelled))
    }
}

impl<T> CancelReservationService for T where
    T: DependOnDatabaseConnection
        + DependOnReservationQuery
        + DependOnReservationModifier
        + DependOnClock
        + AuthorizationService
{
}

#[async_trait::async_trait]
pub trait ExpireReservationService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnReservationQuery
    + DependOnReservationModifier
    + DependOnClock
{
    async fn expire_reservation(
        &self,
        dto: ExpireReservationDto,
    ) -> error_stack::Result<ReservationDto, KernelError> {
        let id = ReservationId::new(dto.reservation_id);
        let mut connection = self.database_connection().transact().await?;
        let reservation = self
            .reservation_query()
            .find_by_id(&mut connection, &id)
            .await?
            .ok_or_else(|| not_found(&id))?;

        let expired = reservation.expire(self.clock().now())?;
        let written = self
            .reservation_modifier()
            .update(&mut connection, &expired, &ReservationStatus::Active)
            .await?;
        if !written {
            return Err(lost_race(&expired));
        }
        connection.commit().await?;
        info!("Reservation {} expired", dto.reservation_id);
        Ok(ReservationDto::from(expired))
    }

    /// Expires every overdue active reservation in one transaction.
    async fn sweep_expired_reservations(
        &self,
    ) -> error_stack::Result<Vec<ReservationDto>, KernelError> {
        let now = self.clock().now();
        let mut connection = self.database_connection().transact().await?;
        let overdue = self
            .reservation_query()
            .find_overdue(&mut connection, &now)
            .await?;

        let mut expired = Vec::with_capacity(overdue.len());
        for reservation in overdue {
            let reservation = reservation.expire(now)?;
            let written = self
                .reservation_modifier()
                .update(&mut connection, &reservation, &ReservationStatus::Active)
                .await?;
            if written {
                expired.push(reservation);
            }
        }
        connection.commit().await?;
        info!("Expired {} overdue reservations", expired.len());
        Ok(expired.into_iter().map(ReservationDto::from).collect())
    }
}

impl<T> ExpireReservationService for T where
    T: DependOnDatabaseConnection
        + DependOnReservationQuery
        + DependOnReservationModifier
        + DependOnClock
{
}

#[async_trait::async_trait]
pub trait NotifyReservationService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnReservationQuery
    + DependOnReservationModifier
    + DependOnNotificationGateway
    + AuthorizationService
{
    /// Tells the head of the book's queue that a copy is waiting.
    async fn notify_first_in_line(
        &self,
        dto: NotifyFirstInLineDto,
    ) -> error_stack::Result<NotificationDto, KernelError> {
        self.ensure_admin(&UserId::new(dto.acting_user_id)).await?;

        let book_id = BookId::new(dto.book_id);
        let mut connection = self.database_connection().transact().await?;
        self.reservation_modifier()
            .lock_book(&mut connection, &book_id)
            .await?;
        let Some(first) = self
            .reservation_query()
            .find_first_in_line(&mut connection, &book_id)
            .await?
        else {
            return Ok(NotificationDto {
                reservation: None,
                warnings: Vec::new(),
            });
        };
        if first.is_notified() {
            return Ok(NotificationDto {
                reservation: Some(ReservationDto::from(first)),
                warnings: Vec::new(),
            });
        }

        // The flag commits before the notice leaves.
        let notified = first.mark_notified()?;
        let written = self
            .reservation_modifier()
            .update(&mut connection, &notified, &ReservationStatus::Active)
            .await?;
        if !written {
            return Err(lost_race(&notified));
        }
        connection.commit().await?;

        if let Err(report) = self
            .notification_gateway()
            .dispatch(ReservationNotice::fulfillable(&notified))
            .await
        {
            warn!(
                "Availability notice failed for reservation {}: {report:?}",
                notified.id().as_ref()
            );
            let mut warnings = vec![format!("Notification failed: {}", report.current_context())];
            let withdrawn = notified.withdraw_notice();
            if let Err(report) = self.withdraw_notice(&withdrawn).await {
                warn!(
                    "Reservation {} stays marked as notified: {report:?}",
                    withdrawn.id().as_ref()
                );
                warnings.push(format!("Notice flag not reset: {}", report.current_context()));
            }
            return Ok(NotificationDto {
                reservation: Some(ReservationDto::from(withdrawn)),
                warnings,
            });
        }

        info!("Reservation {} notified", notified.id().as_ref());
        Ok(NotificationDto {
            reservation: Some(ReservationDto::from(notified)),
            warnings: Vec::new(),
        })
    }

    /// Clears the flag so the next call sends the notice again.
    async fn withdraw_notice(
        &self,
        withdrawn: &Reservation,
    ) -> error_stack::Result<(), KernelError> {
        let mut connection = self.database_connection().transact().await?;
        self.reservation_modifier()
            .lock_book(&mut connection, withdrawn.book_id())
            .await?;
        let written = self
            .reservation_modifier()
            .update(&mut connection, withdrawn, &ReservationStatus::Active)
            .await?;
        if !written {
            return Err(lost_race(withdrawn));
        }
        connection.commit().await
    }
}

impl<T> NotifyReservationService for T where
    T: DependOnDatabaseConnection
        + DependOnReservationQuery
        + DependOnReservationModifier
        + DependOnNotificationGateway
        + AuthorizationService
{
}
