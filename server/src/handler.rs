use std::ops::Deref;
use std::sync::Arc;

use driver::config::load_reservation_config;
use driver::database::{
    PostgresBookCatalog, PostgresDatabase, PostgresReservationRepository, PostgresUserDirectory,
    RedisDatabase, RedisNotificationGateway,
};
use kernel::interface::clock::{DependOnClock, SystemClock};
use kernel::interface::config::{DependOnReservationConfig, ReservationConfig};
use kernel::interface::database::DependOnDatabaseConnection;
use kernel::interface::gateway::{
    DependOnBookCatalog, DependOnNotificationGateway, DependOnUserDirectory,
};
use kernel::interface::query::DependOnReservationQuery;
use kernel::interface::update::DependOnReservationModifier;
use kernel::KernelError;
use tracing::info;

#[derive(Clone)]
pub struct AppModule(Arc<Handler>);

impl AppModule {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        Ok(Self(Arc::new(Handler::init().await?)))
    }
}

impl Deref for AppModule {
    type Target = Handler;
    fn deref(&self) -> &Self::Target {
        Deref::deref(&self.0)
    }
}

pub struct Handler {
    pgpool: PostgresDatabase,
    reservations: PostgresReservationRepository,
    catalog: PostgresBookCatalog,
    directory: PostgresUserDirectory,
    notifier: RedisNotificationGateway,
    clock: SystemClock,
    config: ReservationConfig,
}

impl Handler {
    pub async fn init() -> error_stack::Result<Self, KernelError> {
        let config = load_reservation_config()?;
        let pgpool = PostgresDatabase::new().await?;
        let notifier = RedisNotificationGateway::new(RedisDatabase::new()?)?;
        info!(
            "Reservation window {}, notices go to stream {}",
            config.window().as_ref(),
            notifier.stream()
        );

        Ok(Self {
            catalog: PostgresBookCatalog::new(pgpool.clone()),
            directory: PostgresUserDirectory::new(pgpool.clone()),
            reservations: PostgresReservationRepository,
            notifier,
            clock: SystemClock,
            config,
            pgpool,
        })
    }
}

impl DependOnDatabaseConnection for Handler {
    type DatabaseConnection = PostgresDatabase;
    fn database_connection(&self) -> &Self::DatabaseConnection {
        &self.pgpool
    }
}

impl DependOnReservationQuery for Handler {
    type ReservationQuery = PostgresReservationRepository;
    fn reservation_query(&self) -> &Self::ReservationQuery {
        &self.reservations
    }
}

impl DependOnReservationModifier for Handler {
    type ReservationModifier = PostgresReservationRepository;
    fn reservation_modifier(&self) -> &Self::ReservationModifier {
        &self.reservations
    }
}

impl DependOnBookCatalog for Handler {
    type BookCatalog = PostgresBookCatalog;
    fn book_catalog(&self) -> &Self::BookCatalog {
        &self.catalog
    }
}

impl DependOnUserDirectory for Handler {
    type UserDirectory = PostgresUserDirectory;
    fn user_directory(&self) -> &Self::UserDirectory {
        &self.directory
    }
}

impl DependOnNotificationGateway for Handler {
    type NotificationGateway = RedisNotificationGateway;
    fn notification_gateway(&self) -> &Self::NotificationGateway {
        &self.notifier
    }
}

impl DependOnClock for Handler {
    type Clock = SystemClock;
    fn clock(&self) -> &Self::Clock {
        &self.clock
    }
}

impl DependOnReservationConfig for Handler {
    fn reservation_config(&self) -> &ReservationConfig {
        &self.config
    }
}
