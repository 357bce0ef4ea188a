use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Error, PgConnection, Pool, Postgres};

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::KernelError;

use crate::config::storage_timeout;
use crate::env;
use crate::error::ConvertError;

pub use self::{book::*, reservation::*, user::*};

mod book;
mod reservation;
mod user;

static POSTGRES_URL: &str = "POSTGRES_URL";

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<Postgres>,
}

impl PostgresDatabase {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        let url = env(POSTGRES_URL)?;
        let timeout = storage_timeout()?;
        Self::connect(&url, timeout).await
    }

    /// Every statement and lock wait on the pool is bounded by `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> error_stack::Result<Self, KernelError> {
        let millis = timeout.as_millis().to_string();
        let options = PgConnectOptions::from_str(url)
            .convert_error()?
            .options([
                ("statement_timeout", millis.as_str()),
                ("lock_timeout", millis.as_str()),
            ]);
        let pool = PgPoolOptions::new()
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .convert_error()?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .change_context_lazy(|| KernelError::Internal)
            .attach_printable("Failed to run migrations")?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for PostgresDatabase {
    type Transaction = PostgresTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        let transaction = self.pool.begin().await.convert_error()?;
        Ok(PostgresTransaction(transaction))
    }
}

pub struct PostgresTransaction(sqlx::Transaction<'static, Postgres>);

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        self.0.commit().await.convert_error()
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        self.0.rollback().await.convert_error()
    }
}

impl Deref for PostgresTransaction {
    type Target = PgConnection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PostgresTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// SQLSTATE classes worth a retry: serialization failure, deadlock,
// statement timeout and lock timeout.
const TRANSIENT_STATES: [&str; 4] = ["40001", "40P01", "57014", "55P03"];
const UNIQUE_VIOLATION: &str = "23505";
const ACTIVE_RESERVATION_INDEX: &str = "reservations_active_book_user";

impl<T> ConvertError for Result<T, Error> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| {
            let context = match &error {
                Error::PoolTimedOut | Error::PoolClosed | Error::Io(_) => {
                    KernelError::StorageUnavailable
                }
                Error::Database(database) => match database.code().as_deref() {
                    Some(UNIQUE_VIOLATION)
                        if database.constraint() == Some(ACTIVE_RESERVATION_INDEX) =>
                    {
                        KernelError::DuplicateReservation
                    }
                    Some(code) if TRANSIENT_STATES.contains(&code) => {
                        KernelError::StorageUnavailable
                    }
                    _ => KernelError::Internal,
                },
                _ => KernelError::Internal,
            };
            Report::from(error).change_context(context)
        })
    }
}
