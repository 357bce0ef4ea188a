mod notice;

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use deadpool_redis::redis::RedisError;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, PoolError, Runtime, Timeouts};
use error_stack::{Report, ResultExt};
use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::KernelError;

use crate::config::storage_timeout;
use crate::env;
use crate::error::ConvertError;

pub use self::notice::*;

const REDIS_URL: &str = "REDIS_URL";

#[derive(Clone)]
pub struct RedisDatabase {
    pool: Pool,
}

impl RedisDatabase {
    pub fn new() -> error_stack::Result<Self, KernelError> {
        let url = env(REDIS_URL)?;
        let timeout = storage_timeout()?;
        Self::connect(url, timeout)
    }

    pub fn connect(url: String, timeout: Duration) -> error_stack::Result<Self, KernelError> {
        let mut cfg = Config::from_url(url);
        cfg.pool = Some(PoolConfig {
            timeouts: Timeouts {
                wait: Some(timeout),
                create: Some(timeout),
                recycle: Some(timeout),
            },
            ..PoolConfig::default()
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .change_context_lazy(|| KernelError::Internal)?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for RedisDatabase {
    type Transaction = RedisTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        let con: Connection = self.pool.get().await.convert_error()?;
        Ok(RedisTransaction(con))
    }
}

/// Commands apply as soon as they are sent; there is nothing to commit.
pub struct RedisTransaction(Connection);

#[async_trait::async_trait]
impl Transaction for RedisTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Err(Report::new(KernelError::Internal)
            .attach_printable("roll_back is not supported for redis"))
    }
}

impl Deref for RedisTransaction {
    type Target = Connection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RedisTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

fn redis_context(error: &RedisError) -> KernelError {
    if error.is_timeout() || error.is_connection_dropped() || error.is_io_error() {
        KernelError::StorageUnavailable
    } else {
        KernelError::Internal
    }
}

impl<T> ConvertError for Result<T, PoolError> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| {
            let context = match &error {
                PoolError::Timeout(_) => KernelError::StorageUnavailable,
                PoolError::Backend(error) => redis_context(error),
                _ => KernelError::Internal,
            };
            Report::new(error).change_context(context)
        })
    }
}

impl<T> ConvertError for Result<T, RedisError> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| {
            let context = redis_context(&error);
            Report::new(error).change_context(context)
        })
    }
}
