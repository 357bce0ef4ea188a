use std::time::Duration;

use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Connection;
use error_stack::{Report, ResultExt};
use tracing::debug;

use kernel::interface::database::DatabaseConnection;
use kernel::interface::gateway::{NoticeEnvelope, NotificationGateway, ReservationNotice};
use kernel::KernelError;

use crate::config::storage_timeout;
use crate::database::RedisDatabase;
use crate::env_or;
use crate::error::ConvertError;

const NOTICE_STREAM: &str = "NOTICE_STREAM";
const NOTICE_FIELD: &str = "notice";

/// Appends notices to a Redis stream. Delivery and retries belong to the
/// stream's consumers.
pub struct RedisNotificationGateway {
    db: RedisDatabase,
    stream: String,
    timeout: Duration,
}

impl RedisNotificationGateway {
    pub fn new(db: RedisDatabase) -> error_stack::Result<Self, KernelError> {
        let stream = env_or(NOTICE_STREAM, "reservation-notices".to_string())?;
        let timeout = storage_timeout()?;
        Ok(Self::with_stream(db, stream, timeout))
    }

    pub fn with_stream(db: RedisDatabase, stream: String, timeout: Duration) -> Self {
        Self {
            db,
            stream,
            timeout,
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait::async_trait]
impl NotificationGateway for RedisNotificationGateway {
    async fn dispatch(&self, notice: ReservationNotice) -> error_stack::Result<(), KernelError> {
        let envelope = NoticeEnvelope::from(notice);
        let send = async {
            let mut con = self.db.transact().await?;
            RedisNoticeInternal::append(&mut con, &self.stream, &envelope).await
        };
        let entry = tokio::time::timeout(self.timeout, send)
            .await
            .change_context_lazy(|| KernelError::StorageUnavailable)
            .attach_printable_lazy(|| format!("XADD to {} timed out", self.stream))??;
        debug!("Notice {} appended as {entry}", envelope.id());
        Ok(())
    }
}

pub(in crate::database) struct RedisNoticeInternal;

impl RedisNoticeInternal {
    async fn append(
        con: &mut Connection,
        stream: &str,
        envelope: &NoticeEnvelope,
    ) -> error_stack::Result<String, KernelError> {
        let serialized = serde_json::to_string(envelope)
            .map_err(|e| Report::new(e).change_context(KernelError::Internal))?;
        con.xadd(stream, "*", &[(NOTICE_FIELD, &serialized)])
            .await
            .convert_error()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use deadpool_redis::redis::streams::StreamRangeReply;
    use deadpool_redis::redis::{self, AsyncCommands};
    use uuid::Uuid;

    use kernel::interface::database::DatabaseConnection;
    use kernel::interface::gateway::{NoticeEnvelope, NotificationGateway, ReservationNotice};
    use kernel::prelude::entity::{BookId, ReservationId, UserId};
    use kernel::KernelError;

    use crate::database::{RedisDatabase, RedisNotificationGateway};
    use crate::error::ConvertError;

    #[test_with::env(REDIS_TEST)]
    #[tokio::test]
    async fn dispatch_appends_envelope() -> error_stack::Result<(), KernelError> {
        let db = RedisDatabase::new()?;
        let stream = format!("test-notices-{}", Uuid::new_v4());
        let gateway =
            RedisNotificationGateway::with_stream(db.clone(), stream.clone(), Duration::from_secs(5));
        let notice = ReservationNotice::Fulfillable {
            reservation_id: ReservationId::generate(),
            book_id: BookId::new(Uuid::new_v4()),
            user_id: UserId::new(Uuid::new_v4()),
        };
        gateway.dispatch(notice.clone()).await?;

        let mut con = db.transact().await?;
        let reply: StreamRangeReply = con
            .xrevrange_count(&stream, "+", "-", 1)
            .await
            .convert_error()?;
        let entry = &reply.ids[0];
        let raw: String = redis::from_redis_value(&entry.map["notice"]).convert_error()?;
        let envelope: NoticeEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.notice(), &notice);

        let _: i64 = con.del(&stream).await.convert_error()?;
        Ok(())
    }
}
