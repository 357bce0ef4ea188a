use error_stack::Report;
use sqlx::PgConnection;

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::interface::gateway::UserDirectory;
use kernel::prelude::entity::{OutstandingFine, UserId, UserRole, UserStanding};
use kernel::KernelError;

use crate::database::postgres::PostgresDatabase;
use crate::error::ConvertError;

#[derive(Clone)]
pub struct PostgresUserDirectory {
    db: PostgresDatabase,
}

impl PostgresUserDirectory {
    pub fn new(db: PostgresDatabase) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_standing(
        &self,
        user_id: &UserId,
    ) -> error_stack::Result<Option<UserStanding>, KernelError> {
        let mut con = self.db.transact().await?;
        let standing = PgUserInternal::find_standing(&mut con, user_id).await?;
        con.commit().await?;
        Ok(standing)
    }
}

#[derive(sqlx::FromRow)]
struct StandingRow {
    role: String,
    outstanding_fine: i64,
}

pub(in crate::database) struct PgUserInternal;

impl PgUserInternal {
    async fn find_standing(
        con: &mut PgConnection,
        user_id: &UserId,
    ) -> error_stack::Result<Option<UserStanding>, KernelError> {
        let row = sqlx::query_as::<_, StandingRow>(
            // language=postgresql
            r#"
            SELECT role, outstanding_fine
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(|row| {
            let role = row.role.parse::<UserRole>().map_err(|error| {
                Report::new(KernelError::Internal)
                    .attach_printable(format!("User {}: {error}", user_id.as_ref()))
            })?;
            Ok(UserStanding::new(
                *user_id,
                role,
                OutstandingFine::new(row.outstanding_fine),
            ))
        })
        .transpose()
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::gateway::UserDirectory;
    use kernel::prelude::entity::{UserId, UserRole};
    use kernel::KernelError;

    use crate::database::postgres::{PostgresDatabase, PostgresUserDirectory};
    use crate::error::ConvertError;

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn standing_reflects_role_and_fines() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let id = Uuid::new_v4();
        let mut con = db.transact().await?;
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO users (id, name, role, outstanding_fine)
            VALUES ($1, $2, 'admin', 250)
            "#,
        )
        .bind(id)
        .bind(format!("user-{id}"))
        .execute(&mut **con)
        .await
        .convert_error()?;
        con.commit().await?;

        let directory = PostgresUserDirectory::new(db);
        let standing = directory
            .find_standing(&UserId::new(id))
            .await?
            .unwrap();
        assert_eq!(standing.role(), &UserRole::Admin);
        assert!(standing.is_admin());
        assert!(!standing.can_reserve());

        let missing = directory
            .find_standing(&UserId::new(Uuid::new_v4()))
            .await?;
        assert!(missing.is_none());
        Ok(())
    }
}
