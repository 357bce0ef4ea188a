use error_stack::Report;
use sqlx::PgConnection;

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::interface::gateway::BookCatalog;
use kernel::prelude::entity::{BookAmount, BookId, UserId};
use kernel::KernelError;

use crate::database::postgres::PostgresDatabase;
use crate::error::ConvertError;

/// Catalog view over the `books` table. Allocation runs in its own
/// transaction, separate from any reservation write.
#[derive(Clone)]
pub struct PostgresBookCatalog {
    db: PostgresDatabase,
}

impl PostgresBookCatalog {
    pub fn new(db: PostgresDatabase) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl BookCatalog for PostgresBookCatalog {
    async fn find_availability(
        &self,
        book_id: &BookId,
    ) -> error_stack::Result<Option<BookAmount>, KernelError> {
        let mut con = self.db.transact().await?;
        let amount = PgBookInternal::find_amount(&mut con, book_id).await?;
        con.commit().await?;
        Ok(amount)
    }

    async fn allocate(
        &self,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<(), KernelError> {
        let mut con = self.db.transact().await?;
        PgBookInternal::take_copy(&mut con, book_id).await?;
        PgBookInternal::record_rent(&mut con, book_id, user_id).await?;
        con.commit().await
    }
}

#[derive(sqlx::FromRow)]
struct AmountRow {
    amount: i32,
}

pub(in crate::database) struct PgBookInternal;

impl PgBookInternal {
    async fn find_amount(
        con: &mut PgConnection,
        book_id: &BookId,
    ) -> error_stack::Result<Option<BookAmount>, KernelError> {
        let row = sqlx::query_as::<_, AmountRow>(
            // language=postgresql
            r#"
            SELECT amount
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        Ok(row.map(|row| BookAmount::new(row.amount)))
    }

    async fn take_copy(con: &mut PgConnection, book_id: &BookId) -> error_stack::Result<(), KernelError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE books
            SET amount = amount - 1
            WHERE id = $1 AND amount > 0
            "#,
        )
        .bind(book_id.as_ref())
        .execute(con)
        .await
        .convert_error()?;
        if result.rows_affected() == 0 {
            return Err(Report::new(KernelError::NotFound)
                .attach_printable(format!("No copy of book {} on the shelf", book_id.as_ref())));
        }
        Ok(())
    }

    async fn record_rent(
        con: &mut PgConnection,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<(), KernelError> {
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO book_rents (book_id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(book_id.as_ref())
        .bind(user_id.as_ref())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use sqlx::PgConnection;
    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::gateway::BookCatalog;
    use kernel::prelude::entity::{BookAmount, BookId, UserId};
    use kernel::KernelError;

    use crate::database::postgres::{PostgresBookCatalog, PostgresDatabase};
    use crate::error::ConvertError;

    async fn insert_book(
        con: &mut PgConnection,
        amount: i32,
    ) -> error_stack::Result<BookId, KernelError> {
        let id = Uuid::new_v4();
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO books (id, title, amount)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(format!("book-{id}"))
        .bind(amount)
        .execute(con)
        .await
        .convert_error()?;
        Ok(BookId::new(id))
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn allocation_takes_one_copy() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;
        let book_id = insert_book(&mut con, 1).await?;
        con.commit().await?;

        let catalog = PostgresBookCatalog::new(db);
        let user_id = UserId::new(Uuid::new_v4());
        assert_eq!(
            catalog.find_availability(&book_id).await?,
            Some(BookAmount::new(1))
        );
        catalog.allocate(&book_id, &user_id).await?;
        assert_eq!(
            catalog.find_availability(&book_id).await?,
            Some(BookAmount::new(0))
        );

        let report = catalog.allocate(&book_id, &user_id).await.unwrap_err();
        assert_eq!(report.current_context(), &KernelError::NotFound);

        let unknown = BookId::new(Uuid::new_v4());
        assert_eq!(catalog.find_availability(&unknown).await?, None);
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn same_user_can_rent_a_book_again() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;
        let book_id = insert_book(&mut con, 2).await?;
        con.commit().await?;

        let catalog = PostgresBookCatalog::new(db);
        let user_id = UserId::new(Uuid::new_v4());
        catalog.allocate(&book_id, &user_id).await?;
        catalog.allocate(&book_id, &user_id).await?;
        assert_eq!(
            catalog.find_availability(&book_id).await?,
            Some(BookAmount::new(0))
        );
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn foreign_unique_violation_is_not_a_duplicate_reservation(
    ) -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;
        let book_id = insert_book(&mut con, 1).await?;
        let report = sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO books (id, title)
            VALUES ($1, 'again')
            "#,
        )
        .bind(book_id.as_ref())
        .execute(&mut **con)
        .await
        .convert_error()
        .unwrap_err();
        assert_eq!(report.current_context(), &KernelError::Internal);
        con.roll_back().await?;
        Ok(())
    }
}
