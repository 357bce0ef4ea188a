use crate::entity::{BookAmount, BookId, UserId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait BookCatalog: 'static + Sync + Send {
    /// `None` when the book is unknown to the catalog.
    async fn find_availability(
        &self,
        book_id: &BookId,
    ) -> error_stack::Result<Option<BookAmount>, KernelError>;

    /// Hands one copy of the book to the user after a fulfilment.
    async fn allocate(
        &self,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnBookCatalog: 'static + Sync + Send {
    type BookCatalog: BookCatalog;
    fn book_catalog(&self) -> &Self::BookCatalog;
}
