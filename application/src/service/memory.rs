//! In-process doubles for every collaborator of the reservation services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use error_stack::Report;
use kernel::interface::clock::{Clock, DependOnClock};
use kernel::interface::config::{DependOnReservationConfig, ReservationConfig};
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::gateway::{
    BookCatalog, DependOnBookCatalog, DependOnNotificationGateway, DependOnUserDirectory,
    NotificationGateway, ReservationNotice, UserDirectory,
};
use kernel::interface::query::{DependOnReservationQuery, ReservationQuery};
use kernel::interface::update::{DependOnReservationModifier, ReservationModifier};
use kernel::prelude::entity::{
    BookAmount, BookId, OutstandingFine, Reservation, ReservationId, ReservationStatus,
    SelectLimit, SelectOffset, UserId, UserRole, UserStanding,
};
use kernel::KernelError;
use time::{Duration, OffsetDateTime};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

type Table = HashMap<ReservationId, Reservation>;

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    table: Arc<tokio::sync::Mutex<Table>>,
    refusing: Arc<AtomicBool>,
}

/// Holds the whole table for its lifetime, so transactions run one at a time.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Table>,
    staged: Table,
    refusing: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl DatabaseConnection for MemoryDatabase {
    type Transaction = MemoryTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction {
            guard,
            staged,
            refusing: Arc::clone(&self.refusing),
        })
    }
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        let MemoryTransaction {
            mut guard,
            staged,
            refusing,
        } = self;
        if refusing.load(Ordering::SeqCst) {
            return Err(Report::new(KernelError::StorageUnavailable));
        }
        *guard = staged;
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }
}

impl MemoryDatabase {
    pub fn refuse_commits(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<Reservation> {
        self.table.lock().await.values().cloned().collect()
    }
}

#[derive(Default)]
pub struct MemoryReservationRepository;

fn sorted_by_queue(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by(|a, b| a.queue_order(b));
    reservations
}

fn sorted_most_recent(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by(|a, b| b.queue_order(a));
    reservations
}

#[async_trait::async_trait]
impl ReservationQuery for MemoryReservationRepository {
    type Transaction = MemoryTransaction;

    async fn find_by_id(
        &self,
        con: &mut MemoryTransaction,
        id: &ReservationId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        Ok(con.staged.get(id).cloned())
    }

    async fn find_first_in_line(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        let candidates = con.staged.values().filter(|r| r.book_id() == book_id);
        Ok(kernel::prelude::entity::first_in_line(candidates).cloned())
    }

    async fn find_active_by_book_and_user(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
        user_id: &UserId,
    ) -> error_stack::Result<Option<Reservation>, KernelError> {
        Ok(con
            .staged
            .values()
            .find(|r| r.is_active() && r.book_id() == book_id && r.user_id() == user_id)
            .cloned())
    }

    async fn find_by_book_id(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
        status: Option<&ReservationStatus>,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let found = con
            .staged
            .values()
            .filter(|r| r.book_id() == book_id)
            .filter(|r| status.map_or(true, |status| r.status() == status))
            .cloned()
            .collect();
        Ok(sorted_by_queue(found))
    }

    async fn find_by_user_id(
        &self,
        con: &mut MemoryTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let found = con
            .staged
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        Ok(sorted_most_recent(found))
    }

    async fn find_all(
        &self,
        con: &mut MemoryTransaction,
        status: Option<&ReservationStatus>,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let found = con
            .staged
            .values()
            .filter(|r| status.map_or(true, |status| r.status() == status))
            .cloned()
            .collect();
        Ok(sorted_most_recent(found)
            .into_iter()
            .skip(usize::try_from(*offset.as_ref()).unwrap_or(0))
            .take(usize::try_from(*limit.as_ref()).unwrap_or(0))
            .collect())
    }

    async fn find_overdue(
        &self,
        con: &mut MemoryTransaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Reservation>, KernelError> {
        let found = con
            .staged
            .values()
            .filter(|r| r.is_active() && r.is_overdue(now))
            .cloned()
            .collect();
        Ok(sorted_by_queue(found))
    }
}

#[async_trait::async_trait]
impl ReservationModifier for MemoryReservationRepository {
    type Transaction = MemoryTransaction;

    async fn lock_book(
        &self,
        _con: &mut MemoryTransaction,
        _book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        Ok(())
    }

    async fn create(
        &self,
        con: &mut MemoryTransaction,
        reservation: &Reservation,
    ) -> error_stack::Result<(), KernelError> {
        let duplicate = con.staged.values().any(|r| {
            r.is_active()
                && r.book_id() == reservation.book_id()
                && r.user_id() == reservation.user_id()
        });
        if duplicate {
            return Err(Report::new(KernelError::DuplicateReservation));
        }
        con.staged.insert(*reservation.id(), reservation.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryTransaction,
        reservation: &Reservation,
        expected: &ReservationStatus,
    ) -> error_stack::Result<bool, KernelError> {
        match con.staged.get_mut(reservation.id()) {
            Some(stored) if stored.status() == expected => {
                *stored = reservation.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    books: Mutex<HashMap<BookId, i32>>,
    broken: AtomicBool,
}

impl MemoryCatalog {
    pub fn put(&self, book_id: BookId, amount: i32) {
        self.books.lock().unwrap().insert(book_id, amount);
    }

    pub fn amount(&self, book_id: &BookId) -> Option<i32> {
        self.books.lock().unwrap().get(book_id).copied()
    }

    pub fn break_down(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BookCatalog for MemoryCatalog {
    async fn find_availability(
        &self,
        book_id: &BookId,
    ) -> error_stack::Result<Option<BookAmount>, KernelError> {
        Ok(self.amount(book_id).map(BookAmount::new))
    }

    async fn allocate(
        &self,
        book_id: &BookId,
        _user_id: &UserId,
    ) -> error_stack::Result<(), KernelError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Report::new(KernelError::StorageUnavailable));
        }
        let mut books = self.books.lock().unwrap();
        match books.get_mut(book_id) {
            Some(amount) if *amount > 0 => {
                *amount -= 1;
                Ok(())
            }
            _ => Err(Report::new(KernelError::NotFound)),
        }
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<UserId, UserStanding>>,
}

impl MemoryDirectory {
    pub fn register(&self, role: UserRole, fine: i64) -> UserId {
        let id = UserId::new(Uuid::new_v4());
        let standing = UserStanding::new(id, role, OutstandingFine::new(fine));
        self.users.lock().unwrap().insert(id, standing);
        id
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_standing(
        &self,
        user_id: &UserId,
    ) -> error_stack::Result<Option<UserStanding>, KernelError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<ReservationNotice>>,
    broken: AtomicBool,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<ReservationNotice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn break_down(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NotificationGateway for RecordingGateway {
    async fn dispatch(&self, notice: ReservationNotice) -> error_stack::Result<(), KernelError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Report::new(KernelError::StorageUnavailable));
        }
        self.sent.lock().unwrap().push(notice);
        Ok(())
    }
}

pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MemoryModule {
    pub database: MemoryDatabase,
    pub repository: MemoryReservationRepository,
    pub catalog: MemoryCatalog,
    pub directory: MemoryDirectory,
    pub gateway: RecordingGateway,
    pub clock: ManualClock,
    pub config: ReservationConfig,
}

impl MemoryModule {
    /// A book with no copies on the shelf, ready to be reserved.
    pub fn checked_out_book(&self) -> BookId {
        let id = BookId::new(Uuid::new_v4());
        self.catalog.put(id, 0);
        id
    }

    pub fn member(&self) -> UserId {
        self.directory.register(UserRole::Member, 0)
    }

    pub fn admin(&self) -> UserId {
        self.directory.register(UserRole::Admin, 0)
    }
}

impl DependOnDatabaseConnection for MemoryModule {
    type DatabaseConnection = MemoryDatabase;
    fn database_connection(&self) -> &Self::DatabaseConnection {
        &self.database
    }
}

impl DependOnReservationQuery for MemoryModule {
    type ReservationQuery = MemoryReservationRepository;
    fn reservation_query(&self) -> &Self::ReservationQuery {
        &self.repository
    }
}

impl DependOnReservationModifier for MemoryModule {
    type ReservationModifier = MemoryReservationRepository;
    fn reservation_modifier(&self) -> &Self::ReservationModifier {
        &self.repository
    }
}

impl DependOnBookCatalog for MemoryModule {
    type BookCatalog = MemoryCatalog;
    fn book_catalog(&self) -> &Self::BookCatalog {
        &self.catalog
    }
}

impl DependOnUserDirectory for MemoryModule {
    type UserDirectory = MemoryDirectory;
    fn user_directory(&self) -> &Self::UserDirectory {
        &self.directory
    }
}

impl DependOnNotificationGateway for MemoryModule {
    type NotificationGateway = RecordingGateway;
    fn notification_gateway(&self) -> &Self::NotificationGateway {
        &self.gateway
    }
}

impl DependOnClock for MemoryModule {
    type Clock = ManualClock;
    fn clock(&self) -> &Self::Clock {
        &self.clock
    }
}

impl DependOnReservationConfig for MemoryModule {
    fn reservation_config(&self) -> &ReservationConfig {
        &self.config
    }
}
