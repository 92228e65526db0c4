pub mod client_repository;
pub mod payment_repository;
pub mod recurring_payment_repository;
pub mod work_item_repository;

pub use client_repository::SqliteClientRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use recurring_payment_repository::SqliteRecurringPaymentRepository;
pub use work_item_repository::SqliteWorkItemRepository;
