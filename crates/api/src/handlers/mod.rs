pub mod health;
pub mod metrics;
pub mod obligations;
pub mod payments;
pub mod priorities;
