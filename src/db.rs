// src/db.rs

pub mod change_log_repo;
pub mod delivery_repo;
pub mod memory;
pub mod order_repo;
pub mod pg;
pub mod query;
pub mod school_repo;
pub mod store;
pub mod token_repo;
pub mod user_repo;
pub mod vendor_repo;

pub use delivery_repo::DeliveryRepository;
pub use memory::MemoryStore;
pub use order_repo::OrderRepository;
pub use pg::PgStore;
pub use school_repo::SchoolRepository;
pub use store::Store;
pub use token_repo::TokenRepository;
pub use user_repo::UserRepository;
pub use vendor_repo::VendorRepository;
