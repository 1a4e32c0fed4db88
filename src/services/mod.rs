// Service exports
pub mod cache;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::MemoryStore;
pub use notifications::{create_notifier, MatchCreatedNotice, Notifier, NotifyError};
pub use postgres::PostgresClient;
pub use store::{MatchStore, ProjectStore, StoreError, VendorStore};
