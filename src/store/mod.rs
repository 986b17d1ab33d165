pub mod memory;
pub mod sqlite;

pub use memory::MemoryRateStore;
pub use sqlite::SqliteRateStore;
